//! PDF signing implementation.
//!
//! [`PdfSigner`] runs the two-phase protocol end to end:
//!
//! 1. size: reserve the placeholder ([`prepare_signature`])
//! 2. serialize the incremental update and fix `/ByteRange`
//! 3. fill: hand the covered bytes to the signer and patch `/Contents`
//!
//! Every step works on an owned buffer, so a failure anywhere leaves the
//! destination untouched.

use super::builder::prepare_signature;
use super::byterange::{insert_signature, resolve_byte_range};
use super::provider::SignatureProvider;
use super::types::SignOptions;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::writer::IncrementalWriter;
use std::io::{Read, Write};
use std::path::Path;

/// Signs documents with one set of options.
#[derive(Debug, Clone, Default)]
pub struct PdfSigner {
    options: SignOptions,
    writer: IncrementalWriter,
}

impl PdfSigner {
    /// Create a new PDF signer with the given options.
    pub fn new(options: SignOptions) -> Self {
        Self {
            options,
            writer: IncrementalWriter::new(),
        }
    }

    /// The options every signature is created with.
    pub fn options(&self) -> &SignOptions {
        &self.options
    }

    /// Sign an already loaded document and return the complete signed file.
    ///
    /// The signature is added to `doc`'s pending revision, so `doc` should
    /// not be reused for another signature.
    ///
    /// # Errors
    ///
    /// Structural errors from preparing the signature, [`Error::Signer`] if
    /// the signer fails or returns nothing, and [`Error::SignatureTooLarge`]
    /// if its output does not fit the reserved space.
    pub fn sign_document(&self, doc: &mut PdfDocument, signer: &dyn SignatureProvider) -> Result<Vec<u8>> {
        let prepared = prepare_signature(doc, signer, &self.options)?;

        let serialized = self.writer.write(doc)?;
        let signature_offset = serialized.offset_of(prepared.signature_ref).ok_or_else(|| {
            Error::InvalidPdf(format!("signature {} missing from update", prepared.signature_ref))
        })?;
        let mut bytes = serialized.bytes;

        let layout = resolve_byte_range(&mut bytes, signature_offset, prepared.placeholder)?;
        log::debug!(
            "Signing {} of {} bytes",
            layout.byte_range.before_len + layout.byte_range.after_len,
            bytes.len()
        );

        let signature = {
            let mut content = layout.byte_range.reader(&bytes)?;
            signer.sign(&mut content).map_err(Error::into_signer_error)?
        };
        insert_signature(&mut bytes, &layout, &signature)?;

        log::info!(
            "Signed document: {} signature bytes in a {} byte placeholder",
            signature.len(),
            layout.capacity()
        );
        Ok(bytes)
    }

    /// Parse `input` and sign it.
    pub fn sign_bytes(&self, input: Vec<u8>, signer: &dyn SignatureProvider) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::from_bytes(input)?;
        self.sign_document(&mut doc, signer)
    }

    /// Read a document from `reader` and write the signed file to `writer`.
    ///
    /// Nothing is written unless signing succeeds.
    pub fn sign_reader<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        signer: &dyn SignatureProvider,
    ) -> Result<()> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        let signed = self.sign_bytes(input, signer)?;
        writer.write_all(&signed)?;
        writer.flush()?;
        Ok(())
    }

    /// Sign the file at `input` and write the result to `output`.
    ///
    /// The output is staged in a temporary file next to `output` and moved
    /// into place only once it is complete; on error `output` is not created
    /// or changed. `input` and `output` may be the same path.
    pub fn sign_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        signer: &dyn SignatureProvider,
    ) -> Result<()> {
        let (input, output) = (input.as_ref(), output.as_ref());
        let signed = self.sign_bytes(std::fs::read(input)?, signer)?;

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(&signed)?;
        staged.as_file().sync_all()?;
        staged.persist(output).map_err(|e| Error::Io(e.error))?;

        log::info!("Wrote signed {} to {}", input.display(), output.display());
        Ok(())
    }
}

/// Sign the file at `input` into `output` with `options`.
///
/// Shorthand for `PdfSigner::new(options).sign_file(input, output, signer)`.
pub fn sign_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: SignOptions,
    signer: &dyn SignatureProvider,
) -> Result<()> {
    PdfSigner::new(options).sign_file(input, output, signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::minimal_pdf;
    use crate::signatures::{read_signatures, DigestAlgorithm};
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;

    /// Returns a SHA-256 of the content and remembers what it was given.
    #[derive(Default)]
    struct DigestSigner {
        seen: RefCell<Vec<u8>>,
    }

    impl SignatureProvider for DigestSigner {
        fn estimate_signature_len(&self) -> usize {
            64
        }

        fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>> {
            let mut buf = Vec::new();
            content.read_to_end(&mut buf)?;
            let mut slice = &buf[..];
            let digest = DigestAlgorithm::Sha256.digest_reader(&mut slice)?;
            *self.seen.borrow_mut() = buf;
            Ok(digest)
        }
    }

    struct FailingSigner;

    impl SignatureProvider for FailingSigner {
        fn estimate_signature_len(&self) -> usize {
            16
        }

        fn sign(&self, _content: &mut dyn Read) -> Result<Vec<u8>> {
            Err(Error::signer(std::io::Error::new(std::io::ErrorKind::Other, "token removed")))
        }
    }

    fn signer() -> PdfSigner {
        PdfSigner::new(SignOptions::default().with_signing_time(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()))
    }

    #[test]
    fn test_sign_bytes_layout() {
        let original = minimal_pdf();
        let backend = DigestSigner::default();
        let signed = signer().sign_bytes(original.clone(), &backend).unwrap();

        assert!(signed.starts_with(&original));
        assert!(signed.ends_with(b"%%EOF\n"));

        let mut doc = PdfDocument::from_bytes(signed.clone()).unwrap();
        let infos = read_signatures(&mut doc).unwrap();
        assert_eq!(infos.len(), 1);
        let br = infos[0].byte_range.unwrap();
        br.validate(signed.len()).unwrap();
        assert_eq!(signed[br.excluded().start], b'<');
        assert_eq!(signed[br.excluded().end - 1], b'>');

        assert_eq!(br.signed_content(&signed).unwrap(), *backend.seen.borrow());
        let contents = &infos[0].contents;
        assert_eq!(contents.len(), 64);
        assert_eq!(&contents[..32], &DigestAlgorithm::Sha256.digest_reader(&mut &backend.seen.borrow()[..]).unwrap()[..]);
        assert!(contents[32..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_signer_error_is_reported() {
        let err = signer().sign_bytes(minimal_pdf(), &FailingSigner).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signer);
        assert!(err.to_string().contains("token removed"));
    }

    #[test]
    fn test_sign_reader_leaves_writer_empty_on_error() {
        let mut out = Vec::new();
        let err = signer()
            .sign_reader(&b"not a pdf"[..], &mut out, &DigestSigner::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(out.is_empty());

        signer()
            .sign_reader(&minimal_pdf()[..], &mut out, &DigestSigner::default())
            .unwrap();
        assert!(out.starts_with(b"%PDF-1.7"));
    }

    #[test]
    fn test_sign_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, minimal_pdf()).unwrap();

        sign_file(&path, &path, SignOptions::default(), &DigestSigner::default()).unwrap();
        let signed = std::fs::read(&path).unwrap();
        assert!(signed.len() > minimal_pdf().len());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
