//! Options and result types shared by the signing pipeline.

use super::byterange::ByteRange;
use crate::object::ObjectRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::io::Read;

/// Digest algorithm used by a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256 (recommended)
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Dotted OID of this digest algorithm.
    pub fn oid(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "2.16.840.1.101.3.4.2.1",
            DigestAlgorithm::Sha384 => "2.16.840.1.101.3.4.2.2",
            DigestAlgorithm::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Display name, e.g. `SHA-256`.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Hash everything `content` yields.
    pub fn digest_reader(&self, content: &mut dyn Read) -> std::io::Result<Vec<u8>> {
        match self {
            DigestAlgorithm::Sha256 => hash_reader::<Sha256>(content),
            DigestAlgorithm::Sha384 => hash_reader::<Sha384>(content),
            DigestAlgorithm::Sha512 => hash_reader::<Sha512>(content),
        }
    }
}

fn hash_reader<D: Digest>(content: &mut dyn Read) -> std::io::Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = content.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

/// Signature sub-filter (encoding of `/Contents`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignatureSubFilter {
    /// `adbe.pkcs7.detached`
    #[default]
    #[serde(rename = "adbe.pkcs7.detached")]
    Pkcs7Detached,
    /// `ETSI.CAdES.detached` (PAdES)
    #[serde(rename = "ETSI.CAdES.detached")]
    CadesDetached,
}

impl SignatureSubFilter {
    /// Value written to `/SubFilter`.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SignatureSubFilter::Pkcs7Detached => "adbe.pkcs7.detached",
            SignatureSubFilter::CadesDetached => "ETSI.CAdES.detached",
        }
    }

    /// Inverse of [`as_pdf_name`](Self::as_pdf_name).
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "adbe.pkcs7.detached" => Some(SignatureSubFilter::Pkcs7Detached),
            "ETSI.CAdES.detached" => Some(SignatureSubFilter::CadesDetached),
            _ => None,
        }
    }
}

/// Options for signing a PDF.
///
/// Every signing call takes its own options; nothing here is process-wide.
///
/// ```
/// use pdf_seal::signatures::SignOptions;
///
/// let opts = SignOptions::from_json(r#"{ "reason": "Approved", "estimated_size": 4096 }"#).unwrap();
/// assert_eq!(opts.reason.as_deref(), Some("Approved"));
/// assert_eq!(opts.field_name, "Signature1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignOptions {
    /// Reuse an existing signature field instead of failing
    pub overwrite_existing_field: bool,
    /// Partial name (`/T`) of the signature field
    pub field_name: String,
    /// Reason for signing
    pub reason: Option<String>,
    /// `/Location`
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// `/Name`, when it should differ from the certificate subject
    pub name: Option<String>,
    /// Encoding of `/Contents`
    pub sub_filter: SignatureSubFilter,
    /// Value of `/M`; the current time when unset
    pub signing_time: Option<DateTime<Utc>>,
    /// Reserved signature size in bytes; the signer's own estimate when unset
    pub estimated_size: Option<usize>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            overwrite_existing_field: false,
            field_name: "Signature1".to_string(),
            reason: None,
            location: None,
            contact_info: None,
            name: None,
            sub_filter: SignatureSubFilter::Pkcs7Detached,
            signing_time: None,
            estimated_size: None,
        }
    }
}

impl SignOptions {
    /// Load options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Set `/Reason`.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set `/Location`.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the contact information.
    pub fn with_contact_info(mut self, contact: impl Into<String>) -> Self {
        self.contact_info = Some(contact.into());
        self
    }

    /// Set the signer name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the signature field name.
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    /// Fix the signing time, making output reproducible.
    pub fn with_signing_time(mut self, time: DateTime<Utc>) -> Self {
        self.signing_time = Some(time);
        self
    }

    /// Reserve `bytes` for the signature regardless of the signer's estimate.
    pub fn with_estimated_size(mut self, bytes: usize) -> Self {
        self.estimated_size = Some(bytes);
        self
    }

    /// Allow replacing an existing signature field.
    pub fn overwrite_existing_field(mut self, overwrite: bool) -> Self {
        self.overwrite_existing_field = overwrite;
        self
    }
}

/// A signature field found in a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureInfo {
    /// Field object
    pub field_ref: Option<ObjectRef>,
    /// Partial field name (`/T`)
    pub field_name: Option<String>,
    /// Signature dictionary (`/V`), if the field is signed
    pub signature_ref: Option<ObjectRef>,
    /// `/SubFilter` name
    pub sub_filter: Option<String>,
    /// Signed byte ranges
    pub byte_range: Option<ByteRange>,
    /// Raw `/Contents` bytes, padding included
    pub contents: Vec<u8>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Signing location
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// Name of the signer
    pub name: Option<String>,
    /// Signing time as written in `/M`
    pub signing_time: Option<String>,
}

impl SignatureInfo {
    /// Whether the byte range reaches the end of a file of `file_len` bytes.
    pub fn covers_whole_document(&self, file_len: usize) -> bool {
        self.byte_range.is_some_and(|br| br.validate(file_len).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sub_filter_names() {
        assert_eq!(SignatureSubFilter::Pkcs7Detached.as_pdf_name(), "adbe.pkcs7.detached");
        assert_eq!(
            SignatureSubFilter::from_pdf_name("ETSI.CAdES.detached"),
            Some(SignatureSubFilter::CadesDetached)
        );
        assert_eq!(SignatureSubFilter::from_pdf_name("adbe.x509.rsa_sha1"), None);
    }

    #[test]
    fn test_digest_reader() {
        let mut input: &[u8] = b"abc";
        let digest = DigestAlgorithm::Sha256.digest_reader(&mut input).unwrap();
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let mut input: &[u8] = b"";
        assert_eq!(DigestAlgorithm::Sha512.digest_reader(&mut input).unwrap().len(), 64);
    }

    #[test]
    fn test_sign_options_default() {
        let opts = SignOptions::default();
        assert_eq!(opts.sub_filter, SignatureSubFilter::Pkcs7Detached);
        assert_eq!(opts.field_name, "Signature1");
        assert!(!opts.overwrite_existing_field);
        assert!(opts.estimated_size.is_none());
    }

    #[test]
    fn test_sign_options_builder() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let opts = SignOptions::default()
            .with_reason("Test signing")
            .with_location("Test City")
            .with_signing_time(time)
            .with_estimated_size(1024)
            .overwrite_existing_field(true);
        assert_eq!(opts.reason, Some("Test signing".to_string()));
        assert_eq!(opts.location, Some("Test City".to_string()));
        assert_eq!(opts.signing_time, Some(time));
        assert_eq!(opts.estimated_size, Some(1024));
        assert!(opts.overwrite_existing_field);
    }

    #[test]
    fn test_sign_options_json() {
        let opts = SignOptions::from_json(
            r#"{
                "overwrite_existing_field": true,
                "field_name": "Approval",
                "sub_filter": "ETSI.CAdES.detached",
                "signing_time": "2024-05-01T12:00:00Z"
            }"#,
        )
        .unwrap();
        assert!(opts.overwrite_existing_field);
        assert_eq!(opts.field_name, "Approval");
        assert_eq!(opts.sub_filter, SignatureSubFilter::CadesDetached);
        assert!(opts.signing_time.is_some());

        let json = serde_json::to_string(&opts).unwrap();
        assert_eq!(SignOptions::from_json(&json).unwrap(), opts);
        assert!(SignOptions::from_json("{ \"estimated_size\": \"big\" }").is_err());
    }
}
