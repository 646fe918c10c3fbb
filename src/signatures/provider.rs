//! The signing backend seam.

use crate::error::Result;
use std::io::Read;

/// Produces the bytes stored in a signature's `/Contents`.
///
/// Implementations wrap whatever holds the key: an in-process RSA key, a
/// hardware module or a remote signing service. The engine calls
/// [`estimate_signature_len`](Self::estimate_signature_len) once before
/// anything is serialized and [`sign`](Self::sign) once after the byte
/// ranges are fixed.
///
/// ```
/// use pdf_seal::signatures::SignatureProvider;
/// use std::io::Read;
///
/// /// Signs with the length of the content, for demonstration.
/// struct LengthSigner;
///
/// impl SignatureProvider for LengthSigner {
///     fn estimate_signature_len(&self) -> usize {
///         8
///     }
///
///     fn sign(&self, content: &mut dyn Read) -> pdf_seal::Result<Vec<u8>> {
///         let mut buf = Vec::new();
///         content.read_to_end(&mut buf)?;
///         Ok((buf.len() as u64).to_be_bytes().to_vec())
///     }
/// }
///
/// let mut content: &[u8] = b"hello";
/// assert_eq!(LengthSigner.sign(&mut content).unwrap(), 5u64.to_be_bytes());
/// ```
pub trait SignatureProvider {
    /// Upper bound, in bytes, on what [`sign`](Self::sign) returns.
    ///
    /// The reserved space cannot grow later, so over-estimate.
    fn estimate_signature_len(&self) -> usize;

    /// Sign the digest input and return the encoded signature.
    ///
    /// `content` yields exactly the bytes covered by `/ByteRange`. The
    /// returned bytes are owned; the caller's buffers are never handed out
    /// mutably.
    fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>>;
}

impl<T: SignatureProvider + ?Sized> SignatureProvider for &T {
    fn estimate_signature_len(&self) -> usize {
        (**self).estimate_signature_len()
    }

    fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>> {
        (**self).sign(content)
    }
}

impl<T: SignatureProvider + ?Sized> SignatureProvider for Box<T> {
    fn estimate_signature_len(&self) -> usize {
        (**self).estimate_signature_len()
    }

    fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>> {
        (**self).sign(content)
    }
}
