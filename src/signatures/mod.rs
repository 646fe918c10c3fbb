//! PDF digital signatures.
//!
//! Signing appends an incremental update holding a signature dictionary and
//! an invisible signature field, then fills the signature in place:
//!
//! - **Size**: the signer estimates its output; that many bytes are reserved
//!   as a `/Contents` placeholder ([`Placeholder`]), and `/ByteRange` gets a
//!   fixed-width sentinel.
//! - **Serialize**: the update is written and `/ByteRange` rewritten with
//!   the real spans ([`resolve_byte_range`]).
//! - **Fill**: the covered bytes are streamed to the signer and its output
//!   hex-encoded into the placeholder ([`insert_signature`]).
//!
//! No step changes the length of the file, so every offset computed before
//! signing stays valid.
//!
//! ## Example
//!
//! ```ignore
//! use pdf_seal::signatures::{sign_file, Pkcs7Signer, SignOptions};
//!
//! let signer = Pkcs7Signer::from_files("cert.der", "key.der")?;
//! let options = SignOptions::default().with_reason("Approved");
//! sign_file("contract.pdf", "contract-signed.pdf", options, &signer)?;
//! # Ok::<(), pdf_seal::Error>(())
//! ```
//!
//! The PKCS#7 backend requires the `signatures` feature; any other
//! [`SignatureProvider`] works without it.
//!
//! ## PDF Specification Reference
//!
//! - ISO 32000-1:2008 Section 12.8 - Digital Signatures
//! - ETSI TS 102 778 - PAdES

mod builder;
mod byterange;
#[cfg(feature = "signatures")]
mod pkcs7;
mod provider;
mod signer;
mod types;

pub use builder::{format_pdf_date, prepare_signature, read_signatures, PreparedSignature};
pub use byterange::{
    insert_signature, resolve_byte_range, ByteRange, Placeholder, ResolvedLayout, BYTE_RANGE_DIGITS,
    BYTE_RANGE_MAX,
};
#[cfg(feature = "signatures")]
pub use pkcs7::Pkcs7Signer;
pub use provider::SignatureProvider;
pub use signer::{sign_file, PdfSigner};
pub use types::{DigestAlgorithm, SignOptions, SignatureInfo, SignatureSubFilter};
