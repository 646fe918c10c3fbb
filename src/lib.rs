// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Seal
//!
//! Embeds detached digital signatures into existing PDF files as
//! incremental updates, without moving a single byte of the original.
//!
//! ## Core Features
//!
//! - **Document Model**: lazy object loading through classic xref tables,
//!   xref streams, hybrid files and object streams
//! - **Incremental Updates**: new objects appended with their own xref
//!   section and a `/Prev` chain back to the original
//! - **Fixed-Width Placeholders**: `/Contents` and `/ByteRange` are sized
//!   before serialization and patched in place afterwards
//! - **Pluggable Signers**: any backend implementing
//!   [`signatures::SignatureProvider`]; a PKCS#7 RSA signer ships behind the
//!   `signatures` feature
//! - **Atomic Output**: files are written through a temporary file and only
//!   replace the destination on success
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_seal::signatures::{PdfSigner, SignOptions, SignatureProvider};
//! use std::io::Read;
//!
//! struct HsmSigner;
//!
//! impl SignatureProvider for HsmSigner {
//!     fn estimate_signature_len(&self) -> usize {
//!         8192
//!     }
//!
//!     fn sign(&self, content: &mut dyn Read) -> pdf_seal::Result<Vec<u8>> {
//!         let mut buf = Vec::new();
//!         content.read_to_end(&mut buf)?;
//!         // hand `buf` (or its digest) to the hardware module here
//!         Ok(Vec::new())
//!     }
//! }
//!
//! # fn main() -> pdf_seal::Result<()> {
//! let signer = PdfSigner::new(SignOptions::default().with_reason("Approved"));
//! signer.sign_file("in.pdf", "out.pdf", &HsmSigner)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod xref;

// Stream decoders
pub mod decoders;

// PDF writing
pub mod writer;

// Digital signatures
pub mod signatures;

#[cfg(test)]
mod fixtures;

// Re-exports
pub use document::PdfDocument;
pub use error::{Error, ErrorKind, Result};
pub use object::{Object, ObjectRef};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
