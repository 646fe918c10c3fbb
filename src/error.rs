//! Error types for the signing engine.
//!
//! This module defines all error types that can occur while reading a PDF,
//! preparing its signature field and embedding the signature bytes.

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF processing and signing.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: {0}")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Unexpected end of file
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// Circular reference detected in object graph
    #[error("Circular reference detected: object {0}")]
    CircularReference(crate::object::ObjectRef),

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The trailer has no usable /Root catalog
    #[error("Document has no catalog (/Root missing or not a dictionary)")]
    MissingCatalog,

    /// A signature field already exists and overwriting was not requested
    #[error("Signature field '{0}' already exists (set overwrite_existing_field to replace it)")]
    SignatureFieldExists(String),

    /// The signer's size estimate cannot back a placeholder
    #[error("Invalid signature size estimate: {0} bytes")]
    InvalidEstimate(usize),

    /// The produced signature does not fit the reserved /Contents placeholder
    #[error("Signature ({required} bytes) exceeds reserved placeholder ({reserved} bytes)")]
    SignatureTooLarge {
        /// Bytes returned by the signer
        required: usize,
        /// Bytes reserved when the placeholder was sized
        reserved: usize,
    },

    /// The signing backend failed
    #[error("Signer error: {0}")]
    Signer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing catalog, malformed object graph, unreadable syntax
    Structural,
    /// Signature larger than the reserved placeholder
    Capacity,
    /// The signing backend failed
    Signer,
    /// Reading the source or writing the destination failed
    Io,
}

impl Error {
    /// Wrap a backend error as a signer failure.
    pub fn signer<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Signer(err.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::SignatureTooLarge { .. } => ErrorKind::Capacity,
            Error::Signer(_) => ErrorKind::Signer,
            _ => ErrorKind::Structural,
        }
    }

    /// Re-label any error raised inside a signer as a signer error.
    ///
    /// I/O failures while the signer drains the content stream belong to the
    /// signer, not to the source or destination file.
    pub(crate) fn into_signer_error(self) -> Self {
        match self {
            Error::Signer(_) => self,
            other => Error::Signer(Box::new(other)),
        }
    }
}
