//! PDF writing.
//!
//! ```text
//! PdfDocument (original bytes + pending objects)
//!     ↓
//! [IncrementalWriter] (appends objects, xref section, trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! SerializedDocument { bytes, offsets }
//! ```

mod incremental;
mod object_serializer;

pub use incremental::{IncrementalWriter, SerializedDocument};
pub use object_serializer::ObjectSerializer;
