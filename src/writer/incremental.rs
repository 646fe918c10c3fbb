//! Incremental update writer.
//!
//! Appends a new revision after the original bytes: the pending objects,
//! a cross-reference section covering only those objects, and a trailer
//! whose `/Prev` points at the previous section. Nothing before the
//! original end of file is touched, so every existing offset stays valid.

use super::ObjectSerializer;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::BTreeMap;

/// Trailer keys carried over from the previous revision.
const INHERITED_TRAILER_KEYS: [&str; 3] = ["Root", "Info", "ID"];

/// Bytes of a serialized revision plus where each new object landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedDocument {
    /// The complete file
    pub bytes: Vec<u8>,
    /// Byte offset of `id gen obj` for every object written in the update
    pub offsets: BTreeMap<ObjectRef, usize>,
}

impl SerializedDocument {
    /// Offset at which `obj_ref` was written, if it was part of the update.
    pub fn offset_of(&self, obj_ref: ObjectRef) -> Option<usize> {
        self.offsets.get(&obj_ref).copied()
    }
}

/// Writes a document's pending objects as an incremental update.
#[derive(Debug, Clone)]
pub struct IncrementalWriter {
    serializer: ObjectSerializer,
}

impl Default for IncrementalWriter {
    fn default() -> Self {
        Self {
            serializer: ObjectSerializer::compact(),
        }
    }
}

impl IncrementalWriter {
    /// Create a writer using compact object syntax.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific serializer for the appended objects.
    pub fn with_serializer(serializer: ObjectSerializer) -> Self {
        Self { serializer }
    }

    /// Serialize `doc`: original bytes followed by one update section.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPdf`] if the document has no pending changes.
    pub fn write(&self, doc: &PdfDocument) -> Result<SerializedDocument> {
        if !doc.has_pending_changes() {
            return Err(Error::InvalidPdf("no pending changes to write".to_string()));
        }

        let mut bytes = Vec::with_capacity(doc.data().len() + 4096);
        bytes.extend_from_slice(doc.data());
        if !matches!(bytes.last(), Some(b'\n') | Some(b'\r')) {
            bytes.push(b'\n');
        }

        let mut offsets = BTreeMap::new();
        for (obj_ref, obj) in doc.pending_objects() {
            offsets.insert(*obj_ref, bytes.len());
            bytes.extend_from_slice(&self.serializer.serialize_indirect(*obj_ref, obj));
        }

        let xref_offset = bytes.len();
        write_xref_section(&mut bytes, &offsets);

        let mut trailer = Dictionary::new();
        for key in INHERITED_TRAILER_KEYS {
            if let Some(value) = doc.trailer().get(key) {
                trailer.insert(key.to_string(), value.clone());
            }
        }
        trailer.insert("Size".to_string(), Object::Integer(doc.size() as i64));
        trailer.insert("Prev".to_string(), Object::Integer(doc.startxref() as i64));

        bytes.extend_from_slice(b"trailer\n");
        self.serializer.write_object(&mut bytes, &Object::Dictionary(trailer));
        bytes.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        log::debug!(
            "Incremental update: {} objects, xref at {}, {} -> {} bytes",
            offsets.len(),
            xref_offset,
            doc.data().len(),
            bytes.len()
        );

        Ok(SerializedDocument { bytes, offsets })
    }
}

/// Classic xref section; consecutive object numbers share a subsection.
///
/// Every entry is exactly 20 bytes: `nnnnnnnnnn ggggg n \n`.
fn write_xref_section(out: &mut Vec<u8>, offsets: &BTreeMap<ObjectRef, usize>) {
    out.extend_from_slice(b"xref\n");
    let entries: Vec<(&ObjectRef, &usize)> = offsets.iter().collect();
    for run in entries.chunk_by(|a, b| b.0.id == a.0.id + 1) {
        let first = run[0].0.id;
        out.extend_from_slice(format!("{} {}\n", first, run.len()).as_bytes());
        for (obj_ref, offset) in run {
            out.extend_from_slice(format!("{:010} {:05} n \n", offset, obj_ref.gen).as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::minimal_pdf;

    #[test]
    fn test_no_changes_is_an_error() {
        let doc = PdfDocument::from_bytes(minimal_pdf()).unwrap();
        assert!(IncrementalWriter::new().write(&doc).is_err());
    }

    #[test]
    fn test_original_prefix_preserved_and_reparses() {
        let original = minimal_pdf();
        let mut doc = PdfDocument::from_bytes(original.clone()).unwrap();
        let added = doc.add_object(Object::text("hello"));
        let mut catalog = doc.catalog().unwrap();
        catalog.insert("Note".to_string(), Object::Reference(added));
        doc.update_object(doc.catalog_ref().unwrap(), Object::Dictionary(catalog));

        let out = IncrementalWriter::new().write(&doc).unwrap();
        assert!(out.bytes.starts_with(&original));
        assert!(out.bytes.ends_with(b"%%EOF\n"));

        let offset = out.offset_of(added).unwrap();
        assert!(out.bytes[offset..].starts_with(b"4 0 obj"));

        let mut reparsed = PdfDocument::from_bytes(out.bytes).unwrap();
        assert_eq!(reparsed.size(), 5);
        assert_eq!(reparsed.trailer()["Prev"].as_integer(), Some(doc.startxref() as i64));
        let note = reparsed.catalog().unwrap()["Note"].clone();
        assert_eq!(reparsed.resolve(&note).unwrap(), Object::String(b"hello".to_vec()));
        // untouched objects still come from the first revision
        assert_eq!(reparsed.first_page_ref().unwrap(), ObjectRef::new(3, 0));
    }

    #[test]
    fn test_xref_subsections() {
        let mut offsets = BTreeMap::new();
        offsets.insert(ObjectRef::new(1, 0), 100);
        offsets.insert(ObjectRef::new(4, 0), 200);
        offsets.insert(ObjectRef::new(5, 0), 300);
        let mut out = Vec::new();
        write_xref_section(&mut out, &offsets);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "xref\n1 1\n0000000100 00000 n \n4 2\n0000000200 00000 n \n0000000300 00000 n \n"
        );
    }

    #[test]
    fn test_trailer_inherits_root_and_id() {
        let pdf = crate::fixtures::build_pdf(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
            ],
            "/Root 1 0 R /ID [<AB> <CD>] /XRefStm 999",
        );
        let mut doc = PdfDocument::from_bytes(pdf).unwrap();
        doc.add_object(Object::Null);
        let out = IncrementalWriter::new().write(&doc).unwrap();
        let reparsed = PdfDocument::from_bytes(out.bytes).unwrap();
        let trailer = reparsed.trailer();
        assert!(trailer.contains_key("ID"));
        assert!(trailer.contains_key("Root"));
        assert!(!trailer.contains_key("XRefStm"));
    }
}
