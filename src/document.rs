//! PDF document model.
//!
//! [`PdfDocument`] owns the raw file bytes, the merged cross-reference table
//! and the newest trailer. Objects are parsed lazily on first access and
//! cached. Changes are never applied to the original bytes: new and replaced
//! objects are collected as pending updates, which
//! [`IncrementalWriter`](crate::writer::IncrementalWriter) appends as a new
//! revision.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::objstm::{parse_object_stream, ObjectStream};
use crate::parser::parse_indirect_object;
use crate::xref::{find_xref_offset, parse_xref, CrossRefTable, XRefEntry};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Maximum length of a reference chain followed by [`PdfDocument::resolve`].
const MAX_RECURSION_DEPTH: u32 = 100;

/// A parsed PDF file plus the changes queued for its next revision.
pub struct PdfDocument {
    data: Vec<u8>,
    version: (u8, u8),
    xref: CrossRefTable,
    trailer: Dictionary,
    startxref: usize,
    object_cache: HashMap<ObjectRef, Object>,
    objstm_cache: HashMap<u32, ObjectStream>,
    resolving_stack: HashSet<ObjectRef>,
    updates: BTreeMap<ObjectRef, Object>,
    next_object_id: u32,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.version)
            .field("len", &self.data.len())
            .field("xref_entries", &self.xref.len())
            .field("pending_updates", &self.updates.len())
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Open a PDF document from a file path.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors and on anything [`PdfDocument::from_bytes`] rejects.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Opening {}", path.display());
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Parse a PDF held in memory.
    ///
    /// Reads the header, the cross-reference chain and the trailer. Objects
    /// are not parsed until they are loaded.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHeader`] if the data does not start with `%PDF-M.m`
    /// - [`Error::InvalidXref`] / [`Error::InvalidPdf`] for an unreadable xref chain
    /// - [`Error::Unsupported`] for encrypted documents
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let version = parse_header(&data)?;
        let startxref = find_xref_offset(&data)?;
        let xref = parse_xref(&data, startxref)?;
        let trailer = xref.trailer().clone();

        if trailer.contains_key("Encrypt") {
            return Err(Error::Unsupported("signing encrypted documents".to_string()));
        }

        let size = trailer
            .get("Size")
            .and_then(Object::as_integer)
            .filter(|s| *s > 0)
            .map(|s| s as u32)
            .unwrap_or(0);
        let next_object_id = size.max(xref.max_object_number().map_or(1, |n| n + 1));

        log::info!(
            "Loaded PDF {}.{}: {} bytes, {} xref entries, startxref {}",
            version.0,
            version.1,
            data.len(),
            xref.len(),
            startxref
        );

        Ok(Self {
            data,
            version,
            xref,
            trailer,
            startxref,
            object_cache: HashMap::new(),
            objstm_cache: HashMap::new(),
            resolving_stack: HashSet::new(),
            updates: BTreeMap::new(),
            next_object_id,
        })
    }

    /// PDF version from the header as (major, minor).
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Original file bytes, never modified.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Trailer dictionary of the newest revision.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Offset of the newest cross-reference section (the `/Prev` of the next revision).
    pub fn startxref(&self) -> usize {
        self.startxref
    }

    /// `/Size` the next revision must declare: one past the highest object number in use.
    pub fn size(&self) -> u32 {
        self.next_object_id
    }

    /// Load an indirect object, preferring a pending update over the file.
    ///
    /// ```
    /// # use pdf_seal::document::PdfDocument;
    /// # use pdf_seal::object::{Object, ObjectRef};
    /// # let pdf = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\nxref\n0 2\n0000000000 65535 f \n0000000009 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\nstartxref\n45\n%%EOF\n".to_vec();
    /// let mut doc = PdfDocument::from_bytes(pdf)?;
    /// let catalog = doc.load_object(ObjectRef::new(1, 0))?;
    /// assert_eq!(catalog.as_dict().unwrap()["Type"].as_name(), Some("Catalog"));
    /// # Ok::<(), pdf_seal::error::Error>(())
    /// ```
    pub fn load_object(&mut self, obj_ref: ObjectRef) -> Result<Object> {
        if let Some(updated) = self.updates.get(&obj_ref) {
            return Ok(updated.clone());
        }
        if let Some(cached) = self.object_cache.get(&obj_ref) {
            return Ok(cached.clone());
        }
        if self.resolving_stack.len() as u32 >= MAX_RECURSION_DEPTH {
            return Err(Error::RecursionLimitExceeded(MAX_RECURSION_DEPTH));
        }
        if !self.resolving_stack.insert(obj_ref) {
            log::error!("Circular reference while loading {}", obj_ref);
            return Err(Error::CircularReference(obj_ref));
        }

        let result = self.load_from_file(obj_ref);
        self.resolving_stack.remove(&obj_ref);

        let obj = result?;
        self.object_cache.insert(obj_ref, obj.clone());
        Ok(obj)
    }

    fn load_from_file(&mut self, obj_ref: ObjectRef) -> Result<Object> {
        let entry = *self
            .xref
            .get(obj_ref.id)
            .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))?;

        match entry {
            XRefEntry::Free { .. } => Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen)),
            XRefEntry::InUse { offset, generation } => {
                if generation != obj_ref.gen {
                    log::warn!("{} requested but xref holds generation {}", obj_ref, generation);
                }
                let input = self.data.get(offset..).ok_or(Error::UnexpectedEof)?;
                let (_, (found, obj)) = parse_indirect_object(input).map_err(|e| Error::ParseError {
                    offset,
                    reason: format!("object {}: {}", obj_ref, e),
                })?;
                if found.id != obj_ref.id {
                    return Err(Error::ParseError {
                        offset,
                        reason: format!("expected object {} but found {}", obj_ref, found),
                    });
                }
                Ok(obj)
            },
            XRefEntry::Compressed { stream_id, index } => {
                log::debug!("{} is compressed in object stream {} at index {}", obj_ref, stream_id, index);
                if !self.objstm_cache.contains_key(&stream_id) {
                    let stream = self.load_object(ObjectRef::new(stream_id, 0))?;
                    let unpacked = parse_object_stream(&stream)?;
                    self.objstm_cache.insert(stream_id, unpacked);
                }
                self.objstm_cache
                    .get(&stream_id)
                    .and_then(|s| s.get(obj_ref.id, index))
                    .cloned()
                    .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))
            },
        }
    }

    /// Follow references until a direct object is reached.
    pub fn resolve(&mut self, obj: &Object) -> Result<Object> {
        let mut current = obj.clone();
        let mut seen = HashSet::new();
        while let Object::Reference(r) = current {
            if !seen.insert(r) {
                return Err(Error::CircularReference(r));
            }
            if seen.len() as u32 > MAX_RECURSION_DEPTH {
                return Err(Error::RecursionLimitExceeded(MAX_RECURSION_DEPTH));
            }
            current = self.load_object(r)?;
        }
        Ok(current)
    }

    /// Reference to the document catalog (`/Root` in the trailer).
    pub fn catalog_ref(&self) -> Result<ObjectRef> {
        self.trailer
            .get("Root")
            .and_then(Object::as_reference)
            .ok_or(Error::MissingCatalog)
    }

    /// The catalog dictionary.
    ///
    /// # Errors
    ///
    /// [`Error::MissingCatalog`] when `/Root` is absent or points nowhere,
    /// [`Error::InvalidPdf`] when it is not a dictionary.
    pub fn catalog(&mut self) -> Result<Dictionary> {
        let root = self.catalog_ref()?;
        match self.load_object(root) {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            Ok(Object::Null) | Err(Error::ObjectNotFound(..)) => Err(Error::MissingCatalog),
            Ok(other) => Err(Error::InvalidPdf(format!("catalog {} is a {}", root, other.type_name()))),
            Err(e) => Err(e),
        }
    }

    /// Reference to the first leaf of the page tree.
    pub fn first_page_ref(&mut self) -> Result<ObjectRef> {
        let catalog = self.catalog()?;
        let mut node_ref = catalog
            .get("Pages")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages tree".to_string()))?;

        for _ in 0..MAX_RECURSION_DEPTH {
            let node = self.load_object(node_ref)?;
            let dict = node
                .as_dict()
                .ok_or_else(|| Error::InvalidPdf(format!("page tree node {} is not a dictionary", node_ref)))?;
            let kids = match dict.get("Kids") {
                Some(kids) => self.resolve(kids)?,
                None => return Ok(node_ref),
            };
            if dict.get("Type").and_then(Object::as_name) == Some("Page") {
                return Ok(node_ref);
            }
            node_ref = kids
                .as_array()
                .and_then(|k| k.first())
                .and_then(Object::as_reference)
                .ok_or_else(|| Error::InvalidPdf("document has no pages".to_string()))?;
        }
        Err(Error::RecursionLimitExceeded(MAX_RECURSION_DEPTH))
    }

    /// Queue a new object for the next revision, returning its reference.
    pub fn add_object(&mut self, obj: Object) -> ObjectRef {
        let obj_ref = ObjectRef::new(self.next_object_id, 0);
        self.next_object_id += 1;
        log::debug!("Adding object {}", obj_ref);
        self.updates.insert(obj_ref, obj);
        obj_ref
    }

    /// Replace an object in the next revision.
    pub fn update_object(&mut self, obj_ref: ObjectRef, obj: Object) {
        log::debug!("Updating object {}", obj_ref);
        if obj_ref.id >= self.next_object_id {
            self.next_object_id = obj_ref.id + 1;
        }
        self.object_cache.remove(&obj_ref);
        self.updates.insert(obj_ref, obj);
    }

    /// Objects queued for the next revision, in object-number order.
    pub fn pending_objects(&self) -> impl Iterator<Item = (&ObjectRef, &Object)> + '_ {
        self.updates.iter()
    }

    /// Whether any change is queued.
    pub fn has_pending_changes(&self) -> bool {
        !self.updates.is_empty()
    }
}

/// Parse the `%PDF-M.m` header at the start of the file.
///
/// ```
/// use pdf_seal::document::parse_header;
///
/// assert_eq!(parse_header(b"%PDF-1.7\n").unwrap(), (1, 7));
/// assert!(parse_header(b"GIF89a").is_err());
/// ```
pub fn parse_header(data: &[u8]) -> Result<(u8, u8)> {
    let header = data
        .get(..8)
        .ok_or_else(|| Error::InvalidHeader("file too short to contain a PDF header".to_string()))?;
    if &header[..5] != b"%PDF-" {
        return Err(Error::InvalidHeader(format!(
            "expected '%PDF-', found '{}'",
            String::from_utf8_lossy(&header[..5])
        )));
    }
    let (major, dot, minor) = (header[5], header[6], header[7]);
    if !major.is_ascii_digit() || dot != b'.' || !minor.is_ascii_digit() {
        return Err(Error::InvalidHeader(format!(
            "invalid version '{}'",
            String::from_utf8_lossy(&header[5..8])
        )));
    }
    Ok((major - b'0', minor - b'0'))
}
