//! Signature dictionary and signature field construction.
//!
//! [`prepare_signature`] adds three things to a document's pending revision:
//!
//! ```text
//! Catalog ──/AcroForm──▶ AcroForm ──/Fields──▶ field/widget ──/V──▶ signature dictionary
//!                                                   ▲
//!                           first page ──/Annots────┘
//! ```
//!
//! The signature dictionary carries fixed-width placeholders for
//! `/ByteRange` and `/Contents`; see [`super::byterange`] for how they are
//! filled after serialization.

use super::byterange::{ByteRange, Placeholder};
use super::provider::SignatureProvider;
use super::types::{SignOptions, SignatureInfo};
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// `/SigFlags`: SignaturesExist | AppendOnly.
const SIG_FLAGS: i64 = 0b11;

/// Annotation flags for an invisible signature widget: Print | Locked.
const WIDGET_FLAGS: i64 = 4 | 128;

/// Deepest `/Kids` nesting searched for fields.
const MAX_FIELD_DEPTH: usize = 32;

/// Result of [`prepare_signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedSignature {
    /// The new signature dictionary
    pub signature_ref: ObjectRef,
    /// The field whose `/V` points at it
    pub field_ref: ObjectRef,
    /// Space reserved for `/Contents`
    pub placeholder: Placeholder,
}

/// Add a signature dictionary and its field to `doc`'s pending revision.
///
/// The placeholder size is `options.estimated_size`, or the signer's
/// estimate when unset; it cannot change afterwards.
///
/// # Errors
///
/// - [`Error::InvalidEstimate`] for a zero size or one too large for a
///   10-digit ByteRange
/// - [`Error::MissingCatalog`] / [`Error::InvalidPdf`] for a broken catalog,
///   AcroForm or page tree
/// - [`Error::SignatureFieldExists`] if the document already has a signature
///   field and `options.overwrite_existing_field` is false
pub fn prepare_signature(
    doc: &mut PdfDocument,
    signer: &dyn SignatureProvider,
    options: &SignOptions,
) -> Result<PreparedSignature> {
    let capacity = options
        .estimated_size
        .unwrap_or_else(|| signer.estimate_signature_len());
    let placeholder = Placeholder::new(capacity)?;

    let catalog_ref = doc.catalog_ref()?;
    let mut catalog = doc.catalog()?;

    let (acroform_ref, mut acroform) = match catalog.get("AcroForm") {
        Some(Object::Reference(r)) => {
            let r = *r;
            let form = doc
                .load_object(r)?
                .into_dict()
                .map_err(|_| Error::InvalidPdf(format!("/AcroForm {} is not a dictionary", r)))?;
            (Some(r), Some(form))
        },
        Some(Object::Dictionary(d)) => (None, Some(d.clone())),
        None => (None, None),
        Some(other) => {
            return Err(Error::InvalidPdf(format!("/AcroForm is a {}", other.type_name())));
        },
    };

    let existing = match &acroform {
        Some(form) => signature_fields(doc, form)?.into_iter().next(),
        None => None,
    };
    if let Some(field_ref) = existing {
        if !options.overwrite_existing_field {
            let name = doc
                .load_object(field_ref)?
                .as_dict()
                .and_then(|d| d.get("T"))
                .and_then(Object::as_text)
                .unwrap_or_else(|| field_ref.to_string());
            return Err(Error::SignatureFieldExists(name));
        }
    }

    let signing_time = options.signing_time.unwrap_or_else(Utc::now);
    let signature_ref = doc.add_object(Object::Dictionary(signature_dictionary(
        options,
        placeholder,
        signing_time,
    )));

    let field_ref = match existing {
        Some(field_ref) => {
            log::info!("Reusing signature field {} for {}", field_ref, signature_ref);
            let mut field = doc.load_object(field_ref)?.into_dict()?;
            field.insert("V".to_string(), Object::Reference(signature_ref));
            doc.update_object(field_ref, Object::Dictionary(field));
            field_ref
        },
        None => {
            let page_ref = doc.first_page_ref()?;
            let field_ref = doc.add_object(Object::Dictionary(signature_field(
                &options.field_name,
                signature_ref,
                page_ref,
            )));
            append_to_array(doc, page_ref, "Annots", field_ref)?;
            field_ref
        },
    };

    let mut form = acroform.take().unwrap_or_default();
    if existing.is_none() {
        push_reference(doc, &mut form, "Fields", field_ref)?;
    }
    let flags = form.get("SigFlags").and_then(Object::as_integer).unwrap_or(0);
    form.insert("SigFlags".to_string(), Object::Integer(flags | SIG_FLAGS));

    match acroform_ref {
        Some(r) => doc.update_object(r, Object::Dictionary(form)),
        None if catalog.contains_key("AcroForm") => {
            catalog.insert("AcroForm".to_string(), Object::Dictionary(form));
            doc.update_object(catalog_ref, Object::Dictionary(catalog));
        },
        None => {
            let form_ref = doc.add_object(Object::Dictionary(form));
            catalog.insert("AcroForm".to_string(), Object::Reference(form_ref));
            doc.update_object(catalog_ref, Object::Dictionary(catalog));
        },
    }

    log::info!(
        "Prepared signature {} in field {} with {} reserved bytes",
        signature_ref,
        field_ref,
        placeholder.capacity()
    );

    Ok(PreparedSignature {
        signature_ref,
        field_ref,
        placeholder,
    })
}

fn signature_dictionary(options: &SignOptions, placeholder: Placeholder, time: DateTime<Utc>) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert("Type".to_string(), Object::name("Sig"));
    dict.insert("Filter".to_string(), Object::name("Adobe.PPKLite"));
    dict.insert("SubFilter".to_string(), Object::name(options.sub_filter.as_pdf_name()));
    dict.insert("ByteRange".to_string(), Placeholder::byte_range_object());
    dict.insert("Contents".to_string(), placeholder.contents_object());
    dict.insert("M".to_string(), Object::String(format_pdf_date(time).into_bytes()));

    let optional = [
        ("Name", &options.name),
        ("Reason", &options.reason),
        ("Location", &options.location),
        ("ContactInfo", &options.contact_info),
    ];
    for (key, value) in optional {
        if let Some(text) = value {
            dict.insert(key.to_string(), Object::text(text));
        }
    }
    dict
}

/// Merged field and widget annotation for an invisible signature.
fn signature_field(name: &str, signature_ref: ObjectRef, page_ref: ObjectRef) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert("FT".to_string(), Object::name("Sig"));
    dict.insert("T".to_string(), Object::text(name));
    dict.insert("V".to_string(), Object::Reference(signature_ref));
    dict.insert("Type".to_string(), Object::name("Annot"));
    dict.insert("Subtype".to_string(), Object::name("Widget"));
    dict.insert("Rect".to_string(), Object::Array(vec![Object::Integer(0); 4]));
    dict.insert("F".to_string(), Object::Integer(WIDGET_FLAGS));
    dict.insert("P".to_string(), Object::Reference(page_ref));
    dict
}

/// `D:YYYYMMDDHHmmSSZ`.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use pdf_seal::signatures::format_pdf_date;
///
/// let t = Utc.with_ymd_and_hms(2024, 3, 9, 17, 5, 0).unwrap();
/// assert_eq!(format_pdf_date(t), "D:20240309170500Z");
/// ```
pub fn format_pdf_date(time: DateTime<Utc>) -> String {
    time.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// Push `item` onto the array at `key` of `dict`, following an indirect array.
fn push_reference(doc: &mut PdfDocument, dict: &mut Dictionary, key: &str, item: ObjectRef) -> Result<()> {
    match dict.get_mut(key) {
        Some(Object::Array(items)) => items.push(Object::Reference(item)),
        Some(Object::Reference(r)) => {
            let r = *r;
            match doc.load_object(r)? {
                Object::Array(mut items) => {
                    items.push(Object::Reference(item));
                    doc.update_object(r, Object::Array(items));
                },
                other => {
                    return Err(Error::InvalidPdf(format!("/{} {} is a {}", key, r, other.type_name())));
                },
            }
        },
        None | Some(Object::Null) => {
            dict.insert(key.to_string(), Object::Array(vec![Object::Reference(item)]));
        },
        Some(other) => {
            return Err(Error::InvalidPdf(format!("/{} is a {}", key, other.type_name())));
        },
    }
    Ok(())
}

/// Push `item` onto the array at `key` of the dictionary object `owner`.
fn append_to_array(doc: &mut PdfDocument, owner: ObjectRef, key: &str, item: ObjectRef) -> Result<()> {
    let mut dict = doc
        .load_object(owner)?
        .into_dict()
        .map_err(|_| Error::InvalidPdf(format!("{} is not a dictionary", owner)))?;
    let was_direct = !matches!(dict.get(key), Some(Object::Reference(_)));
    push_reference(doc, &mut dict, key, item)?;
    if was_direct {
        doc.update_object(owner, Object::Dictionary(dict));
    }
    Ok(())
}

/// Signature fields reachable from `acroform`'s `/Fields`, in document order.
///
/// `/FT` is inheritable, so a kid counts when any ancestor is `/FT /Sig`.
fn signature_fields(doc: &mut PdfDocument, acroform: &Dictionary) -> Result<Vec<ObjectRef>> {
    let roots = match acroform.get("Fields") {
        Some(fields) => doc.resolve(fields)?,
        None => return Ok(Vec::new()),
    };
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    if let Some(roots) = roots.as_array() {
        for field in roots {
            collect_signature_fields(doc, field, false, 0, &mut visited, &mut found)?;
        }
    }
    Ok(found)
}

fn collect_signature_fields(
    doc: &mut PdfDocument,
    field: &Object,
    inherited_sig: bool,
    depth: usize,
    visited: &mut HashSet<ObjectRef>,
    found: &mut Vec<ObjectRef>,
) -> Result<()> {
    let field_ref = match field.as_reference() {
        Some(r) => r,
        None => return Ok(()),
    };
    if depth > MAX_FIELD_DEPTH || !visited.insert(field_ref) {
        log::warn!("Skipping field {} (cycle or nesting too deep)", field_ref);
        return Ok(());
    }
    let dict = match doc.load_object(field_ref) {
        Ok(Object::Dictionary(d)) => d,
        Ok(_) | Err(Error::ObjectNotFound(..)) => return Ok(()),
        Err(e) => return Err(e),
    };

    let is_sig = match dict.get("FT").and_then(Object::as_name) {
        Some(ft) => ft == "Sig",
        None => inherited_sig,
    };
    let kids = match dict.get("Kids") {
        Some(kids) => doc.resolve(kids)?,
        None => Object::Null,
    };
    // Kids that are pure widgets belong to their parent field
    let kid_fields: Vec<Object> = match kids.as_array() {
        Some(kids) => kids.clone(),
        None => Vec::new(),
    };

    if is_sig && (kid_fields.is_empty() || dict.contains_key("T")) {
        found.push(field_ref);
    }
    for kid in &kid_fields {
        collect_signature_fields(doc, kid, is_sig, depth + 1, visited, found)?;
    }
    Ok(())
}

/// List the signature fields of a document and what their signatures hold.
pub fn read_signatures(doc: &mut PdfDocument) -> Result<Vec<SignatureInfo>> {
    let catalog = doc.catalog()?;
    let acroform = match catalog.get("AcroForm") {
        Some(form) => match doc.resolve(form)? {
            Object::Dictionary(d) => d,
            _ => return Ok(Vec::new()),
        },
        None => return Ok(Vec::new()),
    };

    let mut infos = Vec::new();
    for field_ref in signature_fields(doc, &acroform)? {
        let field = doc.load_object(field_ref)?.into_dict()?;
        let mut info = SignatureInfo {
            field_ref: Some(field_ref),
            field_name: field.get("T").and_then(Object::as_text),
            ..Default::default()
        };

        if let Some(v) = field.get("V") {
            info.signature_ref = v.as_reference();
            if let Object::Dictionary(sig) = doc.resolve(v)? {
                let text = |key: &str| sig.get(key).and_then(Object::as_text);
                info.sub_filter = sig.get("SubFilter").and_then(Object::as_name).map(str::to_string);
                info.reason = text("Reason");
                info.location = text("Location");
                info.contact_info = text("ContactInfo");
                info.name = text("Name");
                info.signing_time = text("M");
                info.contents = sig
                    .get("Contents")
                    .and_then(Object::as_string)
                    .map(<[u8]>::to_vec)
                    .unwrap_or_default();
                info.byte_range = sig
                    .get("ByteRange")
                    .and_then(Object::as_array)
                    .map(|arr| arr.iter().filter_map(Object::as_integer).collect::<Vec<_>>())
                    .and_then(|values| ByteRange::from_array(&values).ok());
            }
        }
        infos.push(info);
    }
    Ok(infos)
}
