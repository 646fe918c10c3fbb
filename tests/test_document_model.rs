//! Document model tests: loading through the different xref layouts and
//! round-tripping incremental updates.

mod common;

use common::{classic_pdf, one_page_pdf, xref_stream_pdf};
use pdf_seal::object::{Object, ObjectRef};
use pdf_seal::writer::IncrementalWriter;
use pdf_seal::{Error, PdfDocument};

#[test]
fn test_classic_document() {
    let mut doc = PdfDocument::from_bytes(one_page_pdf()).unwrap();
    assert_eq!(doc.version(), (1, 7));
    assert_eq!(doc.size(), 5);
    assert_eq!(doc.catalog_ref().unwrap(), ObjectRef::new(1, 0));
    assert_eq!(doc.first_page_ref().unwrap(), ObjectRef::new(3, 0));

    let contents = doc.load_object(ObjectRef::new(4, 0)).unwrap();
    assert_eq!(
        contents.decode_stream_data().unwrap(),
        b"BT /F1 12 Tf 72 720 Td (Hi) Tj ET\n"
    );
}

#[test]
fn test_xref_stream_with_object_stream() {
    let mut doc = PdfDocument::from_bytes(xref_stream_pdf()).unwrap();
    assert_eq!(doc.version(), (1, 5));
    assert_eq!(doc.size(), 6);

    let catalog = doc.catalog().unwrap();
    assert_eq!(catalog["Type"].as_name(), Some("Catalog"));
    let page = doc.first_page_ref().unwrap();
    let page = doc.load_object(page).unwrap();
    assert_eq!(page.as_dict().unwrap()["Type"].as_name(), Some("Page"));
}

#[test]
fn test_open_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    std::fs::write(&path, one_page_pdf()).unwrap();
    let doc = PdfDocument::open(&path).unwrap();
    assert_eq!(doc.data().len(), one_page_pdf().len());

    let missing = PdfDocument::open(dir.path().join("missing.pdf")).unwrap_err();
    assert!(matches!(missing, Error::Io(_)));
}

#[test]
fn test_update_chain_reparses() {
    let mut doc = PdfDocument::from_bytes(one_page_pdf()).unwrap();
    let info = doc.add_object(Object::Dictionary(
        [("Producer".to_string(), Object::text("pdf_seal"))].into_iter().collect(),
    ));
    assert_eq!(info, ObjectRef::new(5, 0));
    let first = IncrementalWriter::new().write(&doc).unwrap();

    let mut doc = PdfDocument::from_bytes(first.bytes.clone()).unwrap();
    assert_eq!(doc.size(), 6);
    let mut catalog = doc.catalog().unwrap();
    catalog.insert("Info".to_string(), Object::Reference(info));
    doc.update_object(ObjectRef::new(1, 0), Object::Dictionary(catalog));
    let second = IncrementalWriter::new().write(&doc).unwrap();
    assert!(second.bytes.starts_with(&first.bytes));

    let mut doc = PdfDocument::from_bytes(second.bytes).unwrap();
    let prev = doc.trailer()["Prev"].as_integer().unwrap() as usize;
    assert_eq!(&doc.data()[prev..prev + 4], b"xref");
    assert_eq!(doc.trailer()["ID"].as_array().unwrap().len(), 2);

    let catalog = doc.catalog().unwrap();
    let info = doc.resolve(&catalog["Info"]).unwrap();
    assert_eq!(info.as_dict().unwrap()["Producer"].as_text().as_deref(), Some("pdf_seal"));
    // untouched objects still come from the original revision
    assert_eq!(doc.first_page_ref().unwrap(), ObjectRef::new(3, 0));
}

#[test]
fn test_update_on_xref_stream_document() {
    let mut doc = PdfDocument::from_bytes(xref_stream_pdf()).unwrap();
    let mut page = doc.load_object(ObjectRef::new(3, 0)).unwrap().into_dict().unwrap();
    page.insert("Rotate".to_string(), Object::Integer(90));
    doc.update_object(ObjectRef::new(3, 0), Object::Dictionary(page));
    let out = IncrementalWriter::new().write(&doc).unwrap();
    assert_eq!(out.offsets.len(), 1);

    let mut doc = PdfDocument::from_bytes(out.bytes).unwrap();
    let page = doc.load_object(ObjectRef::new(3, 0)).unwrap();
    assert_eq!(page.as_dict().unwrap()["Rotate"].as_integer(), Some(90));
    // still resolved through the object stream
    let pages = doc.load_object(ObjectRef::new(2, 0)).unwrap();
    assert_eq!(pages.as_dict().unwrap()["Count"].as_integer(), Some(1));
}

#[test]
fn test_structural_errors() {
    assert!(matches!(
        PdfDocument::from_bytes(b"hello world".to_vec()),
        Err(Error::InvalidHeader(_))
    ));

    let encrypted = classic_pdf(
        &[(1, "<< /Type /Catalog >>"), (2, "<< /Filter /Standard /V 2 >>")],
        "/Root 1 0 R /Encrypt 2 0 R",
    );
    assert!(matches!(PdfDocument::from_bytes(encrypted), Err(Error::Unsupported(_))));

    let mut no_pages = PdfDocument::from_bytes(classic_pdf(&[(1, "<< /Type /Catalog >>")], "/Root 1 0 R")).unwrap();
    assert!(no_pages.first_page_ref().is_err());
}
