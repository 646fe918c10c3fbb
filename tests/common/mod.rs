//! Shared fixtures for integration tests: generated PDFs and mock signers.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_seal::signatures::{SignOptions, SignatureProvider};
use std::cell::RefCell;
use std::io::{Read, Write};

/// Fixed `/M` so output is reproducible.
pub fn fixed_options() -> SignOptions {
    let time = chrono::DateTime::parse_from_rfc3339("2024-02-29T10:30:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    SignOptions::default().with_signing_time(time)
}

/// PDF with a classic xref table; objects are `(id, body)`.
pub fn classic_pdf(objects: &[(u32, &str)], trailer_extra: &str) -> Vec<u8> {
    let mut pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let max_id = objects.iter().map(|(id, _)| *id).max().unwrap_or(0);
    let mut offsets = vec![None; max_id as usize + 1];
    for (id, body) in objects {
        offsets[*id as usize] = Some(pdf.len());
        write!(pdf, "{} 0 obj\n{}\nendobj\n", id, body).unwrap();
    }
    let xref = pdf.len();
    write!(pdf, "xref\n0 {}\n", max_id + 1).unwrap();
    for offset in &offsets {
        match offset {
            Some(o) => write!(pdf, "{:010} 00000 n \n", o).unwrap(),
            None => pdf.extend_from_slice(b"0000000000 65535 f \n"),
        }
    }
    write!(
        pdf,
        "trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n",
        max_id + 1,
        trailer_extra,
        xref
    )
    .unwrap();
    pdf
}

/// One page, catalog is object 1, page is object 3.
pub fn one_page_pdf() -> Vec<u8> {
    classic_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] /Contents 4 0 R >>"),
            (4, "<< /Length 34 >>\nstream\nBT /F1 12 Tf 72 720 Td (Hi) Tj ET\n\nendstream"),
        ],
        "/Root 1 0 R /ID [<0123456789ABCDEF> <0123456789ABCDEF>]",
    )
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// PDF 1.5 layout: catalog, page tree and page packed in a compressed
/// object stream (object 4), indexed by a compressed xref stream (object 5).
pub fn xref_stream_pdf() -> Vec<u8> {
    let bodies = [
        (1u32, "<< /Type /Catalog /Pages 2 0 R >>"),
        (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
        (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>"),
    ];
    let mut header = String::new();
    let mut body = String::new();
    for (id, text) in &bodies {
        header.push_str(&format!("{} {} ", id, body.len()));
        body.push_str(text);
        body.push(' ');
    }
    let packed = deflate(format!("{}{}", header, body).as_bytes());

    let mut pdf = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let objstm_offset = pdf.len();
    write!(
        pdf,
        "4 0 obj\n<< /Type /ObjStm /N 3 /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
        header.len(),
        packed.len()
    )
    .unwrap();
    pdf.extend_from_slice(&packed);
    pdf.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_offset = pdf.len();
    // type(1) field2(4) field3(2)
    let row = |kind: u8, f2: u32, f3: u16| {
        let mut r = vec![kind];
        r.extend_from_slice(&f2.to_be_bytes());
        r.extend_from_slice(&f3.to_be_bytes());
        r
    };
    let mut rows = Vec::new();
    rows.extend(row(0, 0, 65535));
    rows.extend(row(2, 4, 0));
    rows.extend(row(2, 4, 1));
    rows.extend(row(2, 4, 2));
    rows.extend(row(1, objstm_offset as u32, 0));
    rows.extend(row(1, xref_offset as u32, 0));
    let packed_rows = deflate(&rows);

    write!(
        pdf,
        "5 0 obj\n<< /Type /XRef /Size 6 /W [1 4 2] /Root 1 0 R /Filter /FlateDecode /Length {} >>\nstream\n",
        packed_rows.len()
    )
    .unwrap();
    pdf.extend_from_slice(&packed_rows);
    write!(pdf, "\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_offset).unwrap();
    pdf
}

/// Returns the same bytes every time and records what it was asked to sign.
pub struct MockSigner {
    pub estimate: usize,
    pub output: Vec<u8>,
    pub seen: RefCell<Option<Vec<u8>>>,
}

impl MockSigner {
    pub fn new(estimate: usize, output: Vec<u8>) -> Self {
        Self {
            estimate,
            output,
            seen: RefCell::new(None),
        }
    }

    pub fn seen(&self) -> Vec<u8> {
        self.seen.borrow().clone().expect("signer was not called")
    }
}

impl SignatureProvider for MockSigner {
    fn estimate_signature_len(&self) -> usize {
        self.estimate
    }

    fn sign(&self, content: &mut dyn Read) -> pdf_seal::Result<Vec<u8>> {
        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;
        *self.seen.borrow_mut() = Some(buf);
        Ok(self.output.clone())
    }
}

/// Always fails, like a removed hardware token.
pub struct BrokenSigner;

impl SignatureProvider for BrokenSigner {
    fn estimate_signature_len(&self) -> usize {
        256
    }

    fn sign(&self, _content: &mut dyn Read) -> pdf_seal::Result<Vec<u8>> {
        Err(pdf_seal::Error::signer("device not present"))
    }
}
