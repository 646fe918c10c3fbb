//! Hand-assembled PDFs for unit tests.

/// Assemble a PDF from `(id, body)` pairs with a correct classic xref table.
///
/// `trailer_extra` is spliced into the trailer dictionary after `/Size`.
pub(crate) fn build_pdf(objects: &[(u32, &str)], trailer_extra: &str) -> Vec<u8> {
    let mut pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let max_id = objects.iter().map(|(id, _)| *id).max().unwrap_or(0);
    let mut offsets = vec![None; max_id as usize + 1];
    for (id, body) in objects {
        offsets[*id as usize] = Some(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", max_id + 1).as_bytes());
    for offset in &offsets {
        match offset {
            Some(o) => pdf.extend_from_slice(format!("{:010} 00000 n \n", o).as_bytes()),
            None => pdf.extend_from_slice(b"0000000000 65535 f \n"),
        }
    }
    pdf.extend_from_slice(
        format!("trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n", max_id + 1, trailer_extra, xref).as_bytes(),
    );
    pdf
}

/// One empty page; catalog is object 1.
pub(crate) fn minimal_pdf() -> Vec<u8> {
    build_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>"),
        ],
        "/Root 1 0 R",
    )
}
