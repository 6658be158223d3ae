//! PDF loading against a handcrafted minimal document.
//!
//! The fixture is built byte-by-byte with a correct xref table so
//! `pdf-extract` can parse it without shipping a binary fixture file.

use std::fs;
use std::path::Path;

use docchat::loader::{DocumentLoader, PdfLoader};
use tempfile::TempDir;

/// Minimal valid single-page PDF containing one line of Helvetica text.
fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET\n", phrase);

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(format!("4 0 obj << /Length {} >> stream\n", stream.len()).as_bytes());
    out.extend_from_slice(stream.as_bytes());
    out.extend_from_slice(b"endstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

#[test]
fn loads_a_minimal_pdf_into_pages() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("sample.pdf");
    fs::write(&path, minimal_pdf("retrieval sample phrase")).unwrap();

    let pages = PdfLoader.load(&path).expect("valid PDF should load");
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].metadata.page_index, 0);
    assert_eq!(pages[0].metadata.source, path.display().to_string());
}

#[test]
fn rejects_bytes_that_are_not_a_pdf() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.pdf");
    fs::write(&path, b"this is not a pdf at all").unwrap();

    assert!(PdfLoader.load(&path).is_err());
}

#[test]
fn rejects_a_missing_path() {
    assert!(PdfLoader.load(Path::new("/nonexistent/missing.pdf")).is_err());
}
