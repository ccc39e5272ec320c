use super::*;

#[test]
fn empty_input_is_unreadable() {
    let result = load_pdf(&[], "empty.pdf");
    assert!(matches!(result, Err(RagError::UnreadablePdf(msg)) if msg.contains("empty.pdf")));
}

#[test]
fn non_pdf_bytes_are_unreadable() {
    let result = load_pdf(b"just some plain text, definitely not a pdf", "notes.pdf");
    assert!(matches!(result, Err(RagError::UnreadablePdf(_))));
}

#[test]
fn truncated_pdf_is_unreadable() {
    let result = load_pdf(b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog", "broken.pdf");
    assert!(matches!(result, Err(RagError::UnreadablePdf(_))));
}

#[test]
fn header_detection() {
    assert!(has_pdf_header(b"%PDF-1.4\n..."));
    assert!(has_pdf_header(b"\xEF\xBB\xBF%PDF-1.4\n"));
    assert!(!has_pdf_header(b"%PD"));
    assert!(!has_pdf_header(b"<html></html>"));

    let mut late_header = vec![b' '; HEADER_SEARCH_WINDOW];
    late_header.extend_from_slice(b"%PDF-1.4");
    assert!(!has_pdf_header(&late_header));
}
