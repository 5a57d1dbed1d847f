//! End-to-end text extraction tests.

mod common;

use common::{PdfBuilder, one_page_pdf};
use tinta_core::parse_document;

const TYPE1_STD: &str = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>";

#[test]
fn test_extract_simple_text() {
    let pdf = one_page_pdf(TYPE1_STD, b"BT /F1 12 Tf (Hi) Tj ET");
    let doc = parse_document(pdf, "").unwrap();
    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    assert_eq!(fragments, vec!["Hi".to_string()]);
}

#[test]
fn test_extract_compressed_content() {
    let mut builder = PdfBuilder::new();
    builder
        .add_object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .add_object(2, "<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>")
        .add_object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .add_flate_stream(4, "", b"BT /F1 10 Tf (compressed text) Tj ET")
        .add_object(5, TYPE1_STD);
    let doc = parse_document(builder.finish(6, 1), "").unwrap();

    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    assert_eq!(fragments, vec!["compressed text".to_string()]);
}

#[test]
fn test_extract_tj_array() {
    let pdf = one_page_pdf(TYPE1_STD, b"BT /F1 12 Tf [(Hel) -20 (lo)] TJ ET");
    let doc = parse_document(pdf, "").unwrap();
    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    assert_eq!(fragments, vec!["Hel".to_string(), "lo".to_string()]);
}

#[test]
fn test_extract_hex_string_and_quote() {
    let pdf = one_page_pdf(TYPE1_STD, b"BT /F1 12 Tf <4869> Tj (again) ' ET");
    let doc = parse_document(pdf, "").unwrap();
    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    assert_eq!(fragments, vec!["Hi".to_string(), "again".to_string()]);
}

#[test]
fn test_unmapped_codes_become_replacement_chars() {
    // Code 0x01 has no entry in StandardEncoding
    let pdf = one_page_pdf(TYPE1_STD, b"BT /F1 12 Tf (\\001A) Tj ET");
    let doc = parse_document(pdf, "").unwrap();
    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    assert_eq!(fragments, vec!["\u{fffd}A".to_string()]);
}

#[test]
fn test_differences_encoding() {
    let font = "<< /Type /Font /Subtype /Type1 /BaseFont /Custom \
        /Encoding << /Type /Encoding /Differences [ 65 /B 66 /A ] >> >>";
    let pdf = one_page_pdf(font, b"BT /F1 12 Tf (AB) Tj ET");
    let doc = parse_document(pdf, "").unwrap();
    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    // Codes 65/66 are swapped by the Differences array
    assert_eq!(fragments, vec!["BA".to_string()]);
}

#[test]
fn test_truetype_differences_keeps_base_encoding() {
    let font = "<< /Type /Font /Subtype /TrueType /BaseFont /Custom \
        /Encoding << /BaseEncoding /WinAnsiEncoding /Differences [ 65 /B ] >> >>";
    let pdf = one_page_pdf(font, b"BT /F1 12 Tf (AB) Tj ET");
    let doc = parse_document(pdf, "").unwrap();
    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    // The Differences override is a known gap for TrueType fonts
    assert_eq!(fragments, vec!["AB".to_string()]);
}

#[test]
fn test_type0_tounicode_cmap() {
    let cmap = b"/CIDInit /ProcSet findresource begin\n\
        begincmap\n\
        1 begincodespacerange <00> <FF> endcodespacerange\n\
        2 beginbfchar\n<48> <0048>\n<69> <0131>\nendbfchar\n\
        endcmap\nend" as &[u8];

    let mut builder = PdfBuilder::new();
    builder
        .add_object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .add_object(2, "<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>")
        .add_object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .add_stream(4, "", b"BT /F1 12 Tf (Hi) Tj ET")
        .add_object(
            5,
            "<< /Type /Font /Subtype /Type0 /BaseFont /Composite \
             /Encoding /Identity-H /ToUnicode 6 0 R >>",
        )
        .add_stream(6, "", cmap);
    let doc = parse_document(builder.finish(7, 1), "").unwrap();

    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    // H maps to itself, i maps to dotless i through the CMap
    assert_eq!(fragments, vec!["H\u{131}".to_string()]);
}

#[test]
fn test_page_tree_traversal_order() {
    // Pages nested one level deep: the subtree's kids come before
    // siblings already queued.
    let mut builder = PdfBuilder::new();
    builder
        .add_object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .add_object(
            2,
            "<< /Type /Pages /Kids [ 3 0 R 7 0 R ] /Count 3 >>",
        )
        .add_object(3, "<< /Type /Pages /Parent 2 0 R /Kids [ 5 0 R 6 0 R ] /Count 2 >>")
        .add_stream(4, "", b"") // placeholder, unused
        .add_object(
            5,
            "<< /Type /Page /Parent 3 0 R /Contents 8 0 R \
             /Resources << /Font << /F1 11 0 R >> >> >>",
        )
        .add_object(
            6,
            "<< /Type /Page /Parent 3 0 R /Contents 9 0 R \
             /Resources << /Font << /F1 11 0 R >> >> >>",
        )
        .add_object(
            7,
            "<< /Type /Page /Parent 2 0 R /Contents 10 0 R \
             /Resources << /Font << /F1 11 0 R >> >> >>",
        )
        .add_stream(8, "", b"BT /F1 9 Tf (one) Tj ET")
        .add_stream(9, "", b"BT /F1 9 Tf (two) Tj ET")
        .add_stream(10, "", b"BT /F1 9 Tf (three) Tj ET")
        .add_object(11, TYPE1_STD);
    let doc = parse_document(builder.finish(12, 1), "").unwrap();

    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    assert_eq!(fragments, vec!["one", "two", "three"]);
}

#[test]
fn test_contents_array_concatenated() {
    let mut builder = PdfBuilder::new();
    builder
        .add_object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .add_object(2, "<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>")
        .add_object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents [ 4 0 R 5 0 R ] \
             /Resources << /Font << /F1 6 0 R >> >> >>",
        )
        .add_stream(4, "", b"BT /F1 12 Tf (first) Tj")
        .add_stream(5, "", b"(second) Tj ET")
        .add_object(6, TYPE1_STD);
    let doc = parse_document(builder.finish(7, 1), "").unwrap();

    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    assert_eq!(fragments, vec!["first", "second"]);
}

#[test]
fn test_corrupt_page_contributes_nothing() {
    // Content stream reference dangles; the page yields no text but
    // extraction still succeeds.
    let mut builder = PdfBuilder::new();
    builder
        .add_object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .add_object(2, "<< /Type /Pages /Kids [ 3 0 R 5 0 R ] /Count 2 >>")
        .add_object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 99 0 R \
             /Resources << /Font << /F1 6 0 R >> >> >>",
        )
        .add_object(
            5,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /Font << /F1 6 0 R >> >> >>",
        )
        .add_stream(4, "", b"BT /F1 12 Tf (survivor) Tj ET")
        .add_object(6, TYPE1_STD);
    let doc = parse_document(builder.finish(7, 1), "").unwrap();

    let fragments: Vec<String> = doc.extract_text().unwrap().collect();
    assert_eq!(fragments, vec!["survivor"]);
}
