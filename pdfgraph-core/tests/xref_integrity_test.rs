//! Byte layout of the cross-reference section written by `DocumentWriter`.

use pdfgraph::geometry::Rectangle;
use pdfgraph::objects::Value;
use pdfgraph::{DocumentWriter, WriterConfig};
use proptest::prelude::*;

/// Offset stored after the last `startxref`.
fn startxref(bytes: &[u8]) -> usize {
    let text = String::from_utf8_lossy(bytes);
    let pos = text.rfind("startxref").unwrap();
    text[pos + "startxref".len()..]
        .split_whitespace()
        .next()
        .unwrap()
        .parse()
        .unwrap()
}

/// The `0 n` subsection header and its entry lines, each exactly as
/// written.
fn xref_lines(bytes: &[u8]) -> (usize, Vec<&[u8]>) {
    let start = startxref(bytes);
    assert_eq!(&bytes[start..start + 5], b"xref\n");
    let header_end = start + 5 + bytes[start + 5..].iter().position(|b| *b == b'\n').unwrap();
    let header = std::str::from_utf8(&bytes[start + 5..header_end]).unwrap();
    let count: usize = header.split(' ').nth(1).unwrap().parse().unwrap();
    let first = header_end + 1;
    let lines = (0..count)
        .map(|i| &bytes[first + i * 20..first + (i + 1) * 20])
        .collect();
    (count, lines)
}

fn check_layout(bytes: &[u8], registered: usize) {
    let (count, lines) = xref_lines(bytes);
    assert_eq!(count, registered + 1);
    assert_eq!(lines[0], b"0000000000 65535 f \n");
    for (k, line) in lines.iter().enumerate().skip(1) {
        assert_eq!(line.len(), 20);
        assert_eq!(&line[10..], b" 00000 n \n");
        let offset: usize = std::str::from_utf8(&line[..10]).unwrap().parse().unwrap();
        let expected = format!("{k} 0 obj");
        assert_eq!(
            &bytes[offset..offset + expected.len()],
            expected.as_bytes(),
            "object {k}"
        );
    }
    let trailer_at = bytes.len() - bytes.len().min(400);
    let tail = String::from_utf8_lossy(&bytes[trailer_at..]);
    assert!(tail.contains(&format!("/Size {}", registered + 1)));
}

#[test]
fn test_empty_document_xref() {
    let bytes = DocumentWriter::new(WriterConfig::default()).finish().unwrap();
    check_layout(&bytes, 5);
}

#[test]
fn test_document_with_pages_and_fonts_xref() {
    let mut doc = DocumentWriter::new(WriterConfig::default());
    for i in 0..3 {
        let mut page = doc.add_page(Rectangle::letter());
        page.set_font(pdfgraph::writer::StandardFont::TimesRoman, 12.0)
            .draw_text(72.0, 720.0, &format!("Page {} \u{3a9}", i + 1))
            .unwrap();
    }
    // info, catalog, pages, two maps, 3 × (page + contents), 2 fonts
    let bytes = doc.finish().unwrap();
    check_layout(&bytes, 5 + 6 + 2);
}

proptest! {
    #[test]
    fn prop_xref_offsets_point_at_objects(
        pages in 0usize..4,
        objects in proptest::collection::vec("[a-z ]{0,40}", 0..20),
        compress in any::<bool>(),
    ) {
        let mut doc = DocumentWriter::new(WriterConfig::default().with_compression(compress));
        for _ in 0..pages {
            doc.add_page(Rectangle::a4()).rect(0.0, 0.0, 10.0, 10.0).stroke();
        }
        for text in &objects {
            doc.add_object(Value::string(text.as_bytes()));
        }
        let bytes = doc.finish().unwrap();
        check_layout(&bytes, 5 + 2 * pages + objects.len());
    }
}
