//! Writer → reader roundtrip integration tests
//!
//! Documents built with `DocumentWriter` are parsed back with
//! `PdfDocument`, and every object the writer numbered must resolve to the
//! value that was put in.

use chrono::{TimeZone, Utc};
use pdfgraph::content::{DisplayItem, DisplayList, Interpreter, PaintTarget};
use pdfgraph::encryption::Permissions;
use pdfgraph::geometry::Rectangle;
use pdfgraph::writer::{DeviceColor, EncryptionSettings, ImageInput, RawColor, StandardFont};
use pdfgraph::{
    Dictionary, DocumentWriter, ObjectId, ObjectResolver, PdfDocument, Result, Stream, Value,
    WriterConfig,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn config() -> WriterConfig {
    WriterConfig::default()
        .with_title("Roundtrip")
        .with_creation_date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
}

fn sample_graph(doc: &mut DocumentWriter) -> Vec<(ObjectId, Value)> {
    let leaf = Value::Dict(
        Dictionary::new()
            .with("Kind", Value::name("Leaf"))
            .with("Label", "a (nested) string")
            .with("Weights", Value::Array(vec![1.into(), 2.5.into(), (-3).into()])),
    );
    let leaf_id = doc.add_object(leaf.clone());
    let root = Value::Dict(
        Dictionary::new()
            .with("Child", leaf_id)
            .with("Flag", true)
            .with("Nothing", Value::Null)
            .with("Odd Name", Value::name("A#B C"))
            .with("Binary", Value::String(vec![0, 1, 2, 254, 255])),
    );
    let root_id = doc.add_object(root.clone());
    vec![(leaf_id, leaf), (root_id, root)]
}

#[test]
fn test_objects_resolve_to_written_values() -> Result<()> {
    let mut doc = DocumentWriter::new(config());
    let objects = sample_graph(&mut doc);
    let read = PdfDocument::from_bytes(doc.finish()?)?;

    for (id, expected) in objects {
        assert_eq!(read.get_object(id)?, &expected);
    }
    Ok(())
}

#[test]
fn test_stream_roundtrip_through_compression() -> Result<()> {
    let payload: Vec<u8> = b"0 0 m 100 100 l S\n".repeat(200);
    let mut doc = DocumentWriter::new(config());
    let id = doc.add_object(Stream::new(
        Dictionary::new().with("Purpose", Value::name("Test")),
        payload.clone(),
    ));
    let read = PdfDocument::from_bytes(doc.finish()?)?;

    let stream = read.get_object(id)?.as_stream().cloned().unwrap();
    assert_eq!(stream.dict().get_name("Filter"), Some("FlateDecode"));
    assert_eq!(stream.dict().get_name("Purpose"), Some("Test"));
    assert_eq!(stream.decoded_data()?, payload);
    Ok(())
}

#[test]
fn test_info_and_pages_read_back() -> Result<()> {
    let mut doc = DocumentWriter::new(config().with_author("Someone"));
    doc.add_page(Rectangle::letter());
    doc.add_page(Rectangle::a4());
    let read = PdfDocument::from_bytes(doc.finish()?)?;

    assert_eq!(read.page_count(), 2);
    assert_eq!(read.page(0)?.media_box, Rectangle::letter());
    assert_eq!(read.page(1)?.media_box, Rectangle::a4());
    let info = read.info().unwrap();
    assert_eq!(info.get("Title").and_then(Value::as_text).as_deref(), Some("Roundtrip"));
    assert_eq!(info.get("Author").and_then(Value::as_text).as_deref(), Some("Someone"));
    assert_eq!(
        info.get("CreationDate").and_then(Value::as_text).as_deref(),
        Some("D:20240102030405")
    );
    let catalog = read.catalog()?;
    assert_eq!(catalog.get_name("PageMode"), Some("UseNone"));
    Ok(())
}

#[test]
fn test_encrypted_roundtrip() -> Result<()> {
    let secret = "the quick brown fox";
    let mut doc = DocumentWriter::new(config().with_encryption(
        EncryptionSettings::new("owner-pass", "").with_permissions(Permissions::PRINT),
    ));
    let id = doc.add_object(Value::Dict(Dictionary::new().with("Secret", secret)));
    let stream_id = doc.add_object(Stream::from_bytes(secret.as_bytes().to_vec()));
    let bytes = doc.finish()?;

    assert!(bytes.starts_with(b"%PDF-1.4\n"));
    assert!(!bytes.windows(secret.len()).any(|w| w == secret.as_bytes()));
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Filter /Standard"));

    let read = PdfDocument::from_bytes(bytes)?;
    let dict = read.get_object(id)?.as_dict().unwrap();
    assert_eq!(dict.get("Secret").and_then(Value::as_text).as_deref(), Some(secret));
    let stream = read.get_object(stream_id)?.as_stream().unwrap();
    assert_eq!(stream.decoded_data()?, secret.as_bytes());
    assert_eq!(
        read.info().and_then(|i| i.get("Title")).and_then(Value::as_text).as_deref(),
        Some("Roundtrip")
    );
    Ok(())
}

#[test]
fn test_write_to_disk_and_open() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.pdf");
    let mut doc = DocumentWriter::new(config());
    doc.add_page(Rectangle::letter()).rect(10.0, 10.0, 20.0, 20.0).fill();
    doc.write_to(&path)?;

    let read = PdfDocument::open(&path)?;
    assert_eq!(read.page_count(), 1);
    assert_eq!(read.version(), "1.2");
    Ok(())
}

#[test]
fn test_written_page_interprets() -> Result<()> {
    let mut doc = DocumentWriter::new(config());
    let image = doc.add_image(ImageInput::Raw {
        width: 2,
        height: 2,
        color: RawColor::Rgb,
        samples: vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        alpha: None,
    })?;
    let mut page = doc.add_page(Rectangle::letter());
    page.set_fill_color(DeviceColor::Rgb(0.0, 0.0, 1.0))
        .rect(72.0, 72.0, 100.0, 50.0)
        .fill()
        .set_opacity(0.5, 1.0);
    page.set_font(StandardFont::Courier, 10.0)
        .draw_text(72.0, 700.0, "Hello")?;
    page.draw_image(image, 200.0, 200.0, 64.0, 64.0);
    let read = PdfDocument::from_bytes(doc.finish()?)?;

    let content = read.page_content(0)?;
    let mut surface = DisplayList::new();
    let report = Interpreter::new(&read).run_page(read.page(0)?, &content, &mut surface)?;
    assert!(report.is_clean(), "{:?}", report.diagnostics);

    assert_eq!(surface.fills().count(), 1);
    let text = surface.texts().next().unwrap();
    assert_eq!(text.bytes, b"Hello");
    assert_eq!(text.advance, 25.0);
    let img = surface.images().next().unwrap();
    assert_eq!((img.width, img.height), (2, 2));
    assert_eq!(img.data.len(), 12);
    assert!(surface
        .items()
        .iter()
        .any(|i| matches!(i, DisplayItem::Opacity(PaintTarget::Fill, a) if *a == 0.5)));
    Ok(())
}
