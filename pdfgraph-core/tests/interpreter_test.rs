//! Content-stream interpreter behavior seen through the public API.

use pdfgraph::colorspace::ColorSpace;
use pdfgraph::content::{
    DisplayItem, DisplayList, FillRule, Interpreter, InterpreterConfig, Paint, PaintTarget,
};
use pdfgraph::objects::{Dictionary, ObjectId, Stream, Value};
use pdfgraph::xref::MemoryResolver;
use pdfgraph::PdfError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Routes interpreter diagnostics to the test output; `RUST_LOG=pdfgraph=debug`
/// shows them.
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfgraph=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn kinds(surface: &DisplayList) -> Vec<&'static str> {
    surface
        .items()
        .iter()
        .filter_map(|item| match item {
            DisplayItem::Fill(..) => Some("fill"),
            DisplayItem::StrokePath(..) => Some("stroke"),
            DisplayItem::Clip(..) => Some("clip"),
            DisplayItem::Image(..) => Some("image"),
            DisplayItem::Text(..) => Some("text"),
            DisplayItem::Save => Some("save"),
            DisplayItem::Restore => Some("restore"),
            _ => None,
        })
        .collect()
}

#[test]
fn test_clip_takes_effect_after_the_paint() {
    let objects = MemoryResolver::new();
    let mut surface = DisplayList::new();
    let report = Interpreter::new(&objects)
        .run(
            b"0 0 50 50 re W f 0 0 200 200 re f",
            &Value::Null,
            &mut surface,
        )
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(kinds(&surface), vec!["fill", "clip", "fill"]);

    // The first fill used the whole rectangle; the clip is that rectangle.
    let fills: Vec<_> = surface.fills().collect();
    let clip = surface.clips().next().unwrap();
    assert_eq!(fills[0].segments(), clip.segments());
    assert!(matches!(
        surface.items().iter().find(|i| matches!(i, DisplayItem::Clip(..))),
        Some(DisplayItem::Clip(_, FillRule::NonZero))
    ));
}

#[test]
fn test_rg_selects_space_and_color() {
    let objects = MemoryResolver::new();
    let mut surface = DisplayList::new();
    let mut interpreter = Interpreter::new(&objects);
    interpreter
        .run(b"1 0 0 rg 0 0 10 10 re f", &Value::Null, &mut surface)
        .unwrap();
    let gs = interpreter.graphics_state();
    assert_eq!(*gs.fill_space, ColorSpace::DeviceRGB);
    let color = surface.last_fill_paint().and_then(Paint::as_color).unwrap();
    assert_eq!(*color.space, ColorSpace::DeviceRGB);
    assert_eq!(color.components, vec![1.0, 0.0, 0.0]);
}

#[test]
fn test_unknown_operators_inside_compatibility_section() {
    init_tracing();
    let objects = MemoryResolver::new();
    let mut surface = DisplayList::new();
    let report = Interpreter::new(&objects)
        .run(
            b"BX 1 2 frobnicate EX 0 0 5 5 re f zork",
            &Value::Null,
            &mut surface,
        )
        .unwrap();
    assert_eq!(surface.fills().count(), 1);
    assert_eq!(report.unknown_operators, vec!["zork".to_string()]);
}

#[test]
fn test_strict_mode_stops_on_unknown_operator() {
    init_tracing();
    let objects = MemoryResolver::new();
    let mut surface = DisplayList::new();
    let config = InterpreterConfig::default().with_tolerate_unknown_operators(false);
    let result = Interpreter::with_config(&objects, config).run(b"zork", &Value::Null, &mut surface);
    assert!(matches!(result, Err(PdfError::UnsupportedFeature(_))));
}

#[test]
fn test_ext_gstate_opacity_reaches_surface() {
    let objects = MemoryResolver::new();
    let resources = Value::Dict(Dictionary::new().with(
        "ExtGState",
        Dictionary::new().with(
            "GS1",
            Dictionary::new().with("ca", 0.25).with("CA", 0.75),
        ),
    ));
    let mut surface = DisplayList::new();
    let report = Interpreter::new(&objects)
        .run(b"/GS1 gs 0 0 1 1 re f", &resources, &mut surface)
        .unwrap();
    assert!(report.is_clean());
    let opacities: Vec<(PaintTarget, f32)> = surface
        .items()
        .iter()
        .filter_map(|i| match i {
            DisplayItem::Opacity(target, alpha) => Some((*target, *alpha)),
            _ => None,
        })
        .collect();
    assert_eq!(
        opacities,
        vec![(PaintTarget::Fill, 0.25), (PaintTarget::Stroke, 0.75)]
    );
}

#[test]
fn test_indexed_color_from_resources() {
    let objects = MemoryResolver::new();
    let indexed = Value::Array(vec![
        Value::name("Indexed"),
        Value::name("DeviceRGB"),
        1.into(),
        Value::String(vec![255, 0, 0, 0, 255, 0]),
    ]);
    let resources = Value::Dict(
        Dictionary::new().with("ColorSpace", Dictionary::new().with("CS0", indexed)),
    );
    let mut surface = DisplayList::new();
    let report = Interpreter::new(&objects)
        .run(b"/CS0 cs 1 sc 0 0 1 1 re f", &resources, &mut surface)
        .unwrap();
    assert!(report.is_clean());
    let color = surface.last_fill_paint().and_then(Paint::as_color).unwrap();
    assert_eq!(color.to_rgb(), [0.0, 1.0, 0.0]);
}

#[test]
fn test_missing_resources_do_not_stop_the_page() {
    init_tracing();
    let objects = MemoryResolver::new();
    let mut surface = DisplayList::new();
    let report = Interpreter::new(&objects)
        .run(
            b"/Missing Do /F9 12 Tf /Nope gs 0 0 1 1 re f",
            &Value::Null,
            &mut surface,
        )
        .unwrap();
    assert_eq!(surface.fills().count(), 1);
    assert_eq!(report.diagnostics.len(), 3);
    assert!(report
        .diagnostics
        .iter()
        .all(|d| matches!(d.error, PdfError::ResourceNotFound { .. })));
}

#[test]
fn test_shading_reported_as_unsupported() {
    init_tracing();
    let objects = MemoryResolver::new();
    let mut surface = DisplayList::new();
    let report = Interpreter::new(&objects)
        .run(b"/Sh1 sh 0 0 1 1 re f", &Value::Null, &mut surface)
        .unwrap();
    assert_eq!(report.unsupported().count(), 1);
    assert_eq!(surface.fills().count(), 1);
}

fn self_referencing_form(objects: &mut MemoryResolver) -> Value {
    let id = ObjectId::new(10, 0);
    let form = Stream::new(
        Dictionary::new()
            .with("Type", Value::name("XObject"))
            .with("Subtype", Value::name("Form"))
            .with("BBox", Value::Array(vec![0.into(), 0.into(), 10.into(), 10.into()]))
            .with(
                "Resources",
                Dictionary::new().with("XObject", Dictionary::new().with("Fm0", id)),
            ),
        b"0 0 1 1 re f /Fm0 Do".to_vec(),
    );
    objects.insert(id, form);
    Value::Dict(Dictionary::new().with("XObject", Dictionary::new().with("Fm0", id)))
}

#[test]
fn test_form_recursion_is_bounded() {
    init_tracing();
    let mut objects = MemoryResolver::new();
    let resources = self_referencing_form(&mut objects);
    let mut surface = DisplayList::new();
    let config = InterpreterConfig::default().with_max_nesting_depth(4);
    let report = Interpreter::with_config(&objects, config)
        .run(b"/Fm0 Do", &resources, &mut surface)
        .unwrap();
    assert_eq!(surface.fills().count(), 4);
    assert_eq!(report.unsupported().count(), 1);
}

#[test]
fn test_inline_image_between_paths() {
    let objects = MemoryResolver::new();
    let mut surface = DisplayList::new();
    Interpreter::new(&objects)
        .run(
            b"0 0 1 1 re f q BI /W 1 /H 1 /CS /RGB /BPC 8 ID \x10\x20\x30 EI Q 0 0 2 2 re S",
            &Value::Null,
            &mut surface,
        )
        .unwrap();
    assert_eq!(kinds(&surface), vec!["fill", "save", "image", "restore", "stroke"]);
    assert_eq!(surface.images().next().unwrap().data, vec![0x10, 0x20, 0x30]);
}
