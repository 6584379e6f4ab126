//! Pages under construction and the handle used to draw on them.

use indexmap::IndexMap;
use tracing::trace;

use super::annotations::Annotation;
use super::config::PdfVersion;
use super::fonts::{FontRegistry, StandardFont};
use super::serializer::{format_number, write_name, write_string};
use super::{DocumentWriter, ImageId, PatternId};
use crate::content::{LineCap, LineJoin};
use crate::error::{PdfError, Result};
use crate::geometry::{Matrix, Rectangle};
use crate::objects::{Dictionary, Value};

/// A color in one of the device spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceColor {
    Gray(f64),
    Rgb(f64, f64, f64),
    Cmyk(f64, f64, f64, f64),
}

impl DeviceColor {
    fn write(&self, out: &mut Vec<u8>, stroke: bool) {
        let (components, op): (&[f64], &str) = match self {
            DeviceColor::Gray(g) => (&[*g], if stroke { "G" } else { "g" }),
            DeviceColor::Rgb(r, g, b) => (&[*r, *g, *b], if stroke { "RG" } else { "rg" }),
            DeviceColor::Cmyk(c, m, y, k) => (&[*c, *m, *y, *k], if stroke { "K" } else { "k" }),
        };
        write_operands(out, components);
        out.extend_from_slice(op.as_bytes());
        out.push(b'\n');
    }
}

/// What the content stream has set so far, so repeated settings are not
/// written twice. `None` means unknown.
#[derive(Debug, Clone, Default)]
struct GStateMirror {
    fill: Option<DeviceColor>,
    stroke: Option<DeviceColor>,
    line_width: Option<f64>,
    fill_alpha: Option<f64>,
    stroke_alpha: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct PageBuilder {
    pub(crate) media_box: Rectangle,
    pub(crate) content: Vec<u8>,
    gstate: GStateMirror,
    stack: Vec<GStateMirror>,
    font: Option<(StandardFont, f64)>,
    pub(crate) ext_gstates: IndexMap<String, Dictionary>,
    pub(crate) color_spaces: IndexMap<String, Value>,
    pub(crate) patterns: IndexMap<String, PatternId>,
    pub(crate) annotations: Vec<Annotation>,
}

impl PageBuilder {
    pub(crate) fn new(media_box: Rectangle) -> Self {
        Self {
            media_box,
            content: Vec::new(),
            gstate: GStateMirror::default(),
            stack: Vec::new(),
            font: None,
            ext_gstates: IndexMap::new(),
            color_spaces: IndexMap::new(),
            patterns: IndexMap::new(),
            annotations: Vec::new(),
        }
    }

    fn op(&mut self, operands: &[f64], operator: &str) {
        trace!("page op {operator}");
        write_operands(&mut self.content, operands);
        self.content.extend_from_slice(operator.as_bytes());
        self.content.push(b'\n');
    }

    fn name_op(&mut self, name: &str, operator: &str) {
        write_name(&mut self.content, name);
        self.content.push(b' ');
        self.content.extend_from_slice(operator.as_bytes());
        self.content.push(b'\n');
    }

    /// Resources that belong to this page alone; fonts and XObjects come
    /// from the document-wide maps.
    pub(crate) fn resources(&self, font_map: Value, xobject_map: Value, patterns: &[Value]) -> Dictionary {
        let mut resources = Dictionary::new()
            .with(
                "ProcSet",
                Value::Array(
                    ["PDF", "Text", "ImageB", "ImageC"]
                        .into_iter()
                        .map(Value::name)
                        .collect(),
                ),
            )
            .with("Font", font_map)
            .with("XObject", xobject_map);
        if !self.ext_gstates.is_empty() {
            let dict: Dictionary = self
                .ext_gstates
                .iter()
                .map(|(k, v)| (k.clone(), Value::Dict(v.clone())))
                .collect();
            resources.set("ExtGState", dict);
        }
        if !self.color_spaces.is_empty() {
            let dict: Dictionary = self
                .color_spaces
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            resources.set("ColorSpace", dict);
        }
        if !self.patterns.is_empty() {
            let dict: Dictionary = self
                .patterns
                .iter()
                .filter_map(|(k, id)| patterns.get(id.0).map(|r| (k.clone(), r.clone())))
                .collect();
            resources.set("Pattern", dict);
        }
        resources
    }
}

fn write_operands(out: &mut Vec<u8>, operands: &[f64]) {
    for n in operands {
        out.extend_from_slice(format_number(*n).as_bytes());
        out.push(b' ');
    }
}

/// Content and resources of one page, borrowed from its writer.
pub struct PageHandle<'w> {
    pub(crate) doc: &'w mut DocumentWriter,
    pub(crate) index: usize,
}

impl<'w> PageHandle<'w> {
    /// Zero-based position of the page in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    fn page(&mut self) -> &mut PageBuilder {
        &mut self.doc.pages[self.index]
    }

    pub fn media_box(&self) -> Rectangle {
        self.doc.pages[self.index].media_box
    }

    /// Bytes written to the content stream so far.
    pub fn content(&self) -> &[u8] {
        &self.doc.pages[self.index].content
    }

    pub fn set_fill_color(&mut self, color: DeviceColor) -> &mut Self {
        let page = self.page();
        if page.gstate.fill != Some(color) {
            color.write(&mut page.content, false);
            page.gstate.fill = Some(color);
        }
        self
    }

    pub fn set_stroke_color(&mut self, color: DeviceColor) -> &mut Self {
        let page = self.page();
        if page.gstate.stroke != Some(color) {
            color.write(&mut page.content, true);
            page.gstate.stroke = Some(color);
        }
        self
    }

    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        let page = self.page();
        if page.gstate.line_width != Some(width) {
            page.op(&[width], "w");
            page.gstate.line_width = Some(width);
        }
        self
    }

    pub fn set_line_cap(&mut self, cap: LineCap) -> &mut Self {
        self.page().op(&[cap as u8 as f64], "J");
        self
    }

    pub fn set_line_join(&mut self, join: LineJoin) -> &mut Self {
        self.page().op(&[join as u8 as f64], "j");
        self
    }

    pub fn set_miter_limit(&mut self, limit: f64) -> &mut Self {
        self.page().op(&[limit], "M");
        self
    }

    pub fn set_dash(&mut self, pattern: &[f64], phase: f64) -> &mut Self {
        let page = self.page();
        page.content.push(b'[');
        for (i, n) in pattern.iter().enumerate() {
            if i > 0 {
                page.content.push(b' ');
            }
            page.content.extend_from_slice(format_number(*n).as_bytes());
        }
        page.content.extend_from_slice(b"] ");
        page.op(&[phase], "d");
        self
    }

    pub fn save(&mut self) -> &mut Self {
        let page = self.page();
        page.stack.push(page.gstate.clone());
        page.op(&[], "q");
        self
    }

    /// Emits `Q`. An unmatched restore is refused so the stream stays
    /// balanced.
    pub fn restore(&mut self) -> Result<&mut Self> {
        let page = self.page();
        let saved = page
            .stack
            .pop()
            .ok_or_else(|| PdfError::malformed("restore without matching save"))?;
        page.gstate = saved;
        page.op(&[], "Q");
        Ok(self)
    }

    pub fn transform(&mut self, m: Matrix) -> &mut Self {
        self.page().op(&m.to_array(), "cm");
        self
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.page().op(&[x, y], "m");
        self
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.page().op(&[x, y], "l");
        self
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        self.page().op(&[x1, y1, x2, y2, x3, y3], "c");
        self
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.page().op(&[x, y, width, height], "re");
        self
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.page().op(&[], "h");
        self
    }

    pub fn fill(&mut self) -> &mut Self {
        self.page().op(&[], "f");
        self
    }

    pub fn fill_even_odd(&mut self) -> &mut Self {
        self.page().op(&[], "f*");
        self
    }

    pub fn stroke(&mut self) -> &mut Self {
        self.page().op(&[], "S");
        self
    }

    pub fn fill_stroke(&mut self) -> &mut Self {
        self.page().op(&[], "B");
        self
    }

    /// Intersects the clip with the current path and ends the path.
    pub fn clip(&mut self) -> &mut Self {
        self.page().op(&[], "W n");
        self
    }

    pub fn clip_even_odd(&mut self) -> &mut Self {
        self.page().op(&[], "W* n");
        self
    }

    /// Constant opacity for fills and strokes, through named ExtGState
    /// resources. Requires PDF 1.4.
    pub fn set_opacity(&mut self, fill: f64, stroke: f64) -> &mut Self {
        self.doc.require_version(PdfVersion::V1_4);
        let page = self.page();
        for (alpha, key, stroking) in [(fill, "ca", false), (stroke, "CA", true)] {
            let pct = (alpha.clamp(0.0, 1.0) * 100.0).round();
            let current = if stroking {
                &mut page.gstate.stroke_alpha
            } else {
                &mut page.gstate.fill_alpha
            };
            if *current == Some(pct) {
                continue;
            }
            *current = Some(pct);
            let name = format!("{key}{pct}");
            page.ext_gstates.entry(name.clone()).or_insert_with(|| {
                Dictionary::new()
                    .with("Type", Value::name("ExtGState"))
                    .with(key, pct / 100.0)
            });
            page.name_op(&name, "gs");
        }
        self
    }

    /// Selects the font used by [`draw_text`](Self::draw_text).
    pub fn set_font(&mut self, font: StandardFont, size: f64) -> &mut Self {
        self.page().font = Some((font, size));
        self
    }

    /// Shows `text` starting at `(x, y)` in one text object. Characters
    /// outside the font's current 256-code block switch font entries, each
    /// switch preceded by a `Tf`.
    pub fn draw_text(&mut self, x: f64, y: f64, text: &str) -> Result<&mut Self> {
        let (font, size) = self
            .page()
            .font
            .ok_or_else(|| PdfError::malformed("draw_text before set_font"))?;
        if text.is_empty() {
            return Ok(self);
        }
        let DocumentWriter { pages, fonts, .. } = &mut *self.doc;
        let page = &mut pages[self.index];
        page.op(&[], "BT");
        page.op(&[x, y], "Td");
        let mut current: Option<usize> = None;
        let mut run: Vec<u8> = Vec::new();
        for c in text.chars() {
            let (entry, code) = fonts.encode(font, c);
            if current != Some(entry) {
                flush_run(&mut page.content, &mut run);
                write_name(&mut page.content, &FontRegistry::resource_name(entry));
                page.content.push(b' ');
                page.op(&[size], "Tf");
                current = Some(entry);
            }
            run.push(code);
        }
        flush_run(&mut page.content, &mut run);
        page.op(&[], "ET");
        Ok(self)
    }

    /// Paints `image` into the rectangle at `(x, y)` of size `width` by
    /// `height`.
    pub fn draw_image(&mut self, image: ImageId, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        let page = self.page();
        page.op(&[], "q");
        page.op(&[width, 0.0, 0.0, height, x, y], "cm");
        page.name_op(&image.resource_name(), "Do");
        page.op(&[], "Q");
        self
    }

    /// Adds a color space resource to this page, reusing the name of an
    /// equal one.
    pub fn add_color_space(&mut self, space: Value) -> String {
        let page = self.page();
        if let Some((name, _)) = page.color_spaces.iter().find(|(_, v)| **v == space) {
            return name.clone();
        }
        let name = format!("CS{}", page.color_spaces.len() + 1);
        page.color_spaces.insert(name.clone(), space);
        name
    }

    /// Fills with `components` in the named color space resource.
    pub fn set_fill_color_in(&mut self, space: &str, components: &[f64]) -> &mut Self {
        let page = self.page();
        page.name_op(space, "cs");
        page.op(components, "scn");
        page.gstate.fill = None;
        self
    }

    /// Makes a tiling pattern available on this page and returns its
    /// resource name. Requires PDF 1.3.
    pub fn use_pattern(&mut self, pattern: PatternId) -> String {
        self.doc.require_version(PdfVersion::V1_3);
        let page = self.page();
        if let Some((name, _)) = page.patterns.iter().find(|(_, p)| **p == pattern) {
            return name.clone();
        }
        let name = format!("P{}", page.patterns.len() + 1);
        page.patterns.insert(name.clone(), pattern);
        name
    }

    /// Selects `pattern` as the fill.
    pub fn set_fill_pattern(&mut self, pattern: PatternId) -> &mut Self {
        let name = self.use_pattern(pattern);
        let page = self.page();
        page.name_op("Pattern", "cs");
        page.name_op(&name, "scn");
        page.gstate.fill = None;
        self
    }

    pub fn add_annotation(&mut self, annotation: Annotation) -> &mut Self {
        self.page().annotations.push(annotation);
        self
    }
}

fn flush_run(out: &mut Vec<u8>, run: &mut Vec<u8>) {
    if run.is_empty() {
        return;
    }
    write_string(out, run);
    out.extend_from_slice(b" Tj\n");
    run.clear();
}
