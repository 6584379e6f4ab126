//! A surface that records every call it receives.

use super::path::{FillRule, Path};
use super::state::{BlendMode, StrokeStyle};
use super::surface::{ImageData, Paint, PaintTarget, Surface, TextRun};
use crate::geometry::Matrix;

#[derive(Debug, Clone)]
pub enum DisplayItem {
    Save,
    Restore,
    Transform(Matrix),
    FillPaint(Paint),
    StrokePaint(Paint),
    Stroke(StrokeStyle),
    Opacity(PaintTarget, f32),
    Blend(BlendMode),
    Fill(Path, FillRule),
    StrokePath(Path),
    Clip(Path, FillRule),
    Image(ImageData),
    Text(TextRun),
    BeginMarked(String),
    EndMarked,
}

#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    items: Vec<DisplayItem>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn fills(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::Fill(path, _) => Some(path),
            _ => None,
        })
    }

    pub fn clips(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::Clip(path, _) => Some(path),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::Text(run) => Some(run),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageData> {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::Image(image) => Some(image),
            _ => None,
        })
    }

    /// The fill paint in effect at the last recorded fill.
    pub fn last_fill_paint(&self) -> Option<&Paint> {
        self.items.iter().rev().find_map(|item| match item {
            DisplayItem::FillPaint(paint) => Some(paint),
            _ => None,
        })
    }

    /// Replays the recording onto another surface.
    pub fn replay(&self, surface: &mut dyn Surface) {
        for item in &self.items {
            match item {
                DisplayItem::Save => surface.save(),
                DisplayItem::Restore => surface.restore(),
                DisplayItem::Transform(m) => surface.transform(m),
                DisplayItem::FillPaint(p) => surface.set_fill_paint(p),
                DisplayItem::StrokePaint(p) => surface.set_stroke_paint(p),
                DisplayItem::Stroke(s) => surface.set_stroke(s),
                DisplayItem::Opacity(target, alpha) => surface.set_opacity(*target, *alpha),
                DisplayItem::Blend(mode) => surface.set_blend_mode(*mode),
                DisplayItem::Fill(path, rule) => surface.fill_path(path, *rule),
                DisplayItem::StrokePath(path) => surface.stroke_path(path),
                DisplayItem::Clip(path, rule) => surface.clip_path(path, *rule),
                DisplayItem::Image(image) => surface.draw_image(image),
                DisplayItem::Text(run) => surface.show_text(run),
                DisplayItem::BeginMarked(tag) => surface.begin_marked_content(tag),
                DisplayItem::EndMarked => surface.end_marked_content(),
            }
        }
    }
}

impl Surface for DisplayList {
    fn save(&mut self) {
        self.items.push(DisplayItem::Save);
    }

    fn restore(&mut self) {
        self.items.push(DisplayItem::Restore);
    }

    fn transform(&mut self, matrix: &Matrix) {
        self.items.push(DisplayItem::Transform(*matrix));
    }

    fn set_fill_paint(&mut self, paint: &Paint) {
        self.items.push(DisplayItem::FillPaint(paint.clone()));
    }

    fn set_stroke_paint(&mut self, paint: &Paint) {
        self.items.push(DisplayItem::StrokePaint(paint.clone()));
    }

    fn set_stroke(&mut self, style: &StrokeStyle) {
        self.items.push(DisplayItem::Stroke(style.clone()));
    }

    fn set_opacity(&mut self, target: PaintTarget, alpha: f32) {
        self.items.push(DisplayItem::Opacity(target, alpha));
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.items.push(DisplayItem::Blend(mode));
    }

    fn fill_path(&mut self, path: &Path, rule: FillRule) {
        self.items.push(DisplayItem::Fill(path.clone(), rule));
    }

    fn stroke_path(&mut self, path: &Path) {
        self.items.push(DisplayItem::StrokePath(path.clone()));
    }

    fn clip_path(&mut self, path: &Path, rule: FillRule) {
        self.items.push(DisplayItem::Clip(path.clone(), rule));
    }

    fn draw_image(&mut self, image: &ImageData) {
        self.items.push(DisplayItem::Image(image.clone()));
    }

    fn show_text(&mut self, run: &TextRun) {
        self.items.push(DisplayItem::Text(run.clone()));
    }

    fn begin_marked_content(&mut self, tag: &str) {
        self.items.push(DisplayItem::BeginMarked(tag.to_string()));
    }

    fn end_marked_content(&mut self) {
        self.items.push(DisplayItem::EndMarked);
    }
}
