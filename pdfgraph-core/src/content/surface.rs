//! The painting surface driven by the interpreter.
//!
//! A surface is any 2D backend able to keep a save/restore stack, an affine
//! transform, a clip, and paint paths, images and text runs. Coordinates
//! passed to it are in the current user space; the surface accumulates the
//! transforms it receives through [`Surface::transform`].

use std::sync::Arc;

use super::display_list::DisplayList;
use super::font::LoadedFont;
use super::path::{FillRule, Path};
use super::state::{BlendMode, StrokeStyle};
use crate::colorspace::{Color, ColorSpace};
use crate::geometry::{Matrix, Rectangle};
use crate::objects::ObjectId;
use crate::parser::filters::Filter;

/// A tiling pattern executed once and kept as a recorded tile.
#[derive(Debug, Clone)]
pub struct PatternTile {
    pub id: Option<ObjectId>,
    /// 1 for colored tiles, 2 for uncolored ones.
    pub paint_type: u8,
    pub bbox: Rectangle,
    pub x_step: f64,
    pub y_step: f64,
    /// Pattern space to default user space of the page.
    pub matrix: Matrix,
    pub content: DisplayList,
}

#[derive(Debug, Clone)]
pub enum Paint {
    Solid(Color),
    /// `tint` carries the `scn` components of an uncolored tile.
    Tile {
        tile: Arc<PatternTile>,
        tint: Option<Color>,
    },
}

impl Paint {
    pub fn as_color(&self) -> Option<&Color> {
        match self {
            Paint::Solid(color) => Some(color),
            Paint::Tile { tint, .. } => tint.as_ref(),
        }
    }
}

/// Which paint an opacity change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintTarget {
    Fill,
    Stroke,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Inline,
    XObject(Option<ObjectId>),
}

/// Image samples after the byte-level filters have been undone. Anything
/// left in `pending_filters` (JPEG, CCITT, ...) is for the image decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub source: ImageSource,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    /// `None` for stencil masks.
    pub color_space: Option<Arc<ColorSpace>>,
    pub image_mask: bool,
    pub decode: Option<Vec<f32>>,
    pub interpolate: bool,
    pub pending_filters: Vec<Filter>,
    pub data: Vec<u8>,
}

/// One text-show operation.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub font: Option<Arc<LoadedFont>>,
    pub font_size: f64,
    pub bytes: Vec<u8>,
    /// Text space to current user space, rise and horizontal scale applied.
    pub matrix: Matrix,
    pub render_mode: u8,
    /// Horizontal advance of the whole run in text space units.
    pub advance: f64,
}

pub trait Surface {
    fn save(&mut self);
    fn restore(&mut self);
    /// Concatenates `matrix` onto the current transform.
    fn transform(&mut self, matrix: &Matrix);
    fn set_fill_paint(&mut self, paint: &Paint);
    fn set_stroke_paint(&mut self, paint: &Paint);
    fn set_stroke(&mut self, style: &StrokeStyle);
    fn set_opacity(&mut self, target: PaintTarget, alpha: f32);
    fn set_blend_mode(&mut self, _mode: BlendMode) {}
    fn fill_path(&mut self, path: &Path, rule: FillRule);
    fn stroke_path(&mut self, path: &Path);
    /// Intersects the current clip with `path`.
    fn clip_path(&mut self, path: &Path, rule: FillRule);
    /// Draws `image` into the unit square of the current user space, first
    /// sample row at the top.
    fn draw_image(&mut self, image: &ImageData);
    fn show_text(&mut self, run: &TextRun);
    fn begin_marked_content(&mut self, _tag: &str) {}
    fn end_marked_content(&mut self) {}
}
