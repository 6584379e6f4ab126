//! Graphics state saved and restored by `q`/`Q`.

use std::sync::Arc;

use super::font::LoadedFont;
use super::surface::Paint;
use crate::colorspace::{Color, ColorSpace};
use crate::geometry::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(LineCap::Butt),
            1 => Some(LineCap::Round),
            2 => Some(LineCap::Square),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(LineJoin::Miter),
            1 => Some(LineJoin::Round),
            2 => Some(LineJoin::Bevel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderingIntent {
    AbsoluteColorimetric,
    #[default]
    RelativeColorimetric,
    Saturation,
    Perceptual,
}

impl RenderingIntent {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AbsoluteColorimetric" => Some(RenderingIntent::AbsoluteColorimetric),
            "RelativeColorimetric" => Some(RenderingIntent::RelativeColorimetric),
            "Saturation" => Some(RenderingIntent::Saturation),
            "Perceptual" => Some(RenderingIntent::Perceptual),
            _ => None,
        }
    }
}

/// Separable and non-separable blend modes. Only `Normal` is composited
/// faithfully; the rest are forwarded to the surface as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Normal" | "Compatible" => BlendMode::Normal,
            "Multiply" => BlendMode::Multiply,
            "Screen" => BlendMode::Screen,
            "Overlay" => BlendMode::Overlay,
            "Darken" => BlendMode::Darken,
            "Lighten" => BlendMode::Lighten,
            "ColorDodge" => BlendMode::ColorDodge,
            "ColorBurn" => BlendMode::ColorBurn,
            "HardLight" => BlendMode::HardLight,
            "SoftLight" => BlendMode::SoftLight,
            "Difference" => BlendMode::Difference,
            "Exclusion" => BlendMode::Exclusion,
            "Hue" => BlendMode::Hue,
            "Saturation" => BlendMode::Saturation,
            "Color" => BlendMode::Color,
            "Luminosity" => BlendMode::Luminosity,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f64,
    /// Empty for a solid line.
    pub dash: Vec<f64>,
    pub dash_phase: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 10.0,
            dash: Vec::new(),
            dash_phase: 0.0,
        }
    }
}

/// Text state parameters (`Tc`, `Tw`, `Tz`, `TL`, `Tf`, `Tr`, `Ts`).
#[derive(Debug, Clone)]
pub struct TextState {
    pub font: Option<Arc<LoadedFont>>,
    pub font_size: f64,
    pub char_spacing: f64,
    pub word_spacing: f64,
    /// `Tz 100` is 1.0.
    pub horizontal_scale: f64,
    pub leading: f64,
    pub rise: f64,
    pub render_mode: u8,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GState {
    pub ctm: Matrix,
    pub fill_space: Arc<ColorSpace>,
    pub stroke_space: Arc<ColorSpace>,
    pub fill: Paint,
    pub stroke: Paint,
    pub rendering_intent: RenderingIntent,
    pub stroke_style: StrokeStyle,
    pub flatness: f64,
    pub fill_alpha: f32,
    pub stroke_alpha: f32,
    /// Shape opacity, multiplied into both alphas.
    pub shape_alpha: f32,
    pub alpha_is_shape: bool,
    pub blend_mode: BlendMode,
    pub text: TextState,
}

impl Default for GState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill_space: ColorSpace::device_gray(),
            stroke_space: ColorSpace::device_gray(),
            fill: Paint::Solid(Color::black()),
            stroke: Paint::Solid(Color::black()),
            rendering_intent: RenderingIntent::default(),
            stroke_style: StrokeStyle::default(),
            flatness: 0.0,
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            shape_alpha: 1.0,
            alpha_is_shape: false,
            blend_mode: BlendMode::Normal,
            text: TextState::default(),
        }
    }
}

impl GState {
    pub fn effective_fill_alpha(&self) -> f32 {
        self.fill_alpha * self.shape_alpha
    }

    pub fn effective_stroke_alpha(&self) -> f32 {
        self.stroke_alpha * self.shape_alpha
    }
}
