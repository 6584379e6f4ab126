//! Color operators: g, G, rg, RG, k, K, cs, CS, sc, scn, SC, SCN, sh.

use std::sync::Arc;

use tracing::debug;

use crate::colorspace::{Color, ColorSpace};
use crate::content::display_list::DisplayList;
use crate::content::interpreter::{last_name, numbers, Interpreter};
use crate::content::state::GState;
use crate::content::surface::{Paint, PaintTarget, PatternTile};
use crate::error::{PdfError, ResourceCategory, Result};
use crate::geometry::{Matrix, Rectangle};
use crate::objects::Value;
use crate::resources::ResourceLookup;

#[allow(non_snake_case)]
impl Interpreter<'_> {
    pub(crate) fn do_g(&mut self, operands: &[Value]) -> Result<()> {
        let [gray] = numbers("g", operands)?;
        self.set_device_color(PaintTarget::Fill, ColorSpace::device_gray(), &[gray]);
        Ok(())
    }

    pub(crate) fn do_G(&mut self, operands: &[Value]) -> Result<()> {
        let [gray] = numbers("G", operands)?;
        self.set_device_color(PaintTarget::Stroke, ColorSpace::device_gray(), &[gray]);
        Ok(())
    }

    pub(crate) fn do_rg(&mut self, operands: &[Value]) -> Result<()> {
        let rgb: [f64; 3] = numbers("rg", operands)?;
        self.set_device_color(PaintTarget::Fill, ColorSpace::device_rgb(), &rgb);
        Ok(())
    }

    pub(crate) fn do_RG(&mut self, operands: &[Value]) -> Result<()> {
        let rgb: [f64; 3] = numbers("RG", operands)?;
        self.set_device_color(PaintTarget::Stroke, ColorSpace::device_rgb(), &rgb);
        Ok(())
    }

    pub(crate) fn do_k(&mut self, operands: &[Value]) -> Result<()> {
        let cmyk: [f64; 4] = numbers("k", operands)?;
        self.set_device_color(PaintTarget::Fill, ColorSpace::device_cmyk(), &cmyk);
        Ok(())
    }

    pub(crate) fn do_K(&mut self, operands: &[Value]) -> Result<()> {
        let cmyk: [f64; 4] = numbers("K", operands)?;
        self.set_device_color(PaintTarget::Stroke, ColorSpace::device_cmyk(), &cmyk);
        Ok(())
    }

    pub(crate) fn do_cs(&mut self, operands: &[Value]) -> Result<()> {
        self.select_space(PaintTarget::Fill, "cs", operands)
    }

    pub(crate) fn do_CS(&mut self, operands: &[Value]) -> Result<()> {
        self.select_space(PaintTarget::Stroke, "CS", operands)
    }

    pub(crate) fn do_scn(&mut self, operands: &[Value]) -> Result<()> {
        self.set_color(PaintTarget::Fill, "scn", operands)
    }

    pub(crate) fn do_SCN(&mut self, operands: &[Value]) -> Result<()> {
        self.set_color(PaintTarget::Stroke, "SCN", operands)
    }

    pub(crate) fn do_sh(&mut self, operands: &[Value]) -> Result<()> {
        let name = last_name("sh", operands)?;
        Err(PdfError::unsupported(format!("shading /{name}")))
    }

    /// `g`/`rg`/`k` and friends select the device space and the color in
    /// one step. `Default*` spaces do not apply here.
    fn set_device_color(&mut self, target: PaintTarget, space: Arc<ColorSpace>, values: &[f64]) {
        let components = values.iter().map(|v| v.clamp(0.0, 1.0) as f32).collect();
        let paint = Paint::Solid(Color::new(Arc::clone(&space), components));
        self.store_paint(target, Some(space), paint);
    }

    fn select_space(&mut self, target: PaintTarget, op: &str, operands: &[Value]) -> Result<()> {
        let spec = operands
            .last()
            .ok_or_else(|| PdfError::malformed(format!("'{op}' needs a color space")))?;
        let space = match self.colors.resolve(spec, &self.resources, self.objects) {
            Ok(space) => space,
            Err(e) => {
                // The page keeps painting, in a space that at least shows something.
                self.diagnose(op, e);
                ColorSpace::device_rgb()
            }
        };
        let paint = Paint::Solid(Color::initial(Arc::clone(&space)));
        self.store_paint(target, Some(space), paint);
        Ok(())
    }

    fn set_color(&mut self, target: PaintTarget, op: &str, operands: &[Value]) -> Result<()> {
        let space = match target {
            PaintTarget::Fill => Arc::clone(&self.state.gstate.fill_space),
            PaintTarget::Stroke => Arc::clone(&self.state.gstate.stroke_space),
        };
        let paint = match &*space {
            ColorSpace::Pattern { underlying } => {
                let name = last_name(op, operands)?;
                let tile = self.load_pattern(name)?;
                let tint = match (underlying, tile.paint_type) {
                    (Some(base), 2) => {
                        let rest = &operands[..operands.len() - 1];
                        let n = base.component_count();
                        Some(Color::new(Arc::clone(base), components(op, rest, n)?))
                    }
                    (None, 2) => {
                        return Err(PdfError::malformed(format!(
                            "uncolored pattern /{name} used without an underlying color space"
                        )));
                    }
                    _ => None,
                };
                Paint::Tile { tile, tint }
            }
            other => {
                let values = components(op, operands, other.component_count())?;
                Paint::Solid(Color::new(Arc::clone(&space), values))
            }
        };
        self.store_paint(target, None, paint);
        Ok(())
    }

    fn store_paint(&mut self, target: PaintTarget, space: Option<Arc<ColorSpace>>, paint: Paint) {
        let gs = &mut self.state.gstate;
        match target {
            PaintTarget::Fill => {
                if let Some(space) = space {
                    gs.fill_space = space;
                }
                gs.fill = paint;
            }
            PaintTarget::Stroke => {
                if let Some(space) = space {
                    gs.stroke_space = space;
                }
                gs.stroke = paint;
            }
        }
    }

    /// Looks up a tiling pattern and records its cell once. Later uses of
    /// the same pattern object share the recorded tile.
    fn load_pattern(&mut self, name: &str) -> Result<Arc<PatternTile>> {
        let found = self
            .resources
            .find_resource(ResourceCategory::Pattern, name)
            .ok_or_else(|| PdfError::missing(ResourceCategory::Pattern, name))?;
        let key = found.key(name);
        if let Some(tile) = self.patterns.get(&key) {
            return Ok(Arc::clone(tile));
        }

        let objects = self.objects;
        let stream = match objects.resolve(&found.value)? {
            Value::Stream(stream) => stream,
            Value::Dict(dict) if dict.get_i64("PatternType") == Some(2) => {
                return Err(PdfError::unsupported(format!("shading pattern /{name}")));
            }
            other => {
                return Err(PdfError::malformed(format!(
                    "pattern /{name} is a {}",
                    other.kind()
                )))
            }
        };
        let dict = stream.dict();
        match dict.get_i64("PatternType") {
            Some(1) => {}
            Some(2) => return Err(PdfError::unsupported(format!("shading pattern /{name}"))),
            other => {
                return Err(PdfError::malformed(format!(
                    "pattern /{name} has PatternType {other:?}"
                )))
            }
        }
        let number = |key: &str| dict.get(key).map(|v| objects.resolve_or_null(v)).and_then(Value::as_number);
        let bbox = dict
            .get("BBox")
            .map(|v| objects.resolve_or_null(v))
            .and_then(Rectangle::from_value)
            .ok_or_else(|| PdfError::malformed(format!("pattern /{name} has no /BBox")))?;
        let paint_type = match number("PaintType") {
            Some(p) if p == 2.0 => 2,
            _ => 1,
        };
        let content = stream.decoded_data()?;

        let mut recording = DisplayList::new();
        self.execute_nested(&content, dict.get("Resources"), GState::default(), &mut recording)?;
        debug!("recorded pattern /{name}: {} items", recording.len());

        let tile = Arc::new(PatternTile {
            id: found.value.as_reference(),
            paint_type,
            bbox,
            x_step: number("XStep").unwrap_or_else(|| bbox.width()),
            y_step: number("YStep").unwrap_or_else(|| bbox.height()),
            matrix: dict
                .get("Matrix")
                .and_then(Matrix::from_value)
                .unwrap_or_default(),
            content: recording,
        });
        self.patterns.insert(key, Arc::clone(&tile));
        Ok(tile)
    }
}

/// The last `n` operands as color components.
fn components(op: &str, operands: &[Value], n: usize) -> Result<Vec<f32>> {
    if operands.len() < n {
        return Err(PdfError::malformed(format!(
            "'{op}' needs {n} components, got {}",
            operands.len()
        )));
    }
    operands[operands.len() - n..]
        .iter()
        .map(|v| {
            v.as_f32()
                .ok_or_else(|| PdfError::malformed(format!("'{op}' component is a {}", v.kind())))
        })
        .collect()
}
