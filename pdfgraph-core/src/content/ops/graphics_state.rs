//! Graphics state operators: q, Q, cm, w, J, j, M, d, ri, i, gs.

use crate::content::interpreter::{last_name, numbers, Interpreter};
use crate::content::state::{BlendMode, LineCap, LineJoin, RenderingIntent};
use crate::content::surface::{PaintTarget, Surface};
use crate::error::{PdfError, ResourceCategory, Result};
use crate::geometry::Matrix;
use crate::objects::{Dictionary, Value};
use crate::resources::ResourceLookup;

#[allow(non_snake_case)]
impl Interpreter<'_> {
    pub(crate) fn do_q(&mut self, surface: &mut dyn Surface) {
        self.state.gstack.push(self.state.gstate.clone());
        surface.save();
    }

    pub(crate) fn do_Q(&mut self, surface: &mut dyn Surface) -> Result<()> {
        let restored = self
            .state
            .gstack
            .pop()
            .ok_or_else(|| PdfError::malformed("Q without matching q"))?;
        self.state.gstate = restored;
        self.state.path.clear();
        self.state.pending_clip = None;
        surface.restore();
        Ok(())
    }

    pub(crate) fn do_cm(&mut self, operands: &[Value], surface: &mut dyn Surface) -> Result<()> {
        let [a, b, c, d, e, f] = numbers("cm", operands)?;
        let m = Matrix::new(a, b, c, d, e, f);
        self.concat_ctm(&m, surface);
        Ok(())
    }

    pub(crate) fn concat_ctm(&mut self, m: &Matrix, surface: &mut dyn Surface) {
        self.state.gstate.ctm = m.concat(&self.state.gstate.ctm);
        surface.transform(m);
    }

    pub(crate) fn do_w(&mut self, operands: &[Value]) -> Result<()> {
        let [w] = numbers("w", operands)?;
        self.state.gstate.stroke_style.width = w;
        Ok(())
    }

    pub(crate) fn do_J(&mut self, operands: &[Value]) -> Result<()> {
        let [cap] = numbers("J", operands)?;
        self.state.gstate.stroke_style.cap = LineCap::from_i64(cap as i64)
            .ok_or_else(|| PdfError::malformed(format!("line cap {cap}")))?;
        Ok(())
    }

    pub(crate) fn do_j(&mut self, operands: &[Value]) -> Result<()> {
        let [join] = numbers("j", operands)?;
        self.state.gstate.stroke_style.join = LineJoin::from_i64(join as i64)
            .ok_or_else(|| PdfError::malformed(format!("line join {join}")))?;
        Ok(())
    }

    pub(crate) fn do_M(&mut self, operands: &[Value]) -> Result<()> {
        let [limit] = numbers("M", operands)?;
        self.state.gstate.stroke_style.miter_limit = limit;
        Ok(())
    }

    pub(crate) fn do_d(&mut self, operands: &[Value]) -> Result<()> {
        let [phase] = numbers("d", operands)?;
        let array = operands
            .len()
            .checked_sub(2)
            .and_then(|i| operands[i].as_array())
            .ok_or_else(|| PdfError::malformed("'d' needs a dash array"))?;
        self.set_dash(array, phase);
        Ok(())
    }

    fn set_dash(&mut self, array: &[Value], phase: f64) {
        let style = &mut self.state.gstate.stroke_style;
        style.dash = array.iter().filter_map(Value::as_number).collect();
        style.dash_phase = phase;
    }

    pub(crate) fn do_ri(&mut self, operands: &[Value]) -> Result<()> {
        let name = last_name("ri", operands)?;
        self.state.gstate.rendering_intent = RenderingIntent::from_name(name)
            .ok_or_else(|| PdfError::malformed(format!("rendering intent /{name}")))?;
        Ok(())
    }

    pub(crate) fn do_i(&mut self, operands: &[Value]) -> Result<()> {
        let [flatness] = numbers("i", operands)?;
        self.state.gstate.flatness = flatness;
        Ok(())
    }

    pub(crate) fn do_gs(&mut self, operands: &[Value], surface: &mut dyn Surface) -> Result<()> {
        let name = last_name("gs", operands)?;
        let found = self
            .resources
            .find_resource(ResourceCategory::ExtGState, name)
            .ok_or_else(|| PdfError::missing(ResourceCategory::ExtGState, name))?;
        let dict = self
            .objects
            .resolve(&found.value)?
            .as_dict()
            .ok_or_else(|| PdfError::malformed(format!("ExtGState /{name} is not a dictionary")))?
            .clone();
        self.apply_ext_gstate(&dict, surface);
        Ok(())
    }

    /// Applies the entries of an ExtGState dictionary. Unsupported entries
    /// are reported without stopping the rest of the dictionary.
    fn apply_ext_gstate(&mut self, dict: &Dictionary, surface: &mut dyn Surface) {
        for (key, raw) in dict.iter() {
            let value = self.objects.resolve_or_null(raw).clone();
            match key.as_str() {
                "LW" => {
                    if let Some(w) = value.as_number() {
                        self.state.gstate.stroke_style.width = w;
                    }
                }
                "LC" => {
                    if let Some(cap) = value.as_i64().and_then(LineCap::from_i64) {
                        self.state.gstate.stroke_style.cap = cap;
                    }
                }
                "LJ" => {
                    if let Some(join) = value.as_i64().and_then(LineJoin::from_i64) {
                        self.state.gstate.stroke_style.join = join;
                    }
                }
                "ML" => {
                    if let Some(limit) = value.as_number() {
                        self.state.gstate.stroke_style.miter_limit = limit;
                    }
                }
                "D" => {
                    let parts = value.as_array();
                    let array = parts.and_then(|p| p.first()).and_then(Value::as_array);
                    let phase = parts.and_then(|p| p.get(1)).and_then(Value::as_number);
                    match (array, phase) {
                        (Some(array), Some(phase)) => self.set_dash(array, phase),
                        _ => self.diagnose("gs", PdfError::malformed("ExtGState /D is not [array phase]")),
                    }
                }
                "RI" => {
                    if let Some(intent) = value.as_name().and_then(RenderingIntent::from_name) {
                        self.state.gstate.rendering_intent = intent;
                    }
                }
                "BM" => {
                    let name = match &value {
                        Value::Array(modes) => modes.first().and_then(Value::as_name),
                        other => other.as_name(),
                    };
                    let mode = name.and_then(BlendMode::from_name).unwrap_or_default();
                    if mode != BlendMode::Normal {
                        self.diagnose(
                            "gs",
                            PdfError::unsupported(format!("blend mode {mode:?}")),
                        );
                    }
                    if mode != self.state.gstate.blend_mode {
                        self.state.gstate.blend_mode = mode;
                        surface.set_blend_mode(mode);
                    }
                }
                "AIS" => {
                    if let Some(ais) = value.as_bool() {
                        self.state.gstate.alpha_is_shape = ais;
                    }
                }
                "SMask" => {
                    if value.as_name() != Some("None") {
                        self.diagnose("gs", PdfError::unsupported("soft mask"));
                    }
                }
                "CA" => {
                    if let Some(alpha) = value.as_f32() {
                        if alpha != self.state.gstate.stroke_alpha {
                            self.state.gstate.stroke_alpha = alpha;
                            self.notify_opacity(surface, PaintTarget::Stroke);
                        }
                    }
                }
                "ca" => {
                    if let Some(alpha) = value.as_f32() {
                        let gs = &mut self.state.gstate;
                        if gs.alpha_is_shape {
                            // shape alpha scales both effective alphas
                            if alpha != gs.shape_alpha {
                                gs.shape_alpha = alpha;
                                self.notify_opacity(surface, PaintTarget::Fill);
                                self.notify_opacity(surface, PaintTarget::Stroke);
                            }
                        } else if alpha != gs.fill_alpha {
                            gs.fill_alpha = alpha;
                            self.notify_opacity(surface, PaintTarget::Fill);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
