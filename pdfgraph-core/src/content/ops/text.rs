//! Text object and text state operators.

use std::sync::Arc;

use crate::content::font::LoadedFont;
use crate::content::interpreter::{numbers, Interpreter};
use crate::content::surface::{Surface, TextRun};
use crate::error::{PdfError, ResourceCategory, Result};
use crate::geometry::Matrix;
use crate::objects::Value;
use crate::resources::ResourceLookup;

/// Glyph width used when no font is selected, in thousandths of an em.
const FALLBACK_WIDTH: f64 = 500.0;

#[allow(non_snake_case)]
impl Interpreter<'_> {
    pub(crate) fn do_BT(&mut self) {
        self.state.text_matrix = Matrix::IDENTITY;
        self.state.line_matrix = Matrix::IDENTITY;
    }

    pub(crate) fn do_Tc(&mut self, operands: &[Value]) -> Result<()> {
        let [spacing] = numbers("Tc", operands)?;
        self.state.gstate.text.char_spacing = spacing;
        Ok(())
    }

    pub(crate) fn do_Tw(&mut self, operands: &[Value]) -> Result<()> {
        let [spacing] = numbers("Tw", operands)?;
        self.state.gstate.text.word_spacing = spacing;
        Ok(())
    }

    pub(crate) fn do_Tz(&mut self, operands: &[Value]) -> Result<()> {
        let [percent] = numbers("Tz", operands)?;
        self.state.gstate.text.horizontal_scale = percent / 100.0;
        Ok(())
    }

    pub(crate) fn do_TL(&mut self, operands: &[Value]) -> Result<()> {
        let [leading] = numbers("TL", operands)?;
        self.state.gstate.text.leading = leading;
        Ok(())
    }

    pub(crate) fn do_Tf(&mut self, operands: &[Value]) -> Result<()> {
        let [size] = numbers("Tf", operands)?;
        let name = operands
            .len()
            .checked_sub(2)
            .and_then(|i| operands[i].as_name())
            .ok_or_else(|| PdfError::malformed("'Tf' needs a font name"))?;
        self.state.gstate.text.font_size = size;
        let font = self.load_font(name)?;
        if font.is_type3() {
            self.diagnose("Tf", PdfError::unsupported(format!("Type3 font /{name}")));
        }
        self.state.gstate.text.font = Some(font);
        Ok(())
    }

    pub(crate) fn do_Tr(&mut self, operands: &[Value]) -> Result<()> {
        let [mode] = numbers("Tr", operands)?;
        if !(0.0..=7.0).contains(&mode) {
            return Err(PdfError::malformed(format!("text render mode {mode}")));
        }
        self.state.gstate.text.render_mode = mode as u8;
        Ok(())
    }

    pub(crate) fn do_Ts(&mut self, operands: &[Value]) -> Result<()> {
        let [rise] = numbers("Ts", operands)?;
        self.state.gstate.text.rise = rise;
        Ok(())
    }

    pub(crate) fn do_Td(&mut self, operands: &[Value]) -> Result<()> {
        let [tx, ty] = numbers("Td", operands)?;
        self.next_line(tx, ty);
        Ok(())
    }

    pub(crate) fn do_TD(&mut self, operands: &[Value]) -> Result<()> {
        let [tx, ty] = numbers("TD", operands)?;
        self.state.gstate.text.leading = -ty;
        self.next_line(tx, ty);
        Ok(())
    }

    pub(crate) fn do_Tm(&mut self, operands: &[Value]) -> Result<()> {
        let [a, b, c, d, e, f] = numbers("Tm", operands)?;
        let m = Matrix::new(a, b, c, d, e, f);
        self.state.text_matrix = m;
        self.state.line_matrix = m;
        Ok(())
    }

    pub(crate) fn do_T_star(&mut self) {
        let leading = self.state.gstate.text.leading;
        self.next_line(0.0, -leading);
    }

    pub(crate) fn do_Tj(&mut self, operands: &[Value], surface: &mut dyn Surface) -> Result<()> {
        let bytes = last_string("Tj", operands)?;
        self.show_string(bytes, surface);
        Ok(())
    }

    pub(crate) fn do_TJ(&mut self, operands: &[Value], surface: &mut dyn Surface) -> Result<()> {
        let items = operands
            .last()
            .and_then(Value::as_array)
            .ok_or_else(|| PdfError::malformed("'TJ' needs an array"))?;
        for item in items {
            match item {
                Value::String(bytes) => self.show_string(bytes, surface),
                other => match other.as_number() {
                    Some(adjust) => {
                        let ts = &self.state.gstate.text;
                        let shift = -adjust / 1000.0 * ts.font_size * ts.horizontal_scale;
                        self.advance(shift);
                    }
                    None => {
                        return Err(PdfError::malformed(format!(
                            "'TJ' array holds a {}",
                            other.kind()
                        )))
                    }
                },
            }
        }
        Ok(())
    }

    pub(crate) fn do_quote(&mut self, operands: &[Value], surface: &mut dyn Surface) -> Result<()> {
        let bytes = last_string("'", operands)?;
        self.do_T_star();
        self.show_string(bytes, surface);
        Ok(())
    }

    pub(crate) fn do_double_quote(
        &mut self,
        operands: &[Value],
        surface: &mut dyn Surface,
    ) -> Result<()> {
        let bytes = last_string("\"", operands)?;
        let [word, char] = numbers("\"", &operands[..operands.len() - 1])?;
        self.state.gstate.text.word_spacing = word;
        self.state.gstate.text.char_spacing = char;
        self.do_T_star();
        self.show_string(bytes, surface);
        Ok(())
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        let line = Matrix::translate(tx, ty).concat(&self.state.line_matrix);
        self.state.line_matrix = line;
        self.state.text_matrix = line;
    }

    fn advance(&mut self, tx: f64) {
        self.state.text_matrix = Matrix::translate(tx, 0.0).concat(&self.state.text_matrix);
    }

    fn load_font(&mut self, name: &str) -> Result<Arc<LoadedFont>> {
        let found = self
            .resources
            .find_resource(ResourceCategory::Font, name)
            .ok_or_else(|| PdfError::missing(ResourceCategory::Font, name))?;
        let key = found.key(name);
        if let Some(font) = self.fonts.get(&key) {
            return Ok(Arc::clone(font));
        }
        let dict = self
            .objects
            .resolve(&found.value)?
            .as_dict()
            .ok_or_else(|| PdfError::malformed(format!("font /{name} is not a dictionary")))?;
        let font = Arc::new(LoadedFont::from_dict(name, dict, self.objects));
        self.fonts.insert(key, Arc::clone(&font));
        Ok(font)
    }

    /// Emits one text run and moves the text matrix past it.
    fn show_string(&mut self, bytes: &[u8], surface: &mut dyn Surface) {
        let ts = &self.state.gstate.text;
        let codes: Vec<u32> = match &ts.font {
            Some(font) => font.codes(bytes),
            None => bytes.iter().map(|b| *b as u32).collect(),
        };
        let single_byte = ts.font.as_ref().map_or(true, |f| !f.two_byte);
        let advance: f64 = codes
            .iter()
            .map(|&code| {
                let width = ts
                    .font
                    .as_ref()
                    .map_or(FALLBACK_WIDTH, |f| f.glyph_width(code));
                let mut tx = width / 1000.0 * ts.font_size + ts.char_spacing;
                if single_byte && code == 32 {
                    tx += ts.word_spacing;
                }
                tx * ts.horizontal_scale
            })
            .sum();

        // Modes 3 (invisible) and 7 (clip only) paint nothing.
        let mode = ts.render_mode;
        if mode != 3 && mode != 7 {
            let run = TextRun {
                font: ts.font.clone(),
                font_size: ts.font_size,
                bytes: bytes.to_vec(),
                matrix: Matrix::new(
                    ts.font_size * ts.horizontal_scale,
                    0.0,
                    0.0,
                    ts.font_size,
                    0.0,
                    ts.rise,
                )
                .concat(&self.state.text_matrix),
                render_mode: mode,
                advance,
            };
            let gs = &self.state.gstate;
            if matches!(mode, 0 | 2 | 4 | 6) {
                surface.set_fill_paint(&gs.fill);
            }
            if matches!(mode, 1 | 2 | 5 | 6) {
                surface.set_stroke_paint(&gs.stroke);
                surface.set_stroke(&gs.stroke_style);
            }
            surface.show_text(&run);
        }
        self.advance(advance);
    }
}

fn last_string<'v>(op: &str, operands: &'v [Value]) -> Result<&'v [u8]> {
    match operands.last() {
        Some(Value::String(bytes)) => Ok(bytes),
        _ => Err(PdfError::malformed(format!("'{op}' needs a string"))),
    }
}
