//! Path construction and painting operators.
//!
//! Clipping is deferred: `W`/`W*` only remember the winding rule. The next
//! painting operator (including `n`) paints with the old clip, and only
//! then is the clip intersected with the path just built.

use crate::content::interpreter::{numbers, Interpreter};
use crate::content::path::FillRule;
use crate::content::surface::{PaintTarget, Surface};
use crate::error::Result;
use crate::geometry::Point;
use crate::objects::Value;

#[allow(non_snake_case)]
impl Interpreter<'_> {
    pub(crate) fn do_m(&mut self, operands: &[Value]) -> Result<()> {
        let [x, y] = numbers("m", operands)?;
        self.state.path.move_to(Point::new(x, y));
        Ok(())
    }

    pub(crate) fn do_l(&mut self, operands: &[Value]) -> Result<()> {
        let [x, y] = numbers("l", operands)?;
        self.state.path.line_to(Point::new(x, y))
    }

    pub(crate) fn do_c(&mut self, operands: &[Value]) -> Result<()> {
        let [x1, y1, x2, y2, x3, y3] = numbers("c", operands)?;
        self.state
            .path
            .curve_to(Point::new(x1, y1), Point::new(x2, y2), Point::new(x3, y3))
    }

    pub(crate) fn do_v(&mut self, operands: &[Value]) -> Result<()> {
        let [x2, y2, x3, y3] = numbers("v", operands)?;
        self.state
            .path
            .curve_to_v(Point::new(x2, y2), Point::new(x3, y3))
    }

    pub(crate) fn do_y(&mut self, operands: &[Value]) -> Result<()> {
        let [x1, y1, x3, y3] = numbers("y", operands)?;
        self.state
            .path
            .curve_to_y(Point::new(x1, y1), Point::new(x3, y3))
    }

    pub(crate) fn do_h(&mut self) {
        self.state.path.close();
    }

    pub(crate) fn do_re(&mut self, operands: &[Value]) -> Result<()> {
        let [x, y, w, h] = numbers("re", operands)?;
        self.state.path.rect(x, y, w, h);
        Ok(())
    }

    pub(crate) fn do_S(&mut self, surface: &mut dyn Surface) {
        self.paint_path(surface, None, true);
    }

    pub(crate) fn do_s(&mut self, surface: &mut dyn Surface) {
        self.state.path.close();
        self.paint_path(surface, None, true);
    }

    pub(crate) fn do_f(&mut self, surface: &mut dyn Surface) {
        self.paint_path(surface, Some(FillRule::NonZero), false);
    }

    pub(crate) fn do_f_star(&mut self, surface: &mut dyn Surface) {
        self.paint_path(surface, Some(FillRule::EvenOdd), false);
    }

    pub(crate) fn do_B(&mut self, surface: &mut dyn Surface) {
        self.paint_path(surface, Some(FillRule::NonZero), true);
    }

    pub(crate) fn do_B_star(&mut self, surface: &mut dyn Surface) {
        self.paint_path(surface, Some(FillRule::EvenOdd), true);
    }

    pub(crate) fn do_b(&mut self, surface: &mut dyn Surface) {
        self.state.path.close();
        self.paint_path(surface, Some(FillRule::NonZero), true);
    }

    pub(crate) fn do_b_star(&mut self, surface: &mut dyn Surface) {
        self.state.path.close();
        self.paint_path(surface, Some(FillRule::EvenOdd), true);
    }

    pub(crate) fn do_n(&mut self, surface: &mut dyn Surface) {
        self.finish_path(surface);
    }

    pub(crate) fn do_W(&mut self) {
        self.state.pending_clip = Some(FillRule::NonZero);
    }

    pub(crate) fn do_W_star(&mut self) {
        self.state.pending_clip = Some(FillRule::EvenOdd);
    }

    fn paint_path(&mut self, surface: &mut dyn Surface, fill: Option<FillRule>, stroke: bool) {
        if !self.state.path.is_empty() {
            let gs = &self.state.gstate;
            if let Some(rule) = fill {
                surface.set_fill_paint(&gs.fill);
                surface.fill_path(&self.state.path, rule);
            }
            if stroke {
                surface.set_stroke_paint(&gs.stroke);
                surface.set_stroke(&gs.stroke_style);
                surface.stroke_path(&self.state.path);
            }
        }
        self.finish_path(surface);
    }

    /// Applies a pending clip with the path just painted, then discards the
    /// path: the current path and point are undefined after painting.
    pub(crate) fn finish_path(&mut self, surface: &mut dyn Surface) {
        if let Some(rule) = self.state.pending_clip.take() {
            surface.clip_path(&self.state.path, rule);
        }
        self.state.path.clear();
    }

    /// Tells the surface about an alpha that just changed.
    pub(crate) fn notify_opacity(&self, surface: &mut dyn Surface, target: PaintTarget) {
        let gs = &self.state.gstate;
        let alpha = match target {
            PaintTarget::Fill => gs.effective_fill_alpha(),
            PaintTarget::Stroke => gs.effective_stroke_alpha(),
        };
        surface.set_opacity(target, alpha);
    }
}
