//! Content stream interpreter.
//!
//! Executes page description operators against a [`Surface`]. The
//! interpreter owns the graphics state stack, the current path and the
//! pending clip; resources are looked up through a [`ResourceStack`] that
//! form XObjects and tiling patterns push onto while they run.
//!
//! Failures are isolated per operator: a bad operator is recorded in the
//! [`RunReport`] and execution continues with the next one. Only an
//! unbalanced `EX` (or an unknown operator with
//! `tolerate_unknown_operators` off) stops the stream.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::font::LoadedFont;
use super::path::{FillRule, Path};
use super::state::GState;
use super::surface::{ImageData, PatternTile, Surface};
use super::tokenizer::{ContentToken, ContentTokenizer};
use crate::colorspace::ColorSpaceResolver;
use crate::error::{PdfError, Result};
use crate::geometry::Matrix;
use crate::objects::{ObjectId, Value};
use crate::parser::{ParseError, PdfPage};
use crate::resources::{ResourceKey, ResourceStack};
use crate::xref::ObjectResolver;

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Deepest nesting of form XObjects and tiling patterns executed.
    pub max_nesting_depth: usize,
    /// Report unknown operators outside `BX`/`EX` instead of stopping.
    pub tolerate_unknown_operators: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 32,
            tolerate_unknown_operators: true,
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_tolerate_unknown_operators(mut self, tolerate: bool) -> Self {
        self.tolerate_unknown_operators = tolerate;
        self
    }
}

/// A failure isolated to one operator.
#[derive(Debug)]
pub struct Diagnostic {
    pub operator: String,
    pub error: PdfError,
}

/// Outcome of running one content stream.
#[derive(Debug, Default)]
pub struct RunReport {
    pub operators: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub unknown_operators: Vec<String>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn unsupported(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.error, PdfError::UnsupportedFeature(_)))
    }
}

/// Per-stream registers. A nested form or pattern gets a fresh set and the
/// outer one is put back afterwards.
#[derive(Debug, Clone)]
pub(crate) struct StreamState {
    pub(crate) gstate: GState,
    pub(crate) gstack: Vec<GState>,
    pub(crate) path: Path,
    pub(crate) pending_clip: Option<FillRule>,
    pub(crate) text_matrix: Matrix,
    pub(crate) line_matrix: Matrix,
    pub(crate) compat_depth: usize,
}

impl StreamState {
    pub(crate) fn new(gstate: GState) -> Self {
        Self {
            gstate,
            gstack: Vec::new(),
            path: Path::new(),
            pending_clip: None,
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            compat_depth: 0,
        }
    }
}

pub struct Interpreter<'o> {
    pub(crate) objects: &'o dyn ObjectResolver,
    pub(crate) config: InterpreterConfig,
    pub(crate) resources: ResourceStack,
    pub(crate) colors: ColorSpaceResolver,
    pub(crate) fonts: HashMap<ResourceKey, Arc<LoadedFont>>,
    pub(crate) patterns: HashMap<ResourceKey, Arc<PatternTile>>,
    pub(crate) images: HashMap<ObjectId, Arc<ImageData>>,
    pub(crate) state: StreamState,
    pub(crate) depth: usize,
    report: RunReport,
}

impl<'o> Interpreter<'o> {
    pub fn new(objects: &'o dyn ObjectResolver) -> Self {
        Self::with_config(objects, InterpreterConfig::default())
    }

    pub fn with_config(objects: &'o dyn ObjectResolver, config: InterpreterConfig) -> Self {
        Self {
            objects,
            config,
            resources: ResourceStack::new(),
            colors: ColorSpaceResolver::new(),
            fonts: HashMap::new(),
            patterns: HashMap::new(),
            images: HashMap::new(),
            state: StreamState::new(GState::default()),
            depth: 0,
            report: RunReport::default(),
        }
    }

    /// Graphics state at the current point of execution (or at the end of
    /// the last run).
    pub fn graphics_state(&self) -> &GState {
        &self.state.gstate
    }

    pub fn color_resolver(&self) -> &ColorSpaceResolver {
        &self.colors
    }

    /// Runs the content of `page` with its inherited resources.
    pub fn run_page(
        &mut self,
        page: &PdfPage,
        content: &[u8],
        surface: &mut dyn Surface,
    ) -> Result<RunReport> {
        self.run(content, &Value::Dict(page.resources.clone()), surface)
    }

    /// Runs one content stream with `resources` as the outermost frame.
    pub fn run(
        &mut self,
        content: &[u8],
        resources: &Value,
        surface: &mut dyn Surface,
    ) -> Result<RunReport> {
        self.state = StreamState::new(GState::default());
        self.resources.push(resources, self.objects);
        let result = self.execute(content, surface);
        self.resources.pop();
        let report = std::mem::take(&mut self.report);
        result.map(|()| report)
    }

    /// Executes a content stream in the current state, restoring any `q`
    /// left open at the end.
    pub(crate) fn execute(&mut self, content: &[u8], surface: &mut dyn Surface) -> Result<()> {
        let mut operands: Vec<Value> = Vec::new();
        let result = self.execute_tokens(content, &mut operands, surface);
        if self.state.compat_depth > 0 {
            debug!("{} BX section(s) left open", self.state.compat_depth);
        }
        while self.state.gstack.pop().is_some() {
            surface.restore();
        }
        result
    }

    fn execute_tokens(
        &mut self,
        content: &[u8],
        operands: &mut Vec<Value>,
        surface: &mut dyn Surface,
    ) -> Result<()> {
        for token in ContentTokenizer::new(content) {
            match token {
                Ok(ContentToken::Operand(value)) => operands.push(value),
                Ok(ContentToken::Operator(op)) => {
                    self.report.operators += 1;
                    trace!("{op} {:?}", operands);
                    if op == "EX" && self.state.compat_depth == 0 {
                        return Err(PdfError::malformed("EX without matching BX"));
                    }
                    match self.dispatch(&op, operands, surface) {
                        Ok(true) => {}
                        Ok(false) => self.unknown_operator(&op)?,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => self.diagnose(&op, e),
                    }
                    operands.clear();
                }
                Ok(ContentToken::InlineImage(image)) => {
                    self.report.operators += 1;
                    if let Err(e) = self.do_inline_image(image, surface) {
                        self.diagnose("BI", e);
                    }
                    operands.clear();
                }
                Err(ParseError::UnexpectedEof) => {
                    self.diagnose("", PdfError::malformed("content stream ends mid-token"));
                    break;
                }
                Err(e) => self.diagnose("", e.into()),
            }
        }
        Ok(())
    }

    fn unknown_operator(&mut self, op: &str) -> Result<()> {
        if self.state.compat_depth > 0 {
            trace!("ignoring {op} inside BX/EX");
            return Ok(());
        }
        self.report.unknown_operators.push(op.to_string());
        let error = PdfError::unsupported(format!("unknown operator '{op}'"));
        if !self.config.tolerate_unknown_operators {
            return Err(error);
        }
        self.diagnose(op, error);
        Ok(())
    }

    /// Records a non-fatal failure and carries on.
    pub(crate) fn diagnose(&mut self, op: &str, error: PdfError) {
        warn!("'{op}': {error}");
        self.report.diagnostics.push(Diagnostic {
            operator: op.to_string(),
            error,
        });
    }

    /// Returns `Ok(false)` for operators this interpreter does not know.
    fn dispatch(&mut self, op: &str, operands: &[Value], surface: &mut dyn Surface) -> Result<bool> {
        match op {
            // Path construction
            "m" => self.do_m(operands)?,
            "l" => self.do_l(operands)?,
            "c" => self.do_c(operands)?,
            "v" => self.do_v(operands)?,
            "y" => self.do_y(operands)?,
            "h" => self.do_h(),
            "re" => self.do_re(operands)?,

            // Path painting
            "S" => self.do_S(surface),
            "s" => self.do_s(surface),
            "f" | "F" => self.do_f(surface),
            "f*" | "F*" => self.do_f_star(surface),
            "B" => self.do_B(surface),
            "B*" => self.do_B_star(surface),
            "b" => self.do_b(surface),
            "b*" => self.do_b_star(surface),
            "n" => self.do_n(surface),
            "W" => self.do_W(),
            "W*" => self.do_W_star(),

            // Graphics state
            "q" => self.do_q(surface),
            "Q" => self.do_Q(surface)?,
            "cm" => self.do_cm(operands, surface)?,
            "w" => self.do_w(operands)?,
            "J" => self.do_J(operands)?,
            "j" => self.do_j(operands)?,
            "M" => self.do_M(operands)?,
            "d" => self.do_d(operands)?,
            "ri" => self.do_ri(operands)?,
            "i" => self.do_i(operands)?,
            "gs" => self.do_gs(operands, surface)?,

            // Color
            "g" => self.do_g(operands)?,
            "G" => self.do_G(operands)?,
            "rg" => self.do_rg(operands)?,
            "RG" => self.do_RG(operands)?,
            "k" => self.do_k(operands)?,
            "K" => self.do_K(operands)?,
            "cs" => self.do_cs(operands)?,
            "CS" => self.do_CS(operands)?,
            "sc" | "scn" => self.do_scn(operands)?,
            "SC" | "SCN" => self.do_SCN(operands)?,
            "sh" => self.do_sh(operands)?,

            // Text
            "BT" => self.do_BT(),
            "ET" => {}
            "Tc" => self.do_Tc(operands)?,
            "Tw" => self.do_Tw(operands)?,
            "Tz" => self.do_Tz(operands)?,
            "TL" => self.do_TL(operands)?,
            "Tf" => self.do_Tf(operands)?,
            "Tr" => self.do_Tr(operands)?,
            "Ts" => self.do_Ts(operands)?,
            "Td" => self.do_Td(operands)?,
            "TD" => self.do_TD(operands)?,
            "Tm" => self.do_Tm(operands)?,
            "T*" => self.do_T_star(),
            "Tj" => self.do_Tj(operands, surface)?,
            "TJ" => self.do_TJ(operands, surface)?,
            "'" => self.do_quote(operands, surface)?,
            "\"" => self.do_double_quote(operands, surface)?,
            "d0" | "d1" => {}

            // XObjects and marked content
            "Do" => self.do_Do(operands, surface)?,
            "BMC" | "BDC" => self.do_BMC(operands, surface),
            "EMC" => surface.end_marked_content(),
            "MP" | "DP" => {}

            // Compatibility
            "BX" => self.state.compat_depth += 1,
            "EX" => self.state.compat_depth = self.state.compat_depth.saturating_sub(1),

            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Runs `content` as a nested stream (form or tiling pattern) with its
    /// own registers, starting from `gstate`. The caller's registers are
    /// restored whatever the outcome.
    pub(crate) fn execute_nested(
        &mut self,
        content: &[u8],
        resources: Option<&Value>,
        gstate: GState,
        surface: &mut dyn Surface,
    ) -> Result<()> {
        if self.depth >= self.config.max_nesting_depth {
            return Err(PdfError::unsupported(format!(
                "content nested deeper than {} levels",
                self.config.max_nesting_depth
            )));
        }
        let saved = std::mem::replace(&mut self.state, StreamState::new(gstate));
        if let Some(res) = resources {
            self.resources.push(res, self.objects);
        }
        self.depth += 1;
        let result = self.execute(content, surface);
        self.depth -= 1;
        if resources.is_some() {
            self.resources.pop();
        }
        self.state = saved;
        result
    }
}

/// The last `N` operands as numbers.
pub(crate) fn numbers<const N: usize>(op: &str, operands: &[Value]) -> Result<[f64; N]> {
    if operands.len() < N {
        return Err(PdfError::malformed(format!(
            "'{op}' needs {N} operands, got {}",
            operands.len()
        )));
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(&operands[operands.len() - N..]) {
        *slot = value
            .as_number()
            .ok_or_else(|| PdfError::malformed(format!("'{op}' operand is a {}", value.kind())))?;
    }
    Ok(out)
}

pub(crate) fn last_name<'v>(op: &str, operands: &'v [Value]) -> Result<&'v str> {
    operands
        .last()
        .and_then(Value::as_name)
        .ok_or_else(|| PdfError::malformed(format!("'{op}' needs a name operand")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::display_list::{DisplayItem, DisplayList};
    use crate::objects::Dictionary;
    use crate::xref::MemoryResolver;

    fn run(content: &[u8]) -> (DisplayList, RunReport) {
        let objects = MemoryResolver::new();
        let mut surface = DisplayList::new();
        let report = Interpreter::new(&objects)
            .run(content, &Value::Dict(Dictionary::new()), &mut surface)
            .unwrap();
        (surface, report)
    }

    #[test]
    fn test_bad_operator_does_not_stop_page() {
        let (surface, report) = run(b"0 0 m (x) l 0 0 10 10 re f");
        assert_eq!(surface.fills().count(), 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].operator, "l");
    }

    #[test]
    fn test_unknown_operator_reported_outside_bx() {
        let (_, report) = run(b"foo BX bar EX");
        assert_eq!(report.unknown_operators, vec!["foo".to_string()]);
    }

    #[test]
    fn test_unbalanced_ex_is_fatal() {
        let objects = MemoryResolver::new();
        let mut surface = DisplayList::new();
        let result = Interpreter::new(&objects).run(b"BX EX EX", &Value::Null, &mut surface);
        assert!(matches!(result, Err(PdfError::MalformedDocument(_))));
    }

    #[test]
    fn test_trailing_bx_tolerated() {
        let (_, report) = run(b"BX 0 0 m");
        assert!(report.is_clean());
    }

    #[test]
    fn test_strict_unknown_operators() {
        let objects = MemoryResolver::new();
        let mut surface = DisplayList::new();
        let config = InterpreterConfig::default().with_tolerate_unknown_operators(false);
        let result = Interpreter::with_config(&objects, config).run(b"zz", &Value::Null, &mut surface);
        assert!(matches!(result, Err(PdfError::UnsupportedFeature(_))));
    }

    #[test]
    fn test_open_q_restored_at_end() {
        let (surface, _) = run(b"q q 1 0 0 1 5 5 cm");
        let saves = surface.items().iter().filter(|i| matches!(i, DisplayItem::Save)).count();
        let restores = surface
            .items()
            .iter()
            .filter(|i| matches!(i, DisplayItem::Restore))
            .count();
        assert_eq!(saves, 2);
        assert_eq!(restores, 2);
    }

    #[test]
    fn test_numbers_take_last_operands() {
        let ops = vec![Value::name("x"), 1.into(), 2.into()];
        assert_eq!(numbers::<2>("m", &ops).unwrap(), [1.0, 2.0]);
        assert!(numbers::<3>("c", &ops).is_err());
    }
}
