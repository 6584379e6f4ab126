//! Tint transforms for Separation and DeviceN spaces.
//!
//! The transform is a PDF function object mapping tint values onto the
//! alternate space. Exponential (type 2) and stitching (type 3) functions
//! are evaluated here; sampled and PostScript functions are reported as
//! unsupported and callers fall back to a linear ramp.

use std::fmt;
use std::sync::Arc;

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Value};
use crate::xref::ObjectResolver;

pub trait TintTransform: fmt::Debug + Send + Sync {
    fn output_count(&self) -> usize;
    fn evaluate(&self, input: &[f32]) -> Vec<f32>;
}

/// Builds tint transforms from PDF function objects.
pub trait FunctionFactory {
    fn create(
        &self,
        spec: &Value,
        objects: &dyn ObjectResolver,
        outputs: usize,
    ) -> Result<Arc<dyn TintTransform>>;
}

/// Evaluates function types 2 and 3.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFunctionFactory;

impl FunctionFactory for DefaultFunctionFactory {
    fn create(
        &self,
        spec: &Value,
        objects: &dyn ObjectResolver,
        outputs: usize,
    ) -> Result<Arc<dyn TintTransform>> {
        Ok(Arc::new(parse_function(spec, objects, 0)?.with_outputs(outputs)))
    }
}

const MAX_STITCH_DEPTH: usize = 8;

#[derive(Debug, Clone)]
enum PdfFunction {
    Exponential {
        c0: Vec<f32>,
        c1: Vec<f32>,
        n: f32,
    },
    Stitching {
        domain: [f32; 2],
        functions: Vec<PdfFunction>,
        bounds: Vec<f32>,
        encode: Vec<f32>,
    },
}

#[derive(Debug)]
struct Evaluated {
    function: PdfFunction,
    outputs: usize,
}

impl PdfFunction {
    fn with_outputs(self, outputs: usize) -> Evaluated {
        Evaluated {
            function: self,
            outputs,
        }
    }

    fn eval(&self, x: f32) -> Vec<f32> {
        match self {
            PdfFunction::Exponential { c0, c1, n } => {
                let x = x.clamp(0.0, 1.0);
                let t = if *n == 1.0 { x } else { x.powf(*n) };
                c0.iter().zip(c1).map(|(a, b)| a + t * (b - a)).collect()
            }
            PdfFunction::Stitching {
                domain,
                functions,
                bounds,
                encode,
            } => {
                let x = x.clamp(domain[0], domain[1]);
                let k = bounds.iter().take_while(|b| x >= **b).count();
                let lo = if k == 0 { domain[0] } else { bounds[k - 1] };
                let hi = bounds.get(k).copied().unwrap_or(domain[1]);
                let e0 = encode.get(2 * k).copied().unwrap_or(0.0);
                let e1 = encode.get(2 * k + 1).copied().unwrap_or(1.0);
                let t = if hi > lo {
                    e0 + (x - lo) * (e1 - e0) / (hi - lo)
                } else {
                    e0
                };
                functions.get(k).map(|f| f.eval(t)).unwrap_or_default()
            }
        }
    }
}

impl TintTransform for Evaluated {
    fn output_count(&self) -> usize {
        self.outputs
    }

    fn evaluate(&self, input: &[f32]) -> Vec<f32> {
        let mut out = self.function.eval(input.first().copied().unwrap_or(0.0));
        out.resize(self.outputs, 0.0);
        out
    }
}

fn numbers(dict: &Dictionary, key: &str) -> Option<Vec<f32>> {
    dict.get_array(key)
        .map(|items| items.iter().filter_map(Value::as_f32).collect())
}

fn parse_function(spec: &Value, objects: &dyn ObjectResolver, depth: usize) -> Result<PdfFunction> {
    if depth > MAX_STITCH_DEPTH {
        return Err(PdfError::malformed("function nesting too deep"));
    }
    let value = objects.resolve(spec)?;
    let dict = value
        .as_dict()
        .ok_or_else(|| PdfError::malformed(format!("function is a {}", value.kind())))?;
    match dict.get_i64("FunctionType") {
        Some(2) => Ok(PdfFunction::Exponential {
            c0: numbers(dict, "C0").unwrap_or_else(|| vec![0.0]),
            c1: numbers(dict, "C1").unwrap_or_else(|| vec![1.0]),
            n: dict.get_number("N").unwrap_or(1.0) as f32,
        }),
        Some(3) => {
            let domain = numbers(dict, "Domain").unwrap_or_else(|| vec![0.0, 1.0]);
            let functions = dict
                .get_array("Functions")
                .ok_or_else(|| PdfError::malformed("stitching function without /Functions"))?
                .iter()
                .map(|f| parse_function(f, objects, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            Ok(PdfFunction::Stitching {
                domain: [
                    domain.first().copied().unwrap_or(0.0),
                    domain.get(1).copied().unwrap_or(1.0),
                ],
                bounds: numbers(dict, "Bounds").unwrap_or_default(),
                encode: numbers(dict, "Encode").unwrap_or_default(),
                functions,
            })
        }
        Some(t) => Err(PdfError::unsupported(format!("function type {t}"))),
        None => Err(PdfError::malformed("function without /FunctionType")),
    }
}

/// Fallback tint: full tint maps to the darkest value of the alternate
/// space, zero tint to the lightest.
#[derive(Debug, Clone, Copy)]
pub struct LinearRamp {
    pub outputs: usize,
    pub subtractive: bool,
}

impl TintTransform for LinearRamp {
    fn output_count(&self) -> usize {
        self.outputs
    }

    fn evaluate(&self, input: &[f32]) -> Vec<f32> {
        let t = input.iter().copied().fold(0.0f32, f32::max).clamp(0.0, 1.0);
        let v = if self.subtractive { t } else { 1.0 - t };
        vec![v; self.outputs]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xref::MemoryResolver;

    fn exponential(c0: &[i32], c1: &[i32]) -> Dictionary {
        Dictionary::new()
            .with("FunctionType", 2)
            .with("Domain", Value::Array(vec![0.into(), 1.into()]))
            .with("C0", Value::Array(c0.iter().map(|v| (*v).into()).collect()))
            .with("C1", Value::Array(c1.iter().map(|v| (*v).into()).collect()))
            .with("N", 1)
    }

    #[test]
    fn test_exponential_interpolates() {
        let objects = MemoryResolver::new();
        let spec = Value::Dict(exponential(&[1, 1, 1], &[0, 0, 0]));
        let f = DefaultFunctionFactory.create(&spec, &objects, 3).unwrap();
        assert_eq!(f.evaluate(&[0.5]), vec![0.5, 0.5, 0.5]);
        assert_eq!(f.evaluate(&[2.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_stitching_picks_subfunction() {
        let mut objects = MemoryResolver::new();
        let low = objects.add(exponential(&[0], &[1]));
        let high = objects.add(exponential(&[1], &[0]));
        let spec = Value::Dict(
            Dictionary::new()
                .with("FunctionType", 3)
                .with("Domain", Value::Array(vec![0.into(), 1.into()]))
                .with("Functions", Value::Array(vec![low.into(), high.into()]))
                .with("Bounds", Value::Array(vec![0.5.into()]))
                .with(
                    "Encode",
                    Value::Array(vec![0.into(), 1.into(), 0.into(), 1.into()]),
                ),
        );
        let f = DefaultFunctionFactory.create(&spec, &objects, 1).unwrap();
        assert!((f.evaluate(&[0.25])[0] - 0.5).abs() < 1e-6);
        assert!((f.evaluate(&[0.75])[0] - 0.5).abs() < 1e-6);
        assert!((f.evaluate(&[1.0])[0] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_sampled_function_unsupported() {
        let objects = MemoryResolver::new();
        let spec = Value::Dict(Dictionary::new().with("FunctionType", 0));
        assert!(matches!(
            DefaultFunctionFactory.create(&spec, &objects, 3),
            Err(PdfError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_linear_ramp() {
        let additive = LinearRamp { outputs: 3, subtractive: false };
        assert_eq!(additive.evaluate(&[1.0]), vec![0.0; 3]);
        let subtractive = LinearRamp { outputs: 4, subtractive: true };
        assert_eq!(subtractive.evaluate(&[0.25]), vec![0.25; 4]);
    }
}
