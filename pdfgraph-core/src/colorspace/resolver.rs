use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::function::{DefaultFunctionFactory, FunctionFactory, LinearRamp, TintTransform};
use super::{ColorSpace, D50_WHITE};
use crate::error::{PdfError, ResourceCategory, Result};
use crate::objects::{Dictionary, Value};
use crate::resources::{ResourceKey, ResourceLookup};
use crate::xref::ObjectResolver;

/// Deepest chain of nested base/alternate spaces accepted.
const MAX_NESTING: usize = 8;

/// Turns color space operands and resource entries into [`ColorSpace`]s.
///
/// Spaces reached through an indirect object, or through a name in a
/// resource dictionary, are memoized, so selecting the same space twice
/// yields the same `Arc`. Direct inline arrays are rebuilt every time.
pub struct ColorSpaceResolver {
    cache: HashMap<ResourceKey, Arc<ColorSpace>>,
    functions: Box<dyn FunctionFactory>,
}

impl Default for ColorSpaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorSpaceResolver {
    pub fn new() -> Self {
        Self::with_function_factory(Box::new(DefaultFunctionFactory))
    }

    pub fn with_function_factory(functions: Box<dyn FunctionFactory>) -> Self {
        Self {
            cache: HashMap::new(),
            functions,
        }
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Resolves the operand of `cs`/`CS`, an inline image `/ColorSpace`, or
    /// any nested base space.
    pub fn resolve(
        &mut self,
        spec: &Value,
        resources: &dyn ResourceLookup,
        objects: &dyn ObjectResolver,
    ) -> Result<Arc<ColorSpace>> {
        self.resolve_at(spec, resources, objects, 0, true)
    }

    fn resolve_at(
        &mut self,
        spec: &Value,
        resources: &dyn ResourceLookup,
        objects: &dyn ObjectResolver,
        depth: usize,
        redirect: bool,
    ) -> Result<Arc<ColorSpace>> {
        if depth > MAX_NESTING {
            return Err(PdfError::malformed("color space nesting too deep"));
        }
        match spec {
            Value::Reference(id) => {
                let key = ResourceKey::Object(*id);
                if let Some(hit) = self.cache.get(&key) {
                    return Ok(Arc::clone(hit));
                }
                let target = objects.get_object(*id)?;
                let space = self.resolve_at(target, resources, objects, depth + 1, redirect)?;
                self.cache.insert(key, Arc::clone(&space));
                Ok(space)
            }
            Value::Name(name) => self.resolve_name(name, resources, objects, depth, redirect),
            Value::Array(items) => self.resolve_array(items, resources, objects, depth, redirect),
            other => Err(PdfError::malformed(format!(
                "color space given as {}",
                other.kind()
            ))),
        }
    }

    fn resolve_name(
        &mut self,
        name: &str,
        resources: &dyn ResourceLookup,
        objects: &dyn ObjectResolver,
        depth: usize,
        redirect: bool,
    ) -> Result<Arc<ColorSpace>> {
        let (device, default_key) = match name {
            "DeviceGray" | "G" => (ColorSpace::device_gray(), "DefaultGray"),
            "DeviceRGB" | "RGB" => (ColorSpace::device_rgb(), "DefaultRGB"),
            "DeviceCMYK" | "CMYK" => (ColorSpace::device_cmyk(), "DefaultCMYK"),
            "Pattern" => return Ok(ColorSpace::pattern()),
            _ => return self.resolve_named_resource(name, resources, objects, depth, redirect),
        };
        if !redirect
            || resources
                .find_resource(ResourceCategory::ColorSpace, default_key)
                .is_none()
        {
            return Ok(device);
        }
        match self.resolve_named_resource(default_key, resources, objects, depth, false) {
            Ok(space) if space.component_count() == device.component_count() => {
                debug!("{name} redirected through /{default_key}");
                Ok(space)
            }
            Ok(space) => {
                warn!(
                    "/{default_key} has {} components, keeping {name}",
                    space.component_count()
                );
                Ok(device)
            }
            Err(e) => {
                warn!("ignoring /{default_key}: {e}");
                Ok(device)
            }
        }
    }

    fn resolve_named_resource(
        &mut self,
        name: &str,
        resources: &dyn ResourceLookup,
        objects: &dyn ObjectResolver,
        depth: usize,
        redirect: bool,
    ) -> Result<Arc<ColorSpace>> {
        let found = resources
            .find_resource(ResourceCategory::ColorSpace, name)
            .ok_or_else(|| PdfError::missing(ResourceCategory::ColorSpace, name))?;
        let key = found.key(name);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Arc::clone(hit));
        }
        if found.value.as_name() == Some(name) {
            return Err(PdfError::malformed(format!(
                "color space /{name} refers to itself"
            )));
        }
        let space = self.resolve_at(&found.value, resources, objects, depth + 1, redirect)?;
        self.cache.insert(key, Arc::clone(&space));
        Ok(space)
    }

    fn resolve_array(
        &mut self,
        items: &[Value],
        resources: &dyn ResourceLookup,
        objects: &dyn ObjectResolver,
        depth: usize,
        redirect: bool,
    ) -> Result<Arc<ColorSpace>> {
        let family = items
            .first()
            .and_then(Value::as_name)
            .ok_or_else(|| PdfError::malformed("color space array without a family name"))?;
        let param = |i: usize| -> Result<&Value> {
            let item = items.get(i).ok_or_else(|| {
                PdfError::malformed(format!("/{family} color space is missing operand {i}"))
            })?;
            objects.resolve(item)
        };
        let cie_dict = |i: usize| -> Dictionary {
            items
                .get(i)
                .map(|v| objects.resolve_or_null(v))
                .and_then(Value::as_dict)
                .cloned()
                .unwrap_or_default()
        };

        let space = match family {
            "DeviceGray" | "DeviceRGB" | "DeviceCMYK" | "G" | "RGB" | "CMYK" | "Pattern"
                if items.len() == 1 =>
            {
                return self.resolve_name(family, resources, objects, depth, redirect);
            }
            "CalGray" => {
                let dict = cie_dict(1);
                ColorSpace::CalGray {
                    white_point: floats(&dict, "WhitePoint").unwrap_or(D50_WHITE),
                    gamma: dict.get_number("Gamma").unwrap_or(1.0) as f32,
                }
            }
            "CalRGB" => {
                let dict = cie_dict(1);
                ColorSpace::CalRGB {
                    white_point: floats(&dict, "WhitePoint").unwrap_or(D50_WHITE),
                    gamma: floats(&dict, "Gamma").unwrap_or([1.0; 3]),
                    matrix: floats(&dict, "Matrix")
                        .unwrap_or([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
                }
            }
            "Lab" => {
                let dict = cie_dict(1);
                ColorSpace::Lab {
                    white_point: floats(&dict, "WhitePoint").unwrap_or(D50_WHITE),
                    range: floats(&dict, "Range").unwrap_or([-100.0, 100.0, -100.0, 100.0]),
                }
            }
            "ICCBased" => {
                let stream = param(1)?
                    .as_stream()
                    .ok_or_else(|| PdfError::malformed("/ICCBased operand is not a stream"))?;
                let dict = stream.dict();
                let alternate = match dict.get("Alternate") {
                    Some(alt) => Some(self.resolve_at(alt, resources, objects, depth + 1, false)?),
                    None => None,
                };
                let components = match (dict.get_i64("N"), &alternate) {
                    (Some(n), _) if (1..=32).contains(&n) => n as usize,
                    (_, Some(alt)) => alt.component_count(),
                    _ => return Err(PdfError::malformed("/ICCBased stream without /N")),
                };
                let alternate = match alternate {
                    Some(alt) if alt.component_count() == components => alt,
                    other => {
                        if other.is_some() {
                            warn!("/ICCBased /Alternate does not match /N {components}");
                        }
                        ColorSpace::device_for_components(components).ok_or_else(|| {
                            PdfError::malformed(format!(
                                "/ICCBased with {components} components needs an /Alternate"
                            ))
                        })?
                    }
                };
                let profile = stream.decoded_data().unwrap_or_else(|e| {
                    warn!("unreadable ICC profile, rendering through alternate: {e}");
                    Vec::new()
                });
                ColorSpace::IccBased {
                    components,
                    alternate,
                    profile: Arc::new(profile),
                }
            }
            "Indexed" | "I" => {
                if items.len() != 4 {
                    return Err(PdfError::malformed(format!(
                        "/Indexed color space has {} elements, expected 4",
                        items.len()
                    )));
                }
                let base = self.resolve_at(&items[1], resources, objects, depth + 1, redirect)?;
                let hival = param(2)?
                    .as_number()
                    .ok_or_else(|| PdfError::malformed("/Indexed hival is not a number"))?
                    .clamp(0.0, 255.0) as u8;
                let mut lookup = match param(3)? {
                    Value::String(bytes) => bytes.clone(),
                    Value::Stream(stream) => stream.decoded_data()?,
                    other => {
                        return Err(PdfError::malformed(format!(
                            "/Indexed lookup is a {}",
                            other.kind()
                        )))
                    }
                };
                let needed = (hival as usize + 1) * base.component_count();
                if lookup.len() < needed {
                    warn!("/Indexed lookup has {} of {needed} bytes", lookup.len());
                    lookup.resize(needed, 0);
                }
                ColorSpace::Indexed {
                    base,
                    hival,
                    lookup,
                }
            }
            "Separation" => {
                let name = param(1)?
                    .as_name()
                    .ok_or_else(|| PdfError::malformed("/Separation colorant is not a name"))?
                    .to_string();
                let alternate = self.resolve_at(param(2)?, resources, objects, depth + 1, redirect)?;
                let tint = self.tint_transform(param(3)?, objects, &alternate);
                ColorSpace::Separation {
                    name,
                    alternate,
                    tint,
                }
            }
            "DeviceN" => {
                let names: Vec<String> = param(1)?
                    .as_array()
                    .ok_or_else(|| PdfError::malformed("/DeviceN colorants are not an array"))?
                    .iter()
                    .filter_map(|n| n.as_name().map(str::to_string))
                    .collect();
                if names.is_empty() {
                    return Err(PdfError::malformed("/DeviceN without colorants"));
                }
                let alternate = self.resolve_at(param(2)?, resources, objects, depth + 1, redirect)?;
                let tint = self.tint_transform(param(3)?, objects, &alternate);
                ColorSpace::DeviceN {
                    names,
                    alternate,
                    tint,
                    attributes: items
                        .get(4)
                        .and_then(|v| objects.resolve_or_null(v).as_dict().cloned()),
                }
            }
            "Pattern" => {
                let underlying =
                    self.resolve_at(&items[1], resources, objects, depth + 1, redirect)?;
                ColorSpace::Pattern {
                    underlying: Some(underlying),
                }
            }
            other => {
                return Err(PdfError::unsupported(format!("color space family /{other}")));
            }
        };
        Ok(Arc::new(space))
    }

    fn tint_transform(
        &self,
        spec: &Value,
        objects: &dyn ObjectResolver,
        alternate: &ColorSpace,
    ) -> Arc<dyn TintTransform> {
        let outputs = alternate.component_count();
        self.functions
            .create(spec, objects, outputs)
            .unwrap_or_else(|e| {
                warn!("tint transform replaced by a linear ramp: {e}");
                Arc::new(LinearRamp {
                    outputs,
                    subtractive: matches!(alternate, ColorSpace::DeviceCMYK),
                })
            })
    }
}

fn floats<const N: usize>(dict: &Dictionary, key: &str) -> Option<[f32; N]> {
    let items = dict.get_array(key)?;
    if items.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f32()?;
    }
    Some(out)
}
