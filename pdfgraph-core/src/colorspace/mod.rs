//! Color spaces and color values.
//!
//! A [`ColorSpace`] is immutable once built and shared through `Arc`, so a
//! resolved space can be cached and handed to every graphics state that
//! selects it. Device spaces are process-wide singletons.

mod function;
mod resolver;

pub use function::{DefaultFunctionFactory, FunctionFactory, LinearRamp, TintTransform};
pub use resolver::ColorSpaceResolver;

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::objects::Dictionary;

lazy_static! {
    static ref DEVICE_GRAY: Arc<ColorSpace> = Arc::new(ColorSpace::DeviceGray);
    static ref DEVICE_RGB: Arc<ColorSpace> = Arc::new(ColorSpace::DeviceRGB);
    static ref DEVICE_CMYK: Arc<ColorSpace> = Arc::new(ColorSpace::DeviceCMYK);
    static ref UNCOLORED_PATTERN: Arc<ColorSpace> =
        Arc::new(ColorSpace::Pattern { underlying: None });
}

/// D50 reference white used when a CIE space omits `/WhitePoint`.
pub const D50_WHITE: [f32; 3] = [0.9642, 1.0, 0.8249];

#[derive(Debug, Clone)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRGB,
    DeviceCMYK,
    CalGray {
        white_point: [f32; 3],
        gamma: f32,
    },
    CalRGB {
        white_point: [f32; 3],
        gamma: [f32; 3],
        matrix: [f32; 9],
    },
    Lab {
        white_point: [f32; 3],
        range: [f32; 4],
    },
    /// An embedded ICC profile. Rendering goes through the alternate.
    IccBased {
        components: usize,
        alternate: Arc<ColorSpace>,
        profile: Arc<Vec<u8>>,
    },
    Indexed {
        base: Arc<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
    Separation {
        name: String,
        alternate: Arc<ColorSpace>,
        tint: Arc<dyn TintTransform>,
    },
    DeviceN {
        names: Vec<String>,
        alternate: Arc<ColorSpace>,
        tint: Arc<dyn TintTransform>,
        attributes: Option<Dictionary>,
    },
    /// `underlying` is set for uncolored tiling patterns, which take their
    /// color from the operands of `scn`.
    Pattern {
        underlying: Option<Arc<ColorSpace>>,
    },
}

impl ColorSpace {
    pub fn device_gray() -> Arc<ColorSpace> {
        Arc::clone(&DEVICE_GRAY)
    }

    pub fn device_rgb() -> Arc<ColorSpace> {
        Arc::clone(&DEVICE_RGB)
    }

    pub fn device_cmyk() -> Arc<ColorSpace> {
        Arc::clone(&DEVICE_CMYK)
    }

    pub fn pattern() -> Arc<ColorSpace> {
        Arc::clone(&UNCOLORED_PATTERN)
    }

    /// Device space with `n` components, if there is one.
    pub fn device_for_components(n: usize) -> Option<Arc<ColorSpace>> {
        match n {
            1 => Some(Self::device_gray()),
            3 => Some(Self::device_rgb()),
            4 => Some(Self::device_cmyk()),
            _ => None,
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
            ColorSpace::CalGray { .. } => "CalGray",
            ColorSpace::CalRGB { .. } => "CalRGB",
            ColorSpace::Lab { .. } => "Lab",
            ColorSpace::IccBased { .. } => "ICCBased",
            ColorSpace::Indexed { .. } => "Indexed",
            ColorSpace::Separation { .. } => "Separation",
            ColorSpace::DeviceN { .. } => "DeviceN",
            ColorSpace::Pattern { .. } => "Pattern",
        }
    }

    /// Number of operands a color in this space takes.
    pub fn component_count(&self) -> usize {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray { .. } => 1,
            ColorSpace::DeviceRGB | ColorSpace::CalRGB { .. } | ColorSpace::Lab { .. } => 3,
            ColorSpace::DeviceCMYK => 4,
            ColorSpace::IccBased { components, .. } => *components,
            ColorSpace::Indexed { .. } | ColorSpace::Separation { .. } => 1,
            ColorSpace::DeviceN { names, .. } => names.len(),
            ColorSpace::Pattern { underlying } => {
                underlying.as_ref().map_or(0, |u| u.component_count())
            }
        }
    }

    /// Initial color selected by `cs`/`CS`.
    pub fn default_color(&self) -> Vec<f32> {
        match self {
            ColorSpace::DeviceCMYK => vec![0.0, 0.0, 0.0, 1.0],
            ColorSpace::Lab { range, .. } => {
                vec![0.0, 0.0f32.clamp(range[0], range[1]), 0.0f32.clamp(range[2], range[3])]
            }
            ColorSpace::IccBased { alternate, .. } => alternate.default_color(),
            ColorSpace::Separation { .. } | ColorSpace::DeviceN { .. } => {
                vec![1.0; self.component_count()]
            }
            ColorSpace::Pattern { .. } => Vec::new(),
            _ => vec![0.0; self.component_count()],
        }
    }

    /// Approximate sRGB rendering of `components`. Missing components are
    /// taken as zero.
    pub fn to_rgb(&self, components: &[f32]) -> [f32; 3] {
        let c = |i: usize| components.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);
        match self {
            ColorSpace::DeviceGray => [c(0); 3],
            ColorSpace::CalGray { gamma, .. } => [c(0).powf(*gamma).powf(1.0 / 2.2); 3],
            ColorSpace::DeviceRGB | ColorSpace::CalRGB { .. } => [c(0), c(1), c(2)],
            ColorSpace::DeviceCMYK => {
                let k = c(3);
                [
                    (1.0 - c(0)) * (1.0 - k),
                    (1.0 - c(1)) * (1.0 - k),
                    (1.0 - c(2)) * (1.0 - k),
                ]
            }
            ColorSpace::Lab { white_point, .. } => lab_to_rgb(components, white_point),
            ColorSpace::IccBased { alternate, .. } => alternate.to_rgb(components),
            ColorSpace::Indexed {
                base,
                hival,
                lookup,
            } => {
                let n = base.component_count();
                let index = components
                    .first()
                    .map_or(0, |v| v.round().clamp(0.0, *hival as f32) as usize);
                let entry: Vec<f32> = (0..n)
                    .map(|i| lookup.get(index * n + i).copied().unwrap_or(0) as f32 / 255.0)
                    .collect();
                base.to_rgb(&entry)
            }
            ColorSpace::Separation {
                alternate, tint, ..
            }
            | ColorSpace::DeviceN {
                alternate, tint, ..
            } => alternate.to_rgb(&tint.evaluate(components)),
            ColorSpace::Pattern { underlying } => underlying
                .as_ref()
                .map_or([0.0; 3], |u| u.to_rgb(components)),
        }
    }
}

impl PartialEq for ColorSpace {
    fn eq(&self, other: &Self) -> bool {
        use ColorSpace::*;
        match (self, other) {
            (DeviceGray, DeviceGray) | (DeviceRGB, DeviceRGB) | (DeviceCMYK, DeviceCMYK) => true,
            (
                CalGray { white_point: w1, gamma: g1 },
                CalGray { white_point: w2, gamma: g2 },
            ) => w1 == w2 && g1 == g2,
            (
                CalRGB { white_point: w1, gamma: g1, matrix: m1 },
                CalRGB { white_point: w2, gamma: g2, matrix: m2 },
            ) => w1 == w2 && g1 == g2 && m1 == m2,
            (Lab { white_point: w1, range: r1 }, Lab { white_point: w2, range: r2 }) => {
                w1 == w2 && r1 == r2
            }
            (
                IccBased { components: n1, alternate: a1, profile: p1 },
                IccBased { components: n2, alternate: a2, profile: p2 },
            ) => n1 == n2 && a1 == a2 && p1 == p2,
            (
                Indexed { base: b1, hival: h1, lookup: l1 },
                Indexed { base: b2, hival: h2, lookup: l2 },
            ) => b1 == b2 && h1 == h2 && l1 == l2,
            (
                Separation { name: n1, alternate: a1, tint: t1 },
                Separation { name: n2, alternate: a2, tint: t2 },
            ) => n1 == n2 && a1 == a2 && Arc::ptr_eq(t1, t2),
            (
                DeviceN { names: n1, alternate: a1, tint: t1, attributes: x1 },
                DeviceN { names: n2, alternate: a2, tint: t2, attributes: x2 },
            ) => n1 == n2 && a1 == a2 && Arc::ptr_eq(t1, t2) && x1 == x2,
            (Pattern { underlying: u1 }, Pattern { underlying: u2 }) => u1 == u2,
            _ => false,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family())
    }
}

fn lab_to_rgb(components: &[f32], white: &[f32; 3]) -> [f32; 3] {
    let get = |i: usize| components.get(i).copied().unwrap_or(0.0);
    let l = (get(0) + 16.0) / 116.0;
    let a = l + get(1) / 500.0;
    let b = l - get(2) / 200.0;
    let g = |t: f32| {
        if t >= 6.0 / 29.0 {
            t * t * t
        } else {
            108.0 / 841.0 * (t - 4.0 / 29.0)
        }
    };
    let (x, y, z) = (white[0] * g(a), white[1] * g(l), white[2] * g(b));
    let linear = [
        3.1339 * x - 1.6169 * y - 0.4906 * z,
        -0.9785 * x + 1.9160 * y + 0.0334 * z,
        0.0720 * x - 0.2290 * y + 1.4057 * z,
    ];
    linear.map(|v| {
        let v = v.clamp(0.0, 1.0);
        if v <= 0.0031308 {
            12.92 * v
        } else {
            1.055 * v.powf(1.0 / 2.4) - 0.055
        }
    })
}

/// A color: a space plus its components.
#[derive(Debug, Clone, PartialEq)]
pub struct Color {
    pub space: Arc<ColorSpace>,
    pub components: Vec<f32>,
}

impl Color {
    pub fn new(space: Arc<ColorSpace>, components: Vec<f32>) -> Self {
        Self { space, components }
    }

    /// The initial color of `space`.
    pub fn initial(space: Arc<ColorSpace>) -> Self {
        let components = space.default_color();
        Self { space, components }
    }

    pub fn black() -> Self {
        Self::new(ColorSpace::device_gray(), vec![0.0])
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(ColorSpace::device_rgb(), vec![r, g, b])
    }

    pub fn to_rgb(&self) -> [f32; 3] {
        self.space.to_rgb(&self.components)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_singletons_are_shared() {
        assert!(Arc::ptr_eq(&ColorSpace::device_cmyk(), &ColorSpace::device_cmyk()));
        assert_eq!(*ColorSpace::device_rgb(), ColorSpace::DeviceRGB);
    }

    #[test]
    fn test_default_colors() {
        assert_eq!(ColorSpace::DeviceGray.default_color(), vec![0.0]);
        assert_eq!(ColorSpace::DeviceRGB.default_color(), vec![0.0; 3]);
        assert_eq!(ColorSpace::DeviceCMYK.default_color(), vec![0.0, 0.0, 0.0, 1.0]);
        let sep = ColorSpace::Separation {
            name: "Spot".into(),
            alternate: ColorSpace::device_cmyk(),
            tint: Arc::new(LinearRamp { outputs: 4, subtractive: true }),
        };
        assert_eq!(sep.default_color(), vec![1.0]);
        assert_eq!(sep.component_count(), 1);
    }

    #[test]
    fn test_cmyk_to_rgb() {
        let rgb = ColorSpace::DeviceCMYK.to_rgb(&[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(rgb, [0.0; 3]);
        let rgb = ColorSpace::DeviceCMYK.to_rgb(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(rgb, [0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_indexed_lookup() {
        let space = ColorSpace::Indexed {
            base: ColorSpace::device_rgb(),
            hival: 1,
            lookup: vec![255, 0, 0, 0, 0, 255],
        };
        assert_eq!(space.to_rgb(&[1.0]), [0.0, 0.0, 1.0]);
        assert_eq!(space.to_rgb(&[7.0]), [0.0, 0.0, 1.0]);
        assert_eq!(space.component_count(), 1);
    }

    #[test]
    fn test_lab_white() {
        let space = ColorSpace::Lab {
            white_point: D50_WHITE,
            range: [-100.0, 100.0, -100.0, 100.0],
        };
        let rgb = space.to_rgb(&[100.0, 0.0, 0.0]);
        assert!(rgb.iter().all(|v| *v > 0.95));
    }
}
