//! Points, rectangles and affine matrices in PDF user space.

use crate::objects::Value;

/// A point in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by two corners, as in `/MediaBox`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub lower_left: Point,
    pub upper_right: Point,
}

impl Rectangle {
    pub fn new(lower_left: Point, upper_right: Point) -> Self {
        Self {
            lower_left,
            upper_right,
        }
    }

    pub fn from_position_and_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            lower_left: Point::new(x, y),
            upper_right: Point::new(x + width, y + height),
        }
    }

    /// US Letter, the default page size.
    pub fn letter() -> Self {
        Self::from_position_and_size(0.0, 0.0, 612.0, 792.0)
    }

    pub fn a4() -> Self {
        Self::from_position_and_size(0.0, 0.0, 595.0, 842.0)
    }

    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }

    /// Reads a four-number array, normalizing swapped corners.
    pub fn from_value(value: &Value) -> Option<Self> {
        let arr = value.as_array()?;
        if arr.len() != 4 {
            return None;
        }
        let mut n = [0.0; 4];
        for (slot, item) in n.iter_mut().zip(arr) {
            *slot = item.as_number()?;
        }
        Some(Self::new(
            Point::new(n[0].min(n[2]), n[1].min(n[3])),
            Point::new(n[0].max(n[2]), n[1].max(n[3])),
        ))
    }

    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            self.lower_left.x.into(),
            self.lower_left.y.into(),
            self.upper_right.x.into(),
            self.upper_right.y.into(),
        ])
    }
}

/// Affine transform `[a b c d e f]` mapping `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// `self` applied first, then `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let arr = value.as_array()?;
        if arr.len() != 6 {
            return None;
        }
        let mut n = [0.0; 6];
        for (slot, item) in n.iter_mut().zip(arr) {
            *slot = item.as_number()?;
        }
        Some(Self::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}
