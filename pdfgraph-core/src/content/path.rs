use crate::error::{PdfError, Result};
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
    ClosePath,
}

/// Winding rule used by fills and clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

/// The current path register of the interpreter, in user space.
///
/// Not part of the graphics state: it is cleared after every painting
/// operator and after `Q`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    segments: Vec<PathSegment>,
    current: Option<Point>,
    subpath_start: Option<Point>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn current_point(&self) -> Option<Point> {
        self.current
    }

    pub fn move_to(&mut self, p: Point) {
        self.segments.push(PathSegment::MoveTo(p));
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    pub fn line_to(&mut self, p: Point) -> Result<()> {
        self.require_current("l")?;
        self.segments.push(PathSegment::LineTo(p));
        self.current = Some(p);
        Ok(())
    }

    pub fn curve_to(&mut self, c1: Point, c2: Point, end: Point) -> Result<()> {
        self.require_current("c")?;
        self.segments.push(PathSegment::CurveTo(c1, c2, end));
        self.current = Some(end);
        Ok(())
    }

    /// `v`: the current point doubles as the first control point.
    pub fn curve_to_v(&mut self, c2: Point, end: Point) -> Result<()> {
        let c1 = self.require_current("v")?;
        self.curve_to(c1, c2, end)
    }

    /// `y`: the end point doubles as the second control point.
    pub fn curve_to_y(&mut self, c1: Point, end: Point) -> Result<()> {
        self.curve_to(c1, end, end)
    }

    /// Closes the subpath; the current point returns to its first point.
    pub fn close(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        self.segments.push(PathSegment::ClosePath);
        self.current = self.subpath_start;
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.move_to(Point::new(x, y));
        self.segments.push(PathSegment::LineTo(Point::new(x + w, y)));
        self.segments.push(PathSegment::LineTo(Point::new(x + w, y + h)));
        self.segments.push(PathSegment::LineTo(Point::new(x, y + h)));
        self.segments.push(PathSegment::ClosePath);
        self.current = Some(Point::new(x, y));
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.current = None;
        self.subpath_start = None;
    }

    fn require_current(&self, op: &str) -> Result<Point> {
        self.current
            .ok_or_else(|| PdfError::malformed(format!("'{op}' without a current point")))
    }
}
