//! Metrics of fonts selected with `Tf`. Glyph outlines are the surface's
//! business; the interpreter only needs advances to move the text matrix.

use tracing::debug;

use crate::objects::{Dictionary, Value};
use crate::xref::ObjectResolver;

/// Width used for codes outside `/Widths`, in thousandths of an em.
const DEFAULT_WIDTH: f64 = 500.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFont {
    pub resource_name: String,
    pub subtype: String,
    pub base_font: Option<String>,
    pub first_char: u32,
    pub widths: Vec<f64>,
    pub missing_width: f64,
    /// Composite fonts use two-byte codes.
    pub two_byte: bool,
}

impl LoadedFont {
    pub fn from_dict(resource_name: &str, dict: &Dictionary, objects: &dyn ObjectResolver) -> Self {
        let subtype = dict.get_name("Subtype").unwrap_or("Type1").to_string();
        let widths: Vec<f64> = dict
            .get("Widths")
            .map(|w| objects.resolve_or_null(w))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|v| objects.resolve_or_null(v).as_number().unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        let missing_width = dict
            .get("FontDescriptor")
            .map(|d| objects.resolve_or_null(d))
            .and_then(Value::as_dict)
            .and_then(|d| d.get_number("MissingWidth"))
            .unwrap_or(DEFAULT_WIDTH);
        let font = Self {
            resource_name: resource_name.to_string(),
            two_byte: subtype == "Type0",
            subtype,
            base_font: dict.get_name("BaseFont").map(str::to_string),
            first_char: dict.get_i64("FirstChar").unwrap_or(0).max(0) as u32,
            widths,
            missing_width,
        };
        debug!(
            "loaded font /{} ({}, {} widths)",
            font.resource_name,
            font.subtype,
            font.widths.len()
        );
        font
    }

    pub fn is_type3(&self) -> bool {
        self.subtype == "Type3"
    }

    /// Advance of `code` in thousandths of an em.
    pub fn glyph_width(&self, code: u32) -> f64 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.missing_width)
    }

    /// Splits a shown string into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| c.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
                .collect()
        } else {
            bytes.iter().map(|b| *b as u32).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xref::MemoryResolver;

    #[test]
    fn test_widths_from_first_char() {
        let objects = MemoryResolver::new();
        let dict = Dictionary::new()
            .with("Subtype", Value::name("TrueType"))
            .with("BaseFont", Value::name("Arial"))
            .with("FirstChar", 65)
            .with("Widths", Value::Array(vec![600.into(), 700.into()]));
        let font = LoadedFont::from_dict("F1", &dict, &objects);
        assert_eq!(font.glyph_width(65), 600.0);
        assert_eq!(font.glyph_width(66), 700.0);
        assert_eq!(font.glyph_width(10), DEFAULT_WIDTH);
        assert_eq!(font.base_font.as_deref(), Some("Arial"));
    }

    #[test]
    fn test_two_byte_codes() {
        let objects = MemoryResolver::new();
        let dict = Dictionary::new().with("Subtype", Value::name("Type0"));
        let font = LoadedFont::from_dict("F2", &dict, &objects);
        assert_eq!(font.codes(&[0x01, 0x02, 0x00, 0x41]), vec![0x0102, 0x41]);
    }
}
