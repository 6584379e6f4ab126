//! Font bookkeeping for generated text.
//!
//! Each standard font is split into 256-code entries. Block 0 covers ASCII
//! and Latin-1 and is encoded with `WinAnsiEncoding`. Every other character
//! gets the next free index for its font; index `i` lands in block
//! `i / 256 + 1` at code `i % 256`, and that block's font object names the
//! used characters through a `/Differences` array.

use std::collections::HashMap;

use crate::objects::{Dictionary, Value};

/// The fourteen fonts every PDF viewer provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    pub fn base_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }
}

/// One font object of the output: a standard font restricted to a block.
#[derive(Debug, Clone)]
pub struct FontEntry {
    pub font: StandardFont,
    pub block: u32,
    used: Box<[bool; 256]>,
    /// Characters of a block > 0, in code order.
    chars: Vec<char>,
}

impl FontEntry {
    fn new(font: StandardFont, block: u32) -> Self {
        Self {
            font,
            block,
            used: Box::new([false; 256]),
            chars: Vec::new(),
        }
    }

    pub fn is_used(&self, code: u8) -> bool {
        self.used[code as usize]
    }

    pub fn used_count(&self) -> usize {
        self.used.iter().filter(|u| **u).count()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// The font dictionary written for this entry.
    pub fn to_dict(&self) -> Dictionary {
        let dict = Dictionary::new()
            .with("Type", Value::name("Font"))
            .with("Subtype", Value::name("Type1"))
            .with("BaseFont", Value::name(self.font.base_name()));
        if self.block == 0 {
            return dict.with("Encoding", Value::name("WinAnsiEncoding"));
        }
        let mut differences = vec![Value::from(0)];
        differences.extend(self.chars.iter().map(|c| Value::name(glyph_name(*c))));
        dict.with("FirstChar", 0)
            .with("LastChar", self.chars.len().saturating_sub(1))
            .with(
                "Encoding",
                Dictionary::new()
                    .with("Type", Value::name("Encoding"))
                    .with("Differences", Value::Array(differences)),
            )
    }
}

fn glyph_name(c: char) -> String {
    let cp = c as u32;
    if cp <= 0xFFFF {
        format!("uni{cp:04X}")
    } else {
        format!("u{cp:05X}")
    }
}

/// Characters that WinAnsi encodes at their own code point.
fn in_first_block(c: char) -> bool {
    let cp = c as u32;
    cp < 0x80 || (0xA0..=0xFF).contains(&cp)
}

#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    entries: Vec<FontEntry>,
    by_block: HashMap<(StandardFont, u32), usize>,
    extended: HashMap<StandardFont, HashMap<char, usize>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FontEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resource name of entry `index` in the shared font map.
    pub fn resource_name(index: usize) -> String {
        format!("F{}", index + 1)
    }

    /// Entry index for `font` restricted to `block`, created on demand.
    pub fn entry_for(&mut self, font: StandardFont, block: u32) -> usize {
        if let Some(&i) = self.by_block.get(&(font, block)) {
            return i;
        }
        self.entries.push(FontEntry::new(font, block));
        let i = self.entries.len() - 1;
        self.by_block.insert((font, block), i);
        i
    }

    /// Entry and code that show `c` in `font`, marking the code used.
    pub fn encode(&mut self, font: StandardFont, c: char) -> (usize, u8) {
        if in_first_block(c) {
            let entry = self.entry_for(font, 0);
            let code = c as u32 as u8;
            self.entries[entry].used[code as usize] = true;
            return (entry, code);
        }
        let indices = self.extended.entry(font).or_default();
        let next = indices.len();
        let index = *indices.entry(c).or_insert(next);
        let block = (index / 256) as u32 + 1;
        let code = (index % 256) as u8;
        let entry = self.entry_for(font, block);
        let e = &mut self.entries[entry];
        if !e.used[code as usize] {
            e.used[code as usize] = true;
            e.chars.push(c);
        }
        (entry, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_uses_block_zero() {
        let mut fonts = FontRegistry::new();
        let (entry, code) = fonts.encode(StandardFont::Helvetica, 'A');
        assert_eq!(code, b'A');
        assert_eq!(fonts.entries()[entry].block, 0);
        assert!(fonts.entries()[entry].is_used(b'A'));
        let (e2, code) = fonts.encode(StandardFont::Helvetica, '\u{e9}');
        assert_eq!(e2, entry);
        assert_eq!(code, 0xE9);
    }

    #[test]
    fn test_blocks_of_256() {
        let mut fonts = FontRegistry::new();
        for cp in 0x400..0x400 + 300 {
            fonts.encode(StandardFont::TimesRoman, char::from_u32(cp).unwrap());
        }
        let blocks: Vec<(u32, usize)> = fonts
            .entries()
            .iter()
            .map(|e| (e.block, e.chars().len()))
            .collect();
        assert_eq!(blocks, vec![(1, 256), (2, 44)]);
        // Repeats keep their code.
        assert_eq!(fonts.encode(StandardFont::TimesRoman, '\u{401}'), (0, 1));
    }

    #[test]
    fn test_fonts_are_independent() {
        let mut fonts = FontRegistry::new();
        fonts.encode(StandardFont::Courier, '\u{3b1}');
        let (entry, code) = fonts.encode(StandardFont::Helvetica, '\u{3b2}');
        assert_eq!(code, 0);
        assert_eq!(fonts.entries()[entry].font, StandardFont::Helvetica);
        assert_eq!(fonts.len(), 2);
    }

    #[test]
    fn test_extended_font_dict() {
        let mut fonts = FontRegistry::new();
        fonts.encode(StandardFont::Helvetica, '\u{416}');
        fonts.encode(StandardFont::Helvetica, '\u{1F600}');
        let dict = fonts.entries()[0].to_dict();
        assert_eq!(dict.get_i64("LastChar"), Some(1));
        let diffs = dict
            .get_dict("Encoding")
            .and_then(|e| e.get_array("Differences"))
            .unwrap();
        assert_eq!(diffs[1].as_name(), Some("uni0416"));
        assert_eq!(diffs[2].as_name(), Some("u1F600"));
    }
}
