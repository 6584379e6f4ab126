//! Content stream tokenizer.
//!
//! Splits a decoded content stream into operands and operators. Inline
//! images (`BI ... ID <data> EI`) come out as a single token carrying the
//! expanded image dictionary and the raw sample bytes.

use crate::objects::{Dictionary, Value};
use crate::parser::{Lexer, ParseError, Token};
use crate::parser::lexer::{is_delimiter, is_whitespace};

/// One unit of a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentToken {
    Operand(Value),
    Operator(String),
    InlineImage(InlineImage),
}

/// An inline image with its dictionary keys and name values expanded to
/// their full forms.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub dict: Dictionary,
    pub data: Vec<u8>,
}

const KEY_ABBREVIATIONS: [(&str, &str); 9] = [
    ("BPC", "BitsPerComponent"),
    ("CS", "ColorSpace"),
    ("D", "Decode"),
    ("DP", "DecodeParms"),
    ("F", "Filter"),
    ("H", "Height"),
    ("IM", "ImageMask"),
    ("I", "Interpolate"),
    ("W", "Width"),
];

const VALUE_ABBREVIATIONS: [(&str, &str); 11] = [
    ("G", "DeviceGray"),
    ("RGB", "DeviceRGB"),
    ("CMYK", "DeviceCMYK"),
    ("I", "Indexed"),
    ("AHx", "ASCIIHexDecode"),
    ("A85", "ASCII85Decode"),
    ("LZW", "LZWDecode"),
    ("Fl", "FlateDecode"),
    ("RL", "RunLengthDecode"),
    ("CCF", "CCITTFaxDecode"),
    ("DCT", "DCTDecode"),
];

pub fn expand_key(key: &str) -> &str {
    KEY_ABBREVIATIONS
        .iter()
        .find(|(short, _)| *short == key)
        .map_or(key, |(_, long)| *long)
}

fn expand_value(value: Value) -> Value {
    match value {
        Value::Name(name) => match VALUE_ABBREVIATIONS.iter().find(|(short, _)| *short == name) {
            Some((_, long)) => Value::name(*long),
            None => Value::Name(name),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(expand_value).collect()),
        other => other,
    }
}

pub struct ContentTokenizer<'a> {
    lexer: Lexer<'a>,
    done: bool,
}

impl<'a> ContentTokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            done: false,
        }
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    fn next_token(&mut self) -> Result<Option<ContentToken>, ParseError> {
        let token = self.lexer.next_token()?;
        Ok(Some(match token {
            Token::Eof => return Ok(None),
            Token::Keyword(word) if word == "BI" => {
                ContentToken::InlineImage(self.read_inline_image()?)
            }
            Token::Keyword(word) => ContentToken::Operator(word),
            other => ContentToken::Operand(self.operand(other)?),
        }))
    }

    fn operand(&mut self, token: Token) -> Result<Value, ParseError> {
        Ok(match token {
            Token::Boolean(b) => Value::Boolean(b),
            Token::Integer(i) => Value::Number(i as f64),
            Token::Real(r) => Value::Number(r),
            Token::String(s) => Value::String(s),
            Token::Name(n) => Value::Name(n),
            Token::Null => Value::Null,
            Token::ArrayStart => {
                let mut items = Vec::new();
                loop {
                    match self.lexer.next_token()? {
                        Token::ArrayEnd => break,
                        Token::Eof => return Err(ParseError::UnexpectedEof),
                        other => items.push(self.operand(other)?),
                    }
                }
                Value::Array(items)
            }
            Token::DictStart => {
                let mut dict = Dictionary::new();
                loop {
                    match self.lexer.next_token()? {
                        Token::DictEnd => break,
                        Token::Name(key) => {
                            let next = self.lexer.next_token()?;
                            dict.set(key, self.operand(next)?);
                        }
                        Token::Eof => return Err(ParseError::UnexpectedEof),
                        other => return Err(self.unexpected("dictionary key", &other)),
                    }
                }
                Value::Dict(dict)
            }
            other => return Err(self.unexpected("operand", &other)),
        })
    }

    fn unexpected(&self, expected: &str, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            position: self.lexer.position(),
            expected: expected.to_string(),
            found: format!("{found:?}"),
        }
    }

    fn read_inline_image(&mut self) -> Result<InlineImage, ParseError> {
        let mut dict = Dictionary::new();
        loop {
            match self.lexer.next_token()? {
                Token::Keyword(word) if word == "ID" => break,
                Token::Name(key) => {
                    let next = self.lexer.next_token()?;
                    let value = expand_value(self.operand(next)?);
                    dict.set(expand_key(&key), value);
                }
                Token::Eof => return Err(ParseError::UnexpectedEof),
                other => return Err(self.unexpected("inline image key", &other)),
            }
        }

        // A single whitespace byte separates ID from the samples.
        let data = self.lexer.data();
        let mut start = self.lexer.position();
        if data.get(start).is_some_and(|b| is_whitespace(*b)) {
            start += 1;
        }
        let (end, resume) = find_inline_image_end(data, start).ok_or(ParseError::UnexpectedEof)?;
        self.lexer.seek(resume);
        Ok(InlineImage {
            dict,
            data: data[start..end].to_vec(),
        })
    }
}

/// Finds the `EI` that ends inline image data: preceded by whitespace and
/// followed by whitespace, a delimiter, or the end of the stream. Returns
/// the end of the sample data and the position after `EI`.
fn find_inline_image_end(data: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut pos = start;
    while pos + 2 <= data.len() {
        if &data[pos..pos + 2] == b"EI"
            && pos > start
            && is_whitespace(data[pos - 1])
            && data
                .get(pos + 2)
                .map_or(true, |b| is_whitespace(*b) || is_delimiter(*b))
        {
            let mut end = pos - 1;
            if data[end] == b'\n' && end > start && data[end - 1] == b'\r' {
                end -= 1;
            }
            return Some((end, pos + 2));
        }
        pos += 1;
    }
    None
}

impl Iterator for ContentTokenizer<'_> {
    type Item = Result<ContentToken, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let before = self.lexer.position();
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(ParseError::UnexpectedEof) => {
                self.done = true;
                Some(Err(ParseError::UnexpectedEof))
            }
            Err(e) => {
                if self.lexer.position() == before {
                    self.lexer.seek(before + 1);
                }
                Some(Err(e))
            }
        }
    }
}
