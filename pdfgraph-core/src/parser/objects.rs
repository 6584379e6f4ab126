//! PDF Object Parser
//!
//! Turns tokens into [`Value`]s (ISO 32000-1 Section 7.3), including
//! `n g R` references and `n g obj ... endobj` indirect object blocks with
//! stream payloads.

use super::lexer::{is_whitespace, Lexer, Token};
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, ObjectId, Stream, Value};

/// Looks up the length of a stream whose `/Length` is an indirect reference.
pub trait LengthResolver {
    fn resolve_length(&self, id: ObjectId) -> Option<usize>;
}

/// No indirect lengths available; streams fall back to scanning.
pub struct NoLengths;

impl LengthResolver for NoLengths {
    fn resolve_length(&self, _id: ObjectId) -> Option<usize> {
        None
    }
}

pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
        }
    }

    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self {
            lexer: Lexer::at(data, offset),
        }
    }

    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Parse one direct value; references are recognized by lookahead.
    pub fn parse_value(&mut self) -> ParseResult<Value> {
        let token = self.lexer.next_token()?;
        self.parse_from_token(token)
    }

    fn parse_from_token(&mut self, token: Token) -> ParseResult<Value> {
        match token {
            Token::Null => Ok(Value::Null),
            Token::Boolean(b) => Ok(Value::Boolean(b)),
            Token::Real(r) => Ok(Value::Number(r)),
            Token::String(s) => Ok(Value::String(s)),
            Token::Name(n) => Ok(Value::Name(n)),
            Token::Integer(i) => self.parse_integer_or_reference(i),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => Ok(Value::Dict(self.parse_dictionary_body()?)),
            Token::Eof => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                position: self.lexer.position(),
                expected: "PDF object".to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    fn parse_integer_or_reference(&mut self, first: i64) -> ParseResult<Value> {
        if first < 0 || first > u32::MAX as i64 {
            return Ok(Value::Number(first as f64));
        }
        let second = self.lexer.next_token()?;
        if let Token::Integer(gen) = second {
            if (0..=u16::MAX as i64).contains(&gen) {
                let third = self.lexer.next_token()?;
                if third.is_keyword("R") {
                    return Ok(Value::Reference(ObjectId::new(first as u32, gen as u16)));
                }
                self.lexer.push_token(third);
            }
        }
        self.lexer.push_token(second);
        Ok(Value::Number(first as f64))
    }

    fn parse_array(&mut self) -> ParseResult<Value> {
        let mut elements = Vec::new();
        loop {
            let token = self.lexer.next_token()?;
            match token {
                Token::ArrayEnd => break,
                Token::Eof => return Err(ParseError::UnexpectedEof),
                _ => elements.push(self.parse_from_token(token)?),
            }
        }
        Ok(Value::Array(elements))
    }

    /// Parses the entries after an already consumed `<<`.
    pub fn parse_dictionary_body(&mut self) -> ParseResult<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            match self.lexer.next_token()? {
                Token::DictEnd => break,
                Token::Name(key) => {
                    let token = self.lexer.next_token()?;
                    if token == Token::DictEnd {
                        // Key without a value; treat as null and stop.
                        dict.set(key, Value::Null);
                        break;
                    }
                    let value = self.parse_from_token(token)?;
                    dict.set(key, value);
                }
                Token::Eof => return Err(ParseError::UnexpectedEof),
                other => {
                    return Err(ParseError::UnexpectedToken {
                        position: self.lexer.position(),
                        expected: "dictionary key".to_string(),
                        found: format!("{other:?}"),
                    })
                }
            }
        }
        Ok(dict)
    }

    /// Parses `n g obj <value> [stream ... endstream] endobj` at the current
    /// position.
    pub fn parse_indirect_object(
        &mut self,
        lengths: &dyn LengthResolver,
    ) -> ParseResult<(ObjectId, Value)> {
        let number = self.expect_integer("object number")?;
        let generation = self.expect_integer("generation number")?;
        let keyword = self.lexer.next_token()?;
        if !keyword.is_keyword("obj") {
            return Err(ParseError::UnexpectedToken {
                position: self.lexer.position(),
                expected: "obj".to_string(),
                found: format!("{keyword:?}"),
            });
        }
        let id = ObjectId::new(number as u32, generation as u16);

        let value = self.parse_value()?;
        let next = self.lexer.next_token()?;
        let value = match (value, next) {
            (Value::Dict(dict), token) if token.is_keyword("stream") => {
                let data = self.read_stream_data(&dict, lengths)?;
                Value::Stream(Stream::new(dict, data))
            }
            (value, token) => {
                // A missing endobj is tolerated.
                if !token.is_keyword("endobj") {
                    self.lexer.push_token(token);
                }
                value
            }
        };
        Ok((id, value))
    }

    fn expect_integer(&mut self, what: &str) -> ParseResult<i64> {
        match self.lexer.next_token()? {
            Token::Integer(i) if i >= 0 => Ok(i),
            other => Err(ParseError::UnexpectedToken {
                position: self.lexer.position(),
                expected: what.to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    /// Reads stream bytes after the `stream` keyword. `/Length` is trusted
    /// when it lands on `endstream`; otherwise the data is delimited by the
    /// next `endstream`.
    fn read_stream_data(
        &mut self,
        dict: &Dictionary,
        lengths: &dyn LengthResolver,
    ) -> ParseResult<Vec<u8>> {
        self.lexer.skip_eol();
        let start = self.lexer.position();
        let data = self.lexer.data();

        let declared = match dict.get("Length") {
            Some(Value::Number(n)) if *n >= 0.0 => Some(*n as usize),
            Some(Value::Reference(id)) => lengths.resolve_length(*id),
            _ => None,
        };

        if let Some(len) = declared {
            if let Some(end) = start.checked_add(len).filter(|&e| e <= data.len()) {
                let mut probe = Lexer::at(data, end);
                if probe.next_token()?.is_keyword("endstream") {
                    self.lexer.seek(probe.position());
                    self.skip_endobj()?;
                    return Ok(data[start..end].to_vec());
                }
            }
            tracing::debug!("stream /Length {len} at offset {start} is wrong, scanning");
        }

        let end = self
            .lexer
            .find(b"endstream")
            .ok_or(ParseError::SyntaxError {
                position: start,
                message: "stream without endstream".to_string(),
            })?;
        let mut data_end = end;
        // Drop the EOL that precedes endstream.
        if data_end > start && data[data_end - 1] == b'\n' {
            data_end -= 1;
        }
        if data_end > start && data[data_end - 1] == b'\r' {
            data_end -= 1;
        }
        self.lexer.seek(end + b"endstream".len());
        self.skip_endobj()?;
        Ok(data[start..data_end].to_vec())
    }

    fn skip_endobj(&mut self) -> ParseResult<()> {
        let token = self.lexer.next_token()?;
        if !token.is_keyword("endobj") {
            self.lexer.push_token(token);
        }
        Ok(())
    }
}

/// Parses a single value from bytes, ignoring anything after it.
pub fn parse_value(data: &[u8]) -> ParseResult<Value> {
    ObjectParser::new(data).parse_value()
}

/// True if `data[pos..]` begins a line with `n g obj`.
pub(crate) fn looks_like_object_header(data: &[u8], pos: usize) -> Option<(ObjectId, usize)> {
    if pos > 0 && !is_whitespace(data[pos - 1]) {
        return None;
    }
    let mut lexer = Lexer::at(data, pos);
    let number = match lexer.next_token().ok()? {
        Token::Integer(n) if n > 0 && n <= u32::MAX as i64 => n as u32,
        _ => return None,
    };
    let generation = match lexer.next_token().ok()? {
        Token::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g as u16,
        _ => return None,
    };
    if lexer.next_token().ok()?.is_keyword("obj") {
        Some((ObjectId::new(number, generation), pos))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        let value = parse_value(b"[1 0 R 2 5]").unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::Reference(ObjectId::new(1, 0)),
                Value::Number(2.0),
                Value::Number(5.0),
            ])
        );
    }

    #[test]
    fn test_parse_nested_dictionary() {
        let value = parse_value(b"<< /Type /Page /Resources << /Font << /F1 4 0 R >> >> >>")
            .unwrap();
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.get_name("Type"), Some("Page"));
        let font = dict
            .get_dict("Resources")
            .and_then(|r| r.get_dict("Font"))
            .unwrap();
        assert_eq!(font.get("F1"), Some(&Value::Reference(ObjectId::new(4, 0))));
    }

    #[test]
    fn test_indirect_object_with_stream() {
        let data = b"7 0 obj\n<< /Length 5 >>\nstream\nhello\nendstream\nendobj\n";
        let mut parser = ObjectParser::new(data);
        let (id, value) = parser.parse_indirect_object(&NoLengths).unwrap();
        assert_eq!(id, ObjectId::new(7, 0));
        assert_eq!(value.as_stream().unwrap().data(), b"hello");
    }

    #[test]
    fn test_stream_with_wrong_length_is_rescanned() {
        let data = b"3 0 obj\n<< /Length 99 >>\nstream\r\nabc\r\nendstream\nendobj";
        let mut parser = ObjectParser::new(data);
        let (_, value) = parser.parse_indirect_object(&NoLengths).unwrap();
        assert_eq!(value.as_stream().unwrap().data(), b"abc");
    }

    #[test]
    fn test_indirect_length_resolver() {
        struct Fixed;
        impl LengthResolver for Fixed {
            fn resolve_length(&self, _id: ObjectId) -> Option<usize> {
                Some(4)
            }
        }
        let data = b"3 0 obj\n<< /Length 9 0 R >>\nstream\nab\ncendstream\nendobj";
        let mut parser = ObjectParser::new(data);
        let (_, value) = parser.parse_indirect_object(&Fixed).unwrap();
        assert_eq!(value.as_stream().unwrap().data(), b"ab\nc");
    }

    #[test]
    fn test_object_header_detection() {
        let data = b"junk\n12 0 obj << >> endobj";
        assert_eq!(
            looks_like_object_header(data, 5),
            Some((ObjectId::new(12, 0), 5))
        );
        assert_eq!(looks_like_object_header(data, 6), None);
    }

    #[test]
    fn test_bad_dictionary_key() {
        assert!(parse_value(b"<< 1 2 >>").is_err());
    }
}
