//! PDF Lexer
//!
//! Tokenizes PDF syntax (ISO 32000-1 Section 7.2) over an in-memory byte
//! slice. The same lexer drives both the object parser and the content
//! stream tokenizer; operators and file keywords both come out as
//! [`Token::Keyword`].

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal), raw bytes
    String(Vec<u8>),

    /// Name object without the leading slash, `#xx` escapes decoded
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Null object
    Null,

    /// Any other bare word: `obj`, `R`, `stream`, content operators
    Keyword(String),

    /// End of input
    Eof,
}

impl Token {
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self, Token::Keyword(k) if k == word)
    }
}

pub(crate) fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

pub(crate) fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// PDF Lexer for tokenizing PDF content
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
    token_buffer: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            token_buffer: Vec::new(),
        }
    }

    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self {
            data,
            position: position.min(data.len()),
            token_buffer: Vec::new(),
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Byte offset of the next unread character. Pushed-back tokens are
    /// not accounted for.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.token_buffer.clear();
        self.position = position.min(self.data.len());
    }

    /// Push a token back so the next `next_token` returns it.
    pub fn push_token(&mut self, token: Token) {
        self.token_buffer.push(token);
    }

    /// Get the next token, skipping comments.
    pub fn next_token(&mut self) -> ParseResult<Token> {
        if let Some(token) = self.token_buffer.pop() {
            return Ok(token);
        }

        loop {
            self.skip_whitespace();
            match self.peek_char() {
                Some(b'%') => self.skip_comment(),
                _ => break,
            }
        }

        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.consume_char();
                if self.peek_char() == Some(b'>') {
                    self.consume_char();
                    Ok(Token::DictEnd)
                } else {
                    Err(self.syntax_error("Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.consume_char();
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.consume_char();
                Ok(Token::ArrayEnd)
            }
            b'{' | b'}' => {
                // PostScript calculator braces; only meaningful inside
                // type 4 functions, surfaced as keywords.
                self.consume_char();
                Ok(Token::Keyword((ch as char).to_string()))
            }
            b')' => {
                self.consume_char();
                Err(self.syntax_error("Unbalanced ')'"))
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ => self.read_keyword(),
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let token = self.next_token()?;
        self.push_token(token.clone());
        Ok(token)
    }

    pub(crate) fn peek_char(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    pub(crate) fn consume_char(&mut self) -> Option<u8> {
        let ch = self.peek_char();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    /// Skip whitespace and return the number of bytes skipped
    pub(crate) fn skip_whitespace(&mut self) -> usize {
        let start = self.position;
        while matches!(self.peek_char(), Some(ch) if is_whitespace(ch)) {
            self.position += 1;
        }
        self.position - start
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.position += 1;
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::SyntaxError {
            position: self.position,
            message: message.into(),
        }
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> ParseResult<Token> {
        self.consume_char(); // consume '/'
        let mut name = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.consume_char();

            // /A#20B means "A B"
            if ch == b'#' {
                let hi = self.consume_char().and_then(hex_value);
                let lo = self.consume_char().and_then(hex_value);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => name.push(hi << 4 | lo),
                    _ => return Err(self.syntax_error("Invalid hex code in name")),
                }
            } else {
                name.push(ch);
            }
        }

        Ok(Token::Name(String::from_utf8_lossy(&name).into_owned()))
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.consume_char(); // consume '('
        let mut string = Vec::new();
        let mut paren_depth = 1;

        while paren_depth > 0 {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.syntax_error("Unterminated string"))?;

            match ch {
                b'\\' => {
                    let next = self
                        .consume_char()
                        .ok_or_else(|| self.syntax_error("Unterminated string"))?;
                    match next {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'0'..=b'7' => {
                            let mut value = (next - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek_char() {
                                    Some(d @ b'0'..=b'7') => {
                                        self.consume_char();
                                        value = value * 8 + (d - b'0') as u32;
                                    }
                                    _ => break,
                                }
                            }
                            string.push(value as u8);
                        }
                        // Line continuation
                        b'\r' => {
                            if self.peek_char() == Some(b'\n') {
                                self.consume_char();
                            }
                        }
                        b'\n' => {}
                        other => string.push(other),
                    }
                }
                b'(' => {
                    string.push(ch);
                    paren_depth += 1;
                }
                b')' => {
                    paren_depth -= 1;
                    if paren_depth > 0 {
                        string.push(ch);
                    }
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        self.consume_char(); // consume '<'

        if self.peek_char() == Some(b'<') {
            self.consume_char();
            return Ok(Token::DictStart);
        }

        let mut nibbles = Vec::new();
        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.syntax_error("Unterminated hex string"))?;
            if ch == b'>' {
                break;
            }
            if let Some(v) = hex_value(ch) {
                nibbles.push(v);
            } else if !is_whitespace(ch) {
                return Err(self.syntax_error("Invalid character in hex string"));
            }
        }

        // Pad with 0 if odd number of digits
        if nibbles.len() % 2 != 0 {
            nibbles.push(0);
        }
        let bytes = nibbles.chunks(2).map(|p| p[0] << 4 | p[1]).collect();
        Ok(Token::String(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let mut has_dot = false;

        if matches!(self.peek_char(), Some(b'+' | b'-')) {
            self.consume_char();
            // Some producers write "--5" or "-+5"; tolerate a repeated sign.
            while matches!(self.peek_char(), Some(b'+' | b'-')) {
                self.consume_char();
            }
        }

        while let Some(ch) = self.peek_char() {
            match ch {
                b'0'..=b'9' => {
                    self.consume_char();
                }
                b'.' if !has_dot => {
                    self.consume_char();
                    has_dot = true;
                }
                _ => break,
            }
        }

        let raw = String::from_utf8_lossy(&self.data[start..self.position]).into_owned();
        let negative = raw.starts_with('-');
        let digits: String = raw
            .trim_start_matches(['+', '-'])
            .to_string();

        if digits.is_empty() || digits == "." {
            // A lone sign or dot acts like zero.
            return Ok(Token::Integer(0));
        }

        if has_dot {
            let value = format!("0{digits}")
                .parse::<f64>()
                .map_err(|_| self.syntax_error(format!("Invalid real number: '{raw}'")))?;
            Ok(Token::Real(if negative { -value } else { value }))
        } else {
            match digits.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(if negative { -value } else { value })),
                // Overflowing integers degrade to reals.
                Err(_) => {
                    let value = digits
                        .parse::<f64>()
                        .map_err(|_| self.syntax_error(format!("Invalid integer: '{raw}'")))?;
                    Ok(Token::Real(if negative { -value } else { value }))
                }
            }
        }
    }

    fn read_keyword(&mut self) -> ParseResult<Token> {
        let word = self.read_word();
        if word.is_empty() {
            // A stray delimiter-like byte; skip it so callers make progress.
            let ch = self.consume_char().unwrap_or(b' ');
            return Err(self.syntax_error(format!("Unexpected character: {}", ch as char)));
        }
        Ok(match word.as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            _ => Token::Keyword(word),
        })
    }

    /// Read a word (sequence of non-delimiter characters)
    fn read_word(&mut self) -> String {
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;
        }
        String::from_utf8_lossy(&self.data[start..self.position]).into_owned()
    }

    /// Skips a single end-of-line marker (CRLF, LF or CR).
    pub(crate) fn skip_eol(&mut self) {
        match self.peek_char() {
            Some(b'\r') => {
                self.consume_char();
                if self.peek_char() == Some(b'\n') {
                    self.consume_char();
                }
            }
            Some(b'\n') => {
                self.consume_char();
            }
            _ => {}
        }
    }

    /// Finds `needle` at or after the current position.
    pub(crate) fn find(&self, needle: &[u8]) -> Option<usize> {
        find_bytes(&self.data[self.position..], needle).map(|i| i + self.position)
    }
}

pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub(crate) fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            match lexer.next_token().unwrap() {
                Token::Eof => break,
                t => out.push(t),
            }
        }
        out
    }

    #[test]
    fn test_basic_tokens() {
        let toks = tokens(b"<< /Type /Page /Count 3 >> [1 2.5 -3] true null");
        assert_eq!(
            toks,
            vec![
                Token::DictStart,
                Token::Name("Type".into()),
                Token::Name("Page".into()),
                Token::Name("Count".into()),
                Token::Integer(3),
                Token::DictEnd,
                Token::ArrayStart,
                Token::Integer(1),
                Token::Real(2.5),
                Token::Integer(-3),
                Token::ArrayEnd,
                Token::Boolean(true),
                Token::Null,
            ]
        );
    }

    #[test]
    fn test_name_hex_escape() {
        assert_eq!(tokens(b"/A#20B"), vec![Token::Name("A B".into())]);
    }

    #[test]
    fn test_literal_string_escapes() {
        let toks = tokens(br"(a\(b\)c\\d\n\101 (nested))");
        assert_eq!(
            toks,
            vec![Token::String(b"a(b)c\\d\nA (nested)".to_vec())]
        );
    }

    #[test]
    fn test_literal_string_line_continuation() {
        assert_eq!(
            tokens(b"(abc\\\r\ndef)"),
            vec![Token::String(b"abcdef".to_vec())]
        );
    }

    #[test]
    fn test_hex_string_odd_digits() {
        assert_eq!(
            tokens(b"<48 65 6C 6C 6F 7>"),
            vec![Token::String(b"Hello\x70".to_vec())]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens(b".5 -.25 +7 4."),
            vec![
                Token::Real(0.5),
                Token::Real(-0.25),
                Token::Integer(7),
                Token::Real(4.0),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            tokens(b"%PDF-1.4\n1 % trailing\n2"),
            vec![Token::Integer(1), Token::Integer(2)]
        );
    }

    #[test]
    fn test_operators_are_keywords() {
        assert_eq!(
            tokens(b"0 0 m f* ' \" T*"),
            vec![
                Token::Integer(0),
                Token::Integer(0),
                Token::Keyword("m".into()),
                Token::Keyword("f*".into()),
                Token::Keyword("'".into()),
                Token::Keyword("\"".into()),
                Token::Keyword("T*".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let mut lexer = Lexer::new(b"(never closed");
        assert!(matches!(
            lexer.next_token(),
            Err(ParseError::SyntaxError { .. })
        ));
    }

    #[test]
    fn test_push_and_peek() {
        let mut lexer = Lexer::new(b"1 0 R");
        assert_eq!(lexer.peek_token().unwrap(), Token::Integer(1));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(1));
        lexer.push_token(Token::Integer(9));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(9));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(0));
        assert!(lexer.next_token().unwrap().is_keyword("R"));
    }

    #[test]
    fn test_find_helpers() {
        assert_eq!(find_bytes(b"abcabc", b"bc"), Some(1));
        assert_eq!(rfind_bytes(b"abcabc", b"bc"), Some(4));
        assert_eq!(find_bytes(b"ab", b"abc"), None);
    }
}
