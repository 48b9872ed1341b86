//! JSON token reader used by the fused parser.
//!
//! The lexer only reads tokens; all structural and schema decisions are
//! made by the parser that drives it. Positions are zero-based byte
//! offsets into the input text.

use jtdc_core::ParseError;
use serde_json::Number;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Lexer<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Lexer<'t> {
    pub fn new(text: &'t str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.pos)
    }

    /// Skip JSON insignificant whitespace.
    pub fn skip_ws(&mut self) {
        let bytes = self.text.as_bytes();
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = bytes.get(self.pos) {
            self.pos += 1;
        }
    }

    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    /// Consume `byte` if it is next.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, byte: u8, what: &str) -> Result<(), ParseError> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Error for a token other than `what`, naming what was found.
    pub fn unexpected(&self, what: &str) -> ParseError {
        match self.text[self.pos..].chars().next() {
            None => self.error(format!("expected {what}, found end of input")),
            Some(c) => self.error(format!("expected {what}, found {c:?}")),
        }
    }

    /// Read one of `true`, `false` or `null`.
    pub fn literal(&mut self, word: &'static str) -> Result<(), ParseError> {
        if self.text[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(())
        } else {
            Err(self.error(format!("invalid literal, expected {word}")))
        }
    }

    /// Read a string token starting at its opening quote.
    pub fn string(&mut self) -> Result<String, ParseError> {
        self.expect(b'"', "string")?;
        let bytes = self.text.as_bytes();
        let mut out = String::new();
        let mut run = self.pos;
        loop {
            let Some(&b) = bytes.get(self.pos) else {
                return Err(self.error("unterminated string"));
            };
            match b {
                b'"' => {
                    out.push_str(&self.text[run..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                b'\\' => {
                    out.push_str(&self.text[run..self.pos]);
                    self.escape(&mut out)?;
                    run = self.pos;
                }
                0x00..=0x1f => return Err(self.error("control character in string")),
                _ => self.pos += 1,
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated string"));
        };
        self.pos += 1;
        let c = match b {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let high = self.hex4()?;
                match high {
                    0xD800..=0xDBFF => {
                        if !self.text[self.pos..].starts_with("\\u") {
                            return Err(ParseError::new("lone surrogate in escape", start));
                        }
                        self.pos += 2;
                        let low = self.hex4()?;
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return Err(ParseError::new("invalid surrogate pair in escape", start));
                        }
                        let code = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
                        char::from_u32(code).ok_or_else(|| ParseError::new("invalid unicode escape", start))?
                    }
                    0xDC00..=0xDFFF => return Err(ParseError::new("lone surrogate in escape", start)),
                    _ => char::from_u32(u32::from(high))
                        .ok_or_else(|| ParseError::new("invalid unicode escape", start))?,
                }
            }
            _ => return Err(ParseError::new("invalid escape", start)),
        };
        out.push(c);
        Ok(())
    }

    fn hex4(&mut self) -> Result<u16, ParseError> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid unicode escape"))?;
        let value = u16::from_str_radix(digits, 16).map_err(|_| self.error("invalid unicode escape"))?;
        self.pos += 4;
        Ok(value)
    }

    /// Read a number token, following the JSON number grammar exactly.
    ///
    /// The lexeme is converted with `serde_json`'s own number parsing, so a
    /// parsed number compares equal to the same text read by `serde_json`.
    pub fn number(&mut self) -> Result<Number, ParseError> {
        let start = self.pos;
        self.eat(b'-');
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.digits(),
            _ => return Err(self.unexpected("digit")),
        }
        if self.eat(b'.') {
            if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
                return Err(self.unexpected("digit after decimal point"));
            }
            self.digits();
        }
        if self.eat(b'e') || self.eat(b'E') {
            if !self.eat(b'+') {
                self.eat(b'-');
            }
            if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
                return Err(self.unexpected("digit in exponent"));
            }
            self.digits();
        }
        self.text[start..self.pos]
            .parse::<Number>()
            .map_err(|e| ParseError::new(format!("invalid number: {e}"), start))
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    /// Skip one complete value without building it.
    ///
    /// Tokens are checked individually; container structure is only
    /// balanced, not verified. Callers re-read the same text strictly
    /// afterwards.
    pub fn skip_value(&mut self) -> Result<(), ParseError> {
        let mut open = 0usize;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'{' | b'[') => {
                    self.pos += 1;
                    open += 1;
                    continue;
                }
                Some(b'}' | b']') if open > 0 => {
                    self.pos += 1;
                    open -= 1;
                }
                Some(b',' | b':') if open > 0 => {
                    self.pos += 1;
                    continue;
                }
                Some(b'"') => {
                    self.string()?;
                }
                Some(b't') => self.literal("true")?,
                Some(b'f') => self.literal("false")?,
                Some(b'n') => self.literal("null")?,
                Some(b'-' | b'0'..=b'9') => {
                    self.number()?;
                }
                _ => return Err(self.unexpected("value")),
            }
            if open == 0 {
                return Ok(());
            }
        }
    }
}
