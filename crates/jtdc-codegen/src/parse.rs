//! # Parser Back-End: Fused Lex and Validate
//!
//! Reads JSON text directly into a [`Value`], checking it against a
//! compiled [`Program`] while lexing. There is no intermediate untyped
//! value: each node reads exactly the tokens its form allows and aborts at
//! the first mismatch, reporting a message and the byte offset where
//! parsing stopped. No partial value is ever returned.
//!
//! Acceptance matches the validator: a text parses iff the value it
//! denotes validates, and the parsed value is deep-equal to what
//! `serde_json` reads from the same text. Object members are kept in text
//! order.
//!
//! ## Failure Positions
//!
//! - Wrong token, type mismatch, unknown enum value: start of the token.
//! - Unexpected property, duplicate key: start of the key.
//! - Missing required property, missing discriminator tag: the closing `}`.
//! - Unmapped or non-string discriminator tag: start of the tag value.
//! - Trailing content: its first non-whitespace byte.
//!
//! ## Discriminators
//!
//! A discriminator object is scanned ahead for its tag (skipping other
//! members), then re-read from its opening brace against the selected
//! branch, so the tag may appear anywhere among the members.

use std::sync::Arc;

use jtdc_core::ParseError;
use jtdc_schema::TypeKind;
use serde_json::{Map, Value};

use crate::config::CompilerConfig;
use crate::lexer::Lexer;
use crate::program::{DiscriminatorNode, Node, NodeKind, Program, PropertiesNode, Slot};
use crate::validate::type_accepts;

/// A compiled fused parser.
#[derive(Debug, Clone)]
pub struct Parser {
    program: Arc<Program>,
    config: CompilerConfig,
}

impl Parser {
    /// Create a parser for `program`.
    pub fn new(program: Arc<Program>, config: CompilerConfig) -> Self {
        Self { program, config }
    }

    /// The program this parser runs.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Parse `text` as exactly one schema-valid JSON value.
    ///
    /// Insignificant whitespace is allowed anywhere JSON allows it,
    /// including around the whole document.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` carrying the reason and the zero-based byte
    /// offset at which parsing stopped.
    pub fn parse(&self, text: &str) -> Result<Value, ParseError> {
        let mut run = Run {
            program: &self.program,
            config: &self.config,
            lex: Lexer::new(text),
            depth: 0,
        };
        let value = run.node(self.program.root())?;
        run.lex.skip_ws();
        if !run.lex.at_end() {
            return Err(run.lex.error("unexpected content after value"));
        }
        Ok(value)
    }

    /// A session that records the outcome of each parse.
    pub fn session(&self) -> ParseSession {
        ParseSession::new(self.clone())
    }
}

/// A parser with a failure side-channel.
///
/// After each [`parse`](Self::parse), [`message`](Self::message) and
/// [`position`](Self::position) describe the failure, or are both `None`
/// if the parse succeeded.
#[derive(Debug, Clone)]
pub struct ParseSession {
    parser: Parser,
    message: Option<String>,
    position: Option<usize>,
}

impl ParseSession {
    /// Wrap `parser`.
    pub fn new(parser: Parser) -> Self {
        Self {
            parser,
            message: None,
            position: None,
        }
    }

    /// Parse `text`, returning the value on success.
    pub fn parse(&mut self, text: &str) -> Option<Value> {
        match self.parser.parse(text) {
            Ok(value) => {
                self.message = None;
                self.position = None;
                Some(value)
            }
            Err(e) => {
                self.position = Some(e.position());
                self.message = Some(e.message().to_string());
                None
            }
        }
    }

    /// Why the last parse failed.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Byte offset where the last parse stopped.
    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

struct Run<'a, 't> {
    program: &'a Program,
    config: &'a CompilerConfig,
    lex: Lexer<'t>,
    depth: usize,
}

impl<'a, 't> Run<'a, 't> {
    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.config.max_depth {
            return Err(self
                .lex
                .error(format!("maximum depth of {} exceeded", self.config.max_depth)));
        }
        self.depth += 1;
        Ok(())
    }

    fn node(&mut self, node: &'a Node) -> Result<Value, ParseError> {
        self.enter()?;
        let value = self.form(node)?;
        self.depth -= 1;
        Ok(value)
    }

    fn form(&mut self, node: &'a Node) -> Result<Value, ParseError> {
        self.lex.skip_ws();
        if node.nullable && self.lex.peek() == Some(b'n') {
            self.lex.literal("null")?;
            return Ok(Value::Null);
        }
        match &node.kind {
            NodeKind::Empty => self.any(),
            NodeKind::Ref(id) => {
                let program = self.program;
                self.node(program.unit(*id))
            }
            NodeKind::Type(kind) => self.primitive(*kind),
            NodeKind::Enum(values) => {
                let start = self.lex.pos();
                if self.lex.peek() != Some(b'"') {
                    return Err(self.lex.unexpected("enum string"));
                }
                let s = self.lex.string()?;
                if !values.contains(&s) {
                    return Err(ParseError::new(format!("unrecognized enum value {s:?}"), start));
                }
                Ok(Value::String(s))
            }
            NodeKind::Elements(item) => {
                self.lex.expect(b'[', "array")?;
                let mut items = Vec::new();
                self.lex.skip_ws();
                if self.lex.eat(b']') {
                    return Ok(Value::Array(items));
                }
                loop {
                    items.push(self.node(item)?);
                    self.lex.skip_ws();
                    if self.lex.eat(b',') {
                        continue;
                    }
                    self.lex.expect(b']', "',' or ']'")?;
                    return Ok(Value::Array(items));
                }
            }
            NodeKind::Values(item) => {
                self.lex.expect(b'{', "object")?;
                let mut members = Map::new();
                if self.open_members()? {
                    loop {
                        let key = self.key(&members)?;
                        let value = self.node(item)?;
                        members.insert(key, value);
                        if self.close_or_continue()?.is_some() {
                            break;
                        }
                    }
                }
                Ok(Value::Object(members))
            }
            NodeKind::Properties(props) => {
                self.lex.expect(b'{', "object")?;
                self.properties(props, None)
            }
            NodeKind::Discriminator(disc) => self.discriminator(disc),
        }
    }

    /// A scalar checked by the same rule the validator applies.
    fn primitive(&mut self, kind: TypeKind) -> Result<Value, ParseError> {
        let start = self.lex.pos();
        let value = match self.lex.peek() {
            Some(b'"') => Value::String(self.lex.string()?),
            Some(b't') => {
                self.lex.literal("true")?;
                Value::Bool(true)
            }
            Some(b'f') => {
                self.lex.literal("false")?;
                Value::Bool(false)
            }
            Some(b'-' | b'0'..=b'9') => Value::Number(self.lex.number()?),
            _ => return Err(self.lex.unexpected(kind.as_str())),
        };
        if type_accepts(kind, &value, self.config) {
            Ok(value)
        } else {
            Err(ParseError::new(format!("expected {kind}, found {value}"), start))
        }
    }

    fn discriminator(&mut self, disc: &'a DiscriminatorNode) -> Result<Value, ParseError> {
        if self.lex.peek() != Some(b'{') {
            return Err(self.lex.unexpected("object"));
        }
        let rewind = self.lex;
        let (tag_value, tag_pos) = self.scan_tag(&disc.tag)?;
        let Some(branch) = disc.branch(&tag_value) else {
            return Err(ParseError::new(
                format!("unmapped discriminator tag value {tag_value:?}"),
                tag_pos,
            ));
        };
        self.lex = rewind;
        self.lex.expect(b'{', "object")?;
        self.properties(&branch.properties, Some(disc.tag.as_str()))
    }

    /// Find the tag member of the object starting at the cursor.
    ///
    /// Leaves the cursor wherever the scan stopped.
    fn scan_tag(&mut self, tag: &str) -> Result<(String, usize), ParseError> {
        self.lex.expect(b'{', "object")?;
        self.lex.skip_ws();
        if self.lex.peek() == Some(b'}') {
            return Err(self.lex.error(format!("missing discriminator tag {tag:?}")));
        }
        loop {
            self.lex.skip_ws();
            if self.lex.peek() != Some(b'"') {
                return Err(self.lex.unexpected("string key"));
            }
            let key = self.lex.string()?;
            self.lex.skip_ws();
            self.lex.expect(b':', "':'")?;
            self.lex.skip_ws();
            if key == tag {
                let pos = self.lex.pos();
                if self.lex.peek() != Some(b'"') {
                    return Err(self.lex.error("discriminator tag value must be a string"));
                }
                return Ok((self.lex.string()?, pos));
            }
            self.lex.skip_value()?;
            self.lex.skip_ws();
            if self.lex.eat(b',') {
                continue;
            }
            if self.lex.peek() == Some(b'}') {
                return Err(self.lex.error(format!("missing discriminator tag {tag:?}")));
            }
            return Err(self.lex.unexpected("',' or '}'"));
        }
    }

    /// Members of a properties-form object, after its opening brace.
    fn properties(&mut self, props: &'a PropertiesNode, tag: Option<&str>) -> Result<Value, ParseError> {
        let mut members = Map::new();
        let mut seen = vec![false; props.required.len()];
        let close = if self.open_members()? {
            loop {
                let key_pos = self.lex.pos();
                let key = self.key(&members)?;
                let value = if tag == Some(key.as_str()) {
                    self.lex.skip_ws();
                    Value::String(self.lex.string()?)
                } else {
                    match props.index.get(&key) {
                        Some(&slot) => {
                            if let Slot::Required(i) = slot {
                                seen[i] = true;
                            }
                            self.node(&props.member(slot).node)?
                        }
                        None if props.additional => self.any()?,
                        None => {
                            return Err(ParseError::new(format!("unexpected property {key:?}"), key_pos));
                        }
                    }
                };
                members.insert(key, value);
                if let Some(pos) = self.close_or_continue()? {
                    break pos;
                }
            }
        } else {
            self.lex.pos() - 1
        };
        if let Some(missing) = props.required.iter().zip(&seen).find(|(_, hit)| !**hit) {
            return Err(ParseError::new(
                format!("missing required property {:?}", missing.0.name),
                close,
            ));
        }
        Ok(Value::Object(members))
    }

    /// Any JSON value, with no schema constraint.
    fn any(&mut self) -> Result<Value, ParseError> {
        self.lex.skip_ws();
        match self.lex.peek() {
            Some(b'{') => {
                self.enter()?;
                self.lex.eat(b'{');
                let mut members = Map::new();
                if self.open_members()? {
                    loop {
                        let key = self.key(&members)?;
                        let value = self.any()?;
                        members.insert(key, value);
                        if self.close_or_continue()?.is_some() {
                            break;
                        }
                    }
                }
                self.depth -= 1;
                Ok(Value::Object(members))
            }
            Some(b'[') => {
                self.enter()?;
                self.lex.eat(b'[');
                let mut items = Vec::new();
                self.lex.skip_ws();
                if !self.lex.eat(b']') {
                    loop {
                        items.push(self.any()?);
                        self.lex.skip_ws();
                        if self.lex.eat(b',') {
                            continue;
                        }
                        self.lex.expect(b']', "',' or ']'")?;
                        break;
                    }
                }
                self.depth -= 1;
                Ok(Value::Array(items))
            }
            Some(b'"') => Ok(Value::String(self.lex.string()?)),
            Some(b't') => self.lex.literal("true").map(|()| Value::Bool(true)),
            Some(b'f') => self.lex.literal("false").map(|()| Value::Bool(false)),
            Some(b'n') => self.lex.literal("null").map(|()| Value::Null),
            Some(b'-' | b'0'..=b'9') => Ok(Value::Number(self.lex.number()?)),
            _ => Err(self.lex.unexpected("value")),
        }
    }

    /// After an opening brace: false if the object is empty (brace consumed).
    fn open_members(&mut self) -> Result<bool, ParseError> {
        self.lex.skip_ws();
        Ok(!self.lex.eat(b'}'))
    }

    /// Read `"key":`, rejecting duplicates of keys already in `members`.
    fn key(&mut self, members: &Map<String, Value>) -> Result<String, ParseError> {
        self.lex.skip_ws();
        let start = self.lex.pos();
        if self.lex.peek() != Some(b'"') {
            return Err(self.lex.unexpected("string key"));
        }
        let key = self.lex.string()?;
        if members.contains_key(&key) {
            return Err(ParseError::new(format!("duplicate key {key:?}"), start));
        }
        self.lex.skip_ws();
        self.lex.expect(b':', "':'")?;
        Ok(key)
    }

    /// After a member value: `Some(pos)` of the closing brace, or `None`
    /// if a comma was read.
    fn close_or_continue(&mut self) -> Result<Option<usize>, ParseError> {
        self.lex.skip_ws();
        if self.lex.eat(b',') {
            return Ok(None);
        }
        let pos = self.lex.pos();
        self.lex.expect(b'}', "',' or '}'")?;
        Ok(Some(pos))
    }
}
