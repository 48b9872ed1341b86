//! # Serializer Back-End
//!
//! Writes a schema-valid [`Value`] as JSON text, directed by a compiled
//! [`Program`].
//!
//! Input is assumed valid and is not re-checked. Values with the wrong
//! shape for their node fall back to generic JSON output, so invalid input
//! still produces well-formed text. For every value the schema accepts,
//! parsing the output yields a deep-equal value.
//!
//! ## Output Rules
//!
//! - Strings and object keys use standard JSON escaping.
//! - Numbers are written in their natural JSON form, as stored.
//! - Timestamp strings are written verbatim. Produce them with
//!   [`Timestamp`](jtdc_core::Timestamp) for fixed millisecond precision.
//! - Properties are written required first, then optional, each in
//!   declaration order; absent optional members are omitted. Undeclared
//!   members follow only when `additionalProperties` is true.
//! - For a discriminator, the active branch is the one named by the tag
//!   member of the object itself. The tag is written first.

use std::sync::Arc;

use jtdc_core::SerializeError;
use serde_json::{Map, Value};

use crate::config::CompilerConfig;
use crate::program::{Node, NodeKind, Program, PropertiesNode};

/// A compiled serializer.
#[derive(Debug, Clone)]
pub struct Serializer {
    program: Arc<Program>,
    config: CompilerConfig,
}

impl Serializer {
    /// Create a serializer for `program`.
    pub fn new(program: Arc<Program>, config: CompilerConfig) -> Self {
        Self { program, config }
    }

    /// The program this serializer runs.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Serialize `value` to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `SerializeError::MaxDepthExceeded` if nesting exceeds
    /// `max_depth`.
    pub fn serialize(&self, value: &Value) -> Result<String, SerializeError> {
        let mut out = Vec::with_capacity(128);
        self.serialize_into(value, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    /// Append the JSON text for `value` to `out`.
    ///
    /// # Errors
    ///
    /// Same as [`serialize`](Self::serialize).
    pub fn serialize_into(&self, value: &Value, out: &mut Vec<u8>) -> Result<(), SerializeError> {
        let mut emit = Emit {
            program: &self.program,
            limit: self.config.max_depth,
            out,
            depth: 0,
        };
        emit.node(self.program.root(), value)
    }
}

struct Emit<'a> {
    program: &'a Program,
    limit: usize,
    out: &'a mut Vec<u8>,
    depth: usize,
}

impl<'a> Emit<'a> {
    fn node(&mut self, node: &'a Node, value: &Value) -> Result<(), SerializeError> {
        if self.depth >= self.limit {
            return Err(SerializeError::MaxDepthExceeded { limit: self.limit });
        }
        self.depth += 1;
        let result = self.form(node, value);
        self.depth -= 1;
        result
    }

    fn form(&mut self, node: &'a Node, value: &Value) -> Result<(), SerializeError> {
        match (&node.kind, value) {
            (_, Value::Null) => self.out.extend_from_slice(b"null"),
            (NodeKind::Ref(id), _) => {
                let program = self.program;
                return self.node(program.unit(*id), value);
            }
            (NodeKind::Elements(item), Value::Array(items)) => {
                self.out.push(b'[');
                for (i, element) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push(b',');
                    }
                    self.node(item, element)?;
                }
                self.out.push(b']');
            }
            (NodeKind::Values(item), Value::Object(members)) => {
                self.out.push(b'{');
                for (i, (key, member)) in members.iter().enumerate() {
                    if i > 0 {
                        self.out.push(b',');
                    }
                    self.key(key)?;
                    self.node(item, member)?;
                }
                self.out.push(b'}');
            }
            (NodeKind::Properties(props), Value::Object(members)) => {
                self.object(props, members, None)?;
            }
            (NodeKind::Discriminator(disc), Value::Object(members)) => {
                let active = members
                    .get(&disc.tag)
                    .and_then(Value::as_str)
                    .and_then(|tag_value| disc.branch(tag_value).map(|b| (tag_value, b)));
                match active {
                    Some((tag_value, branch)) => {
                        self.object(&branch.properties, members, Some((disc.tag.as_str(), tag_value)))?;
                    }
                    None => self.generic(value)?,
                }
            }
            _ => self.generic(value)?,
        }
        Ok(())
    }

    fn object(
        &mut self,
        props: &'a PropertiesNode,
        members: &Map<String, Value>,
        tag: Option<(&str, &str)>,
    ) -> Result<(), SerializeError> {
        self.out.push(b'{');
        let mut first = true;
        if let Some((tag, tag_value)) = tag {
            self.key(tag)?;
            serde_json::to_writer(&mut *self.out, tag_value)?;
            first = false;
        }
        for member in props.required.iter().chain(&props.optional) {
            let Some(value) = members.get(&member.name) else {
                continue;
            };
            self.separator(&mut first);
            self.key(&member.name)?;
            self.node(&member.node, value)?;
        }
        if props.additional {
            for (key, value) in members {
                if tag.is_some_and(|(t, _)| t == key.as_str()) || props.index.contains_key(key) {
                    continue;
                }
                self.separator(&mut first);
                self.key(key)?;
                self.generic(value)?;
            }
        }
        self.out.push(b'}');
        Ok(())
    }

    fn separator(&mut self, first: &mut bool) {
        if !*first {
            self.out.push(b',');
        }
        *first = false;
    }

    fn key(&mut self, key: &str) -> Result<(), SerializeError> {
        serde_json::to_writer(&mut *self.out, key)?;
        self.out.push(b':');
        Ok(())
    }

    fn generic(&mut self, value: &Value) -> Result<(), SerializeError> {
        serde_json::to_writer(&mut *self.out, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Compiler;
    use jtdc_core::Timestamp;
    use serde_json::json;

    fn serialize(schema: Value, value: Value) -> String {
        Compiler::default()
            .compile_serializer(&schema)
            .unwrap()
            .serialize(&value)
            .unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(serialize(json!({"type": "string"}), json!("a\"b\n")), r#""a\"b\n""#);
        assert_eq!(serialize(json!({"type": "int32"}), json!(-7)), "-7");
        assert_eq!(serialize(json!({"type": "float64"}), json!(1.5)), "1.5");
        assert_eq!(serialize(json!({"type": "boolean"}), json!(true)), "true");
        assert_eq!(serialize(json!({"enum": ["A"]}), json!("A")), r#""A""#);
    }

    #[test]
    fn test_nullable_writes_null() {
        let schema = json!({"elements": {"type": "int8"}, "nullable": true});
        assert_eq!(serialize(schema, json!(null)), "null");
    }

    #[test]
    fn test_properties_in_declared_order() {
        let schema = json!({
            "properties": {"b": {"type": "string"}, "a": {"type": "string"}},
            "optionalProperties": {"c": {"type": "uint8"}}
        });
        assert_eq!(serialize(schema.clone(), json!({"a": "1", "c": 3, "b": "2"})), r#"{"b":"2","a":"1","c":3}"#);
        assert_eq!(serialize(schema, json!({"a": "1", "b": "2"})), r#"{"b":"2","a":"1"}"#);
    }

    #[test]
    fn test_optional_only_object() {
        let schema = json!({"optionalProperties": {"x": {}, "y": {}}});
        assert_eq!(serialize(schema.clone(), json!({})), "{}");
        assert_eq!(serialize(schema, json!({"y": [1]})), r#"{"y":[1]}"#);
    }

    #[test]
    fn test_additional_members_follow_declared() {
        let schema = json!({"properties": {"a": {}}, "additionalProperties": true});
        assert_eq!(serialize(schema, json!({"z": 1, "a": 2})), r#"{"a":2,"z":1}"#);
    }

    #[test]
    fn test_undeclared_members_dropped_when_not_allowed() {
        let schema = json!({"properties": {"a": {}}});
        assert_eq!(serialize(schema, json!({"z": 1, "a": 2})), r#"{"a":2}"#);
    }

    #[test]
    fn test_discriminator_tag_first() {
        let schema = json!({
            "discriminator": "kind",
            "mapping": {"circle": {"properties": {"r": {"type": "float64"}}}}
        });
        assert_eq!(serialize(schema.clone(), json!({"r": 2.5, "kind": "circle"})), r#"{"kind":"circle","r":2.5}"#);
        // Unmapped tags fall back to generic output.
        assert_eq!(serialize(schema, json!({"kind": "oval"})), r#"{"kind":"oval"}"#);
    }

    #[test]
    fn test_recursive_ref() {
        let schema = json!({
            "definitions": {"node": {"optionalProperties": {"next": {"ref": "node"}}}},
            "ref": "node"
        });
        let value = json!({"next": {"next": {}}});
        assert_eq!(serialize(schema, value), r#"{"next":{"next":{}}}"#);
    }

    #[test]
    fn test_timestamp_helper_output() {
        let ts = Timestamp::parse("2026-03-01T08:00:00+01:00").unwrap();
        let out = serialize(json!({"type": "timestamp"}), ts.into_value());
        assert_eq!(out, r#""2026-03-01T07:00:00.000Z""#);
    }

    #[test]
    fn test_invalid_input_still_well_formed() {
        let schema = json!({"elements": {"type": "string"}});
        let out = serialize(schema, json!({"not": "an array"}));
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"not": "an array"}));
    }

    #[test]
    fn test_depth_limit() {
        let serializer = Compiler::new(CompilerConfig::default().with_max_depth(4))
            .compile_serializer(&json!({"elements": {"elements": {"elements": {"elements": {}}}}}))
            .unwrap();
        let err = serializer.serialize(&json!([[[[[1]]]]])).unwrap_err();
        assert!(matches!(err, SerializeError::MaxDepthExceeded { limit: 4 }));
        assert_eq!(serializer.serialize(&json!([[[]]])).unwrap(), "[[[]]]");
    }

    #[test]
    fn test_serialize_into_appends() {
        let serializer = Compiler::default()
            .compile_serializer(&json!({"type": "uint16"}))
            .unwrap();
        let mut out = b"x=".to_vec();
        serializer.serialize_into(&json!(9), &mut out).unwrap();
        assert_eq!(out, b"x=9");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::Compiler;
    use proptest::prelude::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "definitions": {
                "item": {
                    "properties": {"name": {"type": "string"}, "count": {"type": "uint16"}},
                    "optionalProperties": {"tags": {"values": {"type": "boolean"}}}
                }
            },
            "elements": {"ref": "item", "nullable": true}
        })
    }

    fn item() -> impl Strategy<Value = Value> {
        (
            "\\PC{0,12}",
            any::<u16>(),
            proptest::option::of(proptest::collection::btree_map("[a-z]{1,4}", any::<bool>(), 0..4)),
        )
            .prop_map(|(name, count, tags)| {
                let mut obj = json!({"name": name, "count": count});
                if let Some(tags) = tags {
                    obj["tags"] = json!(tags);
                }
                obj
            })
    }

    fn instance() -> impl Strategy<Value = Value> {
        proptest::collection::vec(prop_oneof![Just(Value::Null), item()], 0..6).prop_map(Value::Array)
    }

    proptest! {
        #[test]
        fn serialized_text_reparses_equal(value in instance()) {
            let compiler = Compiler::default();
            let text = compiler.compile_serializer(&schema()).unwrap().serialize(&value).unwrap();
            let reparsed: Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(reparsed, value.clone());
            let parsed = compiler.compile_parser(&schema()).unwrap().parse(&text).unwrap();
            prop_assert_eq!(parsed, value);
        }
    }
}
