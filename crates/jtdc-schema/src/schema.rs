//! # Schema Model
//!
//! In-memory representation of a checked JTD document.
//!
//! ## Invariants
//!
//! Every value of these types was produced by the meta-schema checker, so:
//!
//! - each node carries exactly one [`Form`];
//! - `Properties` required and optional names are disjoint;
//! - `Enum` values are non-empty and distinct;
//! - discriminator mapping entries are properties-form, non-nullable, and do
//!   not declare the tag as a property;
//! - every `Ref` names an entry of [`Document::definitions`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A checked JTD document: root schema plus its definitions registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Schema,
    definitions: BTreeMap<String, Schema>,
}

impl Document {
    pub(crate) fn new(root: Schema, definitions: BTreeMap<String, Schema>) -> Self {
        Self { root, definitions }
    }

    /// The root schema node.
    pub fn root(&self) -> &Schema {
        &self.root
    }

    /// All named definitions, sorted by name.
    pub fn definitions(&self) -> &BTreeMap<String, Schema> {
        &self.definitions
    }

    /// Look up a definition by name.
    pub fn definition(&self, name: &str) -> Option<&Schema> {
        self.definitions.get(name)
    }
}

/// One schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Whether `null` is accepted in addition to the form.
    pub nullable: bool,
    /// The `metadata` object, ignored by every back-end.
    pub metadata: Option<Map<String, Value>>,
    /// The single active form.
    pub form: Form,
}

/// The eight JTD forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    /// No form keyword: accepts any value.
    Empty,
    /// Reference to a named definition.
    Ref {
        /// Definition name.
        name: String,
    },
    /// A primitive type.
    Type {
        /// Which of the eleven types.
        kind: TypeKind,
    },
    /// One of a fixed set of strings.
    Enum {
        /// Distinct values in declaration order.
        values: Vec<String>,
    },
    /// An array whose items all match `item`.
    Elements {
        /// Item schema.
        item: Box<Schema>,
    },
    /// An object whose member values all match `item`.
    Values {
        /// Member value schema.
        item: Box<Schema>,
    },
    /// An object with known members.
    Properties(Properties),
    /// A tagged union of properties-form objects.
    Discriminator {
        /// Name of the tag member.
        tag: String,
        /// Tag value to branch, in declaration order.
        mapping: Vec<(String, Mapping)>,
    },
}

/// Members of a properties-form schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties {
    /// Required members in declaration order.
    pub required: Vec<(String, Schema)>,
    /// Optional members in declaration order.
    pub optional: Vec<(String, Schema)>,
    /// Whether undeclared members are tolerated.
    pub additional: bool,
    /// Whether the `properties` keyword was present (possibly empty).
    pub has_required_keyword: bool,
}

impl Properties {
    /// Keyword reported when the instance is not an object: `properties`
    /// if the schema declared it, otherwise `optionalProperties`.
    pub fn container_keyword(&self) -> &'static str {
        if self.has_required_keyword {
            "properties"
        } else {
            "optionalProperties"
        }
    }
}

/// One branch of a discriminator mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    /// The branch's `metadata` object.
    pub metadata: Option<Map<String, Value>>,
    /// The branch's members; never includes the tag.
    pub properties: Properties,
}

/// The eleven primitive types of the `type` form.
///
/// Serializes as its keyword value (`"uint8"`, `"timestamp"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Boolean,
    Float32,
    Float64,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    String,
    Timestamp,
}

impl TypeKind {
    /// Every type, in keyword order.
    pub const ALL: [TypeKind; 11] = [
        Self::Boolean,
        Self::Float32,
        Self::Float64,
        Self::Int8,
        Self::Uint8,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::String,
        Self::Timestamp,
    ];

    /// Look up a type by its keyword value.
    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// The keyword value naming this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::String => "string",
            Self::Timestamp => "timestamp",
        }
    }

    /// True for the float and integer types.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Boolean | Self::String | Self::Timestamp)
    }

    /// Inclusive bounds of the integer types.
    pub fn integer_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::Int8 => Some((i8::MIN.into(), i8::MAX.into())),
            Self::Uint8 => Some((0, u8::MAX.into())),
            Self::Int16 => Some((i16::MIN.into(), i16::MAX.into())),
            Self::Uint16 => Some((0, u16::MAX.into())),
            Self::Int32 => Some((i32::MIN.into(), i32::MAX.into())),
            Self::Uint32 => Some((0, u32::MAX.into())),
            _ => None,
        }
    }

    /// Whether a JSON number satisfies this type.
    ///
    /// Float types accept any number. Integer types require an integral
    /// value (`3.0` counts) inside their bounds; with `int32_range` off,
    /// `int32` and `uint32` only require an integral value.
    pub fn accepts_number(&self, n: &Number, int32_range: bool) -> bool {
        let Some((min, max)) = self.integer_bounds() else {
            return self.is_numeric();
        };
        if !is_integral(n) {
            return false;
        }
        if !int32_range && matches!(self, Self::Int32 | Self::Uint32) {
            return true;
        }
        if let Some(i) = n.as_i64() {
            return (min..=max).contains(&i);
        }
        if n.is_u64() {
            return false;
        }
        n.as_f64()
            .is_some_and(|f| f >= min as f64 && f <= max as f64)
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn number(v: Value) -> Number {
        match v {
            Value::Number(n) => n,
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn test_type_keywords_round_trip() {
        for kind in TypeKind::ALL {
            assert_eq!(TypeKind::from_keyword(kind.as_str()), Some(kind));
        }
        assert_eq!(TypeKind::from_keyword("int64"), None);
        assert_eq!(TypeKind::from_keyword("number"), None);
    }

    #[test]
    fn test_type_kind_serde_uses_keywords() {
        for kind in TypeKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
        let parsed: TypeKind = serde_json::from_value(json!("float32")).unwrap();
        assert_eq!(parsed, TypeKind::Float32);
    }

    #[test]
    fn test_integer_bounds_are_inclusive() {
        assert!(TypeKind::Int8.accepts_number(&number(json!(-128)), true));
        assert!(TypeKind::Int8.accepts_number(&number(json!(127)), true));
        assert!(!TypeKind::Int8.accepts_number(&number(json!(128)), true));
        assert!(!TypeKind::Uint8.accepts_number(&number(json!(-1)), true));
        assert!(TypeKind::Uint32.accepts_number(&number(json!(4294967295u64)), true));
        assert!(!TypeKind::Uint32.accepts_number(&number(json!(4294967296u64)), true));
    }

    #[test]
    fn test_integral_floats_accepted_by_integer_types() {
        assert!(TypeKind::Int16.accepts_number(&number(json!(3.0)), true));
        assert!(!TypeKind::Int16.accepts_number(&number(json!(3.5)), true));
    }

    #[test]
    fn test_float_types_accept_any_number() {
        assert!(TypeKind::Float32.accepts_number(&number(json!(3.5)), true));
        assert!(TypeKind::Float64.accepts_number(&number(json!(-1e300)), true));
        assert!(TypeKind::Float64.accepts_number(&number(json!(u64::MAX)), true));
    }

    #[test]
    fn test_int32_range_off_only_checks_integral() {
        let big = number(json!(1u64 << 40));
        assert!(!TypeKind::Int32.accepts_number(&big, true));
        assert!(TypeKind::Int32.accepts_number(&big, false));
        assert!(!TypeKind::Int32.accepts_number(&number(json!(0.5)), false));
        assert!(!TypeKind::Int16.accepts_number(&big, false));
    }

    #[test]
    fn test_non_numeric_types_reject_numbers() {
        assert!(!TypeKind::String.accepts_number(&number(json!(1)), true));
        assert!(!TypeKind::Boolean.accepts_number(&number(json!(0)), true));
    }

    #[test]
    fn test_properties_container_keyword() {
        let mut props = Properties::default();
        assert_eq!(props.container_keyword(), "optionalProperties");
        props.has_required_keyword = true;
        assert_eq!(props.container_keyword(), "properties");
    }
}
