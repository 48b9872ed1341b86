//! # Meta-Schema Checker
//!
//! Validates a raw JSON document against the JTD meta-schema and builds
//! the [`Document`] tree.
//!
//! ## Algorithm
//!
//! 1. The root must be an object. If it has `definitions`, their names are
//!    collected before anything else is checked, so refs may point forward
//!    or be mutually recursive.
//! 2. Each definition is checked as a non-root node.
//! 3. The root is checked. For every node, each key is classified into a
//!    form group (`ref`, `type`, `enum`, `elements`, `values`,
//!    `properties`/`optionalProperties`/`additionalProperties`,
//!    `discriminator`/`mapping`). A second group, an unknown key, or a
//!    group missing its mandatory keyword is an error.
//!
//! The first rule broken, in document key order, is reported with the
//! JSON Pointer of the offending location.

use std::collections::{BTreeMap, HashSet};

use jtdc_core::{JsonPointer, SchemaError, SchemaErrorKind};
use serde_json::{Map, Value};

use crate::schema::{Document, Form, Mapping, Properties, Schema, TypeKind};

impl Document {
    /// Check a raw schema document and build its tree.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` naming the first meta-schema rule broken and
    /// where.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        check_document(value)
    }
}

/// Check a raw schema document. See the module docs for the rule order.
pub fn check_document(value: &Value) -> Result<Document, SchemaError> {
    let root_path = JsonPointer::root();
    let obj = as_schema_object(value, &root_path)?;

    let mut definitions = BTreeMap::new();
    let mut checker = Checker {
        names: HashSet::new(),
    };

    if let Some(defs) = obj.get("definitions") {
        let defs_path = root_path.child("definitions");
        let defs = defs.as_object().ok_or_else(|| wrong_type(&root_path, "definitions", "an object"))?;
        checker.names = defs.keys().cloned().collect();
        for (name, def) in defs {
            let schema = checker.check_node(def, &defs_path.child(name.as_str()), false)?;
            definitions.insert(name.clone(), schema);
        }
    }

    let root = checker.check_node(value, &root_path, true)?;
    Ok(Document::new(root, definitions))
}

struct Checker {
    names: HashSet<String>,
}

/// The mutually exclusive keyword groups.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Group {
    Ref,
    Type,
    Enum,
    Elements,
    Values,
    Properties,
    Discriminator,
}

fn group_of(keyword: &str) -> Option<Group> {
    match keyword {
        "ref" => Some(Group::Ref),
        "type" => Some(Group::Type),
        "enum" => Some(Group::Enum),
        "elements" => Some(Group::Elements),
        "values" => Some(Group::Values),
        "properties" | "optionalProperties" | "additionalProperties" => Some(Group::Properties),
        "discriminator" | "mapping" => Some(Group::Discriminator),
        _ => None,
    }
}

impl Checker {
    fn check_node(&self, value: &Value, path: &JsonPointer, is_root: bool) -> Result<Schema, SchemaError> {
        let obj = as_schema_object(value, path)?;

        let mut group: Option<(Group, &str)> = None;
        for key in obj.keys() {
            match key.as_str() {
                "definitions" if is_root => {}
                "definitions" => {
                    return Err(SchemaError::new(
                        path.child("definitions"),
                        SchemaErrorKind::NestedDefinitions,
                    ))
                }
                "nullable" | "metadata" => {}
                other => {
                    let Some(g) = group_of(other) else {
                        return Err(SchemaError::new(
                            path.child(other),
                            SchemaErrorKind::UnknownKeyword(other.to_string()),
                        ));
                    };
                    match group {
                        None => group = Some((g, other)),
                        Some((existing, _)) if existing == g => {}
                        Some((_, first)) => {
                            return Err(SchemaError::new(
                                path.clone(),
                                SchemaErrorKind::ConflictingForms {
                                    first: first.to_string(),
                                    second: other.to_string(),
                                },
                            ))
                        }
                    }
                }
            }
        }

        let nullable = match obj.get("nullable") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(wrong_type(path, "nullable", "a boolean")),
        };
        let metadata = match obj.get("metadata") {
            None => None,
            Some(Value::Object(m)) => Some(m.clone()),
            Some(_) => return Err(wrong_type(path, "metadata", "an object")),
        };

        let form = match group.map(|(g, _)| g) {
            None => Form::Empty,
            Some(Group::Ref) => self.check_ref(obj, path)?,
            Some(Group::Type) => check_type(obj, path)?,
            Some(Group::Enum) => check_enum(obj, path)?,
            Some(Group::Elements) => Form::Elements {
                item: Box::new(self.check_node(&obj["elements"], &path.child("elements"), false)?),
            },
            Some(Group::Values) => Form::Values {
                item: Box::new(self.check_node(&obj["values"], &path.child("values"), false)?),
            },
            Some(Group::Properties) => Form::Properties(self.check_properties(obj, path)?),
            Some(Group::Discriminator) => self.check_discriminator(obj, path)?,
        };

        Ok(Schema {
            nullable,
            metadata,
            form,
        })
    }

    fn check_ref(&self, obj: &Map<String, Value>, path: &JsonPointer) -> Result<Form, SchemaError> {
        let name = obj["ref"]
            .as_str()
            .ok_or_else(|| wrong_type(path, "ref", "a string"))?;
        if !self.names.contains(name) {
            return Err(SchemaError::new(
                path.child("ref"),
                SchemaErrorKind::UnresolvedRef(name.to_string()),
            ));
        }
        Ok(Form::Ref {
            name: name.to_string(),
        })
    }

    fn check_properties(
        &self,
        obj: &Map<String, Value>,
        path: &JsonPointer,
    ) -> Result<Properties, SchemaError> {
        let required = obj.get("properties");
        let optional = obj.get("optionalProperties");
        if required.is_none() && optional.is_none() {
            return Err(SchemaError::new(
                path.clone(),
                SchemaErrorKind::IncompleteForm {
                    present: "additionalProperties".to_string(),
                    missing: "properties".to_string(),
                },
            ));
        }

        let mut props = Properties {
            has_required_keyword: required.is_some(),
            ..Properties::default()
        };
        if let Some(required) = required {
            props.required = self.check_members(required, path, "properties")?;
        }
        if let Some(optional) = optional {
            props.optional = self.check_members(optional, path, "optionalProperties")?;
        }
        for (name, _) in &props.optional {
            if props.required.iter().any(|(k, _)| k == name) {
                return Err(SchemaError::new(
                    path.child("optionalProperties").child(name.as_str()),
                    SchemaErrorKind::OverlappingProperty(name.clone()),
                ));
            }
        }
        props.additional = match obj.get("additionalProperties") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(wrong_type(path, "additionalProperties", "a boolean")),
        };
        Ok(props)
    }

    fn check_members(
        &self,
        members: &Value,
        path: &JsonPointer,
        keyword: &str,
    ) -> Result<Vec<(String, Schema)>, SchemaError> {
        let members = members
            .as_object()
            .ok_or_else(|| wrong_type(path, keyword, "an object"))?;
        let base = path.child(keyword);
        members
            .iter()
            .map(|(name, sub)| {
                let schema = self.check_node(sub, &base.child(name.as_str()), false)?;
                Ok((name.clone(), schema))
            })
            .collect()
    }

    fn check_discriminator(&self, obj: &Map<String, Value>, path: &JsonPointer) -> Result<Form, SchemaError> {
        let (Some(tag), Some(mapping)) = (obj.get("discriminator"), obj.get("mapping")) else {
            let (present, missing) = if obj.contains_key("mapping") {
                ("mapping", "discriminator")
            } else {
                ("discriminator", "mapping")
            };
            return Err(SchemaError::new(
                path.clone(),
                SchemaErrorKind::IncompleteForm {
                    present: present.to_string(),
                    missing: missing.to_string(),
                },
            ));
        };
        let tag = tag
            .as_str()
            .ok_or_else(|| wrong_type(path, "discriminator", "a string"))?;
        let mapping = mapping
            .as_object()
            .ok_or_else(|| wrong_type(path, "mapping", "an object"))?;

        let mapping_path = path.child("mapping");
        let mut branches = Vec::with_capacity(mapping.len());
        for (tag_value, sub) in mapping {
            let branch_path = mapping_path.child(tag_value.as_str());
            let schema = self.check_node(sub, &branch_path, false)?;
            if schema.nullable {
                return Err(SchemaError::new(
                    branch_path.child("nullable"),
                    SchemaErrorKind::NullableMapping,
                ));
            }
            let Form::Properties(properties) = schema.form else {
                return Err(SchemaError::new(branch_path, SchemaErrorKind::MappingNotProperties));
            };
            let redeclared = [("properties", &properties.required), ("optionalProperties", &properties.optional)]
                .into_iter()
                .find(|(_, members)| members.iter().any(|(k, _)| k == tag));
            if let Some((keyword, _)) = redeclared {
                return Err(SchemaError::new(
                    branch_path.child(keyword).child(tag),
                    SchemaErrorKind::TagRedeclared(tag.to_string()),
                ));
            }
            branches.push((
                tag_value.clone(),
                Mapping {
                    metadata: schema.metadata,
                    properties,
                },
            ));
        }

        Ok(Form::Discriminator {
            tag: tag.to_string(),
            mapping: branches,
        })
    }
}

fn check_type(obj: &Map<String, Value>, path: &JsonPointer) -> Result<Form, SchemaError> {
    let keyword = obj["type"]
        .as_str()
        .ok_or_else(|| wrong_type(path, "type", "a string"))?;
    let kind = TypeKind::from_keyword(keyword).ok_or_else(|| {
        SchemaError::new(path.child("type"), SchemaErrorKind::UnknownType(keyword.to_string()))
    })?;
    Ok(Form::Type { kind })
}

fn check_enum(obj: &Map<String, Value>, path: &JsonPointer) -> Result<Form, SchemaError> {
    let items = obj["enum"]
        .as_array()
        .ok_or_else(|| wrong_type(path, "enum", "an array of strings"))?;
    if items.is_empty() {
        return Err(SchemaError::new(path.child("enum"), SchemaErrorKind::EmptyEnum));
    }
    let enum_path = path.child("enum");
    let mut seen = HashSet::with_capacity(items.len());
    let mut values = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(s) = item.as_str() else {
            return Err(SchemaError::new(
                enum_path.child(i.to_string()),
                SchemaErrorKind::WrongType {
                    keyword: "enum".to_string(),
                    expected: "an array of strings",
                },
            ));
        };
        if !seen.insert(s) {
            return Err(SchemaError::new(
                enum_path.child(i.to_string()),
                SchemaErrorKind::DuplicateEnumValue(s.to_string()),
            ));
        }
        values.push(s.to_string());
    }
    Ok(Form::Enum { values })
}

fn as_schema_object<'a>(value: &'a Value, path: &JsonPointer) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::new(path.clone(), SchemaErrorKind::NotAnObject))
}

fn wrong_type(path: &JsonPointer, keyword: &str, expected: &'static str) -> SchemaError {
    SchemaError::new(
        path.child(keyword),
        SchemaErrorKind::WrongType {
            keyword: keyword.to_string(),
            expected,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind_of(schema: Value) -> SchemaErrorKind {
        Document::from_value(&schema).unwrap_err().kind
    }

    fn path_of(schema: Value) -> String {
        Document::from_value(&schema).unwrap_err().path.to_string()
    }

    #[test]
    fn test_empty_schema() {
        let doc = Document::from_value(&json!({})).unwrap();
        assert_eq!(doc.root().form, Form::Empty);
        assert!(!doc.root().nullable);
        assert!(doc.definitions().is_empty());
    }

    #[test]
    fn test_non_object_schemas_rejected() {
        assert_eq!(kind_of(json!(null)), SchemaErrorKind::NotAnObject);
        assert_eq!(kind_of(json!(true)), SchemaErrorKind::NotAnObject);
        assert_eq!(kind_of(json!([])), SchemaErrorKind::NotAnObject);
    }

    #[test]
    fn test_metadata_and_nullable_kept() {
        let doc = Document::from_value(&json!({
            "type": "string",
            "nullable": true,
            "metadata": {"description": "a name"}
        }))
        .unwrap();
        assert!(doc.root().nullable);
        assert_eq!(doc.root().metadata.as_ref().unwrap()["description"], "a name");
        assert_eq!(doc.root().form, Form::Type { kind: TypeKind::String });
    }

    #[test]
    fn test_unknown_keyword_rejected_with_path() {
        assert_eq!(
            kind_of(json!({"elements": {"foo": 1}})),
            SchemaErrorKind::UnknownKeyword("foo".to_string())
        );
        assert_eq!(path_of(json!({"elements": {"foo": 1}})), "/elements/foo");
    }

    #[test]
    fn test_id_keyword_is_not_part_of_jtd() {
        assert_eq!(
            kind_of(json!({"id": "mySchema", "type": "string"})),
            SchemaErrorKind::UnknownKeyword("id".to_string())
        );
        assert_eq!(
            kind_of(json!({"$id": "mySchema", "type": "string"})),
            SchemaErrorKind::UnknownKeyword("$id".to_string())
        );
    }

    #[test]
    fn test_bad_nullable_and_metadata() {
        assert!(matches!(kind_of(json!({"nullable": "yes"})), SchemaErrorKind::WrongType { .. }));
        assert!(matches!(kind_of(json!({"metadata": []})), SchemaErrorKind::WrongType { .. }));
    }

    #[test]
    fn test_forward_and_mutual_refs_resolve() {
        let doc = Document::from_value(&json!({
            "definitions": {
                "a": {"elements": {"ref": "b"}},
                "b": {"nullable": true, "ref": "a"}
            },
            "ref": "a"
        }))
        .unwrap();
        assert_eq!(doc.definitions().len(), 2);
        assert!(doc.definition("b").unwrap().nullable);
        assert_eq!(doc.root().form, Form::Ref { name: "a".to_string() });
    }

    #[test]
    fn test_unresolved_refs() {
        assert_eq!(
            kind_of(json!({"ref": "missing"})),
            SchemaErrorKind::UnresolvedRef("missing".to_string())
        );
        assert_eq!(
            path_of(json!({"definitions": {"a": {}}, "elements": {"ref": "b"}})),
            "/elements/ref"
        );
        assert!(matches!(kind_of(json!({"ref": 1})), SchemaErrorKind::WrongType { .. }));
    }

    #[test]
    fn test_nested_definitions_rejected() {
        assert_eq!(
            kind_of(json!({"definitions": {"a": {"definitions": {}}}})),
            SchemaErrorKind::NestedDefinitions
        );
        assert_eq!(
            kind_of(json!({"elements": {"definitions": {}}})),
            SchemaErrorKind::NestedDefinitions
        );
    }

    #[test]
    fn test_definitions_must_be_object() {
        assert!(matches!(kind_of(json!({"definitions": []})), SchemaErrorKind::WrongType { .. }));
        assert_eq!(
            kind_of(json!({"definitions": {"a": 3}})),
            SchemaErrorKind::NotAnObject
        );
    }

    #[test]
    fn test_type_values() {
        assert_eq!(
            kind_of(json!({"type": "int64"})),
            SchemaErrorKind::UnknownType("int64".to_string())
        );
        assert!(matches!(kind_of(json!({"type": true})), SchemaErrorKind::WrongType { .. }));
    }

    #[test]
    fn test_enum_rules() {
        assert_eq!(kind_of(json!({"enum": []})), SchemaErrorKind::EmptyEnum);
        assert_eq!(
            kind_of(json!({"enum": ["a", "a"]})),
            SchemaErrorKind::DuplicateEnumValue("a".to_string())
        );
        assert_eq!(path_of(json!({"enum": ["a", 1]})), "/enum/1");
        assert!(matches!(kind_of(json!({"enum": "a"})), SchemaErrorKind::WrongType { .. }));
        let doc = Document::from_value(&json!({"enum": ["B", "A"]})).unwrap();
        assert_eq!(
            doc.root().form,
            Form::Enum { values: vec!["B".to_string(), "A".to_string()] }
        );
    }

    #[test]
    fn test_conflicting_forms() {
        assert!(matches!(
            kind_of(json!({"type": "string", "enum": ["a"]})),
            SchemaErrorKind::ConflictingForms { .. }
        ));
        assert!(matches!(
            kind_of(json!({"definitions": {"a": {}}, "ref": "a", "elements": {}})),
            SchemaErrorKind::ConflictingForms { .. }
        ));
        assert!(matches!(
            kind_of(json!({"properties": {}, "values": {}})),
            SchemaErrorKind::ConflictingForms { .. }
        ));
    }

    #[test]
    fn test_incomplete_forms() {
        assert!(matches!(
            kind_of(json!({"additionalProperties": true})),
            SchemaErrorKind::IncompleteForm { .. }
        ));
        assert!(matches!(
            kind_of(json!({"mapping": {}})),
            SchemaErrorKind::IncompleteForm { .. }
        ));
        assert!(matches!(
            kind_of(json!({"discriminator": "t"})),
            SchemaErrorKind::IncompleteForm { .. }
        ));
    }

    #[test]
    fn test_properties_keep_declaration_order() {
        let doc = Document::from_value(&json!({
            "properties": {"z": {}, "a": {"type": "string"}},
            "optionalProperties": {"m": {}},
            "additionalProperties": true
        }))
        .unwrap();
        let Form::Properties(props) = &doc.root().form else {
            panic!("expected properties form");
        };
        let names: Vec<&str> = props.required.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["z", "a"]);
        assert_eq!(props.optional.len(), 1);
        assert!(props.additional);
        assert!(props.has_required_keyword);
    }

    #[test]
    fn test_overlapping_properties_rejected() {
        assert_eq!(
            kind_of(json!({"properties": {"a": {}}, "optionalProperties": {"a": {}}})),
            SchemaErrorKind::OverlappingProperty("a".to_string())
        );
    }

    #[test]
    fn test_bad_additional_properties() {
        assert!(matches!(
            kind_of(json!({"properties": {}, "additionalProperties": "no"})),
            SchemaErrorKind::WrongType { .. }
        ));
    }

    #[test]
    fn test_discriminator_rules() {
        assert!(matches!(
            kind_of(json!({"discriminator": 1, "mapping": {}})),
            SchemaErrorKind::WrongType { .. }
        ));
        assert!(matches!(
            kind_of(json!({"discriminator": "t", "mapping": []})),
            SchemaErrorKind::WrongType { .. }
        ));
        assert_eq!(
            kind_of(json!({"discriminator": "t", "mapping": {"x": {"type": "string"}}})),
            SchemaErrorKind::MappingNotProperties
        );
        assert_eq!(
            kind_of(json!({"discriminator": "t", "mapping": {"x": {"properties": {}, "nullable": true}}})),
            SchemaErrorKind::NullableMapping
        );
        assert_eq!(
            kind_of(json!({"discriminator": "t", "mapping": {"x": {"properties": {"t": {}}}}})),
            SchemaErrorKind::TagRedeclared("t".to_string())
        );
        assert_eq!(
            path_of(json!({"discriminator": "t", "mapping": {"x": {"optionalProperties": {"t": {}}}}})),
            "/mapping/x/optionalProperties/t"
        );
    }

    #[test]
    fn test_valid_discriminator() {
        let doc = Document::from_value(&json!({
            "discriminator": "kind",
            "mapping": {
                "circle": {"properties": {"r": {"type": "float64"}}},
                "square": {"properties": {"side": {"type": "float64"}}, "nullable": false}
            }
        }))
        .unwrap();
        let Form::Discriminator { tag, mapping } = &doc.root().form else {
            panic!("expected discriminator form");
        };
        assert_eq!(tag, "kind");
        let tags: Vec<&str> = mapping.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(tags, ["circle", "square"]);
    }
}
