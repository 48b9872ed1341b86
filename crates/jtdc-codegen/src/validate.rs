//! # Validator Back-End
//!
//! Checks an in-memory [`Value`] against a compiled [`Program`] and reports
//! every violation as an `{instancePath, schemaPath}` pair.
//!
//! Non-conforming data is ordinary return data, never an `Err`. The only
//! error is [`ValidateError::MaxDepthExceeded`], raised when nesting of
//! schema nodes along one path exceeds the configured limit (adversarial
//! recursive schemas paired with deep instances).
//!
//! ## Traversal Order
//!
//! Required properties in declaration order, then optional properties,
//! then undeclared keys in instance order; array items in index order. In
//! the default mode the run stops at the first violation in that order, so
//! at most one entry is returned. With `all_errors` the run continues past
//! every failure.

use std::fmt;
use std::sync::Arc;

use jtdc_core::{is_timestamp, JsonPointer, ValidateError};
use jtdc_schema::TypeKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::CompilerConfig;
use crate::program::{Node, NodeKind, Program, PropertiesNode};

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Location of the offending value in the instance.
    pub instance_path: JsonPointer,
    /// Location of the schema keyword that rejected it.
    pub schema_path: JsonPointer,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): rejected by {}", self.schema_path)
        } else {
            write!(f, "  {}: rejected by {}", self.instance_path, self.schema_path)
        }
    }
}

/// Collection of validation violations, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl IntoIterator for ValidationViolations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A compiled validator.
///
/// Cheap to clone and safe to share across threads; the program it runs
/// is immutable.
#[derive(Debug, Clone)]
pub struct Validator {
    program: Arc<Program>,
    config: CompilerConfig,
}

impl Validator {
    /// Create a validator for `program`.
    pub fn new(program: Arc<Program>, config: CompilerConfig) -> Self {
        Self { program, config }
    }

    /// The program this validator runs.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The configuration this validator was compiled with.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Validate `instance`, returning every violation found.
    ///
    /// Empty iff `instance` conforms. Without `all_errors` at most one
    /// violation is returned.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::MaxDepthExceeded` if nesting exceeds
    /// `max_depth`.
    pub fn validate(&self, instance: &Value) -> Result<ValidationViolations, ValidateError> {
        let mut run = Run {
            program: &self.program,
            config: &self.config,
            instance_path: JsonPointer::root(),
            violations: Vec::new(),
            depth: 0,
        };
        match run.node(self.program.root(), instance) {
            Ok(()) | Err(Halt::Limit) => Ok(ValidationViolations {
                violations: run.violations,
            }),
            Err(Halt::Depth) => Err(ValidateError::MaxDepthExceeded {
                limit: self.config.max_depth,
            }),
        }
    }

    /// True if `instance` conforms.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::MaxDepthExceeded` if nesting exceeds
    /// `max_depth`.
    pub fn is_valid(&self, instance: &Value) -> Result<bool, ValidateError> {
        let strict = Self {
            program: Arc::clone(&self.program),
            config: self.config.with_all_errors(false),
        };
        strict.validate(instance).map(|v| v.is_empty())
    }
}

/// Whether a primitive value satisfies a `type` form.
///
/// Shared with the parser so both back-ends accept exactly the same values.
pub(crate) fn type_accepts(kind: TypeKind, value: &Value, config: &CompilerConfig) -> bool {
    match (kind, value) {
        (TypeKind::Boolean, Value::Bool(_)) => true,
        (TypeKind::String, Value::String(_)) => true,
        (TypeKind::Timestamp, Value::String(s)) => is_timestamp(s, config.allow_date),
        (_, Value::Number(n)) => kind.accepts_number(n, config.int32_range),
        _ => false,
    }
}

/// Why a run stopped early.
enum Halt {
    /// Non-exhaustive mode recorded its one violation.
    Limit,
    /// Nesting exceeded `max_depth`.
    Depth,
}

type Step = Result<(), Halt>;

struct Run<'a> {
    program: &'a Program,
    config: &'a CompilerConfig,
    instance_path: JsonPointer,
    violations: Vec<Violation>,
    depth: usize,
}

impl<'a> Run<'a> {
    fn node(&mut self, node: &'a Node, value: &Value) -> Step {
        if self.depth >= self.config.max_depth {
            return Err(Halt::Depth);
        }
        self.depth += 1;
        let step = self.form(node, value);
        self.depth -= 1;
        step
    }

    fn form(&mut self, node: &'a Node, value: &Value) -> Step {
        if node.nullable && value.is_null() {
            return Ok(());
        }
        match &node.kind {
            NodeKind::Empty => Ok(()),
            NodeKind::Ref(id) => {
                let program = self.program;
                self.node(program.unit(*id), value)
            }
            NodeKind::Type(kind) => {
                if type_accepts(*kind, value, self.config) {
                    Ok(())
                } else {
                    self.fail(node.schema_path.child("type"))
                }
            }
            NodeKind::Enum(values) => match value {
                Value::String(s) if values.contains(s) => Ok(()),
                _ => self.fail(node.schema_path.child("enum")),
            },
            NodeKind::Elements(item) => {
                let Value::Array(items) = value else {
                    return self.fail(node.schema_path.child("elements"));
                };
                for (i, element) in items.iter().enumerate() {
                    self.instance_path.push(i.to_string());
                    self.node(item, element)?;
                    self.instance_path.pop();
                }
                Ok(())
            }
            NodeKind::Values(item) => {
                let Value::Object(members) = value else {
                    return self.fail(node.schema_path.child("values"));
                };
                for (key, member) in members {
                    self.instance_path.push(key.as_str());
                    self.node(item, member)?;
                    self.instance_path.pop();
                }
                Ok(())
            }
            NodeKind::Properties(props) => {
                let Value::Object(members) = value else {
                    return self.fail(node.schema_path.child(props.container_keyword));
                };
                self.properties(props, &node.schema_path, members, None)
            }
            NodeKind::Discriminator(disc) => {
                let Value::Object(members) = value else {
                    return self.fail(node.schema_path.child("discriminator"));
                };
                match members.get(&disc.tag) {
                    None => self.fail(node.schema_path.child("discriminator")),
                    Some(Value::String(tag_value)) => match disc.branch(tag_value) {
                        Some(branch) => self.properties(
                            &branch.properties,
                            &branch.schema_path,
                            members,
                            Some(disc.tag.as_str()),
                        ),
                        None => self.fail_at(disc.tag.as_str(), node.schema_path.child("mapping")),
                    },
                    Some(_) => self.fail_at(disc.tag.as_str(), node.schema_path.child("discriminator")),
                }
            }
        }
    }

    fn properties(
        &mut self,
        props: &'a PropertiesNode,
        schema_path: &JsonPointer,
        members: &Map<String, Value>,
        tag: Option<&str>,
    ) -> Step {
        for member in &props.required {
            match members.get(&member.name) {
                Some(value) => {
                    self.instance_path.push(member.name.as_str());
                    self.node(&member.node, value)?;
                    self.instance_path.pop();
                }
                None => self.fail(member.node.schema_path.clone())?,
            }
        }
        for member in &props.optional {
            if let Some(value) = members.get(&member.name) {
                self.instance_path.push(member.name.as_str());
                self.node(&member.node, value)?;
                self.instance_path.pop();
            }
        }
        if !props.additional {
            for key in members.keys() {
                if tag == Some(key.as_str()) || props.index.contains_key(key) {
                    continue;
                }
                self.fail_at(key.as_str(), schema_path.clone())?;
            }
        }
        Ok(())
    }

    /// Record a violation at the current instance path.
    fn fail(&mut self, schema_path: JsonPointer) -> Step {
        self.violations.push(Violation {
            instance_path: self.instance_path.clone(),
            schema_path,
        });
        if self.config.all_errors {
            Ok(())
        } else {
            Err(Halt::Limit)
        }
    }

    /// Record a violation at the member `key` of the current instance.
    fn fail_at(&mut self, key: &str, schema_path: JsonPointer) -> Step {
        self.instance_path.push(key);
        let step = self.fail(schema_path);
        self.instance_path.pop();
        step
    }
}
