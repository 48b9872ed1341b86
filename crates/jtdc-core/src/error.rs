//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types used throughout the JTD compiler. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Schema errors are fatal and always carry the JSON Pointer of the
//!   offending location inside the schema document.
//! - Validation of non-conforming data is not an error; only the recursion
//!   limit surfaces through [`ValidateError`].
//! - Parse failures carry a message and the zero-based byte offset at which
//!   parsing stopped.

use thiserror::Error;

use crate::path::JsonPointer;

/// A schema document that violates the JTD meta-schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid schema at '{path}': {kind}")]
pub struct SchemaError {
    /// Location of the offending node or keyword in the schema document.
    pub path: JsonPointer,
    /// What is wrong at that location.
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    /// Create a schema error at `path`.
    pub fn new(path: JsonPointer, kind: SchemaErrorKind) -> Self {
        Self { path, kind }
    }
}

/// The individual meta-schema rules a schema document can break.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// A schema (or sub-schema) is not a JSON object.
    #[error("schema must be an object")]
    NotAnObject,

    /// A keyword outside the JTD vocabulary.
    #[error("unknown keyword '{0}'")]
    UnknownKeyword(String),

    /// A keyword holds a value of the wrong JSON type.
    #[error("keyword '{keyword}' must be {expected}")]
    WrongType {
        /// The offending keyword.
        keyword: String,
        /// Human description of the expected JSON type.
        expected: &'static str,
    },

    /// `definitions` appears below the document root.
    #[error("definitions are only allowed at the root of a schema")]
    NestedDefinitions,

    /// `type` names something other than the eleven JTD types.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// `enum` has no values.
    #[error("enum must not be empty")]
    EmptyEnum,

    /// `enum` lists the same value twice.
    #[error("duplicate enum value '{0}'")]
    DuplicateEnumValue(String),

    /// `ref` names a definition that does not exist.
    #[error("ref to undefined definition '{0}'")]
    UnresolvedRef(String),

    /// Keywords from two different forms are present on one node.
    #[error("keywords '{first}' and '{second}' belong to different forms")]
    ConflictingForms {
        /// Keyword of the first form found.
        first: String,
        /// Keyword of the second form found.
        second: String,
    },

    /// A keyword is present without the keyword its form requires.
    #[error("keyword '{present}' requires '{missing}'")]
    IncompleteForm {
        /// Keyword that was found.
        present: String,
        /// Keyword that must accompany it.
        missing: String,
    },

    /// A property is declared as both required and optional.
    #[error("property '{0}' is declared in both properties and optionalProperties")]
    OverlappingProperty(String),

    /// A discriminator mapping value is not of the properties form.
    #[error("mapping values must be of the properties form")]
    MappingNotProperties,

    /// A discriminator mapping value sets `nullable: true`.
    #[error("mapping values must not be nullable")]
    NullableMapping,

    /// A discriminator mapping value declares the tag as a property.
    #[error("mapping value redeclares discriminator tag '{0}'")]
    TagRedeclared(String),
}

/// Error during canonical serialization of a schema document.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A validation run that could not complete.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateError {
    /// Recursion through refs and nested containers exceeded the limit.
    #[error("maximum depth of {limit} exceeded")]
    MaxDepthExceeded {
        /// The configured limit.
        limit: usize,
    },
}

/// A serialization run that could not complete.
#[derive(Error, Debug)]
pub enum SerializeError {
    /// Recursion through refs and nested containers exceeded the limit.
    #[error("maximum depth of {limit} exceeded")]
    MaxDepthExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// Writing a JSON fragment failed.
    #[error("json write failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The output buffer was not valid UTF-8.
    #[error("output is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// A failed parse: why it stopped and where.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct ParseError {
    message: String,
    position: usize,
}

impl ParseError {
    /// Create a parse error at byte offset `position`.
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Human-readable reason the parse stopped.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Zero-based byte offset into the input where parsing stopped.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Error loading compiler configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be interpreted.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// The environment variable name.
        var: &'static str,
        /// The raw value found.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Error parsing a timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid RFC 3339 timestamp {input:?}: {reason}")]
pub struct TimestampError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display_includes_path() {
        let err = SchemaError::new(
            JsonPointer::from_segments(["properties", "a"]),
            SchemaErrorKind::UnknownKeyword("foo".to_string()),
        );
        let s = err.to_string();
        assert!(s.contains("/properties/a"), "got: {s}");
        assert!(s.contains("unknown keyword 'foo'"), "got: {s}");
    }

    #[test]
    fn test_parse_error_accessors() {
        let err = ParseError::new("unexpected token", 7);
        assert_eq!(err.message(), "unexpected token");
        assert_eq!(err.position(), 7);
        assert_eq!(err.to_string(), "unexpected token at position 7");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            var: "JTDC_MAX_DEPTH",
            value: "lots".to_string(),
            reason: "expected an unsigned integer".to_string(),
        };
        assert!(err.to_string().contains("JTDC_MAX_DEPTH"));
    }
}
