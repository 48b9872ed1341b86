//! # jtdc-codegen: Validator, Serializer and Fused Parser Generation
//!
//! Compiles a checked JTD document into executable artifacts.
//!
//! ## Pipeline
//!
//! ```text
//! raw schema ──► Document::from_value ──► Program::generate ──┬─► Validator
//!                 (jtdc-schema)            (units per def)     ├─► Serializer
//!                                                              └─► Parser
//! ```
//!
//! [`Program`] is the shared unit-resolution step: the root and every
//! definition become one invokable unit, and `ref` nodes invoke their
//! target unit instead of inlining it. The three back-ends only differ in
//! what they do per node.
//!
//! ## Artifacts
//!
//! - [`Validator`] returns [`ValidationViolations`], each an
//!   `{instancePath, schemaPath}` pair. Non-conforming data is never an
//!   error.
//! - [`Serializer`] writes schema-valid values as JSON text.
//! - [`Parser`] lexes and validates JSON text in one pass.
//!   [`ParseSession`] exposes the outcome of the last parse as a
//!   message and position.
//!
//! Artifacts are `Send + Sync`, hold their program in an `Arc`, and never
//! perform I/O.
//!
//! ## Entry Points
//!
//! [`compile`], [`compile_serializer`] and [`compile_parser`] use a fresh
//! default [`Compiler`]. Hold a `Compiler` to share its program cache,
//! register named schemas, or apply a [`CompilerConfig`].

pub mod compiler;
pub mod config;
mod lexer;
pub mod parse;
pub mod program;
pub mod serialize;
pub mod validate;

pub use compiler::{CompileError, Compiler};
pub use config::CompilerConfig;
pub use parse::{ParseSession, Parser};
pub use program::{Program, Unit, UnitId, UnitName};
pub use serialize::Serializer;
pub use validate::{ValidationViolations, Validator, Violation};

use serde_json::Value;

/// Compile a validator with the default configuration.
///
/// # Errors
///
/// Returns `CompileError::Schema` if `schema` is not a valid JTD document.
pub fn compile(schema: &Value) -> Result<Validator, CompileError> {
    Compiler::default().compile(schema)
}

/// Compile a serializer with the default configuration.
///
/// # Errors
///
/// Returns `CompileError::Schema` if `schema` is not a valid JTD document.
pub fn compile_serializer(schema: &Value) -> Result<Serializer, CompileError> {
    Compiler::default().compile_serializer(schema)
}

/// Compile a fused parser with the default configuration.
///
/// # Errors
///
/// Returns `CompileError::Schema` if `schema` is not a valid JTD document.
pub fn compile_parser(schema: &Value) -> Result<Parser, CompileError> {
    Compiler::default().compile_parser(schema)
}
