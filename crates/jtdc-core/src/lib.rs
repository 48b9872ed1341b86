//! # jtdc-core: Foundational Types for the JTD Compiler
//!
//! This crate is the leaf of the `jtdc-*` dependency graph. It defines the
//! types every other crate agrees on: the error hierarchy, the path type
//! used for both `instancePath` and `schemaPath`, the canonical byte form
//! of a schema document, and the timestamp rules of the `timestamp` type.
//!
//! ## Key Design Principles
//!
//! 1. **Paths are segment sequences.** [`JsonPointer`] stores raw segments
//!    (field names, decimal array indices, schema keywords). Escaping to
//!    RFC 6901 text only happens at display time.
//!
//! 2. **One canonical form per schema.** [`CanonicalBytes`] is the only
//!    input accepted by [`schema_digest`], so two schema documents that
//!    differ only in key order or whitespace share one content digest.
//!    Programs are cached by [`layout_digest`] instead, which keeps member
//!    order and only ignores whitespace.
//!
//! 3. **Instance failures are data, schema failures are errors.** The
//!    error types here cover broken schemas, exceeded recursion limits and
//!    parse failures. Non-conforming instances are reported as violations
//!    by the validator, never through `Err`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jtdc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod path;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{layout_digest, schema_digest, SchemaDigest};
pub use error::{
    CanonicalizationError, ConfigError, ParseError, SchemaError, SchemaErrorKind, SerializeError,
    TimestampError, ValidateError,
};
pub use path::{InvalidPointer, JsonPointer};
pub use temporal::{is_timestamp, Timestamp};
