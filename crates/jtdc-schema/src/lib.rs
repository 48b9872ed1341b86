//! # jtdc-schema: Schema Model & Meta-Schema Checker
//!
//! Turns raw JSON Type Definition documents into a validated, immutable
//! schema tree.
//!
//! ## Schema Model (`schema`)
//!
//! [`Schema`] is one node of the tree: a `nullable` flag, opaque metadata,
//! and exactly one [`Form`]. `Form` is a closed enum over the eight JTD
//! forms, so every back-end matches on it exhaustively. The [`Document`]
//! owns the root node and the definitions registry; `Ref` nodes only hold
//! a definition name and are resolved through that registry, which is how
//! recursive schemas stay finite.
//!
//! ## Meta-Schema Checker (`checker`)
//!
//! [`Document::from_value`] applies every meta-schema rule and fails with a
//! [`SchemaError`](jtdc_core::SchemaError) that names the offending
//! location. There is no partial acceptance.
//!
//! ## Loading (`loader`)
//!
//! [`SchemaDirectory`] reads JSON and YAML schema documents from disk for
//! registration with a compiler.
//!
//! ## Crate Policy
//!
//! - Depends only on `jtdc-core` internally.
//! - A `Document` is never mutated after construction.

pub mod checker;
pub mod loader;
pub mod schema;

pub use loader::{LoadError, SchemaDirectory};
pub use schema::{Document, Form, Mapping, Properties, Schema, TypeKind};
