//! # Compiler Handle
//!
//! Owns the configuration, the compiled-program cache and the named schema
//! registry. Every artifact it hands out shares an immutable
//! [`Program`] through an `Arc`, so artifacts are independent of each other
//! and of the compiler once returned.
//!
//! Programs are cached by the layout digest of the schema document:
//! compiling the same schema twice, even with different whitespace, checks
//! and generates it once. Reordered members get their own program, since
//! declaration order fixes error and output order.
//!
//! All methods take `&self`. The cache and registry sit behind
//! `parking_lot::RwLock`s, which never poison and are never held while
//! checking or generating a schema.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use jtdc_core::{
    layout_digest, schema_digest, CanonicalBytes, CanonicalizationError, ConfigError, SchemaDigest,
    SchemaError,
};
use jtdc_schema::{Document, LoadError, SchemaDirectory};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::config::CompilerConfig;
use crate::parse::Parser;
use crate::program::Program;
use crate::serialize::Serializer;
use crate::validate::Validator;

/// Error compiling or registering a schema.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The document is not a valid JTD schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The document could not be canonicalized for caching.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A schema is already registered under this key.
    #[error("schema key '{0}' is already registered")]
    DuplicateKey(String),

    /// A schema loaded from a directory failed to compile.
    #[error("schema '{key}': {source}")]
    Named {
        /// Registration key of the failing schema.
        key: String,
        /// Why it failed.
        #[source]
        source: Box<CompileError>,
    },

    /// Reading a schema directory failed.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Compiles JTD schemas into validators, serializers and parsers.
#[derive(Debug)]
pub struct Compiler {
    config: CompilerConfig,
    programs: RwLock<HashMap<SchemaDigest, Arc<Program>>>,
    named: RwLock<BTreeMap<String, Arc<Program>>>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl Compiler {
    /// Create a compiler with `config`.
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            programs: RwLock::new(HashMap::new()),
            named: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a compiler configured from `JTDC_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an uninterpretable variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        CompilerConfig::from_env().map(Self::new)
    }

    /// The configuration applied to every artifact.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Check `schema` and generate its program, reusing a cached one when
    /// an identical schema was compiled before.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::Schema` if `schema` is not a valid JTD
    /// document.
    pub fn program(&self, schema: &Value) -> Result<Arc<Program>, CompileError> {
        let layout = layout_digest(schema)?;
        if let Some(program) = self.programs.read().get(&layout) {
            tracing::debug!(%layout, "program cache hit");
            return Ok(Arc::clone(program));
        }

        let document = Document::from_value(schema)?;
        let digest = schema_digest(&CanonicalBytes::new(schema)?);
        let program = Arc::new(Program::generate(document, digest)?);
        tracing::debug!(%digest, %layout, units = program.units().len(), "compiled schema");

        let mut programs = self.programs.write();
        Ok(Arc::clone(programs.entry(layout).or_insert(program)))
    }

    /// Compile a validator.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::Schema` if `schema` is not a valid JTD
    /// document.
    pub fn compile(&self, schema: &Value) -> Result<Validator, CompileError> {
        Ok(Validator::new(self.program(schema)?, self.config))
    }

    /// Compile a serializer.
    ///
    /// # Errors
    ///
    /// Same as [`compile`](Self::compile).
    pub fn compile_serializer(&self, schema: &Value) -> Result<Serializer, CompileError> {
        Ok(Serializer::new(self.program(schema)?, self.config))
    }

    /// Compile a fused parser.
    ///
    /// # Errors
    ///
    /// Same as [`compile`](Self::compile).
    pub fn compile_parser(&self, schema: &Value) -> Result<Parser, CompileError> {
        Ok(Parser::new(self.program(schema)?, self.config))
    }

    /// Compile `schema` and register it under `key`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::DuplicateKey` if `key` is taken, or the
    /// compile error for an invalid schema. Nothing is registered on error.
    pub fn add_schema(&self, key: impl Into<String>, schema: &Value) -> Result<(), CompileError> {
        let key = key.into();
        if self.named.read().contains_key(&key) {
            return Err(CompileError::DuplicateKey(key));
        }
        let program = self.program(schema)?;
        self.register(key, program)
    }

    /// Compile and register every schema in `dir`, keyed by file stem.
    ///
    /// All schemas are compiled before any is registered, so a directory
    /// is registered completely or not at all. Returns the number of
    /// schemas registered.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::Load` if the directory cannot be read,
    /// `CompileError::Named` for the first schema that fails to compile,
    /// and `CompileError::DuplicateKey` if a stem is already registered.
    pub fn add_directory(&self, dir: impl AsRef<Path>) -> Result<usize, CompileError> {
        let directory = SchemaDirectory::load(dir)?;
        let mut compiled = Vec::with_capacity(directory.len());
        for (key, schema) in directory.iter() {
            let program = self.program(schema).map_err(|e| CompileError::Named {
                key: key.to_string(),
                source: Box::new(e),
            })?;
            compiled.push((key.to_string(), program));
        }

        let mut named = self.named.write();
        if let Some((key, _)) = compiled.iter().find(|(key, _)| named.contains_key(key)) {
            return Err(CompileError::DuplicateKey(key.clone()));
        }
        let count = compiled.len();
        named.extend(compiled);
        tracing::debug!(dir = %directory.dir().display(), count, "registered schema directory");
        Ok(count)
    }

    fn register(&self, key: String, program: Arc<Program>) -> Result<(), CompileError> {
        let mut named = self.named.write();
        if named.contains_key(&key) {
            return Err(CompileError::DuplicateKey(key));
        }
        tracing::debug!(key = %key, digest = %program.digest(), "registered schema");
        named.insert(key, program);
        Ok(())
    }

    /// Validator for the schema registered under `key`.
    pub fn get_schema(&self, key: &str) -> Option<Validator> {
        self.named
            .read()
            .get(key)
            .map(|program| Validator::new(Arc::clone(program), self.config))
    }

    /// Serializer for the schema registered under `key`.
    pub fn get_serializer(&self, key: &str) -> Option<Serializer> {
        self.named
            .read()
            .get(key)
            .map(|program| Serializer::new(Arc::clone(program), self.config))
    }

    /// Parser for the schema registered under `key`.
    pub fn get_parser(&self, key: &str) -> Option<Parser> {
        self.named
            .read()
            .get(key)
            .map(|program| Parser::new(Arc::clone(program), self.config))
    }

    /// Unregister `key`. Returns true if it was registered.
    ///
    /// Artifacts already handed out keep working. The program stays in the
    /// cache until [`clear_cache`](Self::clear_cache).
    pub fn remove_schema(&self, key: &str) -> bool {
        let removed = self.named.write().remove(key).is_some();
        if removed {
            tracing::debug!(key, "removed schema");
        }
        removed
    }

    /// Registered keys, sorted.
    pub fn schema_keys(&self) -> Vec<String> {
        self.named.read().keys().cloned().collect()
    }

    /// Number of distinct programs in the cache.
    pub fn cached_programs(&self) -> usize {
        self.programs.read().len()
    }

    /// Drop cached programs. Registered schemas are unaffected.
    pub fn clear_cache(&self) {
        self.programs.write().clear();
    }
}
