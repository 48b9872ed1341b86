//! # Schema Directory Loader
//!
//! Reads schema documents from a directory so they can be registered with
//! a compiler under stable names.
//!
//! Recognized files are `<name>.jtd.json`, `<name>.jtd.yaml` and
//! `<name>.jtd.yml`; the key is `<name>`. YAML documents are converted to
//! the equivalent JSON value tree. Other files are ignored. Loading only
//! parses; meta-schema checking happens at registration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

const JSON_SUFFIX: &str = ".jtd.json";
const YAML_SUFFIXES: [&str; 2] = [".jtd.yaml", ".jtd.yml"];

/// Error loading schema documents from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The directory could not be listed.
    #[error("cannot read schema directory '{dir}': {reason}")]
    DirectoryUnreadable {
        /// The directory path.
        dir: String,
        /// Underlying reason.
        reason: String,
    },

    /// A schema file could not be parsed.
    #[error("invalid schema document '{path}': {reason}")]
    InvalidDocument {
        /// The file path.
        path: String,
        /// Underlying reason.
        reason: String,
    },

    /// Two files resolve to the same schema name.
    #[error("duplicate schema name '{name}' in '{dir}'")]
    DuplicateName {
        /// The colliding name.
        name: String,
        /// The directory path.
        dir: String,
    },

    /// IO error reading a schema file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw schema documents loaded from one directory, keyed by name.
#[derive(Debug, Clone)]
pub struct SchemaDirectory {
    dir: PathBuf,
    schemas: BTreeMap<String, Value>,
}

impl SchemaDirectory {
    /// Load every recognized schema file in `dir` (non-recursive).
    ///
    /// # Errors
    ///
    /// Returns `LoadError::DirectoryUnreadable` if `dir` cannot be listed,
    /// `LoadError::InvalidDocument` if a file is not valid JSON/YAML, and
    /// `LoadError::DuplicateName` if `a.jtd.json` and `a.jtd.yaml` coexist.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir).map_err(|e| LoadError::DirectoryUnreadable {
            dir: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut schemas = BTreeMap::new();
        for entry in entries {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((name, format)) = classify(file_name) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            let value: Value = match format {
                Format::Json => serde_json::from_str(&content).map_err(|e| LoadError::InvalidDocument {
                    path: path.display().to_string(),
                    reason: format!("invalid JSON: {e}"),
                })?,
                Format::Yaml => {
                    let yaml: serde_yaml::Value =
                        serde_yaml::from_str(&content).map_err(|e| LoadError::InvalidDocument {
                            path: path.display().to_string(),
                            reason: format!("invalid YAML: {e}"),
                        })?;
                    yaml_to_json_value(&yaml).map_err(|reason| LoadError::InvalidDocument {
                        path: path.display().to_string(),
                        reason,
                    })?
                }
            };
            if schemas.insert(name.to_string(), value).is_some() {
                return Err(LoadError::DuplicateName {
                    name: name.to_string(),
                    dir: dir.display().to_string(),
                });
            }
        }

        tracing::debug!(dir = %dir.display(), count = schemas.len(), "loaded schema directory");
        Ok(Self { dir, schemas })
    }

    /// The directory the schemas were read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of loaded schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// True if no schema files were found.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Names of all loaded schemas, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    /// Look up a raw schema document by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// Iterate over `(name, document)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schemas.iter().map(|(k, v)| (k.as_str(), v))
    }
}

enum Format {
    Json,
    Yaml,
}

fn classify(file_name: &str) -> Option<(&str, Format)> {
    if let Some(name) = file_name.strip_suffix(JSON_SUFFIX) {
        return Some((name, Format::Json)).filter(|(n, _)| !n.is_empty());
    }
    YAML_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))
        .filter(|n| !n.is_empty())
        .map(|n| (n, Format::Yaml))
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Schema documents use only the JSON-compatible subset of YAML; tags are
/// dropped and scalar map keys are stringified.
fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
