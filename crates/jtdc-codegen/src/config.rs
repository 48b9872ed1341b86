//! Compiler configuration.
//!
//! Defaults suit RFC 8927 conformance. Override via environment variables
//! or explicit construction.

use jtdc_core::ConfigError;

/// Default recursion limit for validate, serialize and parse.
pub const DEFAULT_MAX_DEPTH: usize = 256;

const ALL_ERRORS_VAR: &str = "JTDC_ALL_ERRORS";
const MAX_DEPTH_VAR: &str = "JTDC_MAX_DEPTH";
const INT32_RANGE_VAR: &str = "JTDC_INT32_RANGE";
const ALLOW_DATE_VAR: &str = "JTDC_ALLOW_DATE";

/// Options shared by every artifact a [`Compiler`](crate::Compiler) produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Collect every violation instead of stopping at the first.
    pub all_errors: bool,
    /// Maximum nesting of containers and refs before a run fails.
    pub max_depth: usize,
    /// Range-check `int32` and `uint32`. When off they only need to be integral.
    pub int32_range: bool,
    /// Accept a bare `YYYY-MM-DD` as a `timestamp`.
    pub allow_date: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            all_errors: false,
            max_depth: DEFAULT_MAX_DEPTH,
            int32_range: true,
            allow_date: false,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `JTDC_ALL_ERRORS` (default: false)
    /// - `JTDC_MAX_DEPTH` (default: 256)
    /// - `JTDC_INT32_RANGE` (default: true)
    /// - `JTDC_ALLOW_DATE` (default: false)
    ///
    /// Booleans accept `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set to
    /// something that cannot be interpreted.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            all_errors: env_bool(&lookup, ALL_ERRORS_VAR, defaults.all_errors)?,
            max_depth: env_depth(&lookup, defaults.max_depth)?,
            int32_range: env_bool(&lookup, INT32_RANGE_VAR, defaults.int32_range)?,
            allow_date: env_bool(&lookup, ALLOW_DATE_VAR, defaults.allow_date)?,
        })
    }

    /// Set exhaustive error collection.
    pub fn with_all_errors(mut self, all_errors: bool) -> Self {
        self.all_errors = all_errors;
        self
    }

    /// Set the recursion limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn env_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn env_depth(lookup: &impl Fn(&str) -> Option<String>, default: usize) -> Result<usize, ConfigError> {
    let Some(raw) = lookup(MAX_DEPTH_VAR) else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            var: MAX_DEPTH_VAR,
            value: raw,
            reason: "must be at least 1".to_string(),
        }),
        Ok(depth) => Ok(depth),
        Err(e) => Err(ConfigError::InvalidValue {
            var: MAX_DEPTH_VAR,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = CompilerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, CompilerConfig::default());
        assert!(!cfg.all_errors);
        assert_eq!(cfg.max_depth, 256);
        assert!(cfg.int32_range);
        assert!(!cfg.allow_date);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = CompilerConfig::from_lookup(lookup(&[
            ("JTDC_ALL_ERRORS", "yes"),
            ("JTDC_MAX_DEPTH", "32"),
            ("JTDC_INT32_RANGE", "0"),
            ("JTDC_ALLOW_DATE", "ON"),
        ]))
        .unwrap();
        assert!(cfg.all_errors);
        assert_eq!(cfg.max_depth, 32);
        assert!(!cfg.int32_range);
        assert!(cfg.allow_date);
    }

    #[test]
    fn invalid_bool_rejected() {
        let err = CompilerConfig::from_lookup(lookup(&[("JTDC_ALL_ERRORS", "maybe")])).unwrap_err();
        let ConfigError::InvalidValue { var, value, .. } = err;
        assert_eq!(var, "JTDC_ALL_ERRORS");
        assert_eq!(value, "maybe");
    }

    #[test]
    fn invalid_depth_rejected() {
        assert!(CompilerConfig::from_lookup(lookup(&[("JTDC_MAX_DEPTH", "deep")])).is_err());
        assert!(CompilerConfig::from_lookup(lookup(&[("JTDC_MAX_DEPTH", "0")])).is_err());
    }

    #[test]
    fn builders_set_fields() {
        let cfg = CompilerConfig::default().with_all_errors(true).with_max_depth(8);
        assert!(cfg.all_errors);
        assert_eq!(cfg.max_depth, 8);
    }
}
