//! # Paths: Instance and Schema Locations
//!
//! `JsonPointer` is a sequence of raw path segments. The same type serves
//! as `instancePath` (object member names and decimal array indices) and
//! `schemaPath` (schema keywords, property names, definition names).
//!
//! On the wire a path is the array of its segments; `Display` renders the
//! RFC 6901 text form (`/a/0/b~1c`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An ordered sequence of path segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    /// The empty path, pointing at the document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// Remove the last segment.
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    /// A copy of this path with one more segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push(segment);
        next
    }

    /// The raw segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the path, returning its segments.
    pub fn into_segments(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> Extend<S> for JsonPointer {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl From<Vec<String>> for JsonPointer {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            f.write_str("/")?;
            for c in segment.chars() {
                match c {
                    '~' => f.write_str("~0")?,
                    '/' => f.write_str("~1")?,
                    other => write!(f, "{other}")?,
                }
            }
        }
        Ok(())
    }
}

/// Error parsing the RFC 6901 text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid json pointer {0:?}")]
pub struct InvalidPointer(pub String);

impl FromStr for JsonPointer {
    type Err = InvalidPointer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(InvalidPointer(s.to_string()));
        };
        let mut segments = Vec::new();
        for raw in rest.split('/') {
            let mut segment = String::with_capacity(raw.len());
            let mut chars = raw.chars();
            while let Some(c) = chars.next() {
                if c != '~' {
                    segment.push(c);
                    continue;
                }
                match chars.next() {
                    Some('0') => segment.push('~'),
                    Some('1') => segment.push('/'),
                    _ => return Err(InvalidPointer(s.to_string())),
                }
            }
            segments.push(segment);
        }
        Ok(Self(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_displays_empty() {
        assert_eq!(JsonPointer::root().to_string(), "");
    }

    #[test]
    fn test_display_escapes_special_characters() {
        let p = JsonPointer::from_segments(["a/b", "c~d", "0"]);
        assert_eq!(p.to_string(), "/a~1b/c~0d/0");
    }

    #[test]
    fn test_parse_inverts_display() {
        let p = JsonPointer::from_segments(["properties", "a/b", "~"]);
        let parsed: JsonPointer = p.to_string().parse().unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn test_parse_rejects_missing_leading_slash() {
        assert!("a/b".parse::<JsonPointer>().is_err());
        assert!("/a~2".parse::<JsonPointer>().is_err());
    }

    #[test]
    fn test_child_does_not_mutate_parent() {
        let parent = JsonPointer::from_segments(["elements"]);
        let child = parent.child("type");
        assert_eq!(parent.len(), 1);
        assert_eq!(child.segments(), &["elements".to_string(), "type".to_string()]);
    }

    #[test]
    fn test_serializes_as_segment_array() {
        let p = JsonPointer::from_segments(["mapping", "x"]);
        assert_eq!(serde_json::to_value(&p).unwrap(), serde_json::json!(["mapping", "x"]));
        let back: JsonPointer = serde_json::from_value(serde_json::json!(["0", "a"])).unwrap();
        assert_eq!(back.to_string(), "/0/a");
    }
}
