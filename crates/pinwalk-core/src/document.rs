//! Loosely-typed declarative documents.
//!
//! Workflow and action files are YAML whose shape is only a convention, so
//! they are loaded into a small tagged [`Document`] value and every access
//! checks the shape it expects. A mismatch reads as [`Document::Absent`]
//! rather than an error, which lets the scanners walk a half-valid file and
//! keep whatever is usable.

use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::ErrorCode;

static ABSENT: Document = Document::Absent;

/// Errors from [`load`].
///
/// Absence is reported separately from malformed content so callers can
/// tell "no definition" from "broken definition".
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl LoadError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::DocumentParseError
    }
}

/// A loaded YAML document, reduced to the shapes the scanners care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// Key/value pairs in file order. Non-scalar keys are dropped.
    Mapping(Vec<(String, Document)>),
    Sequence(Vec<Document>),
    /// Strings, numbers and booleans, as text.
    Scalar(String),
    /// `null`, an empty document, or a missing key.
    Absent,
}

impl Document {
    /// Look up `key` in a mapping. Anything else yields [`Document::Absent`].
    #[must_use]
    pub fn get(&self, key: &str) -> &Self {
        self.as_mapping()
            .and_then(|entries| entries.iter().find(|(k, _)| k == key))
            .map_or(&ABSENT, |(_, value)| value)
    }

    #[must_use]
    pub fn as_mapping(&self) -> Option<&[(String, Self)]> {
        match self {
            Self::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Self]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Bool(b) => Self::Scalar(b.to_string()),
            Value::Number(n) => Self::Scalar(n.to_string()),
            Value::String(s) => Self::Scalar(s),
            Value::Sequence(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Mapping(map) => Self::Mapping(
                map.into_iter()
                    .filter_map(|(key, value)| scalar_key(key).map(|k| (k, Self::from(value))))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::from(tagged.value),
        }
    }
}

fn scalar_key(key: Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_key(tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Parse YAML text into a [`Document`].
///
/// # Errors
///
/// Returns the underlying YAML error for syntactically invalid input.
pub fn parse_str(text: &str) -> Result<Document, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(Document::Absent);
    }
    serde_yaml::from_str::<Value>(text).map(Document::from)
}

/// Load and parse the YAML file at `path`.
///
/// # Errors
///
/// [`LoadError::NotFound`] if the file does not exist, [`LoadError::Io`] if it
/// cannot be read as UTF-8 text, [`LoadError::Parse`] if it is not YAML.
pub fn load(path: &Path) -> Result<Document, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_lookup_follows_mappings() {
        let doc = parse_str("runs:\n  using: composite\n  steps:\n    - uses: a/b@v1\n")
            .expect("valid yaml");
        assert_eq!(doc.get("runs").get("using").as_str(), Some("composite"));
        let steps = doc.get("runs").get("steps").as_sequence().expect("sequence");
        assert_eq!(steps[0].get("uses").as_str(), Some("a/b@v1"));
    }

    #[test]
    fn shape_mismatch_reads_as_absent() {
        let doc = parse_str("jobs: [1, 2]\n").expect("valid yaml");
        assert!(doc.get("jobs").get("build").is_absent());
        assert!(doc.get("missing").is_absent());
        assert!(doc.get("jobs").as_mapping().is_none());
        assert!(Document::Scalar("x".into()).get("k").is_absent());
    }

    #[test]
    fn scalars_become_text() {
        let doc = parse_str("a: 1\nb: true\nc: ~\n").expect("valid yaml");
        assert_eq!(doc.get("a").as_str(), Some("1"));
        assert_eq!(doc.get("b").as_str(), Some("true"));
        assert!(doc.get("c").is_absent());
    }

    #[test]
    fn empty_text_is_absent() {
        assert_eq!(parse_str("").expect("empty ok"), Document::Absent);
        assert_eq!(parse_str("  \n").expect("blank ok"), Document::Absent);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        assert!(parse_str("jobs: [unclosed\n").is_err());
    }

    #[test]
    fn load_distinguishes_missing_from_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("action.yml");
        assert!(matches!(load(&missing), Err(LoadError::NotFound { .. })));

        std::fs::write(&missing, "runs: {using: [").expect("write");
        let err = load(&missing).expect_err("malformed");
        assert!(matches!(err, LoadError::Parse { .. }));
        assert_eq!(err.code(), ErrorCode::DocumentParseError);

        std::fs::write(&missing, "name: ok\n").expect("write");
        let doc = load(&missing).expect("loads");
        assert_eq!(doc.get("name").as_str(), Some("ok"));
    }
}
