//! Action references: `owner/name@version`.
//!
//! An [`ActionRef`] is the identity of one versioned external action. The
//! compact textual form is what workflow and action documents carry in their
//! `uses:` fields; [`parse`] and the [`Display`](fmt::Display) impl convert
//! between the two, and `format(parse(s)) == s` for every accepted `s`.
//!
//! # Grammar
//!
//! ```text
//! owner/name@version
//! ```
//!
//! - `owner` runs up to the first `/` and is non-empty.
//! - `name` runs up to the next `@` and is non-empty. It may contain `/`
//!   when the action lives in a sub-directory of its repository
//!   (`github/codeql-action/init@v3`).
//! - `version` is the non-empty remainder and may itself contain `/` or `@`.
//!   It must not start with `-`.
//!
//! `owner` and every `/`-separated piece of `name` must be plain path
//! segments: `.`, `..` and leading `/` are rejected, so a reference always
//! resolves inside its own working copy.
//!
//! [`NodeKey`] adds the sentinel for the root repository, which is scanned
//! but never fetched by reference.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use crate::error::ErrorCode;

/// Display label used for the root repository in every rendered output.
pub const ROOT_LABEL: &str = "Main Repository";

/// Returned when a string does not have the `owner/name@version` shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse action reference: {input:?}")]
pub struct MalformedReferenceError {
    input: String,
}

impl MalformedReferenceError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }

    /// The rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::MalformedReference
    }
}

/// Identity of one versioned external action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionRef {
    owner: String,
    name: String,
    version: String,
}

impl ActionRef {
    /// Build a reference from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedReferenceError`] if any part is empty, `owner`
    /// contains `/`, `name` contains `@`, `owner` or `name` is not made of
    /// plain path segments, or `version` starts with `-`.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, MalformedReferenceError> {
        let owner = owner.into();
        let name = name.into();
        let version = version.into();

        let valid = !owner.is_empty()
            && !name.is_empty()
            && !version.is_empty()
            && !owner.contains('/')
            && !name.contains('@')
            && !version.starts_with('-')
            && plain_segments(&owner)
            && plain_segments(&name);
        if !valid {
            return Err(MalformedReferenceError::new(&format!(
                "{owner}/{name}@{version}"
            )));
        }

        Ok(Self {
            owner,
            name,
            version,
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Repository that hosts the action: the first segment of `name`.
    #[must_use]
    pub fn repository(&self) -> &str {
        self.name
            .split_once('/')
            .map_or(self.name.as_str(), |(repo, _)| repo)
    }

    /// Directory of the action inside its repository, if it is not the root.
    #[must_use]
    pub fn subpath(&self) -> Option<&str> {
        self.name
            .split_once('/')
            .map(|(_, rest)| rest.trim_matches('/'))
            .filter(|rest| !rest.is_empty())
    }

    /// Local directory name for a working copy of this reference.
    ///
    /// Readable prefix plus a BLAKE3 digest of the identity triple, so two
    /// distinct references never share a directory even when their
    /// sanitised prefixes coincide (`a_b/c@v` and `a/b_c@v`).
    #[must_use]
    pub fn checkout_dir_name(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.owner.as_bytes());
        hasher.update(b"\x00");
        hasher.update(self.name.as_bytes());
        hasher.update(b"\x00");
        hasher.update(self.version.as_bytes());
        let digest = hasher.finalize().to_hex();

        let readable = format!("{}_{}_{}", self.owner, self.name, self.version);
        let readable: String = readable
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .take(64)
            .collect();

        format!("{readable}-{}", &digest[..16])
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.name, self.version)
    }
}

impl FromStr for ActionRef {
    type Err = MalformedReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// `true` if every component of `path` is a normal name.
fn plain_segments(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

/// A node of the dependency graph: the root repository or one action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Root,
    Action(ActionRef),
}

impl From<ActionRef> for NodeKey {
    fn from(action: ActionRef) -> Self {
        Self::Action(action)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str(ROOT_LABEL),
            Self::Action(action) => action.fmt(f),
        }
    }
}

/// Cheap pre-filter: `true` iff `text` contains both `/` and `@`.
#[must_use]
pub fn is_external(text: &str) -> bool {
    text.contains('/') && text.contains('@')
}

/// Parse `owner/name@version`.
///
/// # Errors
///
/// Returns [`MalformedReferenceError`] if `text` does not match the grammar
/// in the module docs. Callers treat this as "not an external reference".
pub fn parse(text: &str) -> Result<ActionRef, MalformedReferenceError> {
    let malformed = || MalformedReferenceError::new(text);

    let (owner, rest) = text.split_once('/').ok_or_else(malformed)?;
    let (name, version) = rest.split_once('@').ok_or_else(malformed)?;

    ActionRef::new(owner, name, version).map_err(|_| malformed())
}
