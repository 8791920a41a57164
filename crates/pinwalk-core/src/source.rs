//! Capability for obtaining working copies of repositories.
//!
//! The traversal only needs "give me a directory for this reference, or tell
//! me why not". The git-backed implementation lives in the CLI; tests use
//! in-memory doubles.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;
use crate::reference::ActionRef;

/// Why a working copy could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// The fetch tool could not be started at all.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The fetch tool ran and reported failure.
    #[error("`{command}` failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    /// The repository was fetched but the requested version is unknown.
    #[error("failed to checkout '{version}' in {repository}: {source}")]
    Checkout {
        repository: String,
        version: String,
        #[source]
        source: Box<AcquireError>,
    },

    /// The repository was fetched but the action sub-directory is missing.
    #[error("{repository}@{version} has no directory '{subpath}'")]
    MissingSubpath {
        repository: String,
        version: String,
        subpath: String,
    },

    /// The local target directory could not be prepared.
    #[error("failed to prepare {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other source-specific failure.
    #[error("{0}")]
    Unavailable(String),
}

impl AcquireError {
    /// Code for this failure when it ends a run (root) rather than becoming
    /// a node warning.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Workspace { .. } => ErrorCode::WorkspaceUnavailable,
            _ => ErrorCode::ActionAcquisitionFailed,
        }
    }
}

/// Produces local working copies.
///
/// Implementations map each reference to a deterministic, collision-free
/// directory (see [`ActionRef::checkout_dir_name`]) and must remove a stale
/// copy at that path before acquiring again.
pub trait RepositorySource {
    /// Fetch the root repository from `locator` (usually a URL).
    ///
    /// # Errors
    ///
    /// Any fetch failure. The traversal treats it as fatal.
    fn acquire_root(&self, locator: &str) -> Result<PathBuf, AcquireError>;

    /// Fetch `action` at its version and return the action's directory.
    ///
    /// # Errors
    ///
    /// Any fetch or checkout failure. The traversal records it as a warning
    /// on the node and moves on.
    fn acquire(&self, action: &ActionRef) -> Result<PathBuf, AcquireError>;
}

impl<S: RepositorySource + ?Sized> RepositorySource for &S {
    fn acquire_root(&self, locator: &str) -> Result<PathBuf, AcquireError> {
        (**self).acquire_root(locator)
    }

    fn acquire(&self, action: &ActionRef) -> Result<PathBuf, AcquireError> {
        (**self).acquire(action)
    }
}

/// Remove whatever exists at `path` so a fresh copy can be placed there.
///
/// # Errors
///
/// [`AcquireError::Workspace`] if the stale copy cannot be removed.
pub fn clear_stale_copy(path: &Path) -> Result<(), AcquireError> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else if path.exists() {
        std::fs::remove_file(path)
    } else {
        return Ok(());
    };

    result.map_err(|source| AcquireError::Workspace {
        path: path.to_path_buf(),
        source,
    })
}
