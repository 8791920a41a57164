//! Repository source backed by the `git` executable.
//!
//! Layout inside the workspace:
//!
//! ```text
//! <workspace>/
//!   .pinwalk.lock
//!   initial_repo/                      # root repository
//!   actions_checkout_v4-1f0c.../       # one directory per action reference
//! ```
//!
//! Each target directory is removed before cloning, so re-running a scan
//! in the same workspace always starts from fresh copies.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use pinwalk_core::reference::ActionRef;
use pinwalk_core::source::{AcquireError, RepositorySource, clear_stale_copy};
use tracing::{debug, info};

/// Directory name of the root repository inside the workspace.
pub const ROOT_CHECKOUT_DIR: &str = "initial_repo";

/// Clones repositories with `git` into a workspace directory.
#[derive(Debug, Clone)]
pub struct GitSource {
    program: String,
    base_url: String,
    workspace: PathBuf,
}

impl GitSource {
    pub fn new(program: impl Into<String>, base_url: impl Into<String>, workspace: &Path) -> Self {
        Self {
            program: program.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            workspace: workspace.to_path_buf(),
        }
    }

    /// Clone URL for the repository hosting `action`.
    pub fn repository_url(&self, action: &ActionRef) -> String {
        format!(
            "{}/{}/{}.git",
            self.base_url,
            action.owner(),
            action.repository()
        )
    }

    /// Working copy location for `action`.
    pub fn checkout_dir(&self, action: &ActionRef) -> PathBuf {
        self.workspace.join(action.checkout_dir_name())
    }

    fn git<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<(), AcquireError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        let rendered = render_command(&command);
        debug!(command = %rendered, "running");

        let output = command.output().map_err(|source| AcquireError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AcquireError::Command {
                command: rendered,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    fn clone_into(&self, url: &str, target: &Path) -> Result<(), AcquireError> {
        clear_stale_copy(target)?;
        info!(url, target = %target.display(), "cloning");
        self.git(
            [OsStr::new("clone"), OsStr::new("-q"), OsStr::new(url), target.as_os_str()],
            None,
        )
    }
}

impl RepositorySource for GitSource {
    fn acquire_root(&self, locator: &str) -> Result<PathBuf, AcquireError> {
        std::fs::create_dir_all(&self.workspace).map_err(|source| AcquireError::Workspace {
            path: self.workspace.clone(),
            source,
        })?;
        let target = self.workspace.join(ROOT_CHECKOUT_DIR);
        self.clone_into(locator, &target)?;
        Ok(target)
    }

    fn acquire(&self, action: &ActionRef) -> Result<PathBuf, AcquireError> {
        let target = self.checkout_dir(action);
        self.clone_into(&self.repository_url(action), &target)?;

        self.git(["fetch", "-q", "--all"], Some(&target))?;
        self.git(["fetch", "-q", "--tags"], Some(&target))?;

        debug!(version = action.version(), "checking out");
        self.git(["checkout", "-q", action.version()], Some(&target))
            .map_err(|source| AcquireError::Checkout {
                repository: format!("{}/{}", action.owner(), action.repository()),
                version: action.version().to_string(),
                source: Box::new(source),
            })?;

        let Some(subpath) = action.subpath() else {
            return Ok(target);
        };
        let action_dir = target.join(subpath);
        if action_dir.is_dir() {
            Ok(action_dir)
        } else {
            Err(AcquireError::MissingSubpath {
                repository: format!("{}/{}", action.owner(), action.repository()),
                version: action.version().to_string(),
                subpath: subpath.to_string(),
            })
        }
    }
}

fn render_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinwalk_core::reference::parse;

    fn action(text: &str) -> ActionRef {
        parse(text).expect("valid reference")
    }

    #[test]
    fn repository_url_uses_owner_and_repository() {
        let source = GitSource::new("git", "https://github.com/", Path::new("scans"));
        assert_eq!(
            source.repository_url(&action("actions/checkout@v4")),
            "https://github.com/actions/checkout.git"
        );
        assert_eq!(
            source.repository_url(&action("github/codeql-action/init@v3")),
            "https://github.com/github/codeql-action.git"
        );
    }

    #[test]
    fn checkout_dirs_live_in_the_workspace_and_differ_per_version() {
        let source = GitSource::new("git", "https://github.com", Path::new("scans"));
        let v1 = source.checkout_dir(&action("org/tool@v1"));
        let v2 = source.checkout_dir(&action("org/tool@v2"));
        assert!(v1.starts_with("scans"));
        assert_ne!(v1, v2);
        assert_ne!(v1, Path::new("scans").join(ROOT_CHECKOUT_DIR));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = GitSource::new("pinwalk-no-such-git", "https://github.com", dir.path());

        let err = source
            .acquire(&action("org/tool@v1"))
            .expect_err("spawn should fail");
        assert!(matches!(err, AcquireError::Spawn { ref command, .. } if command.starts_with("pinwalk-no-such-git clone -q")));

        let err = source
            .acquire_root("https://example.com/repo.git")
            .expect_err("spawn should fail");
        assert!(matches!(err, AcquireError::Spawn { .. }));
    }

    #[test]
    fn stale_copy_is_removed_before_cloning() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = GitSource::new("pinwalk-no-such-git", "https://github.com", dir.path());
        let target = source.checkout_dir(&action("org/tool@v1"));
        std::fs::create_dir_all(target.join("old")).expect("mkdir");

        let _ = source.acquire(&action("org/tool@v1"));
        assert!(!target.exists());
    }
}
