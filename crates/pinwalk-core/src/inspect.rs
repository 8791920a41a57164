//! Classification of one fetched action and its integrity findings.
//!
//! An action directory carries at most one definition file (`action.yml`,
//! then `action.yaml`). Its `runs.using` discriminator decides what happens:
//!
//! | `runs.using` | children                   | warnings                          |
//! |--------------|----------------------------|-----------------------------------|
//! | `docker`     | none                       | unpinned `docker://` image or `FROM` lines |
//! | `composite`  | `runs.steps[].uses` actions | none                              |
//! | anything else| none                       | none                              |
//!
//! No definition file means a leaf with no findings. An unreadable or
//! unparseable definition is a leaf with one warning. Inspection never fails.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::document::{self, Document, LoadError};
use crate::reference::ActionRef;
use crate::workflow;

/// Definition file names, in lookup order.
pub const ACTION_FILE_NAMES: [&str; 2] = ["action.yml", "action.yaml"];

/// Prefix of an image pulled straight from a registry.
pub const REGISTRY_IMAGE_PREFIX: &str = "docker://";

const DIGEST_MARKER: &str = "@sha256:";
const SHA256_HEX_LEN: usize = 64;

/// How an action executes, as declared by its definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunsMode {
    /// No `action.yml`/`action.yaml` at the action root.
    NoDefinition,
    /// The definition exists but could not be read or parsed.
    Unparseable,
    /// `runs.using: docker`.
    Container,
    /// `runs.using: composite`.
    Composite,
    /// Any other discriminator (`node20`, ...), or none at all.
    Other(Option<String>),
}

/// Result of inspecting one action directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub mode: RunsMode,
    pub children: BTreeSet<ActionRef>,
    pub warnings: Vec<String>,
}

impl Inspection {
    const fn leaf(mode: RunsMode) -> Self {
        Self {
            mode,
            children: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }
}

/// Locate the definition file of the action at `dir`.
#[must_use]
pub fn find_action_file(dir: &Path) -> Option<PathBuf> {
    ACTION_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Inspect the action checked out at `dir`.
#[must_use]
pub fn inspect_action(dir: &Path) -> Inspection {
    let Some(action_file) = find_action_file(dir) else {
        return Inspection::leaf(RunsMode::NoDefinition);
    };

    let doc = match document::load(&action_file) {
        Ok(doc) => doc,
        Err(LoadError::NotFound { .. }) => return Inspection::leaf(RunsMode::NoDefinition),
        Err(err) => {
            let file_name = action_file
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            let mut inspection = Inspection::leaf(RunsMode::Unparseable);
            inspection
                .warnings
                .push(format!("Could not parse {file_name}: {err}"));
            return inspection;
        }
    };

    let inspection = inspect_definition(&doc, dir);
    debug!(
        dir = %dir.display(),
        mode = ?inspection.mode,
        children = inspection.children.len(),
        warnings = inspection.warnings.len(),
        "inspected action"
    );
    inspection
}

/// Classify an already-loaded definition. `dir` is the action root, used to
/// resolve a local Dockerfile.
#[must_use]
pub fn inspect_definition(doc: &Document, dir: &Path) -> Inspection {
    let runs = doc.get("runs");
    if !runs.is_mapping() {
        return Inspection::leaf(RunsMode::Other(None));
    }

    match runs.get("using").as_str() {
        Some("docker") => {
            let mut inspection = Inspection::leaf(RunsMode::Container);
            inspection.warnings = container_warnings(runs.get("image"), dir);
            inspection
        }
        Some("composite") => {
            let mut inspection = Inspection::leaf(RunsMode::Composite);
            workflow::step_references(runs.get("steps"), &mut inspection.children);
            inspection
        }
        other => Inspection::leaf(RunsMode::Other(other.map(str::to_string))),
    }
}

fn container_warnings(image: &Document, dir: &Path) -> Vec<String> {
    let Some(image) = image.as_str() else {
        return vec!["runs.using='docker' but runs.image is missing".to_string()];
    };

    if image.starts_with(REGISTRY_IMAGE_PREFIX) {
        if has_content_digest(image) {
            return Vec::new();
        }
        return vec![format!("Unpinned Docker image => {image}")];
    }

    let Some(dockerfile) = local_dockerfile(dir, image) else {
        return vec![format!(
            "runs.image='{image}' points outside the action directory"
        )];
    };
    if !dockerfile.is_file() {
        return vec![format!(
            "runs.image='{image}' but no Dockerfile found in action root."
        )];
    }
    scan_dockerfile(&dockerfile)
}

/// Resolve a `runs.image` path against the action root, refusing absolute
/// paths and `..` components.
fn local_dockerfile(dir: &Path, image: &str) -> Option<PathBuf> {
    let relative = Path::new(image);
    let contained = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    contained.then(|| dir.join(relative))
}

/// `true` if `image` carries `@sha256:` followed by exactly 64 hex digits,
/// up to the end of the string or the next whitespace.
#[must_use]
pub fn has_content_digest(image: &str) -> bool {
    image.match_indices(DIGEST_MARKER).any(|(at, marker)| {
        let digest = image[at + marker.len()..]
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default();
        digest.len() == SHA256_HEX_LEN && digest.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// Warnings for a Dockerfile on disk; read failures become one warning.
#[must_use]
pub fn scan_dockerfile(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => dockerfile_warnings(&text),
        Err(err) => vec![format!("Could not read Dockerfile: {err}")],
    }
}

/// One warning per `FROM` line whose image argument lacks a digest.
#[must_use]
pub fn dockerfile_warnings(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(from_argument)
        .filter(|argument| !has_content_digest(argument))
        .map(|argument| format!("Unpinned Docker FROM => '{argument}'"))
        .collect()
}

/// The argument of a `FROM` instruction (case-insensitive), verbatim.
fn from_argument(line: &str) -> Option<&str> {
    let line = line.trim();
    let (instruction, rest) = line.split_once(char::is_whitespace)?;
    if !instruction.eq_ignore_ascii_case("FROM") {
        return None;
    }
    let argument = rest.trim();
    (!argument.is_empty()).then_some(argument)
}
