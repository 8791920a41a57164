//! Seed discovery: external action references declared by workflow files.
//!
//! Workflows live under `.github/workflows/` (any depth, `.yml` or `.yaml`).
//! Each one is walked as `jobs.<id>.steps[].uses`; anything that is not the
//! expected shape is skipped, so a broken or templated file contributes zero
//! references instead of failing the scan.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::{self, Document};
use crate::reference::{self, ActionRef};

/// Workflow directory relative to a repository root.
pub const WORKFLOW_DIR: &str = ".github/workflows";

const WORKFLOW_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Container step images use `uses:` too but are not actions.
const DOCKER_USES_PREFIX: &str = "docker://";

/// Collect every external action referenced by the workflows in `repo_dir`.
#[must_use]
pub fn scan_workflows(repo_dir: &Path) -> BTreeSet<ActionRef> {
    let mut found = BTreeSet::new();

    for path in workflow_files(repo_dir) {
        let doc = match document::load(&path) {
            Ok(doc) => doc,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping workflow");
                continue;
            }
        };
        if !doc.is_mapping() {
            debug!(path = %path.display(), "workflow is not a mapping, skipping");
            continue;
        }

        let before = found.len();
        workflow_references(&doc, &mut found);
        debug!(
            path = %path.display(),
            new = found.len() - before,
            "scanned workflow"
        );
    }

    found
}

/// All workflow files below `repo_dir/.github/workflows`, sorted.
#[must_use]
pub fn workflow_files(repo_dir: &Path) -> Vec<PathBuf> {
    let root = repo_dir.join(WORKFLOW_DIR);
    let mut files = Vec::new();
    if root.is_dir() {
        collect_files(&root, &mut files);
    }
    files.sort();
    files
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "cannot list workflow directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            collect_files(&path, out);
        } else if has_workflow_extension(&path) {
            out.push(path);
        }
    }
}

fn has_workflow_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKFLOW_EXTENSIONS.contains(&ext))
}

/// Add the references from `jobs.*.steps[].uses` of one workflow to `out`.
pub fn workflow_references(doc: &Document, out: &mut BTreeSet<ActionRef>) {
    let Some(jobs) = doc.get("jobs").as_mapping() else {
        return;
    };
    for (_, job) in jobs {
        step_references(job.get("steps"), out);
    }
}

/// Add the references from a `steps` sequence to `out`.
///
/// Shared by workflow jobs and composite actions. Non-mapping steps, steps
/// without `uses`, local (`./path`) and container (`docker://`) steps, and
/// malformed references are skipped.
pub fn step_references(steps: &Document, out: &mut BTreeSet<ActionRef>) {
    let Some(steps) = steps.as_sequence() else {
        return;
    };

    for step in steps {
        let Some(uses) = step.get("uses").as_str() else {
            continue;
        };
        if uses.starts_with(DOCKER_USES_PREFIX) || !reference::is_external(uses) {
            continue;
        }
        match reference::parse(uses) {
            Ok(action) => {
                out.insert(action);
            }
            Err(err) => debug!(error = %err, "ignoring malformed uses"),
        }
    }
}
