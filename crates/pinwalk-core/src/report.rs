//! Canonical serialisable result of a scan.
//!
//! ```json
//! {
//!   "dependencies":    { "<parent-label>": ["<child-label>", ...] },
//!   "docker_warnings": { "<node-label>": ["<warning text>", ...] },
//!   "all_actions":     ["<owner>/<name>@<version>", ...]
//! }
//! ```
//!
//! Labels are `owner/name@version`, or [`ROOT_LABEL`] for the root. Child
//! lists and `all_actions` are sorted lexicographically by label; warning
//! lists keep discovery order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::reference::ROOT_LABEL;
use crate::traversal::ScanOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub docker_warnings: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub all_actions: Vec<String>,
}

/// Headline numbers for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub actions: usize,
    pub edges: usize,
    pub nodes_with_warnings: usize,
    pub warnings: usize,
}

impl ScanReport {
    /// Convert a traversal outcome into labelled, sorted form.
    #[must_use]
    pub fn from_outcome(outcome: &ScanOutcome) -> Self {
        let dependencies = outcome
            .graph
            .iter()
            .map(|(parent, children)| {
                let mut labels: Vec<String> = children.iter().map(ToString::to_string).collect();
                labels.sort();
                (parent.to_string(), labels)
            })
            .collect();

        let docker_warnings = outcome
            .warnings
            .iter()
            .map(|(node, warnings)| (node.to_string(), warnings.clone()))
            .collect();

        let mut all_actions: Vec<String> =
            outcome.all_actions.iter().map(ToString::to_string).collect();
        all_actions.sort();

        Self {
            dependencies,
            docker_warnings,
            all_actions,
        }
    }

    /// Dependency entries with the root first, then the rest by label.
    pub fn dependencies_root_first(&self) -> impl Iterator<Item = (&str, &[String])> {
        let root = self
            .dependencies
            .get_key_value(ROOT_LABEL)
            .map(|(k, v)| (k.as_str(), v.as_slice()));
        let rest = self
            .dependencies
            .iter()
            .filter(|(k, _)| k.as_str() != ROOT_LABEL)
            .map(|(k, v)| (k.as_str(), v.as_slice()));
        root.into_iter().chain(rest)
    }

    /// Warnings recorded for `label`, empty if none.
    #[must_use]
    pub fn warnings_for(&self, label: &str) -> &[String] {
        self.docker_warnings
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            actions: self.all_actions.len(),
            edges: self.dependencies.values().map(Vec::len).sum(),
            nodes_with_warnings: self
                .docker_warnings
                .values()
                .filter(|w| !w.is_empty())
                .count(),
            warnings: self.docker_warnings.values().map(Vec::len).sum(),
        }
    }
}
