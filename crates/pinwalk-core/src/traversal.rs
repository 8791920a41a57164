//! Recursive discovery of the action dependency graph.
//!
//! # Overview
//!
//! The root repository is fetched and its workflows seed a worklist. Each
//! pass pops one reference, marks it visited, fetches it, inspects it, and
//! queues the children it declares that have not been seen before.
//!
//! ## Invariants
//!
//! - A reference is marked visited the moment it is popped, before its
//!   children are looked at. A cycle `A -> B -> A` therefore finds `A`
//!   already visited and stops.
//! - A reference is queued only if it is neither visited nor already queued,
//!   so each one is fetched and inspected at most once per run.
//! - Recording the edge `parent -> child` is independent of whether `child`
//!   needs a visit: every declared edge is kept, even to a child reached
//!   earlier through another parent.
//! - Every node in the graph has a warnings entry and vice versa, possibly
//!   empty.
//!
//! Only a failure to fetch the root aborts the run. Every other problem
//! becomes a warning on the node it concerns.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, info, instrument, warn};

use crate::error::ErrorCode;
use crate::inspect::{self, Inspection};
use crate::reference::{ActionRef, NodeKey};
use crate::source::{AcquireError, RepositorySource};
use crate::workflow;

/// Declared children per node.
pub type DependencyGraph = BTreeMap<NodeKey, BTreeSet<ActionRef>>;

/// Findings per node, in discovery order.
pub type WarningsMap = BTreeMap<NodeKey, Vec<String>>;

/// Bounds on a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanLimits {
    /// Stop fetching after this many actions. `None` is unlimited.
    pub max_actions: Option<usize>,
}

impl ScanLimits {
    #[must_use]
    pub const fn unlimited() -> Self {
        Self { max_actions: None }
    }

    #[must_use]
    pub const fn with_max_actions(max_actions: usize) -> Self {
        Self {
            max_actions: Some(max_actions),
        }
    }

    const fn exhausted(self, acquired: usize) -> bool {
        match self.max_actions {
            Some(max) => acquired >= max,
            None => false,
        }
    }
}

/// Fatal scan failures.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to acquire root repository {locator}: {source}")]
    RootAcquisition {
        locator: String,
        #[source]
        source: AcquireError,
    },
}

impl ScanError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::RootAcquisition { .. } => ErrorCode::RootAcquisitionFailed,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Actions handed to the repository source.
    pub acquired: usize,
    /// Of those, how many could not be fetched.
    pub failed: usize,
    /// Actions left unfetched because the limit was reached.
    pub skipped: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Every action ever discovered, including the root's seeds.
    pub all_actions: BTreeSet<ActionRef>,
    pub graph: DependencyGraph,
    pub warnings: WarningsMap,
    pub stats: ScanStats,
}

/// Mutable state of one run. Created empty, owned by the traversal, handed
/// out as a [`ScanOutcome`] at the end.
#[derive(Debug, Default)]
pub struct ScanState {
    graph: DependencyGraph,
    warnings: WarningsMap,
    visited: HashSet<ActionRef>,
    worklist: BTreeSet<ActionRef>,
    discovered: BTreeSet<ActionRef>,
    stats: ScanStats,
}

impl ScanState {
    /// Start a run from the root's seed references. None of them is visited.
    #[must_use]
    pub fn seeded(seeds: BTreeSet<ActionRef>) -> Self {
        let mut state = Self::default();
        state.discovered.extend(seeds.iter().cloned());
        state.worklist.extend(seeds.iter().cloned());
        state.graph.insert(NodeKey::Root, seeds);
        state.warnings.insert(NodeKey::Root, Vec::new());
        state
    }

    /// Pop the next reference that still needs processing and mark it
    /// visited. Returns `None` once the worklist is drained.
    pub fn next_unvisited(&mut self) -> Option<ActionRef> {
        while let Some(action) = self.worklist.pop_first() {
            if !self.visited.insert(action.clone()) {
                continue;
            }
            let key = NodeKey::Action(action.clone());
            self.graph.entry(key.clone()).or_default();
            self.warnings.entry(key).or_default();
            return Some(action);
        }
        None
    }

    /// Whether `action` has already been popped for processing.
    #[must_use]
    pub fn is_visited(&self, action: &ActionRef) -> bool {
        self.visited.contains(action)
    }

    /// Whether `action` is waiting in the worklist.
    #[must_use]
    pub fn is_queued(&self, action: &ActionRef) -> bool {
        self.worklist.contains(action)
    }

    /// Append a warning to `action`'s entry.
    pub fn warn(&mut self, action: &ActionRef, warning: String) {
        self.warnings
            .entry(NodeKey::Action(action.clone()))
            .or_default()
            .push(warning);
    }

    /// Record the edge `parent -> child` and queue `child` if it is new.
    pub fn add_edge(&mut self, parent: &ActionRef, child: ActionRef) {
        self.graph
            .entry(NodeKey::Action(parent.clone()))
            .or_default()
            .insert(child.clone());

        self.discovered.insert(child.clone());
        if !self.is_visited(&child) && !self.is_queued(&child) {
            debug!(parent = %parent, child = %child, "queued");
            self.worklist.insert(child);
        }
    }

    /// Fold one inspection result into the state.
    pub fn record_inspection(&mut self, action: &ActionRef, inspection: Inspection) {
        for warning in inspection.warnings {
            self.warn(action, warning);
        }
        for child in inspection.children {
            self.add_edge(action, child);
        }
    }

    #[must_use]
    pub fn into_outcome(self) -> ScanOutcome {
        ScanOutcome {
            all_actions: self.discovered,
            graph: self.graph,
            warnings: self.warnings,
            stats: self.stats,
        }
    }
}

/// Drives one discovery run against a [`RepositorySource`].
#[derive(Debug)]
pub struct Traversal<S> {
    source: S,
    limits: ScanLimits,
}

impl<S: RepositorySource> Traversal<S> {
    #[must_use]
    pub const fn new(source: S, limits: ScanLimits) -> Self {
        Self { source, limits }
    }

    /// Fetch the root at `locator`, seed from its workflows, and drain.
    ///
    /// # Errors
    ///
    /// [`ScanError::RootAcquisition`] if the root cannot be fetched. Nothing
    /// else is fatal.
    #[instrument(skip(self))]
    pub fn run(&self, locator: &str) -> Result<ScanOutcome, ScanError> {
        info!(locator, "acquiring root repository");
        let root_dir =
            self.source
                .acquire_root(locator)
                .map_err(|source| ScanError::RootAcquisition {
                    locator: locator.to_string(),
                    source,
                })?;

        let seeds = workflow::scan_workflows(&root_dir);
        info!(seeds = seeds.len(), "seeded from root workflows");

        Ok(self.drain(ScanState::seeded(seeds)))
    }

    /// Process the worklist of `state` until it is empty.
    #[must_use]
    pub fn drain(&self, mut state: ScanState) -> ScanOutcome {
        while let Some(action) = state.next_unvisited() {
            if self.limits.exhausted(state.stats.acquired) {
                let max = self.limits.max_actions.unwrap_or_default();
                warn!(action = %action, max, "scan limit reached, not fetching");
                state.warn(
                    &action,
                    format!("skipped: scan limit of {max} actions reached"),
                );
                state.stats.skipped += 1;
                continue;
            }

            info!(action = %action, "acquiring action");
            state.stats.acquired += 1;
            let dir = match self.source.acquire(&action) {
                Ok(dir) => dir,
                Err(err) => {
                    warn!(
                        action = %action,
                        code = %err.code(),
                        error = %err,
                        "unable to acquire action"
                    );
                    state.warn(
                        &action,
                        format!("Unable to clone/check out {action}: {err}"),
                    );
                    state.stats.failed += 1;
                    continue;
                }
            };

            let inspection = inspect::inspect_action(&dir);
            state.record_inspection(&action, inspection);
        }

        let outcome = state.into_outcome();
        info!(
            actions = outcome.all_actions.len(),
            acquired = outcome.stats.acquired,
            failed = outcome.stats.failed,
            skipped = outcome.stats.skipped,
            "scan complete"
        );
        outcome
    }
}
