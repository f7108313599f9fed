//! Graph snapshot export for offline visualisation.

use crate::graph::Graph;
use chrono::{DateTime, Utc};
use rover_error::CommonError;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

/// Maximum number of snapshots retained in the ring.
const MAX_SNAPSHOTS: usize = 100;

/// A single captured rendering of the graph.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// DOT (Graphviz) document describing the graph at capture time.
    pub dot: String,
    /// When the snapshot was captured.
    pub captured_at: DateTime<Utc>,
    /// The graph's logical clock at capture time.
    pub logical_clock: u64,
}

/// A snapshot plus its position in the retained history.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    /// The requested snapshot.
    pub snapshot: Snapshot,
    /// Index that was requested; 0 is the most recent snapshot.
    pub index: usize,
    /// Number of snapshots currently retained.
    pub count: usize,
}

/// Bounded history of graph snapshots.
///
/// Snapshots are captured at the end of every reconfiguration pass and every
/// removal sweep; capturing never mutates graph state.
#[derive(Default)]
pub struct Visualizer {
    snapshots: Mutex<VecDeque<Snapshot>>,
}

impl Visualizer {
    /// Creates an empty snapshot history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures and stores a snapshot of the graph, evicting the oldest
    /// entry when the ring is full.
    pub fn save_snapshot(&self, graph: &Graph) {
        let snapshot = Snapshot {
            dot: export_dot(graph),
            captured_at: Utc::now(),
            logical_clock: graph.logical_clock(),
        };
        let mut ring = self
            .snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if ring.len() == MAX_SNAPSHOTS {
            ring.pop_back();
        }
        ring.push_front(snapshot);
    }

    /// Returns the snapshot at `index` (0 is the most recent).
    ///
    /// # Errors
    ///
    /// Returns a not-found error when `index` is out of range.
    pub fn snapshot(&self, index: usize) -> Result<SnapshotInfo, CommonError> {
        let ring = self
            .snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = ring.len();
        ring.get(index)
            .cloned()
            .map(|snapshot| SnapshotInfo {
                snapshot,
                index,
                count,
            })
            .ok_or_else(|| {
                CommonError::not_found(format!("graph snapshot {index} (have {count})"))
            })
    }
}

/// Renders the graph as a DOT document.
///
/// Node attributes carried: `name`, `api`, `model`, `state`, `revision`,
/// and `has_error`. Edges point from each child to its parents.
#[must_use]
pub fn export_dot(graph: &Graph) -> String {
    let mut out = String::from("digraph resources {\n");
    for name in graph.names() {
        let Some(node) = graph.node(&name) else {
            continue;
        };
        let model = node
            .model()
            .map_or_else(|| "<none>".to_string(), |model| model.to_string());
        let _ = writeln!(
            out,
            "  \"{name}\" [api=\"{api}\", model=\"{model}\", state=\"{state}\", \
             revision=\"{revision}\", has_error={has_error}];",
            api = name.api,
            state = node.state(),
            revision = node.revision(),
            has_error = node.last_error().is_some(),
        );
    }
    for child in graph.names() {
        for parent in graph.parents_of(&child) {
            let _ = writeln!(out, "  \"{child}\" -> \"{parent}\";");
        }
    }
    out.push_str("}\n");
    out
}
