#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::node::{Coord, Goal, Mood, Signal, SignalNode};
use crate::tree::PropagationTree;

/// A structured observation handed to an external sink.
///
/// Design intent:
/// - The core reports fields, it does not format or persist them.
/// - `Node` fires after every node-level pass; interior nodes carry the
///   weight vector the next pass will see, leaves carry `None`.
/// - `Growth` fires when an elated node gains a slot, naming the child
///   that was materialized for it.
/// - `Epoch` fires once per pass with what the root produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum TraceEvent {
    Node {
        coord: Coord,
        goal: Goal,
        output: Signal,
        mood: Mood,
        weights: Option<Vec<Signal>>,
    },
    Growth {
        parent: Coord,
        child: Coord,
        weight: Signal,
    },
    Epoch {
        epoch: u64,
        goal: Goal,
        output: Signal,
        mood: Mood,
    },
}

/// Where observation events go. Attached to the orchestrator at
/// configuration time; there is no process-wide logger or debug flag.
pub trait TraceSink {
    fn record(&mut self, event: TraceEvent);
}

impl<F: FnMut(TraceEvent)> TraceSink for F {
    fn record(&mut self, event: TraceEvent) {
        self(event)
    }
}

/// A read-only snapshot of one node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeSnapshot {
    pub coord: Coord,
    pub mood: Mood,
    pub weights: Vec<Signal>,
    pub history_len: usize,
    pub last_output: Option<Signal>,
    pub last_goal: Option<Goal>,
}

impl NodeSnapshot {
    fn of(node: &SignalNode) -> Self {
        Self {
            coord: node.coord,
            mood: node.mood,
            weights: node.weights.clone(),
            history_len: node.history.len(),
            last_output: node.history.last().map(|o| o.output),
            last_goal: node.history.last().map(|o| o.goal),
        }
    }
}

/// A read-only snapshot of the whole tree, sorted by coordinate so the
/// output is stable across runs.
///
/// Snapshotting is on-demand and allocates; the propagation pass itself
/// is untouched. Observers cannot mutate or steer the tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeSnapshot {
    pub epochs_run: u64,
    pub node_count: usize,
    pub nodes: Vec<NodeSnapshot>,
}

pub struct TreeAdapter<'a> {
    tree: &'a PropagationTree,
}

impl<'a> TreeAdapter<'a> {
    pub fn new(tree: &'a PropagationTree) -> Self {
        Self { tree }
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        let mut nodes: Vec<NodeSnapshot> = self.tree.iter().map(NodeSnapshot::of).collect();
        nodes.sort_unstable_by_key(|n| n.coord);

        TreeSnapshot {
            epochs_run: self.tree.epochs_run(),
            node_count: nodes.len(),
            nodes,
        }
    }
}
