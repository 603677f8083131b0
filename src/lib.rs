//! # dendra
//!
//! A self-expanding tree of adaptive signal nodes.
//!
//! A scalar signal is pushed down through the tree, scaled by per-slot
//! weights; responses are averaged back up; every visited node nudges its
//! weights toward a goal-dependent target and derives a mood from its
//! recent performance. Elated interior nodes grow new child slots, so the
//! tree's shape is a product of its own history.
//!
//! ## Quick Start
//!
//! ```
//! use dendra::prelude::*;
//!
//! let cfg = TreeConfig::default().with_seed(42);
//! let mut tree = PropagationTree::new(cfg).unwrap();
//!
//! let records = tree
//!     .run_epochs(10, 3, &mut GoalPolicy::Uniform)
//!     .unwrap();
//!
//! assert_eq!(records.len(), 10);
//! assert!(tree.node_count() >= 40); // the full three-level lattice, plus growth
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support
//! - `serde`: Enable serialization of events, snapshots and config
//!
//! ## no_std Support
//!
//! Disable default features for `no_std` environments:
//! ```toml
//! dendra = { version = "0.1", default-features = false }
//! ```
//!
//! ## Modules
//!
//! - [`node`]: Signal node unit logic (learning, mood, growth)
//! - [`tree`]: Propagation tree orchestrator
//! - [`prng`]: Deterministic PRNG for reproducible runs
//! - [`observer`]: Trace events, sinks and read-only snapshots

// no_std support
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/node.rs"]
pub mod node;

#[path = "core/tree.rs"]
pub mod tree;

pub mod observer;

/// Prelude module for convenient imports.
///
/// ```
/// use dendra::prelude::*;
/// ```
pub mod prelude {
    pub use crate::node::{Coord, Goal, Mood, Outcome, Signal, SignalNode};
    pub use crate::observer::{TraceEvent, TraceSink, TreeSnapshot};
    pub use crate::tree::{
        EpochRecord, GoalPolicy, PropagationTree, TreeConfig, TreeDiagnostics,
    };
}
