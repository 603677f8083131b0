#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};
#[cfg(not(feature = "std"))]
use hashbrown::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::node::{Coord, Goal, Mood, Signal, SignalNode, MIN_FANOUT};
use crate::observer::{TraceEvent, TraceSink};
use crate::prng::Prng;

/// Tree-lifetime configuration.
///
/// Epoch count and depth limit are per-run arguments to
/// [`PropagationTree::run_epochs`]; everything that shapes node behavior
/// lives here. Defaults reproduce the reference dynamics exactly.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeConfig {
    /// Per-node learning rate, fixed at materialization time.
    pub learning_rate: f32,

    /// Weight slots a fresh node starts with. Never below [`MIN_FANOUT`].
    pub initial_fanout: usize,

    /// Uniform init range for new weights (initial slots and grown ones).
    pub weight_low: f32,
    pub weight_high: f32,

    /// Amplitude of the uniform noise added to a leaf's input.
    pub leaf_noise: f32,

    /// If set, makes a run reproducible bit-for-bit.
    pub seed: Option<u64>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            initial_fanout: MIN_FANOUT,
            weight_low: 0.5,
            weight_high: 1.5,
            leaf_noise: 0.05,
            seed: None,
        }
    }
}

impl TreeConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_learning_rate(mut self, rate: f32) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Validate the configuration, returning an error message if invalid.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.initial_fanout < MIN_FANOUT {
            return Err("initial_fanout must be >= 3");
        }
        if !self.learning_rate.is_finite()
            || self.learning_rate <= 0.0
            || self.learning_rate > 1.0
        {
            return Err("learning_rate must be in (0, 1]");
        }
        if !self.weight_low.is_finite()
            || !self.weight_high.is_finite()
            || self.weight_low > self.weight_high
        {
            return Err("weight init range is invalid");
        }
        if !self.leaf_noise.is_finite() || self.leaf_noise < 0.0 {
            return Err("leaf_noise must be finite and >= 0");
        }
        Ok(())
    }
}

/// How the orchestrator picks a goal for each epoch.
#[derive(Debug, Clone)]
pub enum GoalPolicy {
    /// Uniform draw over {Stability, Chaos, Inversion} from the tree RNG.
    Uniform,
    /// The same goal every epoch.
    Fixed(Goal),
    /// Round-robin over a script of goals, keyed by the epoch counter.
    Cycle(Vec<Goal>),
}

impl GoalPolicy {
    pub fn select(&mut self, epoch: u64, rng: &mut Prng) -> Goal {
        match self {
            GoalPolicy::Uniform => {
                const CHOICES: [Goal; 3] = [Goal::Stability, Goal::Chaos, Goal::Inversion];
                CHOICES[rng.pick(CHOICES.len())]
            }
            GoalPolicy::Fixed(goal) => *goal,
            GoalPolicy::Cycle(goals) => {
                if goals.is_empty() {
                    return Goal::Unknown;
                }
                goals[(epoch % goals.len() as u64) as usize]
            }
        }
    }
}

/// What one epoch produced at the root.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpochRecord {
    pub epoch: u64,
    pub goal: Goal,
    pub output: Signal,
    pub mood: Mood,
}

/// Cheap whole-tree summary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeDiagnostics {
    pub node_count: usize,
    pub slot_count: usize,
    pub max_depth: u32,
    pub elated: usize,
    pub calm: usize,
    pub curious: usize,
    pub frustrated: usize,
}

/// Orchestrator: owns the sparse node arena, the RNG and the trace sink,
/// and drives one full top-down/bottom-up pass per epoch.
///
/// The arena is the only owner of nodes; traversal addresses them purely
/// by coordinate. Coordinates are created on first visit (or eagerly by
/// the growth rule) and persist for the tree's lifetime; the map only
/// ever grows.
pub struct PropagationTree {
    cfg: TreeConfig,
    nodes: HashMap<Coord, SignalNode>,
    rng: Prng,
    epochs_run: u64,
    sink: Option<Box<dyn TraceSink>>,
}

impl PropagationTree {
    /// Create a tree holding only the root at (0,0).
    pub fn new(cfg: TreeConfig) -> Result<Self, &'static str> {
        cfg.validate()?;
        let mut rng = Prng::new(cfg.seed.unwrap_or(1));
        let mut nodes = HashMap::new();
        nodes.insert(Coord::ROOT, SignalNode::new(Coord::ROOT, &cfg, &mut rng));
        Ok(Self {
            cfg,
            nodes,
            rng,
            epochs_run: 0,
            sink: None,
        })
    }

    /// Attach an observation sink. Events are only constructed while a
    /// sink is attached; observers cannot mutate or steer the tree.
    pub fn set_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Run `epochs` sequential propagation passes.
    ///
    /// Each pass draws a goal from `policy`, pushes a unit signal through
    /// the whole tree and records what the root produced. Fails fast on
    /// `epochs == 0` or an empty goal cycle, before any propagation.
    /// Negative depth limits are unrepresentable; a depth limit of 0
    /// makes the root its own leaf.
    pub fn run_epochs(
        &mut self,
        epochs: u32,
        depth_limit: u32,
        policy: &mut GoalPolicy,
    ) -> Result<Vec<EpochRecord>, &'static str> {
        if epochs == 0 {
            return Err("epochs must be > 0");
        }
        if matches!(policy, GoalPolicy::Cycle(goals) if goals.is_empty()) {
            return Err("goal cycle must not be empty");
        }

        self.materialize(Coord::ROOT);

        let mut records = Vec::with_capacity(epochs as usize);
        for _ in 0..epochs {
            let epoch = self.epochs_run;
            let goal = policy.select(epoch, &mut self.rng);
            let output = self.propagate_at(Coord::ROOT, 1.0, goal, depth_limit);
            let mood = self.nodes[&Coord::ROOT].mood;

            if let Some(sink) = self.sink.as_mut() {
                sink.record(TraceEvent::Epoch {
                    epoch,
                    goal,
                    output,
                    mood,
                });
            }
            records.push(EpochRecord {
                epoch,
                goal,
                output,
                mood,
            });
            self.epochs_run += 1;
        }
        Ok(records)
    }

    /// One recursive pass below `coord`: scaled signal down, averaged
    /// response up, learning and mood update at every visited node.
    fn propagate_at(
        &mut self,
        coord: Coord,
        input: Signal,
        goal: Goal,
        depth_limit: u32,
    ) -> Signal {
        if coord.depth >= depth_limit {
            let Self {
                nodes,
                rng,
                cfg,
                sink,
                ..
            } = self;
            let node = nodes.get_mut(&coord).expect("visited node is materialized");
            let output = node.leaf_response(input, goal, cfg.leaf_noise, rng);
            if let Some(sink) = sink.as_mut() {
                sink.record(TraceEvent::Node {
                    coord,
                    goal,
                    output,
                    mood: node.mood,
                    weights: None,
                });
            }
            return output;
        }

        // Branching factor is the slot count at the moment this pass
        // enters the node; children never touch their parent's weights.
        let weights: Vec<Signal> = self.nodes[&coord].weights.clone();
        let mut sum = 0.0;
        for (slot, &w) in weights.iter().enumerate() {
            let child = coord.child(slot);
            self.materialize(child);
            sum += self.propagate_at(child, input * w, goal, depth_limit);
        }
        let avg = sum / weights.len() as Signal;

        let Self {
            nodes,
            rng,
            cfg,
            sink,
            ..
        } = self;

        let (output, mood, grown) = {
            let node = nodes.get_mut(&coord).expect("visited node is materialized");
            let output = node.integrate(avg, goal, rng);
            let grown = node
                .try_grow(depth_limit, cfg, rng)
                .map(|slot| (slot, node.weights[slot]));
            (output, node.mood, grown)
        };

        // A grown slot's child is materialized now, not lazily, so the
        // coordinate is already discoverable before any future pass.
        let mut growth = None;
        if let Some((slot, weight)) = grown {
            let child = coord.child(slot);
            nodes
                .entry(child)
                .or_insert_with(|| SignalNode::new(child, cfg, rng));
            growth = Some((child, weight));
        }

        if let Some(sink) = sink.as_mut() {
            sink.record(TraceEvent::Node {
                coord,
                goal,
                output,
                mood,
                weights: Some(nodes[&coord].weights.clone()),
            });
            if let Some((child, weight)) = growth {
                sink.record(TraceEvent::Growth {
                    parent: coord,
                    child,
                    weight,
                });
            }
        }

        output
    }

    fn materialize(&mut self, coord: Coord) {
        let Self {
            nodes, rng, cfg, ..
        } = self;
        nodes
            .entry(coord)
            .or_insert_with(|| SignalNode::new(coord, cfg, rng));
    }

    pub fn node(&self, coord: Coord) -> Option<&SignalNode> {
        self.nodes.get(&coord)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.nodes.contains_key(&coord)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn epochs_run(&self) -> u64 {
        self.epochs_run
    }

    pub fn config(&self) -> &TreeConfig {
        &self.cfg
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalNode> {
        self.nodes.values()
    }

    pub fn diagnostics(&self) -> TreeDiagnostics {
        let mut diag = TreeDiagnostics {
            node_count: self.nodes.len(),
            ..Default::default()
        };
        for node in self.nodes.values() {
            diag.slot_count += node.weights.len();
            diag.max_depth = diag.max_depth.max(node.coord.depth);
            match node.mood {
                Mood::Elated => diag.elated += 1,
                Mood::Calm => diag.calm += 1,
                Mood::Curious => diag.curious += 1,
                Mood::Frustrated => diag.frustrated += 1,
            }
        }
        diag
    }
}
