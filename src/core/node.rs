#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prng::Prng;
use crate::tree::TreeConfig;

/// Scalar signal value flowing through the tree.
pub type Signal = f32;

/// Floor on a node's slot count. Weight vectors never shrink below this,
/// so the mean over child outputs is always well-defined.
pub const MIN_FANOUT: usize = 3;

/// How many recent history entries the mood classifier reads.
pub const MOOD_WINDOW: usize = 5;

/// Position of a node in the tree: (depth, index within that depth).
///
/// Assigned at creation and immutable. Node identity is the coordinate,
/// never a pointer; the tree's arena is the only owner of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coord {
    pub depth: u32,
    pub index: u32,
}

impl Coord {
    pub const ROOT: Coord = Coord { depth: 0, index: 0 };

    /// Coordinate of the child occupying weight slot `slot`.
    #[inline]
    pub fn child(self, slot: usize) -> Coord {
        Coord {
            depth: self.depth + 1,
            index: slot as u32,
        }
    }
}

impl core::fmt::Display for Coord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({},{})", self.depth, self.index)
    }
}

/// Learning goal for a propagation pass.
///
/// `Unknown` is the explicit fallback for unrecognized labels. It is a
/// normal branch, not an error: learning silently aims at 0.5 and the
/// mood classifier never counts it as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Goal {
    Stability,
    Chaos,
    Inversion,
    Unknown,
}

impl Goal {
    /// Map an open string label onto the closed enumeration.
    /// Anything unrecognized becomes `Unknown`.
    pub fn from_label(label: &str) -> Goal {
        match label {
            "stability" => Goal::Stability,
            "chaos" => Goal::Chaos,
            "inversion" => Goal::Inversion,
            _ => Goal::Unknown,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Goal::Stability => "stability",
            Goal::Chaos => "chaos",
            Goal::Inversion => "inversion",
            Goal::Unknown => "unknown",
        }
    }

    /// Learning target for this goal.
    ///
    /// Chaos draws a fresh target from [0.4, 0.6] on every call; the
    /// moving goalpost is intentional and must not be cached.
    pub fn target(self, rng: &mut Prng) -> Signal {
        match self {
            Goal::Stability => 1.0,
            Goal::Inversion => 0.0,
            Goal::Chaos => rng.range_f32(0.4, 0.6),
            Goal::Unknown => 0.5,
        }
    }

    /// Whether an output counts as a success under this goal's threshold.
    pub fn is_success(self, output: Signal) -> bool {
        match self {
            Goal::Stability => output > 0.9,
            Goal::Chaos => output > 0.4 && output < 0.6,
            Goal::Inversion => output < 0.1,
            Goal::Unknown => false,
        }
    }
}

/// Behavioral state derived from recent performance.
///
/// A pure function of the last `MOOD_WINDOW` history entries; `Elated`
/// gates structural growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mood {
    Elated,
    Calm,
    #[default]
    Curious,
    Frustrated,
}

impl Mood {
    /// Fixed classifier over a success count in 0..=MOOD_WINDOW.
    pub fn from_success_count(successes: usize) -> Mood {
        match successes {
            n if n >= 4 => Mood::Elated,
            3 => Mood::Calm,
            2 => Mood::Curious,
            _ => Mood::Frustrated,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Mood::Elated => "elated",
            Mood::Calm => "calm",
            Mood::Curious => "curious",
            Mood::Frustrated => "frustrated",
        }
    }
}

/// One history entry: what a node produced, and under which goal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Outcome {
    pub output: Signal,
    pub goal: Goal,
}

/// Standard logistic squashing, `1 / (1 + e^-x)`. Pure.
#[inline]
pub fn activation(x: Signal) -> Signal {
    #[cfg(feature = "std")]
    let e = (-x).exp();
    #[cfg(not(feature = "std"))]
    let e = libm::expf(-x);
    1.0 / (1.0 + e)
}

/// One adaptive unit in the propagation tree.
///
/// Owns a weight vector (one entry per potential child slot), an
/// append-only performance history and a derived mood. Weight slots only
/// ever grow; the slot count is the node's branching factor on the next
/// pass that visits it.
#[derive(Debug, Clone)]
pub struct SignalNode {
    pub coord: Coord,
    pub weights: Vec<Signal>,
    pub learning_rate: f32,
    pub history: Vec<Outcome>,
    pub mood: Mood,
}

impl SignalNode {
    /// Materialize a fresh node. Weights start at `cfg.initial_fanout`
    /// slots, each drawn uniformly from the configured init range.
    pub fn new(coord: Coord, cfg: &TreeConfig, rng: &mut Prng) -> Self {
        let mut weights = Vec::with_capacity(cfg.initial_fanout);
        for _ in 0..cfg.initial_fanout {
            weights.push(rng.range_f32(cfg.weight_low, cfg.weight_high));
        }
        Self {
            coord,
            weights,
            learning_rate: cfg.learning_rate,
            history: Vec::new(),
            mood: Mood::Curious,
        }
    }

    /// Nudge every weight toward the goal's target and record the outcome.
    ///
    /// All slots receive the identical scalar update, including slots
    /// appended after this node was created. No per-slot credit
    /// assignment. Infallible; `Unknown` goals learn toward 0.5.
    pub fn learn(&mut self, output: Signal, goal: Goal, rng: &mut Prng) {
        let target = goal.target(rng);
        let error = target - output;
        for w in &mut self.weights {
            *w += self.learning_rate * error;
        }
        self.history.push(Outcome { output, goal });
    }

    /// Recompute the mood from the last `MOOD_WINDOW` history entries.
    pub fn update_mood(&mut self) {
        let start = self.history.len().saturating_sub(MOOD_WINDOW);
        let successes = self.history[start..]
            .iter()
            .filter(|o| o.goal.is_success(o.output))
            .count();
        self.mood = Mood::from_success_count(successes);
    }

    /// Leaf pass: squash the input plus a little uniform noise, then
    /// learn from the result. The only place stochastic noise enters a
    /// signal value.
    pub fn leaf_response(
        &mut self,
        input: Signal,
        goal: Goal,
        noise_amp: f32,
        rng: &mut Prng,
    ) -> Signal {
        let noise = rng.range_f32(-noise_amp, noise_amp);
        let output = activation(input + noise);
        self.learn(output, goal, rng);
        self.update_mood();
        output
    }

    /// Interior pass: squash the mean of the child outputs, then learn
    /// from the result.
    pub fn integrate(&mut self, avg: Signal, goal: Goal, rng: &mut Prng) -> Signal {
        let output = activation(avg);
        self.learn(output, goal, rng);
        self.update_mood();
        output
    }

    /// Growth rule: an elated node with headroom below the depth limit
    /// appends one new weight slot and reports its index so the tree can
    /// materialize the child immediately. Nodes whose children are
    /// leaves do not grow.
    pub fn try_grow(
        &mut self,
        depth_limit: u32,
        cfg: &TreeConfig,
        rng: &mut Prng,
    ) -> Option<usize> {
        if self.mood != Mood::Elated || self.coord.depth + 1 >= depth_limit {
            return None;
        }
        self.weights.push(rng.range_f32(cfg.weight_low, cfg.weight_high));
        Some(self.weights.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node() -> (SignalNode, Prng) {
        let cfg = TreeConfig::default();
        let mut rng = Prng::new(42);
        let node = SignalNode::new(Coord::ROOT, &cfg, &mut rng);
        (node, rng)
    }

    #[test]
    fn activation_midpoint_is_half() {
        assert_eq!(activation(0.0), 0.5);
    }

    #[test]
    fn activation_is_strictly_increasing() {
        let mut prev = activation(-6.0);
        let mut x = -5.9_f32;
        while x < 6.0 {
            let y = activation(x);
            assert!(y > prev, "activation not increasing at x={x}");
            prev = y;
            x += 0.1;
        }
    }

    #[test]
    fn activation_stays_in_open_unit_interval() {
        for &x in &[-80.0_f32, -10.0, -1.0, 0.0, 1.0, 10.0, 80.0] {
            let y = activation(x);
            assert!(y > 0.0 && y < 1.0, "activation({x}) = {y}");
        }
    }

    #[test]
    fn new_node_starts_with_three_curious_slots() {
        let (node, _) = test_node();
        assert_eq!(node.weights.len(), MIN_FANOUT);
        assert_eq!(node.mood, Mood::Curious);
        assert!(node.history.is_empty());
        for &w in &node.weights {
            assert!((0.5..1.5).contains(&w));
        }
    }

    #[test]
    fn learn_stability_bumps_every_weight_identically() {
        let (mut node, mut rng) = test_node();
        let before = node.weights.clone();

        node.learn(0.5, Goal::Stability, &mut rng);

        // error = 1.0 - 0.5, rate = 0.05, so every slot moves by 0.025.
        for (b, a) in before.iter().zip(&node.weights) {
            assert!((a - b - 0.025).abs() < 1e-6);
        }
        assert_eq!(
            node.history.last(),
            Some(&Outcome {
                output: 0.5,
                goal: Goal::Stability
            })
        );
    }

    #[test]
    fn learn_unknown_goal_defaults_to_half_target() {
        let (mut node, mut rng) = test_node();
        let before = node.weights.clone();

        node.learn(0.25, Goal::Unknown, &mut rng);

        // target 0.5, error 0.25, delta 0.0125. Tolerated, never an error.
        for (b, a) in before.iter().zip(&node.weights) {
            assert!((a - b - 0.0125).abs() < 1e-6);
        }
    }

    #[test]
    fn learn_chaos_resamples_its_target() {
        let (mut node, mut rng) = test_node();
        // With output pinned at the band center, the weight delta exposes
        // the freshly drawn target each call. Two calls almost surely
        // draw different targets from [0.4, 0.6].
        let w0 = node.weights[0];
        node.learn(0.5, Goal::Chaos, &mut rng);
        let d1 = node.weights[0] - w0;
        let w1 = node.weights[0];
        node.learn(0.5, Goal::Chaos, &mut rng);
        let d2 = node.weights[0] - w1;

        assert!(d1.abs() <= 0.05 * 0.1 + 1e-6);
        assert!(d2.abs() <= 0.05 * 0.1 + 1e-6);
        assert_ne!(d1, d2);
    }

    #[test]
    fn goal_labels_round_trip_and_tolerate_junk() {
        assert_eq!(Goal::from_label("stability"), Goal::Stability);
        assert_eq!(Goal::from_label("chaos"), Goal::Chaos);
        assert_eq!(Goal::from_label("inversion"), Goal::Inversion);
        assert_eq!(Goal::from_label("entropy"), Goal::Unknown);
        assert_eq!(Goal::from_label(""), Goal::Unknown);
        assert_eq!(Goal::Chaos.as_label(), "chaos");
    }

    #[test]
    fn mood_classifier_is_exact_at_boundaries() {
        assert_eq!(Mood::from_success_count(5), Mood::Elated);
        assert_eq!(Mood::from_success_count(4), Mood::Elated);
        assert_eq!(Mood::from_success_count(3), Mood::Calm);
        assert_eq!(Mood::from_success_count(2), Mood::Curious);
        assert_eq!(Mood::from_success_count(1), Mood::Frustrated);
        assert_eq!(Mood::from_success_count(0), Mood::Frustrated);
    }

    #[test]
    fn perfect_stability_history_is_elated() {
        let (mut node, _) = test_node();
        for _ in 0..5 {
            node.history.push(Outcome {
                output: 1.0,
                goal: Goal::Stability,
            });
        }
        node.update_mood();
        assert_eq!(node.mood, Mood::Elated);
    }

    #[test]
    fn single_success_history_is_frustrated() {
        let (mut node, _) = test_node();
        node.history.push(Outcome {
            output: 0.95,
            goal: Goal::Stability,
        });
        for _ in 0..4 {
            node.history.push(Outcome {
                output: 0.5,
                goal: Goal::Stability,
            });
        }
        node.update_mood();
        assert_eq!(node.mood, Mood::Frustrated);
    }

    #[test]
    fn mood_reads_only_the_recent_window() {
        let (mut node, _) = test_node();
        // Five old successes, then five recent failures: the old ones
        // must not count.
        for _ in 0..5 {
            node.history.push(Outcome {
                output: 0.95,
                goal: Goal::Stability,
            });
        }
        for _ in 0..5 {
            node.history.push(Outcome {
                output: 0.2,
                goal: Goal::Stability,
            });
        }
        node.update_mood();
        assert_eq!(node.mood, Mood::Frustrated);
    }

    #[test]
    fn chaos_success_band_is_open() {
        assert!(!Goal::Chaos.is_success(0.4));
        assert!(Goal::Chaos.is_success(0.41));
        assert!(Goal::Chaos.is_success(0.59));
        assert!(!Goal::Chaos.is_success(0.6));
        assert!(!Goal::Stability.is_success(0.9));
        assert!(Goal::Stability.is_success(0.91));
        assert!(Goal::Inversion.is_success(0.09));
        assert!(!Goal::Inversion.is_success(0.1));
        assert!(!Goal::Unknown.is_success(0.5));
    }

    #[test]
    fn leaf_response_appends_one_entry_and_stays_bounded() {
        let (mut node, mut rng) = test_node();
        for i in 1..=20 {
            let out = node.leaf_response(1.0, Goal::Stability, 0.05, &mut rng);
            assert!((0.0..=1.0).contains(&out));
            assert_eq!(node.history.len(), i);
        }
    }

    #[test]
    fn try_grow_requires_elation_and_headroom() {
        let cfg = TreeConfig::default();
        let (mut node, mut rng) = test_node();

        // Curious: no growth.
        assert_eq!(node.try_grow(6, &cfg, &mut rng), None);

        node.mood = Mood::Elated;
        // Parent-of-leaves (depth 0 with limit 1): still no growth.
        assert_eq!(node.try_grow(1, &cfg, &mut rng), None);
        assert_eq!(node.weights.len(), 3);

        // Elated with headroom: exactly one new slot, index 3.
        assert_eq!(node.try_grow(6, &cfg, &mut rng), Some(3));
        assert_eq!(node.weights.len(), 4);
        assert!((0.5..1.5).contains(&node.weights[3]));
    }

    #[test]
    fn weights_never_shrink() {
        let cfg = TreeConfig::default();
        let (mut node, mut rng) = test_node();
        let mut len = node.weights.len();
        for i in 0..50 {
            node.learn(0.3, Goal::Inversion, &mut rng);
            node.update_mood();
            if i % 7 == 0 {
                node.mood = Mood::Elated;
                node.try_grow(10, &cfg, &mut rng);
            }
            assert!(node.weights.len() >= len);
            assert!(node.weights.len() >= MIN_FANOUT);
            len = node.weights.len();
        }
    }
}
