// Keyed enter/update/exit reconciliation for rendered words.
//
// A `Scene` holds one node per word text. Each `join` diffs the new placement
// set against the nodes: new keys enter from zero size at their slot, existing
// keys retarget from wherever their animation currently is, missing keys fade
// out and are removed once the exit delay has elapsed.

use super::layout::PlacedWord;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

/// Duration of position/size/opacity animations.
pub const TRANSITION: Duration = Duration::from_millis(800);
/// Exiting nodes are dropped this long after leaving the data set.
pub const EXIT_REMOVAL_DELAY: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Entering,
    Present,
    Exiting,
}

/// Animatable attributes of one word.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Visual {
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub opacity: f64,
}

impl Visual {
    fn hidden_at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            font_size: 0.0,
            opacity: 0.0,
        }
    }

    fn lerp(&self, to: &Visual, t: f64) -> Visual {
        Visual {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            font_size: self.font_size + (to.font_size - self.font_size) * t,
            opacity: self.opacity + (to.opacity - self.opacity) * t,
        }
    }
}

/// Ease-out cubic, `1 − (1 − t)³`.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone)]
struct Node {
    from: Visual,
    to: Visual,
    started: Instant,
    phase: Phase,
    remove_at: Option<Instant>,
    color: &'static str,
    rotation: u16,
}

impl Node {
    fn visual_at(&self, now: Instant) -> Visual {
        let elapsed = now.saturating_duration_since(self.started);
        let t = elapsed.as_secs_f64() / TRANSITION.as_secs_f64();
        self.from.lerp(&self.to, ease_out_cubic(t))
    }

    fn retarget(&mut self, to: Visual, now: Instant) {
        self.from = self.visual_at(now);
        self.to = to;
        self.started = now;
    }
}

/// Keys touched by one join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub entered: Vec<String>,
    pub updated: Vec<String>,
    pub exited: Vec<String>,
}

/// Interpolated word ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedWord {
    pub text: String,
    pub phase: Phase,
    pub visual: Visual,
    pub color: &'static str,
    pub rotation: u16,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: BTreeMap<String, Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the scene with a new placement set.
    pub fn join(&mut self, data: &[PlacedWord], now: Instant) -> JoinSummary {
        self.prune(now);

        let mut summary = JoinSummary::default();
        let keys: HashSet<&str> = data.iter().map(|w| w.text.as_str()).collect();

        for (text, node) in self.nodes.iter_mut() {
            if keys.contains(text.as_str()) || node.phase == Phase::Exiting {
                continue;
            }
            let current = node.visual_at(now);
            node.retarget(Visual::hidden_at(current.x, current.y), now);
            node.phase = Phase::Exiting;
            node.remove_at = Some(now + EXIT_REMOVAL_DELAY);
            summary.exited.push(text.clone());
        }

        for word in data {
            let target = Visual {
                x: word.x,
                y: word.y,
                font_size: word.font_size as f64,
                opacity: 1.0,
            };
            match self.nodes.get_mut(&word.text) {
                Some(node) => {
                    node.retarget(target, now);
                    node.phase = Phase::Present;
                    node.remove_at = None;
                    node.color = word.color;
                    node.rotation = word.rotation;
                    summary.updated.push(word.text.clone());
                }
                None => {
                    self.nodes.insert(
                        word.text.clone(),
                        Node {
                            from: Visual::hidden_at(word.x, word.y),
                            to: target,
                            started: now,
                            phase: Phase::Entering,
                            remove_at: None,
                            color: word.color,
                            rotation: word.rotation,
                        },
                    );
                    summary.entered.push(word.text.clone());
                }
            }
        }

        summary
    }

    /// Drop exiting nodes whose removal delay has passed. Returns removed keys.
    pub fn prune(&mut self, now: Instant) -> Vec<String> {
        let expired: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.remove_at.is_some_and(|at| now >= at))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.nodes.remove(key);
        }
        expired
    }

    /// Interpolated state of every live node.
    pub fn frame(&self, now: Instant) -> Vec<RenderedWord> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.remove_at.map_or(true, |at| now < at))
            .map(|(text, node)| RenderedWord {
                text: text.clone(),
                phase: node.phase,
                visual: node.visual_at(now),
                color: node.color,
                rotation: node.rotation,
            })
            .collect()
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.nodes
            .values()
            .any(|n| now.saturating_duration_since(n.started) < TRANSITION)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn phase_of(&self, text: &str) -> Option<Phase> {
        self.nodes.get(text).map(|n| n.phase)
    }
}
