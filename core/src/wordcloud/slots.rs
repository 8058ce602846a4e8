// Slot table for the word cloud.
//
// Slots are fixed canvas positions spread over a golden-angle spiral. Slot
// positions depend only on (width, height, margin, count); words are bound to
// slots and keep them for as long as they stay in the active set.

use crate::prng::Mulberry32;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use tracing::debug;

/// Drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64, margin: f64) -> Self {
        Self {
            width,
            height,
            margin,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    fn clamp_x(&self, x: f64) -> f64 {
        x.min(self.width - self.margin).max(self.margin)
    }

    fn clamp_y(&self, y: f64) -> f64 {
        y.min(self.height - self.margin).max(self.margin)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(900.0, 500.0, 60.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub occupied_by: Option<String>,
}

impl Slot {
    pub fn is_free(&self) -> bool {
        self.occupied_by.is_none()
    }
}

/// Golden-angle increment, `π(3 − √5)`.
pub fn golden_angle() -> f64 {
    PI * (3.0 - 5f64.sqrt())
}

/// Per-index noise in `[0, 1)`.
fn slot_noise(key: usize) -> f64 {
    Mulberry32::new(key as u32).next_f64()
}

/// Spread `count` slots across the canvas.
pub fn generate_slots(canvas: Canvas, count: usize) -> Vec<Slot> {
    let (cx, cy) = canvas.center();
    let effective_w = (canvas.width - canvas.margin * 1.5).max(1.0);
    let effective_h = (canvas.height - canvas.margin * 1.5).max(1.0);
    let max_radius = effective_w.min(effective_h) / 2.0;
    let aspect = effective_w / effective_h;
    let step = golden_angle();

    (0..count)
        .map(|i| {
            let angle = i as f64 * step;
            let base_radius = ((i + 1) as f64 / count as f64).sqrt() * max_radius;

            // Stretch the spiral along the longer axis
            let radius_x = if aspect > 1.0 {
                base_radius * aspect * 0.8
            } else {
                base_radius
            };
            let radius_y = if aspect < 1.0 {
                base_radius * (1.0 / aspect) * 0.8
            } else {
                base_radius
            };

            let noise_x = (slot_noise(i * 7 + 1) - 0.5) * (effective_w / 10.0);
            let noise_y = (slot_noise(i * 13 + 2) - 0.5) * (effective_h / 10.0);

            Slot {
                id: i,
                x: canvas.clamp_x(cx + angle.cos() * radius_x + noise_x),
                y: canvas.clamp_y(cy + angle.sin() * radius_y + noise_y),
                occupied_by: None,
            }
        })
        .collect()
}

/// Slots plus the word → slot bindings that persist across updates.
#[derive(Debug, Clone)]
pub struct SlotTable {
    canvas: Canvas,
    slots: Vec<Slot>,
    bindings: HashMap<String, usize>,
}

impl SlotTable {
    pub fn new(canvas: Canvas, count: usize) -> Self {
        Self {
            canvas,
            slots: generate_slots(canvas, count),
            bindings: HashMap::new(),
        }
    }

    /// Regenerate slots when the canvas or slot count changed. Bindings are
    /// dropped with the old slots.
    pub fn resize(&mut self, canvas: Canvas, count: usize) -> bool {
        if canvas == self.canvas && count == self.slots.len() {
            return false;
        }
        debug!(target: "wordcloud", width = canvas.width, height = canvas.height, count, "Regenerating slots");
        *self = Self::new(canvas, count);
        true
    }

    /// Release slots of words that left the set, then give each new word the
    /// first free slot in word order. Words that find no free slot stay unbound.
    pub fn assign<'a, I>(&mut self, words: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let words: Vec<&str> = words.into_iter().collect();
        let active: HashSet<&str> = words.iter().copied().collect();

        let slots = &mut self.slots;
        self.bindings.retain(|word, slot_id| {
            let keep = active.contains(word.as_str());
            if !keep {
                slots[*slot_id].occupied_by = None;
            }
            keep
        });

        for word in words {
            if self.bindings.contains_key(word) {
                continue;
            }
            if let Some(slot) = self.slots.iter_mut().find(|s| s.is_free()) {
                slot.occupied_by = Some(word.to_string());
                self.bindings.insert(word.to_string(), slot.id);
            }
        }
    }

    pub fn slot_of(&self, word: &str) -> Option<&Slot> {
        self.bindings.get(word).map(|id| &self.slots[*id])
    }

    pub fn slot_id(&self, word: &str) -> Option<usize> {
        self.bindings.get(word).copied()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_free()).count()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
        for slot in &mut self.slots {
            slot.occupied_by = None;
        }
    }
}
