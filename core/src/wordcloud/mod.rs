// Word cloud layout engine
//
// Maps a ranked word set onto stable canvas slots and drives the keyed
// enter/update/exit scene. Visual attributes depend only on (text, seed).

pub mod layout;
pub mod slots;
pub mod svg;
pub mod transition;

pub use layout::{sort_for_display, FontScale, PlacedWord, MAX_FONT_PX, MIN_FONT_PX};
pub use slots::{generate_slots, golden_angle, Canvas, Slot, SlotTable};
pub use svg::{render_svg, PLACEHOLDER_TEXT};
pub use transition::{
    ease_out_cubic, JoinSummary, Phase, RenderedWord, Scene, Visual, EXIT_REMOVAL_DELAY,
    TRANSITION,
};

use crate::api::{SnapshotWord, WordCount};
use crate::prng::random_seed;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

/// `{text, value}` pair fed to the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequencyEntry {
    pub text: String,
    pub value: u64,
}

impl WordFrequencyEntry {
    pub fn new(text: impl Into<String>, value: u64) -> Self {
        Self {
            text: text.into(),
            value,
        }
    }
}

impl From<WordCount> for WordFrequencyEntry {
    fn from(w: WordCount) -> Self {
        Self::new(w.word, w.count)
    }
}

impl From<&WordCount> for WordFrequencyEntry {
    fn from(w: &WordCount) -> Self {
        Self::new(w.word.clone(), w.count)
    }
}

impl From<&SnapshotWord> for WordFrequencyEntry {
    fn from(w: &SnapshotWord) -> Self {
        Self::new(w.word.clone(), w.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordCloudConfig {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    /// Number of words drawn, and number of slots.
    pub word_limit: usize,
    /// Number of words requested from the backend.
    pub fetch_limit: u32,
    /// Fixed layout seed. A random one is drawn when unset.
    pub seed: Option<u32>,
}

impl Default for WordCloudConfig {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 500.0,
            margin: 60.0,
            word_limit: 30,
            fetch_limit: 100,
            seed: None,
        }
    }
}

impl WordCloudConfig {
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height, self.margin)
    }
}

/// One renderable state of the cloud.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCloudFrame {
    pub width: f64,
    pub height: f64,
    pub seed: u32,
    pub words: Vec<RenderedWord>,
    /// True when there is no data to draw.
    pub placeholder: bool,
}

impl WordCloudFrame {
    pub fn to_svg(&self) -> String {
        render_svg(&self.words, self.width, self.height)
    }
}

pub struct WordCloudEngine {
    canvas: Canvas,
    word_limit: usize,
    seed: u32,
    table: SlotTable,
    scene: Scene,
    entries: Vec<WordFrequencyEntry>,
    placements: Vec<PlacedWord>,
}

impl WordCloudEngine {
    pub fn new(config: &WordCloudConfig) -> Self {
        let canvas = config.canvas();
        let seed = config.seed.unwrap_or_else(random_seed);
        Self {
            canvas,
            word_limit: config.word_limit,
            seed,
            table: SlotTable::new(canvas, config.word_limit),
            scene: Scene::new(),
            entries: Vec::new(),
            placements: Vec::new(),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn word_limit(&self) -> usize {
        self.word_limit
    }

    /// Current placements, in display order.
    pub fn placements(&self) -> &[PlacedWord] {
        &self.placements
    }

    pub fn slot_table(&self) -> &SlotTable {
        &self.table
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Replace the word set and reconcile the scene.
    pub fn update(&mut self, entries: Vec<WordFrequencyEntry>, now: Instant) -> WordCloudFrame {
        self.entries = entries;
        self.relayout(now)
    }

    /// New canvas size. Slots are regenerated only when the size changed.
    pub fn resize(&mut self, width: f64, height: f64, now: Instant) -> WordCloudFrame {
        let canvas = Canvas::new(width, height, self.canvas.margin);
        if self.table.resize(canvas, self.word_limit) {
            self.canvas = canvas;
        }
        self.relayout(now)
    }

    pub fn set_word_limit(&mut self, word_limit: usize, now: Instant) -> WordCloudFrame {
        if self.table.resize(self.canvas, word_limit) {
            self.word_limit = word_limit;
        }
        self.relayout(now)
    }

    pub fn set_seed(&mut self, seed: u32, now: Instant) -> WordCloudFrame {
        self.seed = seed;
        self.relayout(now)
    }

    /// Draw a fresh seed and restyle the current words.
    pub fn redraw(&mut self, now: Instant) -> WordCloudFrame {
        let seed = random_seed();
        info!(target: "wordcloud", seed, "Redrawing word cloud");
        self.set_seed(seed, now)
    }

    /// Interpolated frame at `now` without changing the data.
    pub fn frame(&mut self, now: Instant) -> WordCloudFrame {
        self.scene.prune(now);
        WordCloudFrame {
            width: self.canvas.width,
            height: self.canvas.height,
            seed: self.seed,
            words: self.scene.frame(now),
            placeholder: self.entries.is_empty(),
        }
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.scene.is_animating(now)
    }

    fn relayout(&mut self, now: Instant) -> WordCloudFrame {
        let mut visible = sort_for_display(&self.entries);
        // One node per text, keeping the highest count; zero counts never draw
        let mut seen = HashSet::new();
        visible.retain(|e| e.value > 0 && seen.insert(e.text.clone()));
        visible.truncate(self.word_limit);

        self.table.assign(visible.iter().map(|e| e.text.as_str()));
        let scale = FontScale::from_entries(&visible);

        self.placements = visible
            .iter()
            .filter_map(|entry| {
                let slot = self.table.slot_of(&entry.text)?;
                Some(PlacedWord::new(
                    entry,
                    slot.id,
                    slot.x,
                    slot.y,
                    scale.size_for(entry.value),
                    self.seed,
                ))
            })
            .collect();

        let summary = self.scene.join(&self.placements, now);
        debug!(
            target: "wordcloud",
            entered = summary.entered.len(),
            updated = summary.updated.len(),
            exited = summary.exited.len(),
            "Reconciled word cloud"
        );

        self.frame(now)
    }
}
