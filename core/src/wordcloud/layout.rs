// Font sizing and display ordering.

use super::WordFrequencyEntry;
use crate::prng::WordStyle;
use serde::Serialize;
use std::cmp::Ordering;

pub const MIN_FONT_PX: u32 = 12;
pub const MAX_FONT_PX: u32 = 60;

/// Linear count → pixel mapping over the current word set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontScale {
    min_count: u64,
    max_count: u64,
}

impl FontScale {
    pub fn from_entries(entries: &[WordFrequencyEntry]) -> Self {
        let min_count = entries.iter().map(|e| e.value).min().unwrap_or(0);
        let max_count = entries.iter().map(|e| e.value).max().unwrap_or(0);
        Self {
            min_count,
            max_count,
        }
    }

    pub fn size_for(&self, count: u64) -> u32 {
        // Range floors at 1 so a uniform set maps to the minimum size
        let range = self.max_count.saturating_sub(self.min_count).max(1) as f64;
        let normalized = (count.saturating_sub(self.min_count) as f64 / range).clamp(0.0, 1.0);
        (MIN_FONT_PX as f64 + normalized * (MAX_FONT_PX - MIN_FONT_PX) as f64).floor() as u32
    }
}

/// Count descending, then text ascending.
pub fn sort_for_display(entries: &[WordFrequencyEntry]) -> Vec<WordFrequencyEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| match b.value.cmp(&a.value) {
        Ordering::Equal => a.text.cmp(&b.text),
        other => other,
    });
    sorted
}

/// A word bound to a slot with its resolved visual attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedWord {
    pub text: String,
    pub count: u64,
    pub slot_id: usize,
    pub x: f64,
    pub y: f64,
    pub font_size: u32,
    pub color: &'static str,
    pub rotation: u16,
}

impl PlacedWord {
    pub fn new(entry: &WordFrequencyEntry, slot_id: usize, x: f64, y: f64, font_size: u32, seed: u32) -> Self {
        let style = WordStyle::for_word(&entry.text, seed);
        Self {
            text: entry.text.clone(),
            count: entry.value,
            slot_id,
            x,
            y,
            font_size,
            color: style.color,
            rotation: style.rotation,
        }
    }
}
