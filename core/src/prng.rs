/// Seeded randomness for reproducible word-cloud rendering
///
/// `Mulberry32` produces the same `[0, 1)` stream for the same seed on every
/// platform. Word attributes (color, rotation) are derived from a hash of the
/// word text and the seed only, so reordering the input never restyles a word.
use rand::Rng;

/// Qualitative palette used for word colors.
pub const PALETTE: [&str; 15] = [
    "#5470C6", "#91CC75", "#FAC858", "#EE6666", "#73C0DE", "#3BA272", "#FC8452", "#9A60B4",
    "#EA7CCC", "#48B8D0", "#6E7074", "#546570", "#C23531", "#2F4554", "#61A0A8",
];

/// Upper bound (exclusive) for user-facing seeds.
pub const MAX_SEED: u32 = 1_000_000;

/// Mulberry32 generator: 32-bit state, golden-ratio style increment,
/// two xorshift-multiply rounds.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    const INCREMENT: u32 = 0x6D2B_79F5;

    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(Self::INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Next float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }
}

impl Iterator for Mulberry32 {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_f64())
    }
}

/// 32-bit string hash over UTF-16 code units (`h = h * 31 + unit`), absolute value.
pub fn string_hash(text: &str) -> u32 {
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| {
            h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32)
        });
    hash.unsigned_abs()
}

/// Hash of a word combined with the layout seed.
pub fn word_hash(text: &str, seed: u32) -> u32 {
    string_hash(&format!("{text}{seed}"))
}

/// Visual attributes that depend only on `(text, seed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordStyle {
    pub color: &'static str,
    pub rotation: u16,
}

impl WordStyle {
    pub fn for_word(text: &str, seed: u32) -> Self {
        let hash = word_hash(text, seed);
        Self {
            color: PALETTE[hash as usize % PALETTE.len()],
            rotation: if hash % 2 == 0 { 90 } else { 0 },
        }
    }
}

pub fn word_color(text: &str, seed: u32) -> &'static str {
    WordStyle::for_word(text, seed).color
}

pub fn word_rotation(text: &str, seed: u32) -> u16 {
    WordStyle::for_word(text, seed).rotation
}

/// Fresh seed for the "redraw" action.
pub fn random_seed() -> u32 {
    rand::thread_rng().gen_range(0..MAX_SEED)
}
