// Playback engine
//
// Loads pre-aggregated snapshot sequences and keeps the playback cursor. The
// primary and word-cloud sequences load independently with their own loading
// and error flags. The timer that advances playback lives with the caller.

use crate::api::{
    PlaybackSource, Snapshot, SnapshotMetadata, SnapshotQuery, WordcloudSnapshot,
    WordcloudSnapshotQuery,
};
use crate::{ChatScopeError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const MIN_STEP_SECONDS: u32 = 60;
pub const MAX_STEP_SECONDS: u32 = 3600;
pub const WINDOW_HOURS: [u32; 5] = [1, 4, 8, 12, 24];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub step_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordcloudSnapshotRequest {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub step_seconds: u32,
    pub window_hours: u32,
    pub word_limit: u32,
    pub wordlist_id: Option<i64>,
    pub replacement_wordlist_id: Option<i64>,
}

impl WordcloudSnapshotRequest {
    /// Word-cloud request over the same range and cadence as `base`.
    pub fn aligned_with(base: &SnapshotRequest) -> Self {
        Self {
            start: base.start,
            end: base.end,
            step_seconds: base.step_seconds,
            window_hours: 4,
            word_limit: 50,
            wordlist_id: None,
            replacement_wordlist_id: None,
        }
    }

    /// Apply an exclusion list and a replacement list to the aggregation.
    pub fn with_wordlists(
        mut self,
        wordlist_id: Option<i64>,
        replacement_wordlist_id: Option<i64>,
    ) -> Self {
        self.wordlist_id = wordlist_id;
        self.replacement_wordlist_id = replacement_wordlist_id;
        self
    }
}

fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>, step_seconds: u32) -> Result<()> {
    if end <= start {
        return Err(ChatScopeError::InvalidRequest(
            "end_time must be after start_time".to_string(),
        ));
    }
    if step_seconds < MIN_STEP_SECONDS {
        return Err(ChatScopeError::InvalidRequest(format!(
            "step_seconds must be at least {MIN_STEP_SECONDS}"
        )));
    }
    if step_seconds > MAX_STEP_SECONDS {
        return Err(ChatScopeError::InvalidRequest(format!(
            "step_seconds must be at most {MAX_STEP_SECONDS}"
        )));
    }
    Ok(())
}

fn validate_wordcloud(request: &WordcloudSnapshotRequest) -> Result<()> {
    if !WINDOW_HOURS.contains(&request.window_hours) {
        return Err(ChatScopeError::InvalidRequest(format!(
            "window_hours must be one of {WINDOW_HOURS:?}"
        )));
    }
    // word_limit bounds are enforced by the backend
    Ok(())
}

#[derive(Debug, Default)]
struct State {
    snapshots: Vec<Snapshot>,
    metadata: Option<SnapshotMetadata>,
    current_index: usize,
    is_playing: bool,
    loading: bool,
    error: Option<String>,
    wordcloud_snapshots: Vec<WordcloudSnapshot>,
    wordcloud_loading: bool,
    wordcloud_error: Option<String>,
}

pub struct PlaybackEngine {
    source: Arc<dyn PlaybackSource>,
    state: RwLock<State>,
}

impl PlaybackEngine {
    pub fn new(source: Arc<dyn PlaybackSource>) -> Self {
        Self {
            source,
            state: RwLock::new(State::default()),
        }
    }

    /// Load the primary sequence. Returns `Ok(false)` without a request when
    /// either bound is missing.
    pub async fn load_snapshots(&self, request: SnapshotRequest) -> Result<bool> {
        let (Some(start), Some(end)) = (request.start, request.end) else {
            return Ok(false);
        };
        validate_range(start, end, request.step_seconds)?;

        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
            state.is_playing = false;
        }

        let result = self
            .source
            .fetch_snapshots(SnapshotQuery {
                start_time: start,
                end_time: end,
                step_seconds: request.step_seconds,
            })
            .await;

        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(series) => {
                info!(target: "playback", snapshots = series.snapshots.len(), step_seconds = request.step_seconds, "Loaded snapshots");
                state.snapshots = series.snapshots;
                state.metadata = Some(series.metadata);
                state.current_index = 0;
                Ok(true)
            }
            Err(e) => {
                warn!(target: "playback", error = %e, "Error loading snapshots");
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Load the word-cloud sequence. Same missing-bound rule as `load_snapshots`.
    pub async fn load_wordcloud_snapshots(&self, request: WordcloudSnapshotRequest) -> Result<bool> {
        let (Some(start), Some(end)) = (request.start, request.end) else {
            return Ok(false);
        };
        validate_range(start, end, request.step_seconds)?;
        validate_wordcloud(&request)?;

        {
            let mut state = self.state.write().await;
            state.wordcloud_loading = true;
            state.wordcloud_error = None;
        }

        let result = self
            .source
            .fetch_wordcloud_snapshots(WordcloudSnapshotQuery {
                start_time: start,
                end_time: end,
                step_seconds: request.step_seconds,
                window_hours: request.window_hours,
                word_limit: request.word_limit,
                wordlist_id: request.wordlist_id,
                replacement_wordlist_id: request.replacement_wordlist_id,
            })
            .await;

        let mut state = self.state.write().await;
        state.wordcloud_loading = false;
        match result {
            Ok(series) => {
                info!(target: "playback", snapshots = series.snapshots.len(), window_hours = request.window_hours, "Loaded word cloud snapshots");
                state.wordcloud_snapshots = series.snapshots;
                Ok(true)
            }
            Err(e) => {
                warn!(target: "playback", error = %e, "Error loading word cloud snapshots");
                state.wordcloud_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Flip play/pause. No-op without snapshots; returns the new state.
    pub async fn toggle_playback(&self) -> bool {
        let mut state = self.state.write().await;
        if state.snapshots.is_empty() {
            return false;
        }
        state.is_playing = !state.is_playing;
        debug!(target: "playback", playing = state.is_playing, "Toggled playback");
        state.is_playing
    }

    pub async fn set_playing(&self, playing: bool) {
        let mut state = self.state.write().await;
        state.is_playing = playing && !state.snapshots.is_empty();
    }

    /// Timer tick. Moves one frame forward, stopping playback at the last frame.
    pub async fn advance(&self) -> bool {
        let mut state = self.state.write().await;
        if state.current_index + 1 < state.snapshots.len() {
            state.current_index += 1;
            true
        } else {
            state.is_playing = false;
            false
        }
    }

    pub async fn step_forward(&self) -> usize {
        let mut state = self.state.write().await;
        if state.current_index + 1 < state.snapshots.len() {
            state.current_index += 1;
        }
        state.current_index
    }

    pub async fn step_back(&self) -> usize {
        let mut state = self.state.write().await;
        state.current_index = state.current_index.saturating_sub(1);
        state.current_index
    }

    /// Jump to `index`, clamped to the loaded range.
    pub async fn seek(&self, index: usize) -> usize {
        let mut state = self.state.write().await;
        state.current_index = index.min(state.snapshots.len().saturating_sub(1));
        state.current_index
    }

    pub async fn current(&self) -> Option<Snapshot> {
        let state = self.state.read().await;
        state.snapshots.get(state.current_index).cloned()
    }

    /// Word-cloud frame at the current index.
    pub async fn current_words(&self) -> Option<WordcloudSnapshot> {
        let state = self.state.read().await;
        state.wordcloud_snapshots.get(state.current_index).cloned()
    }

    pub async fn current_index(&self) -> usize {
        self.state.read().await.current_index
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.snapshots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.snapshots.is_empty()
    }

    pub async fn snapshots(&self) -> Vec<Snapshot> {
        self.state.read().await.snapshots.clone()
    }

    pub async fn wordcloud_snapshots(&self) -> Vec<WordcloudSnapshot> {
        self.state.read().await.wordcloud_snapshots.clone()
    }

    pub async fn metadata(&self) -> Option<SnapshotMetadata> {
        self.state.read().await.metadata.clone()
    }

    pub async fn is_playing(&self) -> bool {
        self.state.read().await.is_playing
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn wordcloud_loading(&self) -> bool {
        self.state.read().await.wordcloud_loading
    }

    pub async fn wordcloud_error(&self) -> Option<String> {
        self.state.read().await.wordcloud_error.clone()
    }
}
