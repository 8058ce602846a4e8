// Word frequency store
//
// Holds the ranked word set for the word cloud. Every successful fetch replaces
// the set wholesale; failures keep the previous data and record the error.

use crate::api::{WordFrequencyQuery, WordFrequencySource};
use crate::request_token::RequestTokens;
use crate::time::{Clock, SystemClock, TimeRange};
use crate::wordcloud::WordFrequencyEntry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub const DEFAULT_WORD_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordStats {
    pub total_messages: u64,
    pub unique_words: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordFrequencyRequest {
    pub range: TimeRange,
    pub limit: u32,
    pub exclude_words: Vec<String>,
}

impl Default for WordFrequencyRequest {
    fn default() -> Self {
        Self {
            range: TimeRange::realtime(),
            limit: DEFAULT_WORD_LIMIT,
            exclude_words: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    words: Vec<WordFrequencyEntry>,
    stats: WordStats,
    loading: bool,
    error: Option<String>,
}

pub struct WordFrequencyStore {
    source: Arc<dyn WordFrequencySource>,
    clock: Arc<dyn Clock>,
    state: RwLock<State>,
    tokens: RequestTokens,
}

impl WordFrequencyStore {
    pub fn new(source: Arc<dyn WordFrequencySource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn WordFrequencySource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            state: RwLock::new(State::default()),
            tokens: RequestTokens::new(),
        }
    }

    pub async fn get_word_frequency(&self, request: WordFrequencyRequest) {
        let token = self.tokens.issue();
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let query = WordFrequencyQuery {
            start_time: request.range.effective_start(self.clock.now()),
            end_time: request.range.end,
            limit: request.limit,
            exclude_words: request.exclude_words,
        };
        let result = self.source.fetch_word_frequency(query).await;

        let mut state = self.state.write().await;
        if !self.tokens.is_current(token) {
            debug!(target: "word_frequency", token = token.value(), "Dropping stale word frequency");
            return;
        }
        match result {
            Ok(response) => {
                debug!(
                    target: "word_frequency",
                    words = response.words.len(),
                    total_messages = response.total_messages,
                    "Loaded word frequency"
                );
                state.words = response.words.into_iter().map(WordFrequencyEntry::from).collect();
                state.stats = WordStats {
                    total_messages: response.total_messages,
                    unique_words: response.unique_words,
                };
            }
            Err(e) => {
                warn!(target: "word_frequency", error = %e, "Failed to fetch word frequency");
                state.error = Some(e.to_string());
            }
        }
        state.loading = false;
    }

    pub async fn words(&self) -> Vec<WordFrequencyEntry> {
        self.state.read().await.words.clone()
    }

    pub async fn stats(&self) -> WordStats {
        self.state.read().await.stats
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }
}
