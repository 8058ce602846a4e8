// Chat message and hourly stats store
//
// Owns the message page and the hourly reconciliation state. Each stream takes
// a request token before awaiting the backend; responses that are no longer
// the latest are dropped.

use super::hourly::{HourlyStats, MergeOutcome, StatsRequest};
use crate::api::{ChatFilters, ChatMessage, ChatSource, HourlyStatPoint, MessageQuery};
use crate::request_token::RequestTokens;
use crate::time::{Clock, SystemClock, TimeRange};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Parameters of one `get_messages` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRequest {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub range: TimeRange,
    pub filters: ChatFilters,
    /// Initial load shows the blocking spinner, later loads the refresh marker.
    pub is_initial: bool,
}

impl MessageRequest {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        }
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_filters(mut self, filters: ChatFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn initial(mut self) -> Self {
        self.is_initial = true;
        self
    }
}

#[derive(Debug)]
struct MessagesState {
    messages: Vec<ChatMessage>,
    total: u64,
    loading: bool,
    is_refreshing: bool,
    error: Option<String>,
}

impl Default for MessagesState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            total: 0,
            // Nothing is shown until the first page lands
            loading: true,
            is_refreshing: false,
            error: None,
        }
    }
}

#[derive(Debug, Default)]
struct StatsState {
    hourly: HourlyStats,
    loading: bool,
    error: Option<String>,
}

pub struct ChatMessagesStore {
    source: Arc<dyn ChatSource>,
    clock: Arc<dyn Clock>,
    messages: RwLock<MessagesState>,
    stats: RwLock<StatsState>,
    message_tokens: RequestTokens,
    stats_tokens: RequestTokens,
}

impl ChatMessagesStore {
    pub fn new(source: Arc<dyn ChatSource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn ChatSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            messages: RwLock::new(MessagesState::default()),
            stats: RwLock::new(StatsState::default()),
            message_tokens: RequestTokens::new(),
            stats_tokens: RequestTokens::new(),
        }
    }

    /// Fetch one page of messages. Failures keep the previous page.
    pub async fn get_messages(&self, request: MessageRequest) {
        let token = self.message_tokens.issue();
        {
            let mut state = self.messages.write().await;
            if request.is_initial {
                state.loading = true;
            } else {
                state.is_refreshing = true;
            }
        }

        let query = MessageQuery {
            limit: request.limit,
            offset: request.offset,
            start_time: request.range.effective_start(self.clock.now()),
            end_time: request.range.end,
            filters: request.filters,
        };
        let result = self.source.fetch_messages(query).await;

        let mut state = self.messages.write().await;
        if !self.message_tokens.is_current(token) {
            debug!(target: "messages", token = token.value(), "Dropping stale message page");
            return;
        }
        match result {
            Ok(page) => {
                debug!(target: "messages", count = page.messages.len(), total = page.total, "Loaded messages");
                state.messages = page.messages;
                state.total = page.total;
                state.error = None;
            }
            Err(e) => {
                warn!(target: "messages", error = %e, "Error fetching messages");
                state.error = Some(e.to_string());
            }
        }
        state.loading = false;
        state.is_refreshing = false;
    }

    /// Fetch hourly buckets, incrementally when the stream allows it.
    pub async fn get_hourly_stats(&self, request: StatsRequest) {
        let token = self.stats_tokens.issue();
        let query = {
            let mut state = self.stats.write().await;
            if !state.hourly.is_fully_loaded() {
                state.loading = true;
            }
            state.hourly.plan_fetch(&request, self.clock.now())
        };
        let incremental = query.is_incremental();
        let result = self.source.fetch_message_stats(query).await;

        let mut state = self.stats.write().await;
        if !self.stats_tokens.is_current(token) {
            debug!(target: "chat_stats", token = token.value(), "Dropping stale hourly stats");
            return;
        }
        match result {
            Ok(points) => {
                let outcome = state.hourly.apply(&request, points, self.clock.now());
                match outcome {
                    MergeOutcome::Unchanged => {
                        debug!(target: "chat_stats", incremental, "No new hourly buckets")
                    }
                    MergeOutcome::Replaced { points } => {
                        debug!(target: "chat_stats", points, "Replaced hourly stats")
                    }
                    MergeOutcome::Merged { points, evicted } => {
                        debug!(target: "chat_stats", points, evicted, "Merged hourly stats")
                    }
                }
                state.error = None;
            }
            Err(e) => {
                warn!(target: "chat_stats", error = %e, incremental, "Error fetching stats");
                state.error = Some(e.to_string());
            }
        }
        state.loading = false;
    }

    /// Clear the hourly collection and watermark. In-flight stats responses
    /// are discarded.
    pub async fn reset_stats(&self) {
        self.stats_tokens.invalidate();
        let mut state = self.stats.write().await;
        state.hourly.reset();
        state.loading = false;
        info!(target: "chat_stats", "Reset hourly stats");
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.read().await.messages.clone()
    }

    pub async fn total_messages(&self) -> u64 {
        self.messages.read().await.total
    }

    pub async fn is_loading(&self) -> bool {
        self.messages.read().await.loading
    }

    pub async fn is_refreshing(&self) -> bool {
        self.messages.read().await.is_refreshing
    }

    pub async fn error(&self) -> Option<String> {
        self.messages.read().await.error.clone()
    }

    pub async fn hourly_stats(&self) -> Vec<HourlyStatPoint> {
        self.stats.read().await.hourly.points()
    }

    pub async fn stats_loading(&self) -> bool {
        self.stats.read().await.loading
    }

    pub async fn stats_error(&self) -> Option<String> {
        self.stats.read().await.error.clone()
    }

    pub async fn last_seen_hour(&self) -> Option<DateTime<Utc>> {
        self.stats.read().await.hourly.last_seen()
    }
}
