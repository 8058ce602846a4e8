// Wire types for the analytics backend.
//
// Unknown fields are ignored unless a type keeps them in `extra`.

use crate::time::{format_timestamp, utc_timestamp};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// `{hour, count}` bucket from `/api/stats/comments` and `/api/chat/message-stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyStatPoint {
    #[serde(with = "utc_timestamp")]
    pub hour: DateTime<Utc>,
    pub count: u64,
}

impl HourlyStatPoint {
    pub fn new(hour: DateTime<Utc>, count: u64) -> Self {
        Self { hour, count }
    }
}

/// `{time, count}` sample from `/api/stats/viewers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerPoint {
    #[serde(with = "utc_timestamp")]
    pub time: DateTime<Utc>,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(default, with = "utc_timestamp::option")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub emotes: Vec<serde_json::Value>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub money: Option<serde_json::Value>,
}

impl ChatMessage {
    pub fn is_paid(&self) -> bool {
        self.message_type.as_deref() == Some("paid_message")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub total: u64,
}

/// `paid_message_filter` query values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaidMessageFilter {
    #[default]
    All,
    PaidOnly,
    NonPaidOnly,
}

impl PaidMessageFilter {
    /// Query value, `None` for `All` (the backend default).
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            PaidMessageFilter::All => None,
            PaidMessageFilter::PaidOnly => Some("paid_only"),
            PaidMessageFilter::NonPaidOnly => Some("non_paid_only"),
        }
    }
}

/// Author/message/paid filters shared by the chat endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatFilters {
    pub author: Option<String>,
    pub message: Option<String>,
    pub paid: PaidMessageFilter,
}

impl ChatFilters {
    pub(crate) fn push_query(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(author) = self.author.as_deref().filter(|a| !a.is_empty()) {
            params.push(("author_filter", author.to_string()));
        }
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            params.push(("message_filter", message.to_string()));
        }
        if let Some(paid) = self.paid.as_query() {
            params.push(("paid_message_filter", paid.to_string()));
        }
    }
}

/// Query for `/api/chat/messages`, with the effective start already resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub filters: ChatFilters,
}

/// Query for `/api/chat/message-stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsQuery {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub filters: ChatFilters,
    /// Incremental watermark: only buckets at or after this hour.
    pub since: Option<DateTime<Utc>>,
}

impl StatsQuery {
    pub fn is_incremental(&self) -> bool {
        self.since.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopAuthor {
    #[serde(default)]
    pub author_id: Option<String>,
    pub author: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopAuthors {
    #[serde(default)]
    pub top_authors: Vec<TopAuthor>,
    #[serde(default)]
    pub total_authors: u64,
    #[serde(default)]
    pub displayed_authors: u64,
    #[serde(default)]
    pub tie_extended: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidAuthor {
    #[serde(default)]
    pub author_id: Option<String>,
    pub author: String,
    #[serde(default)]
    pub amount_twd: f64,
    #[serde(default)]
    pub message_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoneySummary {
    #[serde(default)]
    pub total_amount_twd: f64,
    #[serde(default)]
    pub paid_message_count: u64,
    #[serde(default)]
    pub unknown_currencies: Vec<String>,
    #[serde(default)]
    pub top_authors: Vec<PaidAuthor>,
}

/// Author drill-down payloads are passed through untyped.
pub type AuthorSummary = serde_json::Value;
pub type AuthorTrend = serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamStats {
    #[serde(default)]
    pub concurrent_viewers: Option<u64>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default, with = "utc_timestamp::option")]
    pub collected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamInfo {
    pub video_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub live_broadcast_content: Option<String>,
    #[serde(default, with = "utc_timestamp::option")]
    pub actual_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: Option<StreamStats>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamInfoResponse {
    #[serde(default)]
    pub stream: Option<StreamInfo>,
}

/// Ranked word as sent by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordFrequencyResponse {
    #[serde(default)]
    pub words: Vec<WordCount>,
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub unique_words: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFrequencyQuery {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: u32,
    pub exclude_words: Vec<String>,
}

/// One played-back frame. Metric fields the client does not interpret are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(alias = "time", with = "utc_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub viewer_count: Option<u64>,
    #[serde(default)]
    pub hourly_messages: Option<u64>,
    #[serde(default)]
    pub paid_message_count: Option<u64>,
    #[serde(default)]
    pub revenue_twd: Option<f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default, with = "utc_timestamp::option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "utc_timestamp::option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub step_seconds: Option<u32>,
    #[serde(default)]
    pub total_snapshots: Option<u64>,
    #[serde(default)]
    pub window_hours: Option<u32>,
    #[serde(default)]
    pub word_limit: Option<u32>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSeries {
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

/// Word entry inside a word-cloud snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotWord {
    pub word: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordcloudSnapshot {
    #[serde(alias = "time", with = "utc_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub words: Vec<SnapshotWord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordcloudSnapshotSeries {
    #[serde(default)]
    pub snapshots: Vec<WordcloudSnapshot>,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub step_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordcloudSnapshotQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub step_seconds: u32,
    pub window_hours: u32,
    pub word_limit: u32,
    pub wordlist_id: Option<i64>,
    pub replacement_wordlist_id: Option<i64>,
}

/// `hours=N` or an explicit window, for the viewer/comment stats endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsWindow {
    LastHours(u32),
    Range {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl StatsWindow {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            StatsWindow::LastHours(hours) => vec![("hours", hours.to_string())],
            StatsWindow::Range { start, end } => {
                let mut params = Vec::new();
                push_time(&mut params, "start_time", *start);
                push_time(&mut params, "end_time", *end);
                params
            }
        }
    }
}

pub(crate) fn push_time(
    params: &mut Vec<(&'static str, String)>,
    key: &'static str,
    value: Option<DateTime<Utc>>,
) {
    if let Some(v) = value {
        params.push((key, format_timestamp(v)));
    }
}

/// A persisted, named wordlist family served under its own endpoint.
pub trait WordlistRecord:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    type Item: Clone + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Collection path, e.g. `/api/exclusion-wordlists`.
    const ENDPOINT: &'static str;
    /// JSON field carrying the items (`words` or `replacements`).
    const ITEMS_FIELD: &'static str;

    fn id(&self) -> i64;
    fn name(&self) -> &str;
    fn items(&self) -> &[Self::Item];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionWordlist {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub words: Vec<String>,
}

impl WordlistRecord for ExclusionWordlist {
    type Item = String;
    const ENDPOINT: &'static str = "/api/exclusion-wordlists";
    const ITEMS_FIELD: &'static str = "words";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn items(&self) -> &[String] {
        &self.words
    }
}

/// `source` is rewritten to `target` before counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementWordlist {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

impl WordlistRecord for ReplacementWordlist {
    type Item = Replacement;
    const ENDPOINT: &'static str = "/api/replacement-wordlists";
    const ITEMS_FIELD: &'static str = "replacements";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn items(&self) -> &[Replacement] {
        &self.replacements
    }
}
