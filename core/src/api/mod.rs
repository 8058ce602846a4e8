// Backend API surface
//
// Each consumed slice of the REST API is a small trait so stores can be driven
// by fakes in tests. `ApiClient` implements all of them over HTTP.

mod client;
pub mod types;

pub use client::{ApiClient, ApiConfig};
pub use types::*;

use crate::time::TimeRange;
use crate::Result;
use async_trait::async_trait;

/// Chat message pages and hourly message buckets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSource: Send + Sync {
    async fn fetch_messages(&self, query: MessageQuery) -> Result<MessagePage>;

    async fn fetch_message_stats(&self, query: StatsQuery) -> Result<Vec<HourlyStatPoint>>;
}

/// Ranked word counts for a window.
#[async_trait]
pub trait WordFrequencySource: Send + Sync {
    async fn fetch_word_frequency(
        &self,
        query: WordFrequencyQuery,
    ) -> Result<WordFrequencyResponse>;
}

/// CRUD over one wordlist family.
#[async_trait]
pub trait WordlistSource<L: WordlistRecord>: Send + Sync {
    async fn list_wordlists(&self) -> Result<Vec<L>>;

    async fn get_wordlist(&self, id: i64) -> Result<L>;

    async fn create_wordlist(&self, name: String, items: Vec<L::Item>) -> Result<L>;

    async fn update_wordlist(&self, id: i64, items: Vec<L::Item>) -> Result<L>;

    async fn delete_wordlist(&self, id: i64) -> Result<()>;
}

/// Pre-aggregated playback frames.
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    async fn fetch_snapshots(&self, query: SnapshotQuery) -> Result<SnapshotSeries>;

    async fn fetch_wordcloud_snapshots(
        &self,
        query: WordcloudSnapshotQuery,
    ) -> Result<WordcloudSnapshotSeries>;
}

/// Viewer, comment and money aggregates for the overview panels.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch_viewers(&self, window: StatsWindow) -> Result<Vec<ViewerPoint>>;

    async fn fetch_comments(&self, window: StatsWindow) -> Result<Vec<HourlyStatPoint>>;

    async fn fetch_money_summary(&self, range: TimeRange) -> Result<MoneySummary>;

    async fn fetch_top_authors(
        &self,
        range: TimeRange,
        filters: ChatFilters,
        include_meta: bool,
    ) -> Result<TopAuthors>;
}

/// Currently tracked live stream.
#[async_trait]
pub trait StreamInfoSource: Send + Sync {
    async fn fetch_stream_info(&self) -> Result<Option<StreamInfo>>;
}
