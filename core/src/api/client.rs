/// HTTP client for the chat analytics backend
///
/// JSON over HTTP. Non-2xx responses surface the backend `detail` message when
/// the body carries one, otherwise `HTTP error! status: <code>`.
use super::types::*;
use super::{
    ChatSource, PlaybackSource, StatsSource, StreamInfoSource, WordFrequencySource,
    WordlistSource,
};
use crate::time::TimeRange;
use crate::{ChatScopeError, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the API client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, without the `/api` prefix
    pub base_url: String,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 10_000,
            user_agent: "chatscope/0.1".to_string(),
        }
    }
}

type Params = Vec<(&'static str, String)>;

/// Typed client for every `/api/...` endpoint the dashboard consumes.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Create a client with default configuration
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: ApiConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &Params) -> Result<T> {
        let request = self.http_client.get(self.url(path)).query(params);
        self.execute(path, request).await
    }

    async fn execute<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let response = self.send(path, request).await?;
        response.json::<T>().await.map_err(|e| {
            warn!(target: "api", path = %path, error = %e, "Failed to decode response");
            ChatScopeError::Decode(format!("{}: {}", path, e))
        })
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response> {
        debug!(target: "api", path = %path, "Sending request");

        let response = request.send().await.map_err(|e| {
            warn!(target: "api", path = %path, error = %e, "Request failed");
            ChatScopeError::Transport(e.to_string())
        })?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            warn!(target: "api", path = %path, error = %err, "Backend returned error");
            return Err(err);
        }
        Ok(response)
    }

    pub async fn fetch_author_summary(
        &self,
        author_id: &str,
        range: TimeRange,
    ) -> Result<AuthorSummary> {
        let path = format!("/api/chat/authors/{}/summary", encode_segment(author_id));
        self.get_json(&path, &range_params(range)).await
    }

    pub async fn fetch_author_messages(
        &self,
        author_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
        range: TimeRange,
    ) -> Result<MessagePage> {
        let path = format!("/api/chat/authors/{}/messages", encode_segment(author_id));
        let mut params = Params::new();
        push_page(&mut params, limit, offset);
        params.extend(range_params(range));
        self.get_json(&path, &params).await
    }

    pub async fn fetch_author_trend(&self, author_id: &str, range: TimeRange) -> Result<AuthorTrend> {
        let path = format!("/api/chat/authors/{}/trend", encode_segment(author_id));
        self.get_json(&path, &range_params(range)).await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a non-2xx response onto `ChatScopeError::Http`.
async fn error_from_response(response: Response) -> ChatScopeError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = detail_message(&body).unwrap_or_else(|| format!("HTTP error! status: {}", status));
    ChatScopeError::Http { status, message }
}

/// `detail` from a `{detail: ...}` error body. Non-string details (validation
/// error lists) are rendered as JSON.
fn detail_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Option<Value>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

fn range_params(range: TimeRange) -> Params {
    let mut params = Params::new();
    push_time(&mut params, "start_time", range.start);
    push_time(&mut params, "end_time", range.end);
    params
}

fn push_page(params: &mut Params, limit: Option<u32>, offset: Option<u32>) {
    if let Some(limit) = limit.filter(|l| *l > 0) {
        params.push(("limit", limit.to_string()));
    }
    if let Some(offset) = offset.filter(|o| *o > 0) {
        params.push(("offset", offset.to_string()));
    }
}

fn encode_segment(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[async_trait]
impl ChatSource for ApiClient {
    async fn fetch_messages(&self, query: MessageQuery) -> Result<MessagePage> {
        let mut params = Params::new();
        push_page(&mut params, query.limit, query.offset);
        push_time(&mut params, "start_time", query.start_time);
        push_time(&mut params, "end_time", query.end_time);
        query.filters.push_query(&mut params);
        self.get_json("/api/chat/messages", &params).await
    }

    async fn fetch_message_stats(&self, query: StatsQuery) -> Result<Vec<HourlyStatPoint>> {
        let mut params = Params::new();
        push_time(&mut params, "start_time", query.start_time);
        push_time(&mut params, "end_time", query.end_time);
        query.filters.push_query(&mut params);
        push_time(&mut params, "since", query.since);
        self.get_json("/api/chat/message-stats", &params).await
    }
}

#[async_trait]
impl WordFrequencySource for ApiClient {
    async fn fetch_word_frequency(
        &self,
        query: WordFrequencyQuery,
    ) -> Result<WordFrequencyResponse> {
        let mut params = Params::new();
        params.push(("limit", query.limit.to_string()));
        push_time(&mut params, "start_time", query.start_time);
        push_time(&mut params, "end_time", query.end_time);
        if !query.exclude_words.is_empty() {
            params.push(("exclude_words", query.exclude_words.join(",")));
        }
        self.get_json("/api/wordcloud/word-frequency", &params).await
    }
}

#[async_trait]
impl<L: WordlistRecord> WordlistSource<L> for ApiClient {
    async fn list_wordlists(&self) -> Result<Vec<L>> {
        self.get_json(L::ENDPOINT, &Params::new()).await
    }

    async fn get_wordlist(&self, id: i64) -> Result<L> {
        self.get_json(&format!("{}/{}", L::ENDPOINT, id), &Params::new())
            .await
    }

    async fn create_wordlist(&self, name: String, items: Vec<L::Item>) -> Result<L> {
        let mut body = Map::new();
        body.insert("name".to_string(), Value::String(name));
        body.insert(L::ITEMS_FIELD.to_string(), serde_json::to_value(items)?);

        let request = self.http_client.post(self.url(L::ENDPOINT)).json(&body);
        self.execute(L::ENDPOINT, request).await
    }

    async fn update_wordlist(&self, id: i64, items: Vec<L::Item>) -> Result<L> {
        let path = format!("{}/{}", L::ENDPOINT, id);
        let mut body = Map::new();
        body.insert(L::ITEMS_FIELD.to_string(), serde_json::to_value(items)?);

        let request = self.http_client.put(self.url(&path)).json(&body);
        self.execute(&path, request).await
    }

    async fn delete_wordlist(&self, id: i64) -> Result<()> {
        let path = format!("{}/{}", L::ENDPOINT, id);
        let request = self.http_client.delete(self.url(&path));
        self.send(&path, request).await?;
        Ok(())
    }
}

#[async_trait]
impl PlaybackSource for ApiClient {
    async fn fetch_snapshots(&self, query: SnapshotQuery) -> Result<SnapshotSeries> {
        let mut params = Params::new();
        push_time(&mut params, "start_time", Some(query.start_time));
        push_time(&mut params, "end_time", Some(query.end_time));
        params.push(("step_seconds", query.step_seconds.to_string()));
        self.get_json("/api/playback/snapshots", &params).await
    }

    async fn fetch_wordcloud_snapshots(
        &self,
        query: WordcloudSnapshotQuery,
    ) -> Result<WordcloudSnapshotSeries> {
        let mut params = Params::new();
        push_time(&mut params, "start_time", Some(query.start_time));
        push_time(&mut params, "end_time", Some(query.end_time));
        params.push(("step_seconds", query.step_seconds.to_string()));
        params.push(("window_hours", query.window_hours.to_string()));
        params.push(("word_limit", query.word_limit.to_string()));
        if let Some(id) = query.wordlist_id {
            params.push(("wordlist_id", id.to_string()));
        }
        if let Some(id) = query.replacement_wordlist_id {
            params.push(("replacement_wordlist_id", id.to_string()));
        }
        self.get_json("/api/playback/word-frequency-snapshots", &params)
            .await
    }
}

#[async_trait]
impl StatsSource for ApiClient {
    async fn fetch_viewers(&self, window: StatsWindow) -> Result<Vec<ViewerPoint>> {
        self.get_json("/api/stats/viewers", &window.query()).await
    }

    async fn fetch_comments(&self, window: StatsWindow) -> Result<Vec<HourlyStatPoint>> {
        self.get_json("/api/stats/comments", &window.query()).await
    }

    async fn fetch_money_summary(&self, range: TimeRange) -> Result<MoneySummary> {
        self.get_json("/api/stats/money-summary", &range_params(range))
            .await
    }

    async fn fetch_top_authors(
        &self,
        range: TimeRange,
        filters: ChatFilters,
        include_meta: bool,
    ) -> Result<TopAuthors> {
        let mut params = range_params(range);
        filters.push_query(&mut params);
        if include_meta {
            params.push(("include_meta", "true".to_string()));
        }
        self.get_json("/api/chat/top-authors", &params).await
    }
}

#[async_trait]
impl StreamInfoSource for ApiClient {
    async fn fetch_stream_info(&self) -> Result<Option<StreamInfo>> {
        let response: StreamInfoResponse = self.get_json("/api/stream-info", &Params::new()).await?;
        Ok(response.stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_message() {
        assert_eq!(
            detail_message(r#"{"detail":"end_time must be after start_time"}"#).as_deref(),
            Some("end_time must be after start_time")
        );
        assert_eq!(detail_message("<html>boom</html>"), None);
        assert_eq!(detail_message(r#"{"detail":null}"#), None);
        assert!(detail_message(r#"{"detail":[{"loc":["query"]}]}"#)
            .unwrap()
            .contains("loc"));
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("UC_abc-1"), "UC_abc-1");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn test_url_joins_base() {
        let client = ApiClient::with_config(ApiConfig {
            base_url: "http://example.test/".to_string(),
            ..ApiConfig::default()
        });
        assert_eq!(client.url("/api/stream-info"), "http://example.test/api/stream-info");
    }
}
