use async_trait::async_trait;
use chatscope_core::api::{WordCount, WordFrequencyQuery, WordFrequencyResponse, WordFrequencySource};
use chatscope_core::time::{format_timestamp, parse_utc};
use chatscope_core::wordcloud::{WordCloudConfig, WordCloudEngine};
use chatscope_core::{
    ChatScopeError, FixedClock, Result, TimeRange, WordFrequencyEntry, WordFrequencyRequest,
    WordFrequencyStore,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Notify};

#[derive(Default)]
struct FakeWords {
    responses: Mutex<VecDeque<Result<WordFrequencyResponse>>>,
    queries: Mutex<Vec<WordFrequencyQuery>>,
    // Holds the next call until notified
    gate: Mutex<Option<Arc<Notify>>>,
}

#[async_trait]
impl WordFrequencySource for FakeWords {
    async fn fetch_word_frequency(
        &self,
        query: WordFrequencyQuery,
    ) -> Result<WordFrequencyResponse> {
        self.queries.lock().await.push(query);
        let next = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(WordFrequencyResponse::default()));
        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        next
    }
}

fn response(words: &[(&str, u64)], total_messages: u64) -> WordFrequencyResponse {
    WordFrequencyResponse {
        words: words
            .iter()
            .map(|(w, c)| WordCount {
                word: w.to_string(),
                count: *c,
            })
            .collect(),
        total_messages,
        unique_words: words.len() as u64,
    }
}

fn setup() -> (Arc<FakeWords>, WordFrequencyStore) {
    let fake = Arc::new(FakeWords::default());
    let store = WordFrequencyStore::with_clock(
        fake.clone(),
        Arc::new(FixedClock::at("2026-02-18T12:00:00Z")),
    );
    (fake, store)
}

#[tokio::test]
async fn test_default_request_uses_rolling_window() {
    let (fake, store) = setup();
    fake.responses
        .lock()
        .await
        .push_back(Ok(response(&[("hello", 3), ("world", 1)], 4)));

    store.get_word_frequency(WordFrequencyRequest::default()).await;

    let queries = fake.queries.lock().await;
    assert_eq!(queries[0].limit, 100);
    assert_eq!(
        queries[0].start_time.map(format_timestamp).as_deref(),
        Some("2026-02-18T00:00:00.000Z")
    );
    assert_eq!(
        store.words().await,
        vec![WordFrequencyEntry::new("hello", 3), WordFrequencyEntry::new("world", 1)]
    );
    assert_eq!(store.stats().await.total_messages, 4);
    assert_eq!(store.stats().await.unique_words, 2);
}

#[tokio::test]
async fn test_empty_words_still_report_totals() {
    let (fake, store) = setup();
    fake.responses.lock().await.push_back(Ok(WordFrequencyResponse {
        words: Vec::new(),
        total_messages: 12,
        unique_words: 0,
    }));

    store
        .get_word_frequency(WordFrequencyRequest {
            exclude_words: vec!["foo".to_string()],
            ..Default::default()
        })
        .await;

    assert_eq!(fake.queries.lock().await[0].exclude_words, vec!["foo".to_string()]);
    assert!(store.words().await.is_empty());
    assert_eq!(store.stats().await.total_messages, 12);
    assert!(store.error().await.is_none());

    let mut engine = WordCloudEngine::new(&WordCloudConfig {
        seed: Some(1),
        ..Default::default()
    });
    let frame = engine.update(store.words().await, Instant::now());
    assert!(frame.placeholder);
}

#[test]
fn test_missing_totals_default_to_zero() {
    let parsed: WordFrequencyResponse = serde_json::from_str(r#"{"words":[]}"#).unwrap();
    assert_eq!(parsed.total_messages, 0);
    assert_eq!(parsed.unique_words, 0);
}

#[tokio::test]
async fn test_failure_keeps_previous_words() {
    let (fake, store) = setup();
    {
        let mut responses = fake.responses.lock().await;
        responses.push_back(Ok(response(&[("kept", 5)], 5)));
        responses.push_back(Err(ChatScopeError::Transport("connection refused".into())));
    }

    store.get_word_frequency(WordFrequencyRequest::default()).await;
    store.get_word_frequency(WordFrequencyRequest::default()).await;

    assert_eq!(store.words().await, vec![WordFrequencyEntry::new("kept", 5)]);
    assert_eq!(
        store.error().await.as_deref(),
        Some("Transport error: connection refused")
    );
    assert!(!store.is_loading().await);
}

#[tokio::test]
async fn test_new_response_replaces_set_wholesale() {
    let (fake, store) = setup();
    {
        let mut responses = fake.responses.lock().await;
        responses.push_back(Ok(response(&[("a", 5), ("b", 3)], 8)));
        responses.push_back(Ok(response(&[("c", 1)], 1)));
    }
    let range = TimeRange::between(
        parse_utc("2026-02-17T00:00:00Z").unwrap(),
        parse_utc("2026-02-17T12:00:00Z").unwrap(),
    );

    store.get_word_frequency(WordFrequencyRequest::default()).await;
    store
        .get_word_frequency(WordFrequencyRequest {
            range,
            limit: 50,
            exclude_words: Vec::new(),
        })
        .await;

    assert_eq!(store.words().await, vec![WordFrequencyEntry::new("c", 1)]);
    let queries = fake.queries.lock().await;
    assert_eq!(queries[1].start_time, range.start);
    assert_eq!(queries[1].end_time, range.end);
    assert_eq!(queries[1].limit, 50);
}

#[tokio::test]
async fn test_stale_word_frequency_is_dropped() {
    let (fake, store) = setup();
    let gate = Arc::new(Notify::new());
    *fake.gate.lock().await = Some(gate.clone());
    {
        let mut responses = fake.responses.lock().await;
        responses.push_back(Ok(response(&[("spam", 50)], 50)));
        responses.push_back(Ok(response(&[("hype", 7)], 9)));
    }

    // Exclusions change while the first request is still in flight
    tokio::join!(store.get_word_frequency(WordFrequencyRequest::default()), async {
        store
            .get_word_frequency(WordFrequencyRequest {
                exclude_words: vec!["spam".into()],
                ..Default::default()
            })
            .await;
        gate.notify_one();
    });

    assert_eq!(store.words().await, vec![WordFrequencyEntry::new("hype", 7)]);
    assert_eq!(store.stats().await.total_messages, 9);
    assert!(!store.is_loading().await);
    assert!(store.error().await.is_none());
}
