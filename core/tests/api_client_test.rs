use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chatscope_core::api::{
    ChatFilters, ChatSource, ExclusionWordlist, MessageQuery, PaidMessageFilter, PlaybackSource,
    Replacement, ReplacementWordlist, SnapshotQuery, StatsQuery, StatsSource, StatsWindow,
    StreamInfoSource, WordFrequencyQuery, WordFrequencySource, WordlistSource,
};
use chatscope_core::time::{format_timestamp, parse_utc};
use chatscope_core::{ApiClient, ApiConfig, TimeRange};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    query: HashMap<String, String>,
    body: Option<Value>,
}

// Request log shared with the in-process backend
#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    async fn push(&self, uri: &Uri, query: HashMap<String, String>, body: Option<Value>) {
        self.requests.lock().await.push(Recorded {
            path: uri.path().to_string(),
            query,
            body,
        });
    }

    async fn last(&self) -> Recorded {
        self.requests.lock().await.last().cloned().unwrap()
    }
}

async fn messages(
    State(rec): State<Recorder>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.push(&uri, query, None).await;
    Json(json!({
        "messages": [
            {"id": "m1", "time": "2026-02-18T10:00:00", "author": "alice", "message": "hi"},
            {"id": "m2", "time": "2026-02-18T10:05:00+08:00", "author": "bob", "message": "yo",
             "message_type": "paid_message"}
        ],
        "total": 2
    }))
}

async fn message_stats(
    State(rec): State<Recorder>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.push(&uri, query, None).await;
    Json(json!([{"hour": "2026-02-18T10:00:00", "count": 3}]))
}

async fn word_frequency(
    State(rec): State<Recorder>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.push(&uri, query, None).await;
    Json(json!({"words": [{"word": "草", "count": 9}], "total_messages": 20}))
}

async fn viewers(
    State(rec): State<Recorder>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.push(&uri, query, None).await;
    Json(json!([{"time": "2026-02-18T10:00:00", "count": 1500}]))
}

async fn create_wordlist(
    State(rec): State<Recorder>,
    uri: Uri,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.push(&uri, HashMap::new(), Some(body.clone())).await;
    let mut created = body;
    created["id"] = json!(1);
    Json(created)
}

async fn missing_wordlist(State(rec): State<Recorder>, uri: Uri) -> impl IntoResponse {
    rec.push(&uri, HashMap::new(), None).await;
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": "Wordlist not found"})),
    )
}

async fn stream_info(State(rec): State<Recorder>, uri: Uri) -> Json<Value> {
    rec.push(&uri, HashMap::new(), None).await;
    Json(json!({"stream": null}))
}

async fn bad_range(
    State(rec): State<Recorder>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    rec.push(&uri, query, None).await;
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"detail": "end_time must be after start_time"})),
    )
}

async fn server_error(State(rec): State<Recorder>, uri: Uri) -> StatusCode {
    rec.push(&uri, HashMap::new(), None).await;
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn author(
    State(rec): State<Recorder>,
    uri: Uri,
    Path((id, view)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.push(&uri, query, None).await;
    Json(json!({"author_id": id, "view": view, "messages": [], "total": 0}))
}

async fn spawn_backend() -> (ApiClient, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/api/chat/messages", get(messages))
        .route("/api/chat/message-stats", get(message_stats))
        .route("/api/wordcloud/word-frequency", get(word_frequency))
        .route("/api/stats/viewers", get(viewers))
        .route("/api/stats/money-summary", get(server_error))
        .route("/api/exclusion-wordlists", post(create_wordlist))
        .route("/api/exclusion-wordlists/:id", delete(missing_wordlist))
        .route("/api/replacement-wordlists", post(create_wordlist))
        .route("/api/chat/authors/:id/:view", get(author))
        .route("/api/stream-info", get(stream_info))
        .route("/api/playback/snapshots", get(bad_range))
        .with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ApiClient::with_config(ApiConfig {
        base_url: format!("http://{addr}"),
        ..ApiConfig::default()
    });
    (client, recorder)
}

#[tokio::test]
async fn test_messages_query_omits_unset_params() {
    let (client, recorder) = spawn_backend().await;
    let start = parse_utc("2026-02-18T00:00:00Z").unwrap();

    let page = client
        .fetch_messages(MessageQuery {
            limit: Some(20),
            offset: Some(0),
            start_time: Some(start),
            end_time: None,
            filters: ChatFilters {
                author: Some("alice".into()),
                message: None,
                paid: PaidMessageFilter::All,
            },
        })
        .await
        .unwrap();

    let req = recorder.last().await;
    assert_eq!(req.path, "/api/chat/messages");
    assert_eq!(req.query.get("limit").map(String::as_str), Some("20"));
    assert_eq!(
        req.query.get("start_time").map(String::as_str),
        Some("2026-02-18T00:00:00.000Z")
    );
    assert_eq!(req.query.get("author_filter").map(String::as_str), Some("alice"));
    for absent in ["offset", "end_time", "message_filter", "paid_message_filter"] {
        assert!(!req.query.contains_key(absent), "{absent} should be omitted");
    }

    assert_eq!(page.total, 2);
    // Naive timestamps are UTC; offsets are honored
    assert_eq!(
        page.messages[0].time.map(format_timestamp).as_deref(),
        Some("2026-02-18T10:00:00.000Z")
    );
    assert_eq!(
        page.messages[1].time.map(format_timestamp).as_deref(),
        Some("2026-02-18T02:05:00.000Z")
    );
    assert!(page.messages[1].is_paid());
}

#[tokio::test]
async fn test_incremental_stats_query() {
    let (client, recorder) = spawn_backend().await;
    let since = parse_utc("2026-02-18T09:00:00Z").unwrap();

    let points = client
        .fetch_message_stats(StatsQuery {
            start_time: None,
            end_time: None,
            filters: ChatFilters {
                paid: PaidMessageFilter::PaidOnly,
                ..Default::default()
            },
            since: Some(since),
        })
        .await
        .unwrap();

    let req = recorder.last().await;
    assert_eq!(
        req.query.get("since").map(String::as_str),
        Some("2026-02-18T09:00:00.000Z")
    );
    assert_eq!(
        req.query.get("paid_message_filter").map(String::as_str),
        Some("paid_only")
    );
    assert!(!req.query.contains_key("start_time"));
    assert_eq!(points[0].hour, parse_utc("2026-02-18T10:00:00Z").unwrap());
    assert_eq!(points[0].count, 3);
}

#[tokio::test]
async fn test_word_frequency_joins_exclusions() {
    let (client, recorder) = spawn_backend().await;

    let response = client
        .fetch_word_frequency(WordFrequencyQuery {
            start_time: None,
            end_time: None,
            limit: 100,
            exclude_words: vec!["lol".into(), "888".into()],
        })
        .await
        .unwrap();

    let req = recorder.last().await;
    assert_eq!(req.query.get("limit").map(String::as_str), Some("100"));
    assert_eq!(req.query.get("exclude_words").map(String::as_str), Some("lol,888"));
    assert_eq!(response.words[0].word, "草");
    assert_eq!(response.total_messages, 20);
    assert_eq!(response.unique_words, 0);
}

#[tokio::test]
async fn test_stats_window_uses_hours_param() {
    let (client, recorder) = spawn_backend().await;
    let points = client.fetch_viewers(StatsWindow::LastHours(12)).await.unwrap();

    let req = recorder.last().await;
    assert_eq!(req.query.get("hours").map(String::as_str), Some("12"));
    assert_eq!(points[0].count, 1500);
}

#[tokio::test]
async fn test_wordlist_bodies_use_family_field() {
    let (client, recorder) = spawn_backend().await;

    let created = <ApiClient as WordlistSource<ExclusionWordlist>>::create_wordlist(
        &client,
        "emotes".into(),
        vec!["lol".into()],
    )
    .await
    .unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(created.words, vec!["lol".to_string()]);
    let body = recorder.last().await.body.unwrap();
    assert_eq!(body, json!({"name": "emotes", "words": ["lol"]}));

    let rules = vec![Replacement {
        source: "www".into(),
        target: "笑".into(),
    }];
    let created = <ApiClient as WordlistSource<ReplacementWordlist>>::create_wordlist(
        &client,
        "laughs".into(),
        rules.clone(),
    )
    .await
    .unwrap();
    assert_eq!(created.replacements, rules);
    let req = recorder.last().await;
    assert_eq!(req.path, "/api/replacement-wordlists");
    assert_eq!(
        req.body.unwrap()["replacements"],
        json!([{"source": "www", "target": "笑"}])
    );
}

#[tokio::test]
async fn test_error_detail_becomes_message() {
    let (client, _recorder) = spawn_backend().await;

    let err = client
        .fetch_snapshots(SnapshotQuery {
            start_time: parse_utc("2026-02-18T10:00:00Z").unwrap(),
            end_time: parse_utc("2026-02-18T09:00:00Z").unwrap(),
            step_seconds: 300,
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "end_time must be after start_time");

    let err = <ApiClient as WordlistSource<ExclusionWordlist>>::delete_wordlist(&client, 42)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Wordlist not found");
}

#[tokio::test]
async fn test_error_without_detail_reports_status() {
    let (client, _recorder) = spawn_backend().await;
    let err = client
        .fetch_money_summary(TimeRange::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP error! status: 500");
}

#[tokio::test]
async fn test_stream_info_null_is_none() {
    let (client, recorder) = spawn_backend().await;
    assert!(client.fetch_stream_info().await.unwrap().is_none());
    assert_eq!(recorder.last().await.path, "/api/stream-info");
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let client = ApiClient::with_config(ApiConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_ms: 500,
        ..ApiConfig::default()
    });
    let err = client.fetch_stream_info().await.unwrap_err();
    assert!(err.status().is_none());
    assert!(err.to_string().starts_with("Transport error"));
}

#[tokio::test]
async fn test_author_drill_down_encodes_id() {
    let (client, recorder) = spawn_backend().await;
    let range = TimeRange::between(
        parse_utc("2026-02-18T00:00:00Z").unwrap(),
        parse_utc("2026-02-18T06:00:00Z").unwrap(),
    );

    let summary = client.fetch_author_summary("UC a/b", range).await.unwrap();
    assert_eq!(summary["author_id"], "UC a/b");
    assert_eq!(summary["view"], "summary");
    let req = recorder.last().await;
    assert_eq!(req.path, "/api/chat/authors/UC%20a%2Fb/summary");
    assert_eq!(
        req.query.get("start_time").map(String::as_str),
        Some("2026-02-18T00:00:00.000Z")
    );
    assert_eq!(
        req.query.get("end_time").map(String::as_str),
        Some("2026-02-18T06:00:00.000Z")
    );

    let page = client
        .fetch_author_messages("小明", Some(10), Some(0), TimeRange::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    let req = recorder.last().await;
    assert_eq!(req.path, "/api/chat/authors/%E5%B0%8F%E6%98%8E/messages");
    assert_eq!(req.query.get("limit").map(String::as_str), Some("10"));
    // Zero offset and unset bounds are omitted
    assert!(!req.query.contains_key("offset"));
    assert!(!req.query.contains_key("start_time"));

    let trend = client.fetch_author_trend("UC123", range).await.unwrap();
    assert_eq!(trend["view"], "trend");
    assert_eq!(recorder.last().await.path, "/api/chat/authors/UC123/trend");
}
