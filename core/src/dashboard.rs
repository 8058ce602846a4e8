// Dashboard runtime
//
// Owns the stores and the pollers that keep them fresh. The current view
// (time range, chat filters, exclusion words) is shared with the pollers and
// read on every tick.

use crate::api::{
    ApiClient, ChatFilters, ChatSource, ExclusionWordlist, MoneySummary, PlaybackSource,
    ReplacementWordlist, StatsSource, StatsWindow, StreamInfo, StreamInfoSource, ViewerPoint,
    WordFrequencySource, WordlistSource,
};
use crate::chat::{ChatMessagesStore, MessageRequest, StatsRequest};
use crate::config::DashboardConfig;
use crate::playback::PlaybackEngine;
use crate::poller::{PollHandle, Poller};
use crate::time::{Clock, SystemClock, TimeRange, ROLLING_WINDOW_HOURS};
use crate::word_frequency::{WordFrequencyRequest, WordFrequencyStore};
use crate::wordcloud::{WordCloudEngine, WordCloudFrame};
use crate::wordlists::WordlistManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Backend surfaces the dashboard talks to.
#[derive(Clone)]
pub struct DashboardSources {
    pub chat: Arc<dyn ChatSource>,
    pub word_frequency: Arc<dyn WordFrequencySource>,
    pub exclusions: Arc<dyn WordlistSource<ExclusionWordlist>>,
    pub replacements: Arc<dyn WordlistSource<ReplacementWordlist>>,
    pub playback: Arc<dyn PlaybackSource>,
    pub stream_info: Arc<dyn StreamInfoSource>,
    pub stats: Arc<dyn StatsSource>,
}

impl DashboardSources {
    pub fn from_client(client: Arc<ApiClient>) -> Self {
        Self {
            chat: client.clone(),
            word_frequency: client.clone(),
            exclusions: client.clone(),
            replacements: client.clone(),
            playback: client.clone(),
            stream_info: client.clone(),
            stats: client,
        }
    }
}

/// What the live panels are currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardView {
    pub range: TimeRange,
    pub filters: ChatFilters,
    pub exclude_words: Vec<String>,
    pub page_size: u32,
    pub page_offset: u32,
}

/// Viewer and paid-message panel. Each half keeps its last good value.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub viewers: Vec<ViewerPoint>,
    pub money: Option<MoneySummary>,
    pub error: Option<String>,
}

impl StreamStats {
    pub fn latest_viewers(&self) -> Option<u64> {
        self.viewers.last().map(|p| p.count)
    }
}

pub struct Dashboard {
    config: DashboardConfig,
    sources: DashboardSources,
    view: Arc<RwLock<DashboardView>>,
    chat: Arc<ChatMessagesStore>,
    word_frequency: Arc<WordFrequencyStore>,
    exclusions: Arc<WordlistManager<ExclusionWordlist>>,
    replacements: Arc<WordlistManager<ReplacementWordlist>>,
    playback: Arc<PlaybackEngine>,
    stream_info: Arc<RwLock<Option<StreamInfo>>>,
    stream_stats: Arc<RwLock<StreamStats>>,
    wordcloud: Arc<Mutex<WordCloudEngine>>,
    pollers: Mutex<Vec<PollHandle>>,
}

impl Dashboard {
    /// Dashboard over the HTTP backend from `config.api`.
    pub fn new(config: DashboardConfig) -> Self {
        let client = Arc::new(ApiClient::with_config(config.api.clone()));
        Self::with_sources(config, DashboardSources::from_client(client), Arc::new(SystemClock))
    }

    pub fn with_sources(
        config: DashboardConfig,
        sources: DashboardSources,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let view = DashboardView {
            page_size: DEFAULT_PAGE_SIZE,
            ..Default::default()
        };
        Self {
            chat: Arc::new(ChatMessagesStore::with_clock(sources.chat.clone(), clock.clone())),
            word_frequency: Arc::new(WordFrequencyStore::with_clock(
                sources.word_frequency.clone(),
                clock,
            )),
            exclusions: Arc::new(WordlistManager::new(sources.exclusions.clone())),
            replacements: Arc::new(WordlistManager::new(sources.replacements.clone())),
            playback: Arc::new(PlaybackEngine::new(sources.playback.clone())),
            stream_info: Arc::new(RwLock::new(None)),
            stream_stats: Arc::new(RwLock::new(StreamStats::default())),
            wordcloud: Arc::new(Mutex::new(WordCloudEngine::new(&config.wordcloud))),
            view: Arc::new(RwLock::new(view)),
            pollers: Mutex::new(Vec::new()),
            sources,
            config,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn chat(&self) -> &Arc<ChatMessagesStore> {
        &self.chat
    }

    pub fn word_frequency(&self) -> &Arc<WordFrequencyStore> {
        &self.word_frequency
    }

    pub fn exclusions(&self) -> &Arc<WordlistManager<ExclusionWordlist>> {
        &self.exclusions
    }

    pub fn replacements(&self) -> &Arc<WordlistManager<ReplacementWordlist>> {
        &self.replacements
    }

    pub fn playback(&self) -> &Arc<PlaybackEngine> {
        &self.playback
    }

    pub async fn view(&self) -> DashboardView {
        self.view.read().await.clone()
    }

    pub async fn stream_info(&self) -> Option<StreamInfo> {
        self.stream_info.read().await.clone()
    }

    pub async fn stream_stats(&self) -> StreamStats {
        self.stream_stats.read().await.clone()
    }

    /// Launch the live pollers and load both wordlist indexes.
    pub async fn start(&self) {
        self.exclusions.refresh().await;
        self.replacements.refresh().await;
        self.spawn_pollers().await;
        info!(target: "dashboard", base_url = %self.config.api.base_url, "Dashboard started");
    }

    /// Switch the time range. Stats start over with a full fetch.
    pub async fn set_range(&self, range: TimeRange) {
        {
            let mut view = self.view.write().await;
            view.range = range;
            view.page_offset = 0;
        }
        self.chat.reset_stats().await;
        self.restart().await;
    }

    pub async fn set_filters(&self, filters: ChatFilters) {
        {
            let mut view = self.view.write().await;
            view.filters = filters;
            view.page_offset = 0;
        }
        self.chat.reset_stats().await;
        self.restart().await;
    }

    pub async fn set_exclude_words(&self, words: Vec<String>) {
        self.view.write().await.exclude_words = words;
        self.restart().await;
    }

    pub async fn set_page(&self, page_size: u32, page_offset: u32) {
        {
            let mut view = self.view.write().await;
            view.page_size = page_size;
            view.page_offset = page_offset;
        }
        self.restart().await;
    }

    /// Interpolated word cloud at `now`.
    pub async fn word_cloud_frame(&self, now: Instant) -> WordCloudFrame {
        self.wordcloud.lock().await.frame(now)
    }

    pub async fn redraw_word_cloud(&self, now: Instant) -> WordCloudFrame {
        self.wordcloud.lock().await.redraw(now)
    }

    pub async fn poller_names(&self) -> Vec<String> {
        self.pollers
            .lock()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub async fn shutdown(&self) {
        let mut pollers = self.pollers.lock().await;
        for poller in pollers.iter_mut() {
            poller.stop();
        }
        pollers.clear();
        info!(target: "dashboard", "Dashboard stopped");
    }

    async fn restart(&self) {
        let mut pollers = self.pollers.lock().await;
        if pollers.is_empty() {
            return;
        }
        debug!(target: "dashboard", "Restarting pollers");
        pollers.clear();
        drop(pollers);
        self.spawn_pollers().await;
    }

    async fn spawn_pollers(&self) {
        let poll = &self.config.poll;
        let mut handles = Vec::with_capacity(5);

        let chat = self.chat.clone();
        let view = self.view.clone();
        let first_page = Arc::new(AtomicBool::new(true));
        handles.push(Poller::spawn("messages", poll.messages, move || {
            let chat = chat.clone();
            let view = view.clone();
            let first_page = first_page.clone();
            async move {
                let v = view.read().await.clone();
                let mut request = MessageRequest::page(v.page_size, v.page_offset)
                    .with_range(v.range)
                    .with_filters(v.filters);
                request.is_initial = first_page.swap(false, Ordering::SeqCst);
                chat.get_messages(request).await;
            }
        }));

        let chat = self.chat.clone();
        let view = self.view.clone();
        handles.push(Poller::spawn("hourly_stats", poll.hourly_stats, move || {
            let chat = chat.clone();
            let view = view.clone();
            async move {
                let v = view.read().await.clone();
                chat.get_hourly_stats(StatsRequest::for_range(v.range).with_filters(v.filters))
                    .await;
            }
        }));

        let store = self.word_frequency.clone();
        let engine = self.wordcloud.clone();
        let view = self.view.clone();
        let fetch_limit = self.config.wordcloud.fetch_limit;
        handles.push(Poller::spawn("word_frequency", poll.word_frequency, move || {
            let store = store.clone();
            let engine = engine.clone();
            let view = view.clone();
            async move {
                let v = view.read().await.clone();
                store
                    .get_word_frequency(WordFrequencyRequest {
                        range: v.range,
                        limit: fetch_limit,
                        exclude_words: v.exclude_words,
                    })
                    .await;
                let words = store.words().await;
                engine.lock().await.update(words, Instant::now());
            }
        }));

        let source = self.sources.stream_info.clone();
        let slot = self.stream_info.clone();
        handles.push(Poller::spawn("stream_info", poll.stream_info, move || {
            let source = source.clone();
            let slot = slot.clone();
            async move {
                match source.fetch_stream_info().await {
                    Ok(info) => *slot.write().await = info,
                    Err(e) => warn!(target: "dashboard", error = %e, "Failed to fetch stream info"),
                }
            }
        }));

        let source = self.sources.stats.clone();
        let slot = self.stream_stats.clone();
        let view = self.view.clone();
        handles.push(Poller::spawn("stream_stats", poll.stream_stats, move || {
            let source = source.clone();
            let slot = slot.clone();
            let view = view.clone();
            async move {
                let range = view.read().await.range;
                let window = if range.is_realtime() {
                    StatsWindow::LastHours(ROLLING_WINDOW_HOURS as u32)
                } else {
                    StatsWindow::Range {
                        start: range.start,
                        end: range.end,
                    }
                };
                let (viewers, money) = tokio::join!(
                    source.fetch_viewers(window),
                    source.fetch_money_summary(range)
                );

                let mut stats = slot.write().await;
                stats.error = None;
                match viewers {
                    Ok(points) => stats.viewers = points,
                    Err(e) => {
                        warn!(target: "dashboard", error = %e, "Failed to fetch viewer stats");
                        stats.error = Some(e.to_string());
                    }
                }
                match money {
                    Ok(summary) => stats.money = Some(summary),
                    Err(e) => {
                        warn!(target: "dashboard", error = %e, "Failed to fetch money summary");
                        stats.error = Some(e.to_string());
                    }
                }
            }
        }));

        *self.pollers.lock().await = handles;
    }
}
