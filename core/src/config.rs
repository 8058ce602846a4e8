// Dashboard configuration
//
// Defaults, then environment variables, then an optional TOML overlay.

use crate::api::ApiConfig;
use crate::wordcloud::WordCloudConfig;
use crate::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Poll cadence per panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub messages: Duration,
    pub hourly_stats: Duration,
    pub word_frequency: Duration,
    pub stream_info: Duration,
    /// Viewer counts and paid-message totals.
    pub stream_stats: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            messages: Duration::from_secs(10),
            hourly_stats: Duration::from_secs(60),
            word_frequency: Duration::from_secs(30),
            stream_info: Duration::from_secs(30),
            stream_stats: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// Password granting the admin role. Unset means nobody can log in as admin.
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub poll: PollConfig,
    pub wordcloud: WordCloudConfig,
    pub auth: AuthConfig,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

impl DashboardConfig {
    /// Defaults with `CHATSCOPE_*` environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = env_string("CHATSCOPE_API_URL") {
            config.api.base_url = url;
        }
        if let Some(ms) = env_parse("CHATSCOPE_TIMEOUT_MS") {
            config.api.timeout_ms = ms;
        }
        config.auth.admin_password = env_string("CHATSCOPE_ADMIN_PASSWORD");
        if let Some(limit) = env_parse("CHATSCOPE_WORD_LIMIT") {
            config.wordcloud.word_limit = limit;
        }
        if let Some(seed) = env_parse("CHATSCOPE_SEED") {
            config.wordcloud.seed = Some(seed);
        }
        config
    }

    /// Environment config overlaid with the TOML file named by
    /// `CHATSCOPE_CONFIG` (default `./chatscope.toml`). Unreadable or invalid
    /// files are logged and ignored.
    pub fn load() -> Self {
        let base = Self::from_env();
        let path = std::env::var("CHATSCOPE_CONFIG").unwrap_or_else(|_| "chatscope.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            info!(target: "dashboard", path = %path, "No TOML config found; using defaults/env");
            return base;
        }
        match fs::read_to_string(p) {
            Ok(s) => match base.clone().overlay_toml(&s) {
                Ok(config) => config,
                Err(e) => {
                    warn!(target: "dashboard", error = %e, "Failed to parse TOML; using defaults");
                    base
                }
            },
            Err(e) => {
                warn!(target: "dashboard", error = %e, "Failed to read TOML; using defaults");
                base
            }
        }
    }

    /// Apply a TOML document on top of this config.
    pub fn overlay_toml(self, raw: &str) -> Result<Self> {
        let overlay: DashboardToml = toml::from_str(raw)?;
        Ok(overlay.overlay(self))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DashboardToml {
    api: Option<ApiToml>,
    poll: Option<PollToml>,
    wordcloud: Option<WordCloudToml>,
    auth: Option<AuthToml>,
}

impl DashboardToml {
    fn overlay(self, mut base: DashboardConfig) -> DashboardConfig {
        if let Some(a) = self.api {
            a.apply(&mut base.api);
        }
        if let Some(p) = self.poll {
            p.apply(&mut base.poll);
        }
        if let Some(w) = self.wordcloud {
            w.apply(&mut base.wordcloud);
        }
        if let Some(a) = self.auth {
            if a.admin_password.is_some() {
                base.auth.admin_password = a.admin_password;
            }
        }
        base
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApiToml {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    user_agent: Option<String>,
}

impl ApiToml {
    fn apply(self, a: &mut ApiConfig) {
        if let Some(v) = self.base_url {
            a.base_url = v;
        }
        if let Some(v) = self.timeout_ms {
            a.timeout_ms = v;
        }
        if let Some(v) = self.user_agent {
            a.user_agent = v;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PollToml {
    messages_secs: Option<u64>,
    hourly_stats_secs: Option<u64>,
    word_frequency_secs: Option<u64>,
    stream_info_secs: Option<u64>,
    stream_stats_secs: Option<u64>,
}

impl PollToml {
    fn apply(self, p: &mut PollConfig) {
        // Zero would spin the poller
        let secs = |v: u64| Duration::from_secs(v.max(1));
        if let Some(v) = self.messages_secs {
            p.messages = secs(v);
        }
        if let Some(v) = self.hourly_stats_secs {
            p.hourly_stats = secs(v);
        }
        if let Some(v) = self.word_frequency_secs {
            p.word_frequency = secs(v);
        }
        if let Some(v) = self.stream_info_secs {
            p.stream_info = secs(v);
        }
        if let Some(v) = self.stream_stats_secs {
            p.stream_stats = secs(v);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WordCloudToml {
    width: Option<f64>,
    height: Option<f64>,
    margin: Option<f64>,
    word_limit: Option<usize>,
    fetch_limit: Option<u32>,
    seed: Option<u32>,
}

impl WordCloudToml {
    fn apply(self, w: &mut WordCloudConfig) {
        if let Some(v) = self.width {
            w.width = v;
        }
        if let Some(v) = self.height {
            w.height = v;
        }
        if let Some(v) = self.margin {
            w.margin = v;
        }
        if let Some(v) = self.word_limit {
            w.word_limit = v;
        }
        if let Some(v) = self.fetch_limit {
            w.fetch_limit = v;
        }
        if let Some(v) = self.seed {
            w.seed = Some(v);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AuthToml {
    admin_password: Option<String>,
}
