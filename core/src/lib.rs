// ChatScope Core Library
// Live-stream chat analytics client runtime

pub mod api;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod playback;
pub mod poller;
pub mod prng;
pub mod request_token;
pub mod session;
pub mod telemetry;
pub mod time;
pub mod word_frequency;
pub mod wordcloud;
pub mod wordlists;

// Export core types
pub use api::{ApiClient, ApiConfig};
pub use chat::{ChatMessagesStore, HourlyStats, MessageRequest, StatsRequest};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardSources, DashboardView, StreamStats};
pub use playback::{PlaybackEngine, SnapshotRequest, WordcloudSnapshotRequest};
pub use poller::{PollHandle, Poller};
pub use session::{Role, Session};
pub use time::{Clock, FixedClock, SystemClock, TimeRange};
pub use word_frequency::{WordFrequencyRequest, WordFrequencyStore};
pub use wordcloud::{WordCloudConfig, WordCloudEngine, WordCloudFrame, WordFrequencyEntry};
pub use wordlists::{ExclusionEditor, ReplacementEditor, WordlistEditor, WordlistManager};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatScopeError {
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response. `message` carries the backend `detail` when it sent one.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ChatScopeError {
    /// HTTP status for backend rejections, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatScopeError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatScopeError>;
