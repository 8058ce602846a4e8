// Chat messages and hourly message statistics

pub mod hourly;
pub mod messages;

pub use hourly::{HourlyStats, MergeOutcome, StatsRequest};
pub use messages::{ChatMessagesStore, MessageRequest};
