// Time helpers shared by every store that works on a rolling window.
//
// The backend emits UTC timestamps, sometimes without an offset suffix.
// Everything here treats naive timestamps as UTC.

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Length of the real-time rolling window.
pub const ROLLING_WINDOW_HOURS: i64 = 12;

/// Source of "now". Injected so window math is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(RwLock::new(instant)),
        }
    }

    /// Parse an RFC 3339 string. Panics on malformed input; test helper.
    pub fn at(timestamp: &str) -> Self {
        let instant = parse_utc(timestamp)
            .unwrap_or_else(|| panic!("invalid timestamp for FixedClock: {timestamp}"));
        Self::new(instant)
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.write() {
            *guard = instant;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.instant.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
            .read()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

/// Optional explicit time filter. Both bounds unset means real-time mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn realtime() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_realtime(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Start bound actually sent to the backend: the explicit start, or the
    /// rolling window start when no bound at all was given.
    pub fn effective_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.is_realtime() {
            Some(rolling_window_start(now))
        } else {
            self.start
        }
    }
}

pub fn rolling_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(ROLLING_WINDOW_HOURS)
}

/// `2026-02-18T00:00:00.000Z`
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse RFC 3339, or a naive ISO-8601 timestamp interpreted as UTC.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn floor_to_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(Duration::hours(1))
        .unwrap_or(instant)
}

/// Serde adapter for backend timestamps.
pub mod utc_timestamp {
    use super::{format_timestamp, parse_utc};
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_utc(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use super::super::{format_timestamp, parse_utc};
        use chrono::{DateTime, Utc};
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => s.serialize_str(&format_timestamp(*v)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => parse_utc(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}"))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_timestamps_are_utc() {
        let naive = parse_utc("2026-02-18T10:00:00").unwrap();
        let zulu = parse_utc("2026-02-18T10:00:00Z").unwrap();
        let offset = parse_utc("2026-02-18T18:00:00+08:00").unwrap();
        assert_eq!(naive, zulu);
        assert_eq!(offset, zulu);
        assert!(parse_utc("not a time").is_none());
    }

    #[test]
    fn test_format_matches_backend_style() {
        let t = parse_utc("2026-02-18T00:00:00Z").unwrap();
        assert_eq!(format_timestamp(t), "2026-02-18T00:00:00.000Z");
    }

    #[test]
    fn test_rolling_window_start() {
        let now = parse_utc("2026-02-18T12:00:00Z").unwrap();
        let range = TimeRange::realtime();
        assert_eq!(
            range.effective_start(now).map(format_timestamp).as_deref(),
            Some("2026-02-18T00:00:00.000Z")
        );

        let explicit = TimeRange {
            start: None,
            end: Some(now),
        };
        assert_eq!(explicit.effective_start(now), None);
    }

    #[test]
    fn test_floor_to_hour() {
        let t = parse_utc("2026-02-18T10:47:12.345Z").unwrap();
        assert_eq!(format_timestamp(floor_to_hour(t)), "2026-02-18T10:00:00.000Z");
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at("2026-02-18T12:00:00Z");
        clock.advance(Duration::hours(1));
        assert_eq!(format_timestamp(clock.now()), "2026-02-18T13:00:00.000Z");
    }
}
