// Hourly message-count reconciliation.
//
// Owned state behind the hourly stats stream: the hour-keyed collection, the
// last-seen-hour watermark and the fully-loaded flag. `plan_fetch` decides
// between a full-range and an incremental request; `apply` folds the response
// back in. Neither does I/O.

use crate::api::{ChatFilters, HourlyStatPoint, StatsQuery};
use crate::time::{rolling_window_start, TimeRange};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Parameters of one `get_hourly_stats` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsRequest {
    pub range: TimeRange,
    pub filters: ChatFilters,
    pub force_full_fetch: bool,
}

impl StatsRequest {
    pub fn realtime() -> Self {
        Self::default()
    }

    pub fn for_range(range: TimeRange) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    pub fn with_filters(mut self, filters: ChatFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force_full_fetch = true;
        self
    }
}

/// What `apply` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Empty response, state untouched.
    Unchanged,
    /// Collection replaced by a full-range response.
    Replaced { points: usize },
    /// Response merged into the rolling collection.
    Merged { points: usize, evicted: usize },
}

#[derive(Debug, Clone, Default)]
pub struct HourlyStats {
    points: BTreeMap<DateTime<Utc>, u64>,
    last_seen: Option<DateTime<Utc>>,
    fully_loaded: bool,
}

impl HourlyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.fully_loaded
    }

    /// Hour of the last point of the most recent non-empty response.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    /// Points ascending by hour.
    pub fn points(&self) -> Vec<HourlyStatPoint> {
        self.points
            .iter()
            .map(|(hour, count)| HourlyStatPoint::new(*hour, *count))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the next fetch for `request` only asks for newer buckets.
    pub fn is_incremental(&self, request: &StatsRequest) -> bool {
        !request.force_full_fetch
            && self.fully_loaded
            && request.range.is_realtime()
            && self.last_seen.is_some()
    }

    /// Build the backend query for `request`.
    pub fn plan_fetch(&self, request: &StatsRequest, now: DateTime<Utc>) -> StatsQuery {
        let realtime = request.range.is_realtime();
        let mut start_time = request.range.start;
        if realtime && (request.force_full_fetch || !self.fully_loaded) {
            start_time = Some(rolling_window_start(now));
        }

        StatsQuery {
            start_time,
            end_time: request.range.end,
            filters: request.filters.clone(),
            since: if self.is_incremental(request) {
                self.last_seen
            } else {
                None
            },
        }
    }

    /// Fold a successful response for `request` into the collection.
    pub fn apply(
        &mut self,
        request: &StatsRequest,
        response: Vec<HourlyStatPoint>,
        now: DateTime<Utc>,
    ) -> MergeOutcome {
        let Some(last) = response.last() else {
            return MergeOutcome::Unchanged;
        };
        self.last_seen = Some(last.hour);

        let replace =
            !self.fully_loaded || request.force_full_fetch || !request.range.is_realtime();
        if replace {
            self.points = response.into_iter().map(|p| (p.hour, p.count)).collect();
            self.fully_loaded = true;
            return MergeOutcome::Replaced {
                points: self.points.len(),
            };
        }

        // Later points overwrite earlier ones for the same hour
        for point in response {
            self.points.insert(point.hour, point.count);
        }

        let mut evicted = 0;
        if request.range.is_realtime() {
            let cutoff = rolling_window_start(now);
            let before = self.points.len();
            self.points = self.points.split_off(&cutoff);
            evicted = before - self.points.len();
        }

        MergeOutcome::Merged {
            points: self.points.len(),
            evicted,
        }
    }

    /// Forget everything so the next fetch is a full-range fetch.
    pub fn reset(&mut self) {
        self.points.clear();
        self.last_seen = None;
        self.fully_loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{format_timestamp, parse_utc};

    fn at(s: &str) -> DateTime<Utc> {
        parse_utc(s).unwrap()
    }

    fn point(hour: &str, count: u64) -> HourlyStatPoint {
        HourlyStatPoint::new(at(hour), count)
    }

    #[test]
    fn test_first_fetch_is_full_with_rolling_start() {
        let stats = HourlyStats::new();
        let query = stats.plan_fetch(&StatsRequest::realtime(), at("2026-02-18T12:00:00Z"));
        assert_eq!(
            query.start_time.map(format_timestamp).as_deref(),
            Some("2026-02-18T00:00:00.000Z")
        );
        assert_eq!(query.end_time, None);
        assert!(!query.is_incremental());
    }

    #[test]
    fn test_incremental_merge_sorted() {
        let now = at("2026-02-18T12:00:00Z");
        let mut stats = HourlyStats::new();
        let request = StatsRequest::realtime();

        let outcome = stats.apply(&request, vec![point("2026-02-18T10:00:00Z", 2)], now);
        assert_eq!(outcome, MergeOutcome::Replaced { points: 1 });

        let query = stats.plan_fetch(&request, now);
        assert_eq!(query.since, Some(at("2026-02-18T10:00:00Z")));
        assert_eq!(query.start_time, None);

        stats.apply(&request, vec![point("2026-02-18T11:00:00Z", 5)], now);
        assert_eq!(
            stats.points(),
            vec![point("2026-02-18T10:00:00Z", 2), point("2026-02-18T11:00:00Z", 5)]
        );
        assert_eq!(stats.last_seen(), Some(at("2026-02-18T11:00:00Z")));
    }

    #[test]
    fn test_incremental_overwrites_same_hour() {
        let now = at("2026-02-18T12:00:00Z");
        let mut stats = HourlyStats::new();
        let request = StatsRequest::realtime();
        stats.apply(&request, vec![point("2026-02-18T11:00:00Z", 5)], now);
        stats.apply(&request, vec![point("2026-02-18T11:00:00Z", 9)], now);
        assert_eq!(stats.points(), vec![point("2026-02-18T11:00:00Z", 9)]);
    }

    #[test]
    fn test_merge_evicts_points_before_cutoff() {
        let mut stats = HourlyStats::new();
        let request = StatsRequest::realtime();
        stats.apply(
            &request,
            vec![point("2026-02-18T01:00:00Z", 1), point("2026-02-18T02:00:00Z", 1)],
            at("2026-02-18T12:00:00Z"),
        );

        let later = at("2026-02-18T13:30:00Z");
        let outcome = stats.apply(&request, vec![point("2026-02-18T13:00:00Z", 4)], later);
        assert_eq!(outcome, MergeOutcome::Merged { points: 2, evicted: 1 });
        assert_eq!(
            stats.points(),
            vec![point("2026-02-18T02:00:00Z", 1), point("2026-02-18T13:00:00Z", 4)]
        );
    }

    #[test]
    fn test_empty_response_is_noop() {
        let now = at("2026-02-18T12:00:00Z");
        let mut stats = HourlyStats::new();
        let request = StatsRequest::realtime();
        stats.apply(&request, vec![point("2026-02-18T10:00:00Z", 2)], now);

        assert_eq!(stats.apply(&request, Vec::new(), now), MergeOutcome::Unchanged);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.last_seen(), Some(at("2026-02-18T10:00:00Z")));
    }

    #[test]
    fn test_reset_forces_full_fetch() {
        let now = at("2026-02-18T12:00:00Z");
        let mut stats = HourlyStats::new();
        let request = StatsRequest::realtime();
        stats.apply(&request, vec![point("2026-02-18T10:00:00Z", 2)], now);
        assert!(stats.is_incremental(&request));

        stats.reset();
        assert!(stats.is_empty());
        assert!(!stats.is_fully_loaded());
        let query = stats.plan_fetch(&request, now);
        assert!(!query.is_incremental());
        assert!(query.start_time.is_some());
    }

    #[test]
    fn test_explicit_range_always_replaces() {
        let now = at("2026-02-18T12:00:00Z");
        let mut stats = HourlyStats::new();
        let range = TimeRange::between(at("2026-02-17T00:00:00Z"), at("2026-02-17T06:00:00Z"));
        let request = StatsRequest::for_range(range);

        stats.apply(&request, vec![point("2026-02-17T01:00:00Z", 3)], now);
        let query = stats.plan_fetch(&request, now);
        assert!(!query.is_incremental());
        assert_eq!(query.start_time, range.start);
        assert_eq!(query.end_time, range.end);

        // Points older than the rolling window survive in range mode
        stats.apply(&request, vec![point("2026-02-17T02:00:00Z", 7)], now);
        assert_eq!(stats.points(), vec![point("2026-02-17T02:00:00Z", 7)]);
    }

    #[test]
    fn test_forced_request_replaces() {
        let now = at("2026-02-18T12:00:00Z");
        let mut stats = HourlyStats::new();
        stats.apply(&StatsRequest::realtime(), vec![point("2026-02-18T10:00:00Z", 2)], now);

        let forced = StatsRequest::realtime().forced();
        let query = stats.plan_fetch(&forced, now);
        assert!(!query.is_incremental());
        assert_eq!(query.start_time, Some(at("2026-02-18T00:00:00Z")));

        stats.apply(&forced, vec![point("2026-02-18T11:00:00Z", 1)], now);
        assert_eq!(stats.points(), vec![point("2026-02-18T11:00:00Z", 1)]);
    }
}
