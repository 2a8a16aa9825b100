//! Session tracking over a stream of per-frame analysis results.
//!
//! The tracker counts correct and incorrect frames for the current window.
//! Once the flush interval has elapsed it turns the counts into a
//! [`SessionSummary`], appends it to the persisted history, and updates the
//! cumulative [`ProgressStats`].
//!
//! Persistence is best-effort: read failures fall back to empty state and
//! write failures are logged, never surfaced to the frame loop.

use crate::store::KeyValueStore;
use crate::{
    AnalysisResult, Error, Result, FlushReport, FrameCounters, Improvement, ProgressStats, SessionSummary,
    WindowStats,
};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Store key for cumulative progress
pub const PROGRESS_KEY: &str = "progress_stats";

/// Store key for the ordered session history
pub const HISTORY_KEY: &str = "session_history";

/// Aggregation policy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSettings {
    /// Minimum time between flushes
    pub flush_interval: Duration,
    /// Assumed frames per second when converting counts to time
    pub sample_rate_hz: f64,
    /// Count frames with missing landmarks as incorrect instead of skipping them
    pub count_incomplete_frames: bool,
}

impl SessionSettings {
    /// Whether counts can be turned into finite durations and flushes
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(Error::Config(format!(
                "sample_rate_hz must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if self.flush_interval <= Duration::zero() {
            return Err(Error::Config(format!(
                "flush_interval must be positive, got {}",
                self.flush_interval
            )));
        }
        Ok(())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            flush_interval: Duration::seconds(300),
            sample_rate_hz: 30.0,
            count_incomplete_frames: false,
        }
    }
}

/// Stateful recorder fed once per analyzed frame
pub struct SessionTracker<S: KeyValueStore> {
    store: S,
    settings: SessionSettings,
    counters: FrameCounters,
    history: Vec<SessionSummary>,
    progress: ProgressStats,
    last_flush: DateTime<Utc>,
}

impl<S: KeyValueStore> SessionTracker<S> {
    /// Create a tracker whose first window starts at `started_at`
    ///
    /// Persisted history and progress are restored from `store`. Invalid
    /// settings are replaced by the defaults with a warning.
    pub fn new(store: S, settings: SessionSettings, started_at: DateTime<Utc>) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                tracing::warn!("{}. Using default session settings.", e);
                SessionSettings::default()
            }
        };
        let mut tracker = Self {
            store,
            settings,
            counters: FrameCounters::default(),
            history: Vec::new(),
            progress: ProgressStats::default(),
            last_flush: started_at,
        };
        tracker.load_state();
        tracker
    }

    /// Reload history and progress from the store
    ///
    /// Missing or malformed records fall back to empty defaults with a
    /// warning. Calling this repeatedly yields the same state.
    pub fn load_state(&mut self) {
        self.progress = match load_record::<ProgressStats>(&self.store, PROGRESS_KEY) {
            Some(stats) if stats.is_valid() => stats,
            Some(stats) => {
                tracing::warn!(
                    "Discarding invalid progress stats {:?}, using defaults",
                    stats
                );
                ProgressStats::default()
            }
            None => ProgressStats::default(),
        };

        self.history = load_record::<Vec<serde_json::Value>>(&self.store, HISTORY_KEY)
            .map(decode_history)
            .unwrap_or_default();

        tracing::debug!(
            "Restored {} sessions, {:.1} practice minutes",
            self.history.len(),
            self.progress.total_practice_minutes
        );
    }

    /// Count one frame and flush if the interval has elapsed
    ///
    /// `None` means the detector found no pose; such frames are not counted.
    /// Returns the flush report when this call triggered a flush.
    pub fn record(
        &mut self,
        result: Option<&AnalysisResult>,
        now: DateTime<Utc>,
    ) -> Option<FlushReport> {
        let result = result?;
        if !result.is_complete() && !self.settings.count_incomplete_frames {
            return None;
        }

        self.counters.count(result.is_correct);

        if now - self.last_flush >= self.settings.flush_interval && !self.counters.is_empty() {
            self.flush(now)
        } else {
            None
        }
    }

    /// Close the current window
    ///
    /// Does nothing and returns `None` when no frames were counted.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Option<FlushReport> {
        let summary =
            SessionSummary::from_counters(&self.counters, self.settings.sample_rate_hz, now)?;

        let improvement = self
            .history
            .last()
            .map(|previous| Improvement::between(previous, &summary));

        self.history.push(summary.clone());
        persist(&mut self.store, HISTORY_KEY, &self.history);

        self.progress.add(&summary);
        persist(&mut self.store, PROGRESS_KEY, &self.progress);

        self.counters.reset();
        self.last_flush = now;

        tracing::info!(
            "Session #{} flushed: {:.1}% correct over {:.1}s",
            self.progress.sessions_completed,
            summary.correct_percentage,
            summary.total_seconds
        );
        if let Some(improvement) = &improvement {
            tracing::info!("{}", improvement);
        }

        Some(FlushReport {
            summary,
            improvement,
            progress: self.progress,
        })
    }

    /// Running statistics for the current window, `None` if it is empty
    pub fn window_stats(&self) -> Option<WindowStats> {
        let correct_percentage = self.counters.correct_percentage()?;
        let rate = self.settings.sample_rate_hz;
        let correct_seconds = self.counters.correct_frames() as f64 / rate;
        let incorrect_seconds = self.counters.incorrect_frames() as f64 / rate;
        Some(WindowStats {
            correct_percentage,
            incorrect_percentage: self.counters.incorrect_frames() as f64 * 100.0
                / self.counters.total_frames() as f64,
            correct_seconds,
            incorrect_seconds,
            total_seconds: correct_seconds + incorrect_seconds,
        })
    }

    pub fn counters(&self) -> &FrameCounters {
        &self.counters
    }

    pub fn history(&self) -> &[SessionSummary] {
        &self.history
    }

    pub fn progress(&self) -> &ProgressStats {
        &self.progress
    }

    pub fn last_flush(&self) -> DateTime<Utc> {
        self.last_flush
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Encode and save one record; failures are logged and dropped
fn persist<T: Serialize + ?Sized>(store: &mut impl KeyValueStore, key: &str, value: &T) {
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!("Failed to encode {}: {}", key, e);
            return;
        }
    };
    if let Err(e) = store.save(key, &encoded) {
        tracing::warn!("Failed to save {}: {}. Will retry on next flush.", key, e);
    }
}

/// Decode history entries one by one, skipping any that do not parse
fn decode_history(entries: Vec<serde_json::Value>) -> Vec<SessionSummary> {
    let mut history = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<SessionSummary>(entry) {
            Ok(summary) => history.push(summary),
            Err(e) => {
                tracing::warn!("Skipping session history entry {}: {}", index, e);
            }
        }
    }
    history
}

/// Read and decode one record, logging and discarding anything unusable
fn load_record<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let contents = match store.load(key) {
        Ok(Some(contents)) => contents,
        Ok(None) => {
            tracing::info!("No {} record found, using defaults", key);
            return None;
        }
        Err(e) => {
            tracing::warn!("Unable to read {}: {}. Using defaults.", key, e);
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}. Using defaults.", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fixtures::{crossed_arms, good_posture};
    use crate::store::MemoryStore;
    use crate::{analyze, Trend};

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn tracker() -> SessionTracker<MemoryStore> {
        crate::logging::init_test();
        SessionTracker::new(MemoryStore::new(), SessionSettings::default(), start())
    }

    fn correct() -> AnalysisResult {
        analyze(&good_posture())
    }

    fn incorrect() -> AnalysisResult {
        analyze(&crossed_arms())
    }

    /// Record `correct` then `incorrect` frames without crossing the interval
    fn fill(tracker: &mut SessionTracker<MemoryStore>, correct_n: u64, incorrect_n: u64) {
        let good = correct();
        let bad = incorrect();
        for _ in 0..correct_n {
            assert!(tracker.record(Some(&good), start()).is_none());
        }
        for _ in 0..incorrect_n {
            assert!(tracker.record(Some(&bad), start()).is_none());
        }
    }

    /// Store whose writes always fail
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Store("disk unavailable".into()))
        }

        fn save(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Store("disk unavailable".into()))
        }
    }

    #[test]
    fn test_no_detection_is_not_counted() {
        let mut tracker = tracker();
        assert!(tracker
            .record(None, start() + Duration::seconds(400))
            .is_none());
        assert!(tracker.counters().is_empty());
    }

    #[test]
    fn test_incomplete_frames_skipped_by_default() {
        let mut tracker = tracker();
        tracker.record(Some(&AnalysisResult::incomplete()), start());
        assert!(tracker.counters().is_empty());
    }

    #[test]
    fn test_incomplete_frames_counted_when_configured() {
        let settings = SessionSettings {
            count_incomplete_frames: true,
            ..SessionSettings::default()
        };
        let mut tracker = SessionTracker::new(MemoryStore::new(), settings, start());
        tracker.record(Some(&AnalysisResult::incomplete()), start());

        assert_eq!(tracker.counters().incorrect_frames(), 1);
        assert_eq!(tracker.counters().total_frames(), 1);
    }

    #[test]
    fn test_alternating_frames() {
        let mut tracker = tracker();
        let good = correct();
        let bad = incorrect();
        let n = 7u64;
        for i in 0..n {
            let result = if i % 2 == 0 { &good } else { &bad };
            tracker.record(Some(result), start());
        }

        let counters = *tracker.counters();
        assert_eq!(counters.total_frames(), n);
        assert_eq!(counters.correct_frames(), 4); // ceil(7 / 2)
        assert_eq!(counters.incorrect_frames(), 3);

        let report = tracker.flush(start() + Duration::seconds(1)).unwrap();
        let expected = counters.correct_frames() as f64 / counters.total_frames() as f64 * 100.0;
        assert!((report.summary.correct_percentage - expected).abs() < 1e-9);
    }

    #[test]
    fn test_flush_converts_frames_to_seconds() {
        let mut tracker = tracker();
        fill(&mut tracker, 540, 60);

        let report = tracker.flush(start() + Duration::seconds(20)).unwrap();
        assert_eq!(report.summary.correct_seconds, 18.0);
        assert_eq!(report.summary.incorrect_seconds, 2.0);
        assert_eq!(report.summary.total_seconds, 20.0);
        assert_eq!(report.summary.correct_percentage, 90.0);
        assert!(report.improvement.is_none());
    }

    #[test]
    fn test_flush_resets_counters_and_appends_history() {
        let mut tracker = tracker();
        fill(&mut tracker, 10, 5);
        let flushed_at = start() + Duration::seconds(30);

        tracker.flush(flushed_at).unwrap();
        assert_eq!(*tracker.counters(), FrameCounters::default());
        assert_eq!(tracker.history().len(), 1);
        assert_eq!(tracker.last_flush(), flushed_at);
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let mut tracker = tracker();
        assert!(tracker.flush(start() + Duration::seconds(600)).is_none());
        assert!(tracker.history().is_empty());
        assert_eq!(tracker.last_flush(), start());
        assert!(tracker.store().is_empty());
    }

    #[test]
    fn test_record_triggers_flush_at_interval() {
        let mut tracker = tracker();
        let good = correct();

        assert!(tracker
            .record(Some(&good), start() + Duration::seconds(299))
            .is_none());
        let report = tracker
            .record(Some(&good), start() + Duration::seconds(300))
            .expect("flush at exactly the interval");

        assert_eq!(report.summary.correct_percentage, 100.0);
        assert_eq!(report.progress.sessions_completed, 1);
        assert!(tracker.counters().is_empty());

        // New window starts from the flush time
        assert!(tracker
            .record(Some(&good), start() + Duration::seconds(400))
            .is_none());
    }

    #[test]
    fn test_improvement_between_sessions() {
        let mut tracker = tracker();

        fill(&mut tracker, 60, 40);
        tracker.flush(start() + Duration::seconds(300)).unwrap();

        fill(&mut tracker, 75, 25);
        let report = tracker.flush(start() + Duration::seconds(600)).unwrap();

        let improvement = report.improvement.unwrap();
        assert!((improvement.delta_points - 15.0).abs() < 1e-9);
        assert_eq!(improvement.trend(), Trend::Improved);
    }

    #[test]
    fn test_decrease_between_sessions() {
        let mut tracker = tracker();

        fill(&mut tracker, 9, 1);
        tracker.flush(start() + Duration::seconds(300)).unwrap();
        fill(&mut tracker, 1, 1);
        let report = tracker.flush(start() + Duration::seconds(600)).unwrap();

        assert_eq!(report.improvement.unwrap().trend(), Trend::Decreased);
    }

    #[test]
    fn test_progress_accumulates_minutes() {
        let mut tracker = tracker();

        fill(&mut tracker, 900, 900); // 60s at 30/s
        tracker.flush(start() + Duration::seconds(300)).unwrap();
        let before = *tracker.progress();

        fill(&mut tracker, 450, 0); // 15s
        let report = tracker.flush(start() + Duration::seconds(600)).unwrap();

        assert_eq!(report.progress.sessions_completed, 2);
        let expected = before.total_practice_minutes + report.summary.total_seconds / 60.0;
        assert!((report.progress.total_practice_minutes - expected).abs() < 1e-9);
        assert!((report.progress.total_practice_minutes - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_history_is_append_only() {
        let mut tracker = tracker();
        let mut snapshots = Vec::new();

        for i in 1..=3 {
            fill(&mut tracker, i * 10, 10);
            tracker.flush(start() + Duration::seconds(300 * i as i64)).unwrap();
            snapshots.push(tracker.history().to_vec());
        }

        for (i, snapshot) in snapshots.iter().enumerate() {
            assert_eq!(snapshot.len(), i + 1);
            assert_eq!(&tracker.history()[..=i], &snapshot[..]);
        }
    }

    #[test]
    fn test_state_persists_across_trackers() {
        let mut tracker = tracker();
        fill(&mut tracker, 30, 30);
        tracker.flush(start() + Duration::seconds(300)).unwrap();

        let store = tracker.store().clone();
        let restored = SessionTracker::new(store, SessionSettings::default(), start());

        assert_eq!(restored.history(), tracker.history());
        assert_eq!(restored.progress(), tracker.progress());
        assert!(restored.counters().is_empty());
    }

    #[test]
    fn test_load_state_is_idempotent() {
        let mut tracker = tracker();
        fill(&mut tracker, 3, 1);
        tracker.flush(start() + Duration::seconds(5)).unwrap();

        let history = tracker.history().to_vec();
        tracker.load_state();
        tracker.load_state();
        assert_eq!(tracker.history(), &history[..]);
        assert_eq!(tracker.progress().sessions_completed, 1);
    }

    #[test]
    fn test_corrupt_records_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.save(PROGRESS_KEY, "{ not json").unwrap();
        store.save(HISTORY_KEY, r#"[{"timestamp": 5}]"#).unwrap();

        let tracker = SessionTracker::new(store, SessionSettings::default(), start());
        assert_eq!(*tracker.progress(), ProgressStats::default());
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_negative_minutes_are_discarded() {
        let mut store = MemoryStore::new();
        store
            .save(
                PROGRESS_KEY,
                r#"{"sessions_completed":2,"total_practice_minutes":-3.0}"#,
            )
            .unwrap();

        let tracker = SessionTracker::new(store, SessionSettings::default(), start());
        assert_eq!(*tracker.progress(), ProgressStats::default());
    }

    #[test]
    fn test_broken_store_never_interrupts_recording() {
        let mut tracker = SessionTracker::new(BrokenStore, SessionSettings::default(), start());
        let good = correct();
        tracker.record(Some(&good), start());

        let report = tracker
            .record(Some(&good), start() + Duration::seconds(300))
            .unwrap();
        assert_eq!(report.progress.sessions_completed, 1);
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn test_bad_history_entry_keeps_the_rest() {
        let mut store = MemoryStore::new();
        store
            .save(
                HISTORY_KEY,
                r#"[
                {"timestamp":"2026-02-27T10:00:00Z","correct_percentage":60.0,
                 "correct_seconds":180.0,"incorrect_seconds":120.0,"total_seconds":300.0},
                {"timestamp":"2026-02-28T10:00:00Z","correct_percentage":null,
                 "correct_seconds":0.0,"incorrect_seconds":0.0,"total_seconds":0.0},
                {"timestamp":"2026-02-28T11:00:00Z","correct_percentage":70.0,
                 "correct_seconds":210.0,"incorrect_seconds":90.0,"total_seconds":300.0}
            ]"#,
            )
            .unwrap();

        let mut tracker = SessionTracker::new(store, SessionSettings::default(), start());
        assert_eq!(tracker.history().len(), 2);
        assert_eq!(tracker.history()[1].correct_percentage, 70.0);

        fill(&mut tracker, 8, 2);
        let report = tracker.flush(start() + Duration::seconds(10)).unwrap();
        assert!((report.improvement.unwrap().delta_points - 10.0).abs() < 1e-9);

        let saved = tracker.store().load(HISTORY_KEY).unwrap().unwrap();
        let persisted: Vec<SessionSummary> = serde_json::from_str(&saved).unwrap();
        assert_eq!(persisted.len(), 3);
        assert_eq!(persisted, tracker.history());
    }

    #[test]
    fn test_invalid_settings_fall_back_to_defaults() {
        for settings in [
            SessionSettings {
                sample_rate_hz: 0.0,
                ..SessionSettings::default()
            },
            SessionSettings {
                sample_rate_hz: f64::NAN,
                ..SessionSettings::default()
            },
            SessionSettings {
                flush_interval: Duration::zero(),
                ..SessionSettings::default()
            },
        ] {
            assert!(settings.validate().is_err());
            let tracker = SessionTracker::new(MemoryStore::new(), settings, start());
            assert_eq!(*tracker.settings(), SessionSettings::default());
        }
    }

    #[test]
    fn test_zero_sample_rate_keeps_state_reloadable() {
        let settings = SessionSettings {
            sample_rate_hz: 0.0,
            ..SessionSettings::default()
        };
        let mut tracker = SessionTracker::new(MemoryStore::new(), settings, start());
        for i in 1..=2 {
            fill(&mut tracker, 30, 0);
            tracker.flush(start() + Duration::seconds(300 * i)).unwrap();
        }
        assert!(tracker.progress().is_valid());

        let restored = SessionTracker::new(
            tracker.store().clone(),
            SessionSettings::default(),
            start(),
        );
        assert_eq!(restored.progress().sessions_completed, 2);
        assert!((restored.progress().total_practice_minutes - 2.0 / 60.0).abs() < 1e-9);
        assert_eq!(restored.history().len(), 2);
    }

    #[test]
    fn test_window_stats() {
        let mut tracker = tracker();
        assert!(tracker.window_stats().is_none());

        fill(&mut tracker, 45, 15);
        let stats = tracker.window_stats().unwrap();
        assert_eq!(stats.correct_percentage, 75.0);
        assert_eq!(stats.incorrect_percentage, 25.0);
        assert_eq!(stats.correct_seconds, 1.5);
        assert_eq!(stats.incorrect_seconds, 0.5);
        assert_eq!(stats.total_seconds, 2.0);
    }
}
