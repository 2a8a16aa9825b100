//! Core domain types for Podium.
//!
//! This module defines the values that flow between the analyzer, the
//! tracker and the host application:
//! - Per-frame analysis results and their named sub-checks
//! - Frame counters for the current window
//! - Session summaries and cumulative progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Analysis Types
// ============================================================================

/// A single posture heuristic
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    ShouldersAligned,
    HipsAligned,
    BackStraight,
    HeadCentered,
    HeadUpright,
    ArmsNotCrossed,
    ArmsInGesturingPosition,
    WeightBalanced,
    ShouldersRelaxed,
}

impl Check {
    pub const ALL: [Check; 9] = [
        Check::ShouldersAligned,
        Check::HipsAligned,
        Check::BackStraight,
        Check::HeadCentered,
        Check::HeadUpright,
        Check::ArmsNotCrossed,
        Check::ArmsInGesturingPosition,
        Check::WeightBalanced,
        Check::ShouldersRelaxed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Check::ShouldersAligned => "shoulders_aligned",
            Check::HipsAligned => "hips_aligned",
            Check::BackStraight => "back_straight",
            Check::HeadCentered => "head_centered",
            Check::HeadUpright => "head_upright",
            Check::ArmsNotCrossed => "arms_not_crossed",
            Check::ArmsInGesturingPosition => "arms_in_gesturing_position",
            Check::WeightBalanced => "weight_balanced",
            Check::ShouldersRelaxed => "shoulders_relaxed",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of every posture heuristic for one frame
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostureChecks {
    pub shoulders_aligned: bool,
    pub hips_aligned: bool,
    pub back_straight: bool,
    pub head_centered: bool,
    pub head_upright: bool,
    pub arms_not_crossed: bool,
    pub arms_in_gesturing_position: bool,
    pub weight_balanced: bool,
    pub shoulders_relaxed: bool,
}

impl PostureChecks {
    /// All checks passing
    pub fn passing() -> Self {
        Self {
            shoulders_aligned: true,
            hips_aligned: true,
            back_straight: true,
            head_centered: true,
            head_upright: true,
            arms_not_crossed: true,
            arms_in_gesturing_position: true,
            weight_balanced: true,
            shoulders_relaxed: true,
        }
    }

    pub fn get(&self, check: Check) -> bool {
        match check {
            Check::ShouldersAligned => self.shoulders_aligned,
            Check::HipsAligned => self.hips_aligned,
            Check::BackStraight => self.back_straight,
            Check::HeadCentered => self.head_centered,
            Check::HeadUpright => self.head_upright,
            Check::ArmsNotCrossed => self.arms_not_crossed,
            Check::ArmsInGesturingPosition => self.arms_in_gesturing_position,
            Check::WeightBalanced => self.weight_balanced,
            Check::ShouldersRelaxed => self.shoulders_relaxed,
        }
    }

    pub fn set(&mut self, check: Check, value: bool) {
        let slot = match check {
            Check::ShouldersAligned => &mut self.shoulders_aligned,
            Check::HipsAligned => &mut self.hips_aligned,
            Check::BackStraight => &mut self.back_straight,
            Check::HeadCentered => &mut self.head_centered,
            Check::HeadUpright => &mut self.head_upright,
            Check::ArmsNotCrossed => &mut self.arms_not_crossed,
            Check::ArmsInGesturingPosition => &mut self.arms_in_gesturing_position,
            Check::WeightBalanced => &mut self.weight_balanced,
            Check::ShouldersRelaxed => &mut self.shoulders_relaxed,
        };
        *slot = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Check, bool)> + '_ {
        Check::ALL.iter().map(move |&c| (c, self.get(c)))
    }

    pub fn failing(&self) -> impl Iterator<Item = Check> + '_ {
        self.iter().filter(|(_, ok)| !ok).map(|(c, _)| c)
    }

    pub fn all_pass(&self) -> bool {
        Check::ALL.iter().all(|&c| self.get(c))
    }
}

/// Judgment for a single frame
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub is_correct: bool,
    pub feedback_message: String,
    /// `None` when the frame lacked required landmarks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<PostureChecks>,
}

impl AnalysisResult {
    /// Message shown when the body is not fully in frame
    pub const INCOMPLETE_MESSAGE: &'static str = "Move fully into camera view";

    /// Message shown when every check passes
    pub const AFFIRMATION: &'static str = "Great presentation posture!";

    /// Result for a frame that is missing required landmarks
    pub fn incomplete() -> Self {
        Self {
            is_correct: false,
            feedback_message: Self::INCOMPLETE_MESSAGE.to_string(),
            checks: None,
        }
    }

    /// Whether the heuristics actually ran on this frame
    pub fn is_complete(&self) -> bool {
        self.checks.is_some()
    }

    /// Sub-checks keyed by check; empty for incomplete frames
    pub fn checks_map(&self) -> BTreeMap<Check, bool> {
        self.checks
            .map(|checks| checks.iter().collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Frame tallies for the current window
///
/// `correct_frames + incorrect_frames == total_frames` always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrameCounters {
    correct_frames: u64,
    incorrect_frames: u64,
    total_frames: u64,
}

impl FrameCounters {
    pub fn correct_frames(&self) -> u64 {
        self.correct_frames
    }

    pub fn incorrect_frames(&self) -> u64 {
        self.incorrect_frames
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.total_frames == 0
    }

    pub fn count(&mut self, correct: bool) {
        if correct {
            self.correct_frames += 1;
        } else {
            self.incorrect_frames += 1;
        }
        self.total_frames += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Share of correct frames in percent, `None` for an empty window
    pub fn correct_percentage(&self) -> Option<f64> {
        if self.total_frames == 0 {
            return None;
        }
        Some(self.correct_frames as f64 * 100.0 / self.total_frames as f64)
    }
}

/// Live statistics for the window in progress
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WindowStats {
    pub correct_percentage: f64,
    pub incorrect_percentage: f64,
    pub correct_seconds: f64,
    pub incorrect_seconds: f64,
    pub total_seconds: f64,
}

/// A completed practice window
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub timestamp: DateTime<Utc>,
    pub correct_percentage: f64,
    pub correct_seconds: f64,
    pub incorrect_seconds: f64,
    pub total_seconds: f64,
}

impl SessionSummary {
    /// Summarize counters, converting frames to seconds at `sample_rate_hz`
    ///
    /// Returns `None` when no frames were counted.
    pub fn from_counters(
        counters: &FrameCounters,
        sample_rate_hz: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let correct_percentage = counters.correct_percentage()?;
        let correct_seconds = counters.correct_frames() as f64 / sample_rate_hz;
        let incorrect_seconds = counters.incorrect_frames() as f64 / sample_rate_hz;
        Some(Self {
            timestamp,
            correct_percentage,
            correct_seconds,
            incorrect_seconds,
            total_seconds: correct_seconds + incorrect_seconds,
        })
    }
}

/// Cumulative practice totals across all sessions
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProgressStats {
    #[serde(default)]
    pub sessions_completed: u32,
    #[serde(default)]
    pub total_practice_minutes: f64,
}

impl ProgressStats {
    /// Whether the totals could have been produced by [`ProgressStats::add`]
    pub fn is_valid(&self) -> bool {
        self.total_practice_minutes.is_finite() && self.total_practice_minutes >= 0.0
    }

    pub fn add(&mut self, summary: &SessionSummary) {
        self.sessions_completed = self.sessions_completed.saturating_add(1);
        self.total_practice_minutes += summary.total_seconds / 60.0;
    }
}

/// Whether the latest session did better than the one before
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improved,
    Decreased,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improved => f.write_str("improved"),
            Trend::Decreased => f.write_str("decreased"),
        }
    }
}

/// Change in correct posture share between two consecutive sessions
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Improvement {
    /// Percentage-point difference, current minus previous
    pub delta_points: f64,
}

impl Improvement {
    pub fn between(previous: &SessionSummary, current: &SessionSummary) -> Self {
        Self {
            delta_points: current.correct_percentage - previous.correct_percentage,
        }
    }

    /// A zero delta counts as improved
    pub fn trend(&self) -> Trend {
        if self.delta_points >= 0.0 {
            Trend::Improved
        } else {
            Trend::Decreased
        }
    }
}

impl fmt::Display for Improvement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Your correct posture has {} by {:.1}% since last session",
            self.trend(),
            self.delta_points.abs()
        )
    }
}

/// Everything a flush produced, for the presentation layer
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlushReport {
    pub summary: SessionSummary,
    /// `None` for the very first session
    pub improvement: Option<Improvement>,
    pub progress: ProgressStats,
}
