//! Posture analysis for a single frame.
//!
//! The analyzer is a pure function of the landmarks and its thresholds:
//! no I/O, no state carried between frames.

use crate::landmark::{Landmark, LandmarkFrame, LandmarkId};
use crate::{feedback, AnalysisResult, PostureChecks};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Analyzer with default thresholds, shared by [`analyze`]
static DEFAULT_ANALYZER: Lazy<PostureAnalyzer> = Lazy::new(PostureAnalyzer::default);

/// Distances are in normalized frame coordinates, so they hold at any
/// resolution.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    /// Max vertical offset between shoulders or hips, and max horizontal
    /// offset between the shoulder and hip midpoints
    pub alignment_tolerance: f64,
    /// Min horizontal distance between the wrists
    pub arm_separation: f64,
    /// Max vertical offset between the knees and between the ankles
    pub balance_tolerance: f64,
    pub min_visibility: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            alignment_tolerance: 0.08,
            arm_separation: 0.15,
            balance_tolerance: 0.05,
            min_visibility: 0.0,
        }
    }
}

/// The required landmarks, resolved once per frame
struct Body<'a> {
    nose: &'a Landmark,
    left_shoulder: &'a Landmark,
    right_shoulder: &'a Landmark,
    left_elbow: &'a Landmark,
    right_elbow: &'a Landmark,
    left_wrist: &'a Landmark,
    right_wrist: &'a Landmark,
    left_hip: &'a Landmark,
    right_hip: &'a Landmark,
    left_knee: &'a Landmark,
    right_knee: &'a Landmark,
    left_ankle: &'a Landmark,
    right_ankle: &'a Landmark,
}

impl<'a> Body<'a> {
    fn resolve(frame: &'a LandmarkFrame, min_visibility: f64) -> Option<Self> {
        let get = |id: LandmarkId| frame.get(id).filter(|lm| lm.is_visible(min_visibility));
        Some(Self {
            nose: get(LandmarkId::Nose)?,
            left_shoulder: get(LandmarkId::LeftShoulder)?,
            right_shoulder: get(LandmarkId::RightShoulder)?,
            left_elbow: get(LandmarkId::LeftElbow)?,
            right_elbow: get(LandmarkId::RightElbow)?,
            left_wrist: get(LandmarkId::LeftWrist)?,
            right_wrist: get(LandmarkId::RightWrist)?,
            left_hip: get(LandmarkId::LeftHip)?,
            right_hip: get(LandmarkId::RightHip)?,
            left_knee: get(LandmarkId::LeftKnee)?,
            right_knee: get(LandmarkId::RightKnee)?,
            left_ankle: get(LandmarkId::LeftAnkle)?,
            right_ankle: get(LandmarkId::RightAnkle)?,
        })
    }
}

/// Presentation posture heuristics
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PostureAnalyzer {
    thresholds: Thresholds,
}

impl PostureAnalyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Judge one frame
    ///
    /// Never fails: a frame lacking any required landmark yields
    /// [`AnalysisResult::incomplete`].
    pub fn analyze(&self, frame: &LandmarkFrame) -> AnalysisResult {
        match self.evaluate(frame) {
            Some(checks) => {
                let is_correct = checks.all_pass();
                let feedback_message = feedback::compose(&checks)
                    .unwrap_or_else(|| AnalysisResult::AFFIRMATION.to_string());
                AnalysisResult {
                    is_correct,
                    feedback_message,
                    checks: Some(checks),
                }
            }
            None => AnalysisResult::incomplete(),
        }
    }

    /// Run the nine checks, `None` if the body is not fully visible
    pub fn evaluate(&self, frame: &LandmarkFrame) -> Option<PostureChecks> {
        let b = Body::resolve(frame, self.thresholds.min_visibility)?;
        let t = &self.thresholds;

        let shoulder_mid_x = (b.left_shoulder.x + b.right_shoulder.x) / 2.0;
        let hip_mid_x = (b.left_hip.x + b.right_hip.x) / 2.0;
        let shoulder_min_x = b.left_shoulder.x.min(b.right_shoulder.x);
        let shoulder_max_x = b.left_shoulder.x.max(b.right_shoulder.x);

        // y grows downward: smaller y is higher in the frame
        Some(PostureChecks {
            shoulders_aligned: (b.left_shoulder.y - b.right_shoulder.y).abs()
                < t.alignment_tolerance,
            hips_aligned: (b.left_hip.y - b.right_hip.y).abs() < t.alignment_tolerance,
            back_straight: (shoulder_mid_x - hip_mid_x).abs() < t.alignment_tolerance,
            head_centered: b.nose.x > shoulder_min_x && b.nose.x < shoulder_max_x,
            head_upright: b.nose.y < b.left_shoulder.y.min(b.right_shoulder.y),
            arms_not_crossed: (b.left_wrist.x - b.right_wrist.x).abs() > t.arm_separation,
            arms_in_gesturing_position: b.left_wrist.y > b.left_elbow.y
                && b.right_wrist.y > b.right_elbow.y
                && b.left_wrist.y < b.left_hip.y
                && b.right_wrist.y < b.right_hip.y,
            weight_balanced: (b.left_ankle.y - b.right_ankle.y).abs() < t.balance_tolerance
                && (b.left_knee.y - b.right_knee.y).abs() < t.balance_tolerance,
            shoulders_relaxed: b.left_shoulder.y < b.left_elbow.y
                && b.right_shoulder.y < b.right_elbow.y,
        })
    }
}

/// Judge one frame with the default thresholds
pub fn analyze(frame: &LandmarkFrame) -> AnalysisResult {
    DEFAULT_ANALYZER.analyze(frame)
}
