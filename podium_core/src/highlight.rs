//! Visual cues for a renderer overlaying feedback on the video.
//!
//! A plan lists which landmarks to circle and whether to draw the spine
//! line, so the renderer never re-derives thresholds from raw points.

use crate::feedback::FeedbackGroup;
use crate::landmark::{Landmark, LandmarkFrame, LandmarkId};
use crate::{AnalysisResult, Check};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    Yellow,
    Orange,
    Cyan,
    Magenta,
}

/// A single overlay primitive in normalized coordinates
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Highlight {
    /// Circle each listed landmark
    Points {
        color: HighlightColor,
        points: Vec<(LandmarkId, f64, f64)>,
    },
    /// Line from the shoulder midpoint to the hip midpoint
    Spine {
        color: HighlightColor,
        from: (f64, f64),
        to: (f64, f64),
    },
}

impl Highlight {
    pub fn color(&self) -> HighlightColor {
        match self {
            Highlight::Points { color, .. } | Highlight::Spine { color, .. } => *color,
        }
    }

    /// Scale to pixel space for a frame of the given size
    pub fn to_pixels(&self, width: u32, height: u32) -> Vec<(i32, i32)> {
        let scale = |(x, y): (f64, f64)| Landmark::new(x, y).to_pixel(width, height);
        match self {
            Highlight::Points { points, .. } => {
                points.iter().map(|&(_, x, y)| scale((x, y))).collect()
            }
            Highlight::Spine { from, to, .. } => vec![scale(*from), scale(*to)],
        }
    }
}

const SHOULDERS: &[LandmarkId] = &[LandmarkId::LeftShoulder, LandmarkId::RightShoulder];
const ARMS: &[LandmarkId] = &[
    LandmarkId::LeftElbow,
    LandmarkId::RightElbow,
    LandmarkId::LeftWrist,
    LandmarkId::RightWrist,
];
const HEAD: &[LandmarkId] = &[LandmarkId::Nose];
const FEET: &[LandmarkId] = &[LandmarkId::LeftAnkle, LandmarkId::RightAnkle];

/// Overlay plan for a frame and its analysis
///
/// Empty when the posture is correct or the frame was incomplete.
pub fn plan(frame: &LandmarkFrame, result: &AnalysisResult) -> Vec<Highlight> {
    let checks = match result.checks {
        Some(checks) if !result.is_correct => checks,
        _ => return Vec::new(),
    };

    let mut highlights = Vec::new();
    let mut circle = |ids: &[LandmarkId], color: HighlightColor| {
        let points: Vec<_> = ids
            .iter()
            .filter_map(|&id| frame.get(id).map(|lm| (id, lm.x, lm.y)))
            .collect();
        if !points.is_empty() {
            highlights.push(Highlight::Points { color, points });
        }
    };

    if FeedbackGroup::Shoulders.is_failing(&checks) {
        circle(SHOULDERS, HighlightColor::Yellow);
    }

    if !checks.get(Check::ArmsNotCrossed) || !checks.get(Check::ArmsInGesturingPosition) {
        circle(ARMS, HighlightColor::Orange);
    }

    if FeedbackGroup::Head.is_failing(&checks) {
        circle(HEAD, HighlightColor::Cyan);
    }

    if FeedbackGroup::Balance.is_failing(&checks) {
        circle(FEET, HighlightColor::Magenta);
    }

    if !checks.back_straight {
        if let Some(spine) = spine(frame) {
            highlights.push(spine);
        }
    }

    highlights
}

fn spine(frame: &LandmarkFrame) -> Option<Highlight> {
    let from = Landmark::midpoint(
        frame.get(LandmarkId::LeftShoulder)?,
        frame.get(LandmarkId::RightShoulder)?,
    );
    let to = Landmark::midpoint(
        frame.get(LandmarkId::LeftHip)?,
        frame.get(LandmarkId::RightHip)?,
    );
    Some(Highlight::Spine {
        color: HighlightColor::Yellow,
        from,
        to,
    })
}
