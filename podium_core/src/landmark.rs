//! Body-pose landmarks in normalized image coordinates.
//!
//! Coordinates are relative to the frame: x grows to the right, y grows
//! downward, both nominally within [0, 1].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anatomical points used by the posture heuristics
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkId {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl LandmarkId {
    /// Every landmark the analyzer needs, in MediaPipe index order
    pub const REQUIRED: [LandmarkId; 13] = [
        LandmarkId::Nose,
        LandmarkId::LeftShoulder,
        LandmarkId::RightShoulder,
        LandmarkId::LeftElbow,
        LandmarkId::RightElbow,
        LandmarkId::LeftWrist,
        LandmarkId::RightWrist,
        LandmarkId::LeftHip,
        LandmarkId::RightHip,
        LandmarkId::LeftKnee,
        LandmarkId::RightKnee,
        LandmarkId::LeftAnkle,
        LandmarkId::RightAnkle,
    ];

    /// Size of the MediaPipe BlazePose landmark array
    pub const MEDIAPIPE_COUNT: usize = 33;

    /// Position of this landmark in the 33-point MediaPipe pose topology
    pub fn mediapipe_index(self) -> usize {
        match self {
            LandmarkId::Nose => 0,
            LandmarkId::LeftShoulder => 11,
            LandmarkId::RightShoulder => 12,
            LandmarkId::LeftElbow => 13,
            LandmarkId::RightElbow => 14,
            LandmarkId::LeftWrist => 15,
            LandmarkId::RightWrist => 16,
            LandmarkId::LeftHip => 23,
            LandmarkId::RightHip => 24,
            LandmarkId::LeftKnee => 25,
            LandmarkId::RightKnee => 26,
            LandmarkId::LeftAnkle => 27,
            LandmarkId::RightAnkle => 28,
        }
    }

    pub fn from_mediapipe_index(index: usize) -> Option<Self> {
        Self::REQUIRED
            .iter()
            .copied()
            .find(|id| id.mediapipe_index() == index)
    }
}

/// A single detected point
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Detector confidence (0.0 to 1.0), when the model reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            visibility: None,
        }
    }

    pub fn with_visibility(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            visibility: Some(visibility),
        }
    }

    /// Whether this point is trustworthy at the given visibility floor
    ///
    /// Points without a visibility score are always accepted.
    pub fn is_visible(&self, min_visibility: f64) -> bool {
        self.visibility.map_or(true, |v| v >= min_visibility)
    }

    /// Convert to pixel coordinates
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let px = (self.x * f64::from(width)) as i32;
        let py = (self.y * f64::from(height)) as i32;
        (px, py)
    }

    /// Point halfway between two landmarks
    pub fn midpoint(a: &Landmark, b: &Landmark) -> (f64, f64) {
        ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }
}

/// The landmarks detected in one video frame
///
/// Any subset may be present; the analyzer decides whether it is enough.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: BTreeMap<LandmarkId, Landmark>,
}

impl LandmarkFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from a MediaPipe-ordered landmark array
    ///
    /// Indices outside the required set are ignored, and a short array
    /// simply yields a partial frame.
    pub fn from_indexed(landmarks: &[Landmark]) -> Self {
        let points = LandmarkId::REQUIRED
            .iter()
            .filter_map(|&id| landmarks.get(id.mediapipe_index()).map(|lm| (id, *lm)))
            .collect();
        Self { points }
    }

    /// Like [`from_indexed`](Self::from_indexed), for detectors that report
    /// undetected points as `None`
    pub fn from_optional_indexed(landmarks: &[Option<Landmark>]) -> Self {
        let points = LandmarkId::REQUIRED
            .iter()
            .filter_map(|&id| {
                landmarks
                    .get(id.mediapipe_index())
                    .copied()
                    .flatten()
                    .map(|lm| (id, lm))
            })
            .collect();
        Self { points }
    }

    pub fn insert(&mut self, id: LandmarkId, landmark: Landmark) -> Option<Landmark> {
        self.points.insert(id, landmark)
    }

    pub fn with(mut self, id: LandmarkId, landmark: Landmark) -> Self {
        self.points.insert(id, landmark);
        self
    }

    pub fn remove(&mut self, id: LandmarkId) -> Option<Landmark> {
        self.points.remove(&id)
    }

    pub fn get(&self, id: LandmarkId) -> Option<&Landmark> {
        self.points.get(&id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkId, &Landmark)> {
        self.points.iter().map(|(id, lm)| (*id, lm))
    }

    /// Required landmarks that are absent or below the visibility floor
    pub fn missing(&self, min_visibility: f64) -> Vec<LandmarkId> {
        LandmarkId::REQUIRED
            .iter()
            .copied()
            .filter(|id| !self.get(*id).is_some_and(|lm| lm.is_visible(min_visibility)))
            .collect()
    }
}

impl FromIterator<(LandmarkId, Landmark)> for LandmarkFrame {
    fn from_iter<I: IntoIterator<Item = (LandmarkId, Landmark)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Angle at `vertex` between the rays towards `a` and `c`, in degrees
///
/// Measured in image space and normalized to [0, 360).
pub fn joint_angle(a: &Landmark, vertex: &Landmark, c: &Landmark) -> f64 {
    let angle = ((c.y - vertex.y).atan2(c.x - vertex.x) - (a.y - vertex.y).atan2(a.x - vertex.x))
        .to_degrees();
    if angle < 0.0 {
        angle + 360.0
    } else {
        angle
    }
}
