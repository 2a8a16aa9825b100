#![forbid(unsafe_code)]

//! Core posture analysis and practice tracking for Podium.
//!
//! This crate provides:
//! - Landmark types and the MediaPipe index mapping
//! - The posture analyzer (pure, per frame)
//! - Feedback grouping and highlight plans for renderers
//! - Session tracking with persisted history and progress
//! - Key/value persistence and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod landmark;
pub mod analyzer;
pub mod feedback;
pub mod highlight;
pub mod store;
pub mod tracker;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use landmark::{joint_angle, Landmark, LandmarkFrame, LandmarkId};
pub use analyzer::{analyze, PostureAnalyzer, Thresholds};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use tracker::{SessionSettings, SessionTracker};
