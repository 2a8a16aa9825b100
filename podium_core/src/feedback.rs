//! Remediation messages for failing posture checks.
//!
//! Related checks collapse into one message group. Every check belongs to
//! exactly one group, so any failing combination yields at least one message.

use crate::{Check, PostureChecks};
use serde::Serialize;

/// Separator between messages in the combined feedback line
pub const SEPARATOR: &str = " & ";

/// A family of related checks sharing one remediation message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackGroup {
    Shoulders,
    Balance,
    Spine,
    Head,
    CrossedArms,
    Gesturing,
}

impl FeedbackGroup {
    /// Groups in the order their messages appear
    pub const ALL: [FeedbackGroup; 6] = [
        FeedbackGroup::Shoulders,
        FeedbackGroup::Balance,
        FeedbackGroup::Spine,
        FeedbackGroup::Head,
        FeedbackGroup::CrossedArms,
        FeedbackGroup::Gesturing,
    ];

    pub fn of(check: Check) -> Self {
        match check {
            Check::ShouldersAligned | Check::ShouldersRelaxed => FeedbackGroup::Shoulders,
            Check::HipsAligned | Check::WeightBalanced => FeedbackGroup::Balance,
            Check::BackStraight => FeedbackGroup::Spine,
            Check::HeadCentered | Check::HeadUpright => FeedbackGroup::Head,
            Check::ArmsNotCrossed => FeedbackGroup::CrossedArms,
            Check::ArmsInGesturingPosition => FeedbackGroup::Gesturing,
        }
    }

    pub fn checks(self) -> &'static [Check] {
        match self {
            FeedbackGroup::Shoulders => &[Check::ShouldersAligned, Check::ShouldersRelaxed],
            FeedbackGroup::Balance => &[Check::HipsAligned, Check::WeightBalanced],
            FeedbackGroup::Spine => &[Check::BackStraight],
            FeedbackGroup::Head => &[Check::HeadCentered, Check::HeadUpright],
            FeedbackGroup::CrossedArms => &[Check::ArmsNotCrossed],
            FeedbackGroup::Gesturing => &[Check::ArmsInGesturingPosition],
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FeedbackGroup::Shoulders => "Relax and level your shoulders",
            FeedbackGroup::Balance => "Balance your weight evenly",
            FeedbackGroup::Spine => "Stand up straight",
            FeedbackGroup::Head => "Center your head and look forward",
            FeedbackGroup::CrossedArms => "Uncross your arms",
            FeedbackGroup::Gesturing => "Position arms for natural gesturing",
        }
    }

    /// A group fails when any of its checks fails
    pub fn is_failing(self, checks: &PostureChecks) -> bool {
        self.checks().iter().any(|&c| !checks.get(c))
    }
}

/// Groups with at least one failing check, in display order
pub fn failing_groups(checks: &PostureChecks) -> Vec<FeedbackGroup> {
    FeedbackGroup::ALL
        .iter()
        .copied()
        .filter(|g| g.is_failing(checks))
        .collect()
}

/// Combined remediation line, `None` when everything passes
pub fn compose(checks: &PostureChecks) -> Option<String> {
    let messages: Vec<&str> = failing_groups(checks)
        .into_iter()
        .map(FeedbackGroup::message)
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join(SEPARATOR))
    }
}
