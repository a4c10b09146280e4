//! Merge readiness classification
//!
//! Combines GitHub's own mergeability fields with the approval count and the
//! aggregated CI verdict into the single state shown next to each PR.

use gh_client::{CiState, MergeableState};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// User-facing merge readiness of a pull request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MergeReadiness {
    /// Approved, green CI, no conflicts
    Mergeable,
    /// Merge conflicts with the base branch
    Conflicts,
    /// Blocked by branch protection
    Blocked,
    /// Head branch is behind the base branch
    Behind,
    /// GitHub refuses the merge for another reason
    NotMergeable,
    /// Mergeable but nobody approved yet
    NeedsApprovals,
    CiFailing,
    CiPending,
    CiUnknown,
    /// GitHub is still computing mergeability
    Unknown,
}

impl MergeReadiness {
    /// Get the display icon for this state
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Mergeable => "✅",
            Self::Conflicts => "💥",
            Self::Blocked => "🚫",
            Self::Behind => "🔂",
            Self::NotMergeable => "⛔",
            Self::NeedsApprovals => "👀",
            Self::CiFailing => "🚨",
            Self::CiPending => "⏳",
            Self::CiUnknown => "❔",
            Self::Unknown => "🚧",
        }
    }

    /// Get the display label for this state
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mergeable => "Ready to merge",
            Self::Conflicts => "Merge conflicts",
            Self::Blocked => "Blocked",
            Self::Behind => "Behind base branch",
            Self::NotMergeable => "Not mergeable",
            Self::NeedsApprovals => "Needs approvals",
            Self::CiFailing => "CI failing",
            Self::CiPending => "CI running",
            Self::CiUnknown => "CI status unknown",
            Self::Unknown => "Checking mergeability...",
        }
    }
}

/// Classify a pull request
///
/// Decision table, first match wins:
///
/// | mergeable | approvals | ci      | mergeable_state | result          |
/// |-----------|-----------|---------|-----------------|-----------------|
/// | true      | > 0       | success |                 | mergeable       |
/// | false     |           |         | dirty           | conflicts       |
/// | false     |           |         | blocked         | blocked         |
/// | false     |           |         | behind          | behind          |
/// | false     |           |         | other           | not-mergeable   |
/// | true      | 0         |         |                 | needs-approvals |
/// | true      | > 0       | failure |                 | ci-failing      |
/// | true      | > 0       | pending |                 | ci-pending      |
/// | true      | > 0       | unknown |                 | ci-unknown      |
/// | null      |           |         |                 | unknown         |
pub fn classify(
    mergeable: Option<bool>,
    mergeable_state: Option<MergeableState>,
    approvals: u32,
    ci: CiState,
) -> MergeReadiness {
    match mergeable {
        Some(true) if approvals == 0 => MergeReadiness::NeedsApprovals,
        Some(true) => match ci {
            CiState::Success => MergeReadiness::Mergeable,
            CiState::Failure => MergeReadiness::CiFailing,
            CiState::Pending => MergeReadiness::CiPending,
            CiState::Unknown => MergeReadiness::CiUnknown,
        },
        Some(false) => match mergeable_state {
            Some(MergeableState::Dirty) => MergeReadiness::Conflicts,
            Some(MergeableState::Blocked) => MergeReadiness::Blocked,
            Some(MergeableState::Behind) => MergeReadiness::Behind,
            _ => MergeReadiness::NotMergeable,
        },
        None => MergeReadiness::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CI: [CiState; 4] = [
        CiState::Success,
        CiState::Failure,
        CiState::Pending,
        CiState::Unknown,
    ];

    #[test]
    fn test_mergeable_when_approved_and_green() {
        assert_eq!(
            classify(Some(true), Some(MergeableState::Clean), 2, CiState::Success),
            MergeReadiness::Mergeable
        );
    }

    #[test]
    fn test_not_mergeable_follows_mergeable_state() {
        let cases = [
            (Some(MergeableState::Dirty), MergeReadiness::Conflicts),
            (Some(MergeableState::Blocked), MergeReadiness::Blocked),
            (Some(MergeableState::Behind), MergeReadiness::Behind),
            (Some(MergeableState::Unstable), MergeReadiness::NotMergeable),
            (None, MergeReadiness::NotMergeable),
        ];
        for (state, expected) in cases {
            for ci in ALL_CI {
                assert_eq!(classify(Some(false), state, 3, ci), expected);
            }
        }
    }

    #[test]
    fn test_needs_approvals_regardless_of_ci() {
        for ci in ALL_CI {
            assert_eq!(
                classify(Some(true), Some(MergeableState::Clean), 0, ci),
                MergeReadiness::NeedsApprovals
            );
        }
    }

    #[test]
    fn test_ci_rows() {
        assert_eq!(
            classify(Some(true), None, 1, CiState::Failure),
            MergeReadiness::CiFailing
        );
        assert_eq!(
            classify(Some(true), None, 1, CiState::Pending),
            MergeReadiness::CiPending
        );
        assert_eq!(
            classify(Some(true), None, 1, CiState::Unknown),
            MergeReadiness::CiUnknown
        );
    }

    #[test]
    fn test_null_mergeable_is_unknown() {
        for ci in ALL_CI {
            assert_eq!(
                classify(None, Some(MergeableState::Dirty), 5, ci),
                MergeReadiness::Unknown
            );
        }
    }

    #[test]
    fn test_classify_is_pure() {
        let first = classify(Some(true), Some(MergeableState::Clean), 1, CiState::Pending);
        for _ in 0..5 {
            assert_eq!(
                classify(Some(true), Some(MergeableState::Clean), 1, CiState::Pending),
                first
            );
        }
    }

    #[test]
    fn test_kebab_case_names() {
        assert_eq!(MergeReadiness::NotMergeable.to_string(), "not-mergeable");
        assert_eq!(MergeReadiness::NeedsApprovals.to_string(), "needs-approvals");
        assert_eq!(
            serde_json::to_string(&MergeReadiness::CiFailing).unwrap(),
            "\"ci-failing\""
        );
        assert_eq!(
            "ci-pending".parse::<MergeReadiness>().unwrap(),
            MergeReadiness::CiPending
        );
    }
}
