//! Review summary
//!
//! Only the most recent review of each reviewer counts: someone who approved
//! and later requested changes is no longer an approval.

use gh_client::{Review, ReviewState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Approval count over distinct reviewers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// Reviewers whose latest review is an approval
    pub approvals: u32,
    /// Distinct reviewers who ever reviewed
    pub total: u32,
}

impl ReviewSummary {
    pub fn label(&self) -> String {
        format!("{}/{} approved", self.approvals, self.total)
    }
}

/// Summarise reviews, keeping the latest one per reviewer login
///
/// Reviews without a reviewer (deleted accounts) are ignored. Among reviews of
/// the same person the one with the latest `submitted_at` wins; a review with
/// no timestamp never replaces a timestamped one, and ties go to the review
/// listed later, matching the API's chronological ordering.
pub fn summarize_reviews(reviews: &[Review]) -> ReviewSummary {
    let mut latest: HashMap<&str, &Review> = HashMap::new();

    for review in reviews {
        let Some(login) = review.reviewer() else {
            continue;
        };
        match latest.get(login) {
            Some(existing) if existing.submitted_at > review.submitted_at => {}
            _ => {
                latest.insert(login, review);
            }
        }
    }

    let approvals = latest
        .values()
        .filter(|r| r.state == ReviewState::Approved)
        .count();

    ReviewSummary {
        approvals: approvals as u32,
        total: latest.len() as u32,
    }
}
