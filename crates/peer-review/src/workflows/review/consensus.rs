use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::domain::{ManuscriptId, Recommendation, ReviewAssignment, ReviewStatus};
use super::policy::ReviewPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    ReadyToPublish,
    ReviewComplete,
    NeedMoreReviews(usize),
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextAction::ReadyToPublish => f.write_str("ready_to_publish"),
            NextAction::ReviewComplete => f.write_str("review_complete"),
            NextAction::NeedMoreReviews(count) => write!(f, "need_{count}_more_reviews"),
        }
    }
}

impl Serialize for NextAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishRecommendation {
    Approve,
    Reject,
}

/// Progress of a manuscript toward a publication decision, always computed fresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusStatus {
    pub manuscript_id: ManuscriptId,
    pub total_reviewers: usize,
    pub completed_count: usize,
    pub accept_count: usize,
    pub reviews_in_progress: usize,
    pub reviews_pending: usize,
    pub overdue_count: usize,
    pub required_reviews: usize,
    pub required_accepts: usize,
    pub can_publish: bool,
    pub publish_recommendation: Option<PublishRecommendation>,
    pub next_action: NextAction,
}

impl ConsensusStatus {
    pub fn quorum_reached(&self) -> bool {
        self.completed_count >= self.required_reviews
    }
}

/// Aggregates completed reviews into the publish gate.
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    required_reviews: usize,
    required_accepts: usize,
}

impl ConsensusEngine {
    pub fn new(policy: &ReviewPolicy) -> Self {
        Self {
            required_reviews: policy.required_reviews,
            required_accepts: policy.required_accepts,
        }
    }

    pub fn tally(
        &self,
        manuscript_id: ManuscriptId,
        reviews: &[ReviewAssignment],
        now: DateTime<Utc>,
    ) -> ConsensusStatus {
        let reviews: Vec<&ReviewAssignment> = reviews
            .iter()
            .filter(|record| record.manuscript_id == manuscript_id)
            .collect();

        // One completed review counts per reviewer.
        let mut seen = HashSet::new();
        let completed: Vec<&ReviewAssignment> = reviews
            .iter()
            .copied()
            .filter(|record| record.status == ReviewStatus::Completed)
            .filter(|record| match &record.reviewer {
                Some(reviewer) => seen.insert(reviewer.clone()),
                None => true,
            })
            .collect();

        let completed_count = completed.len();
        let accept_count = completed
            .iter()
            .filter(|record| record.recommendation == Some(Recommendation::Accept))
            .count();

        let quorum = completed_count >= self.required_reviews;
        let can_publish = quorum && accept_count >= self.required_accepts;

        let next_action = if can_publish {
            NextAction::ReadyToPublish
        } else if quorum {
            NextAction::ReviewComplete
        } else {
            NextAction::NeedMoreReviews(self.required_reviews - completed_count)
        };

        let publish_recommendation = quorum.then_some(if can_publish {
            PublishRecommendation::Approve
        } else {
            PublishRecommendation::Reject
        });

        ConsensusStatus {
            manuscript_id,
            total_reviewers: reviews
                .iter()
                .filter_map(|record| record.reviewer.as_ref())
                .collect::<HashSet<_>>()
                .len(),
            completed_count,
            accept_count,
            reviews_in_progress: reviews.iter().filter(|r| r.status.is_active()).count(),
            reviews_pending: reviews
                .iter()
                .filter(|r| r.status == ReviewStatus::Pending)
                .count(),
            overdue_count: reviews.iter().filter(|r| r.is_overdue(now)).count(),
            required_reviews: self.required_reviews,
            required_accepts: self.required_accepts,
            can_publish,
            publish_recommendation,
            next_action,
        }
    }
}
