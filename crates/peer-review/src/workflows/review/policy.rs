use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ACTIVE_REVIEWS: usize = 3;
pub const DEFAULT_REVIEW_WINDOW_DAYS: u32 = 30;
/// Upper bound for a review window or a single deadline extension.
pub const MAX_REVIEW_DAYS: u32 = 3650;
pub const DEFAULT_MIN_TOPIC_PAPERS: usize = 3;
pub const DEFAULT_REQUIRED_REVIEWS: usize = 3;
pub const DEFAULT_REQUIRED_ACCEPTS: usize = 2;
pub const DEFAULT_EVALUATION_WORKERS: usize = 8;
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(20);

/// How candidates are scored during automatic assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    Deterministic,
    Oracle,
}

impl AssignmentStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentStrategy::Deterministic => "deterministic",
            AssignmentStrategy::Oracle => "oracle",
        }
    }
}

impl fmt::Display for AssignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown assignment strategy '{0}' (expected deterministic or oracle)")]
pub struct UnknownStrategy(pub String);

impl FromStr for AssignmentStrategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deterministic" | "rules" => Ok(Self::Deterministic),
            "oracle" | "ai" => Ok(Self::Oracle),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Every numeric rule the review workflow enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPolicy {
    /// Workload cap on simultaneous Assigned/InProgress reviews per reviewer.
    pub max_active_reviews: usize,
    pub review_window_days: u32,
    /// First-author, on-topic papers a reviewer needs to qualify.
    pub min_topic_papers: usize,
    /// Quorum of completed reviews before a publication decision.
    pub required_reviews: usize,
    pub required_accepts: usize,
    pub default_strategy: AssignmentStrategy,
    /// Upper bound on candidates evaluated concurrently.
    pub evaluation_workers: usize,
    pub oracle_timeout: Duration,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            max_active_reviews: DEFAULT_MAX_ACTIVE_REVIEWS,
            review_window_days: DEFAULT_REVIEW_WINDOW_DAYS,
            min_topic_papers: DEFAULT_MIN_TOPIC_PAPERS,
            required_reviews: DEFAULT_REQUIRED_REVIEWS,
            required_accepts: DEFAULT_REQUIRED_ACCEPTS,
            default_strategy: AssignmentStrategy::Deterministic,
            evaluation_workers: DEFAULT_EVALUATION_WORKERS,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }
}

impl ReviewPolicy {
    pub fn review_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.review_window_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_aliases() {
        assert_eq!("AI".parse(), Ok(AssignmentStrategy::Oracle));
        assert_eq!(" rules ".parse(), Ok(AssignmentStrategy::Deterministic));
        assert_eq!(
            "random".parse::<AssignmentStrategy>(),
            Err(UnknownStrategy("random".to_string()))
        );
    }

    #[test]
    fn longest_window_is_representable() {
        let policy = ReviewPolicy {
            review_window_days: MAX_REVIEW_DAYS,
            ..ReviewPolicy::default()
        };
        assert_eq!(policy.review_window().num_days(), 3650);
    }

    #[test]
    fn default_policy_matches_workflow_rules() {
        let policy = ReviewPolicy::default();
        assert_eq!(policy.max_active_reviews, 3);
        assert_eq!(policy.required_reviews, 3);
        assert_eq!(policy.required_accepts, 2);
        assert_eq!(policy.review_window(), chrono::Duration::days(30));
    }
}
