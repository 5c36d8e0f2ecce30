use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::consensus::{ConsensusEngine, ConsensusStatus, PublishRecommendation};
use super::domain::{
    AssignmentId, AssignmentView, Manuscript, ManuscriptId, ManuscriptStatus, Recommendation,
    ReviewAssignment, ReviewStatus, ReviewerId, ValidationError,
};
use super::eligibility::{self, EligibilityInput, EligibilityReport, Ineligibility};
use super::lifecycle::{self, Decision, DraftUpdate, LifecycleError, ReviewLifecycle, TransitionError};
use super::locks::ManuscriptLocks;
use super::oracle::Oracle;
use super::policy::{AssignmentStrategy, ReviewPolicy, MAX_REVIEW_DAYS};
use super::qualification::{QualificationConfig, QualificationEvaluator, QualificationResult};
use super::repository::{
    AssignmentFilter, ManuscriptRepository, RepositoryError, ReviewAssignmentRepository,
    ReviewerProfileRepository,
};
use super::selection::{
    mark_under_review, AssignmentError, AssignmentOutcome, AssignmentSelector, CandidateRanking,
    DeterministicEvaluator, OracleEvaluator,
};
use super::workload::WorkloadTracker;

/// Options for opening a review record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OpenReview {
    #[serde(default)]
    pub reviewer: Option<ReviewerId>,
    #[serde(default)]
    pub editor: Option<ReviewerId>,
    #[serde(default)]
    pub review_days: Option<i64>,
}

/// A reviewer's final decision on an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReview {
    pub reviewer: ReviewerId,
    pub recommendation: Recommendation,
    pub comments: Option<String>,
    pub confidential_comments: Option<String>,
}

/// Stored assignment plus the consensus recomputed right after the write.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedReview {
    pub assignment: ReviewAssignment,
    pub consensus: ConsensusStatus,
}

/// Facade over selection, lifecycle, eligibility and consensus.
pub struct ReviewWorkflowService<M, P, A> {
    manuscripts: Arc<M>,
    profiles: Arc<P>,
    assignments: Arc<A>,
    policy: ReviewPolicy,
    qualification: Arc<QualificationEvaluator>,
    selector: AssignmentSelector<M, P, A>,
    lifecycle: ReviewLifecycle<A>,
    workload: WorkloadTracker<A>,
    consensus: ConsensusEngine,
    locks: Arc<ManuscriptLocks>,
}

impl<M, P, A> ReviewWorkflowService<M, P, A>
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    pub fn new(manuscripts: Arc<M>, profiles: Arc<P>, assignments: Arc<A>, policy: ReviewPolicy) -> Self {
        let qualification = Arc::new(QualificationEvaluator::new(QualificationConfig::from_policy(
            &policy,
        )));
        Self::with_evaluator(manuscripts, profiles, assignments, policy, qualification)
    }

    /// Use a custom qualification evaluator, e.g. one with an identity-based name matcher.
    pub fn with_evaluator(
        manuscripts: Arc<M>,
        profiles: Arc<P>,
        assignments: Arc<A>,
        policy: ReviewPolicy,
        qualification: Arc<QualificationEvaluator>,
    ) -> Self {
        let locks = Arc::new(ManuscriptLocks::new());
        let deterministic = Arc::new(DeterministicEvaluator::new(
            Arc::clone(&qualification),
            policy.evaluation_workers,
        ));
        let selector = AssignmentSelector::new(
            Arc::clone(&manuscripts),
            Arc::clone(&profiles),
            Arc::clone(&assignments),
            Arc::clone(&locks),
            policy.clone(),
            deterministic,
        );

        Self {
            lifecycle: ReviewLifecycle::new(Arc::clone(&assignments)),
            workload: WorkloadTracker::new(Arc::clone(&assignments)),
            consensus: ConsensusEngine::new(&policy),
            manuscripts,
            profiles,
            assignments,
            policy,
            qualification,
            selector,
            locks,
        }
    }

    /// Enable the oracle strategy.
    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        let evaluator = OracleEvaluator::new(
            oracle,
            Arc::clone(&self.qualification),
            self.policy.evaluation_workers,
            self.policy.oracle_timeout,
        );
        self.selector = self.selector.with_oracle(Arc::new(evaluator));
        self
    }

    pub fn policy(&self) -> &ReviewPolicy {
        &self.policy
    }

    fn manuscript(&self, id: ManuscriptId) -> Result<Manuscript, ReviewServiceError> {
        self.manuscripts
            .get(id)?
            .ok_or(ReviewServiceError::ManuscriptNotFound(id))
    }

    fn open_manuscript(&self, id: ManuscriptId) -> Result<Manuscript, ReviewServiceError> {
        let manuscript = self.manuscript(id)?;
        if !manuscript.status.is_open() {
            return Err(ReviewServiceError::AlreadyDecided {
                id,
                status: manuscript.status,
            });
        }
        Ok(manuscript)
    }

    fn record(&self, id: AssignmentId) -> Result<ReviewAssignment, ReviewServiceError> {
        self.assignments
            .get(id)?
            .ok_or(ReviewServiceError::AssignmentNotFound(id))
    }

    fn eligibility(
        &self,
        reviewer: &ReviewerId,
        manuscript: &Manuscript,
        reviews: &[ReviewAssignment],
        target: Option<&ReviewAssignment>,
    ) -> Result<EligibilityReport, ReviewServiceError> {
        let profile = self.profiles.get(reviewer)?;
        Ok(eligibility::check(
            EligibilityInput {
                reviewer,
                manuscript,
                reviews,
                profile: profile.as_ref(),
                target,
            },
            &self.qualification,
        ))
    }

    /// Eligibility, duplicate and workload checks shared by every manual assignment path.
    fn admit(
        &self,
        reviewer: &ReviewerId,
        manuscript: &Manuscript,
        reviews: &[ReviewAssignment],
    ) -> Result<(), ReviewServiceError> {
        let report = self.eligibility(reviewer, manuscript, reviews, None)?;
        if let Some(reason) = report.ineligibility {
            return Err(ReviewServiceError::Ineligible {
                reviewer: reviewer.clone(),
                reason,
            });
        }
        if reviews
            .iter()
            .any(|record| record.is_held_by(reviewer) && record.status != ReviewStatus::Completed)
        {
            return Err(TransitionError::AlreadyAssigned {
                reviewer: reviewer.clone(),
            }
            .into());
        }
        let load = self.workload.current_load(reviewer)?;
        if load >= self.policy.max_active_reviews {
            return Err(ReviewServiceError::Overloaded {
                reviewer: reviewer.clone(),
                load,
                cap: self.policy.max_active_reviews,
            });
        }
        Ok(())
    }

    fn review_window(&self, days: Option<i64>) -> Result<Duration, ReviewServiceError> {
        match days {
            None => Ok(self.policy.review_window()),
            Some(days) => day_span(days).ok_or_else(|| ValidationError::ReviewWindow(days).into()),
        }
    }

    /// Create a review slot, optionally already held by an eligible reviewer.
    pub async fn open_review(
        &self,
        manuscript_id: ManuscriptId,
        request: OpenReview,
    ) -> Result<ReviewAssignment, ReviewServiceError> {
        let window = self.review_window(request.review_days)?;
        let _guard = self.locks.acquire(manuscript_id).await?;
        let manuscript = self.open_manuscript(manuscript_id)?;

        if let Some(reviewer) = &request.reviewer {
            let reviews = self.assignments.by_manuscript(manuscript_id)?;
            self.admit(reviewer, &manuscript, &reviews)?;
        }

        let assigned = request.reviewer.is_some();
        let record = self.lifecycle.open(lifecycle::create(
            manuscript_id,
            request.reviewer,
            request.editor,
            window,
            Utc::now(),
        )?)?;
        if assigned {
            mark_under_review(self.manuscripts.as_ref(), &manuscript)?;
        }
        Ok(record)
    }

    /// Manual assignment of a pending slot.
    pub async fn assign_reviewer(
        &self,
        assignment_id: AssignmentId,
        reviewer: ReviewerId,
        editor: Option<ReviewerId>,
    ) -> Result<ReviewAssignment, ReviewServiceError> {
        let manuscript_id = self.record(assignment_id)?.manuscript_id;
        let _guard = self.locks.acquire(manuscript_id).await?;

        let record = self.record(assignment_id)?;
        let manuscript = self.open_manuscript(manuscript_id)?;
        let now = Utc::now();
        let window = self.policy.review_window();
        lifecycle::assign(&record, &reviewer, editor.as_ref(), window, now)?;

        let reviews = self.assignments.by_manuscript(manuscript_id)?;
        self.admit(&reviewer, &manuscript, &reviews)?;

        let assigned = self
            .lifecycle
            .assign(&record, &reviewer, editor.as_ref(), window, now)?;
        mark_under_review(self.manuscripts.as_ref(), &manuscript)?;
        info!(%assignment_id, %manuscript_id, reviewer = %reviewer, "reviewer assigned manually");
        Ok(assigned)
    }

    /// Create one assigned record per reviewer. Every reviewer is validated before any write.
    pub async fn assign_panel(
        &self,
        manuscript_id: ManuscriptId,
        reviewers: Vec<ReviewerId>,
        editor: Option<ReviewerId>,
    ) -> Result<Vec<ReviewAssignment>, ReviewServiceError> {
        let mut seen = HashSet::new();
        let panel: Vec<ReviewerId> = reviewers
            .into_iter()
            .filter(|reviewer| seen.insert(reviewer.clone()))
            .collect();
        if panel.len() < self.policy.required_reviews {
            return Err(ValidationError::PanelTooSmall {
                required: self.policy.required_reviews,
                supplied: panel.len(),
            }
            .into());
        }

        let _guard = self.locks.acquire(manuscript_id).await?;
        let manuscript = self.open_manuscript(manuscript_id)?;
        let reviews = self.assignments.by_manuscript(manuscript_id)?;
        for reviewer in &panel {
            self.admit(reviewer, &manuscript, &reviews)?;
        }

        let now = Utc::now();
        let window = self.policy.review_window();
        let records = panel
            .into_iter()
            .map(|reviewer| lifecycle::create(manuscript_id, Some(reviewer), editor.clone(), window, now))
            .collect::<Result<Vec<_>, _>>()?;
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            created.push(self.lifecycle.open(record)?);
        }
        mark_under_review(self.manuscripts.as_ref(), &manuscript)?;
        info!(%manuscript_id, panel = created.len(), "review panel assigned");
        Ok(created)
    }

    /// Pick and assign a reviewer; `None` uses the configured default strategy.
    pub async fn auto_assign(
        &self,
        manuscript_id: ManuscriptId,
        strategy: Option<AssignmentStrategy>,
    ) -> Result<AssignmentOutcome, ReviewServiceError> {
        let strategy = strategy.unwrap_or(self.policy.default_strategy);
        Ok(self.selector.auto_assign(manuscript_id, strategy).await?)
    }

    pub async fn qualified_reviewers(
        &self,
        manuscript_id: ManuscriptId,
        strategy: Option<AssignmentStrategy>,
    ) -> Result<CandidateRanking, ReviewServiceError> {
        let strategy = strategy.unwrap_or(self.policy.default_strategy);
        Ok(self.selector.rank(manuscript_id, strategy).await?)
    }

    /// General qualification without manuscript context.
    pub fn reviewer_qualification(
        &self,
        reviewer: &ReviewerId,
    ) -> Result<QualificationResult, ReviewServiceError> {
        let profile = self
            .profiles
            .get(reviewer)?
            .ok_or_else(|| ReviewServiceError::ReviewerNotFound(reviewer.clone()))?;
        Ok(self.qualification.evaluate_general(&profile))
    }

    pub fn check_eligibility(
        &self,
        reviewer: &ReviewerId,
        manuscript_id: ManuscriptId,
    ) -> Result<EligibilityReport, ReviewServiceError> {
        let manuscript = self.manuscript(manuscript_id)?;
        let reviews = self.assignments.by_manuscript(manuscript_id)?;
        self.eligibility(reviewer, &manuscript, &reviews, None)
    }

    pub fn save_draft(
        &self,
        assignment_id: AssignmentId,
        update: DraftUpdate,
    ) -> Result<ReviewAssignment, ReviewServiceError> {
        let record = self.record(assignment_id)?;
        Ok(self.lifecycle.save_draft(&record, update)?)
    }

    /// Record a reviewer's decision after re-validating eligibility.
    ///
    /// Submissions on one manuscript are serialized so that a reviewer can complete at most
    /// one of its records.
    pub async fn submit_review(
        &self,
        assignment_id: AssignmentId,
        submission: SubmitReview,
    ) -> Result<SubmittedReview, ReviewServiceError> {
        let manuscript_id = self.record(assignment_id)?.manuscript_id;
        let _guard = self.locks.acquire(manuscript_id).await?;

        let record = self.record(assignment_id)?;
        let manuscript = self.open_manuscript(record.manuscript_id)?;
        let reviews = self.assignments.by_manuscript(record.manuscript_id)?;

        let report = self.eligibility(&submission.reviewer, &manuscript, &reviews, Some(&record))?;
        if let Some(reason) = report.ineligibility {
            warn!(
                %assignment_id,
                reviewer = %submission.reviewer,
                code = reason.code(),
                "review submission rejected"
            );
            return Err(ReviewServiceError::Ineligible {
                reviewer: submission.reviewer,
                reason,
            });
        }

        let completed = self.lifecycle.complete(
            &record,
            &submission.reviewer,
            Decision {
                recommendation: submission.recommendation,
                comments: submission.comments,
                confidential_comments: submission.confidential_comments,
            },
            Utc::now(),
        )?;

        let consensus = self.consensus_status(completed.manuscript_id)?;
        info!(
            %assignment_id,
            manuscript_id = %completed.manuscript_id,
            reviewer = %submission.reviewer,
            recommendation = submission.recommendation.label(),
            completed = consensus.completed_count,
            next_action = %consensus.next_action,
            "review submitted"
        );
        Ok(SubmittedReview {
            assignment: completed,
            consensus,
        })
    }

    pub fn extend_deadline(
        &self,
        assignment_id: AssignmentId,
        days: i64,
        reason: Option<String>,
    ) -> Result<ReviewAssignment, ReviewServiceError> {
        let extension = day_span(days).ok_or(ValidationError::ExtensionDays(days))?;
        let record = self.record(assignment_id)?;
        let updated = self.lifecycle.extend_deadline(&record, extension, reason)?;
        info!(%assignment_id, days, deadline = %updated.deadline, "review deadline extended");
        Ok(updated)
    }

    pub fn consensus_status(
        &self,
        manuscript_id: ManuscriptId,
    ) -> Result<ConsensusStatus, ReviewServiceError> {
        self.manuscript(manuscript_id)?;
        let reviews = self.assignments.by_manuscript(manuscript_id)?;
        Ok(self.consensus.tally(manuscript_id, &reviews, Utc::now()))
    }

    /// Publish once quorum is reached with enough accepts.
    pub async fn publish(
        &self,
        manuscript_id: ManuscriptId,
        published_by: ReviewerId,
    ) -> Result<Manuscript, ReviewServiceError> {
        let _guard = self.locks.acquire(manuscript_id).await?;
        let manuscript = self.open_manuscript(manuscript_id)?;
        let status = self.consensus_status(manuscript_id)?;
        if !status.can_publish {
            return Err(ReviewServiceError::QuorumNotReached {
                status: Box::new(status),
            });
        }

        let published = self.manuscripts.update_status(
            manuscript_id,
            ManuscriptStatus::Published,
            manuscript.status,
            Some(published_by.clone()),
        )?;
        info!(%manuscript_id, published_by = %published_by, "manuscript published");
        Ok(published)
    }

    /// Reject once quorum is reached and the consensus recommends rejection.
    pub async fn reject(
        &self,
        manuscript_id: ManuscriptId,
        decided_by: ReviewerId,
    ) -> Result<Manuscript, ReviewServiceError> {
        let _guard = self.locks.acquire(manuscript_id).await?;
        let manuscript = self.open_manuscript(manuscript_id)?;
        let status = self.consensus_status(manuscript_id)?;
        match status.publish_recommendation {
            None => {
                return Err(ReviewServiceError::QuorumNotReached {
                    status: Box::new(status),
                })
            }
            Some(PublishRecommendation::Approve) => {
                return Err(ReviewServiceError::ConsensusFavorsPublication {
                    status: Box::new(status),
                })
            }
            Some(PublishRecommendation::Reject) => {}
        }

        let rejected = self.manuscripts.update_status(
            manuscript_id,
            ManuscriptStatus::Rejected,
            manuscript.status,
            Some(decided_by.clone()),
        )?;
        info!(%manuscript_id, decided_by = %decided_by, "manuscript rejected");
        Ok(rejected)
    }

    pub fn assignment(&self, assignment_id: AssignmentId) -> Result<AssignmentView, ReviewServiceError> {
        Ok(self.record(assignment_id)?.view(Utc::now()))
    }

    pub fn list_assignments(
        &self,
        filter: &AssignmentFilter,
    ) -> Result<Vec<AssignmentView>, ReviewServiceError> {
        let now = Utc::now();
        Ok(self
            .assignments
            .list(filter)?
            .iter()
            .map(|record| record.view(now))
            .collect())
    }

    pub fn reviews_for(&self, manuscript_id: ManuscriptId) -> Result<Vec<AssignmentView>, ReviewServiceError> {
        self.manuscript(manuscript_id)?;
        let now = Utc::now();
        Ok(self
            .assignments
            .by_manuscript(manuscript_id)?
            .iter()
            .map(|record| record.view(now))
            .collect())
    }
}

/// Error raised by the review workflow service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("manuscript {0} not found")]
    ManuscriptNotFound(ManuscriptId),
    #[error("review assignment {0} not found")]
    AssignmentNotFound(AssignmentId),
    #[error("reviewer {0} has no profile on record")]
    ReviewerNotFound(ReviewerId),
    #[error("{reviewer} cannot review this manuscript: {reason}")]
    Ineligible {
        reviewer: ReviewerId,
        reason: Ineligibility,
    },
    #[error("{reviewer} already holds {load} active reviews (limit {cap})")]
    Overloaded {
        reviewer: ReviewerId,
        load: usize,
        cap: usize,
    },
    #[error("manuscript {id} is already {state}", state = .status.label())]
    AlreadyDecided {
        id: ManuscriptId,
        status: ManuscriptStatus,
    },
    #[error("publication quorum not reached: {}", .status.next_action)]
    QuorumNotReached { status: Box<ConsensusStatus> },
    #[error("consensus recommends publication; the manuscript cannot be rejected")]
    ConsensusFavorsPublication { status: Box<ConsensusStatus> },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error("record changed concurrently: {0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl ReviewServiceError {
    /// Whether the caller may retry, possibly with another strategy.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReviewServiceError::Overloaded { .. } | ReviewServiceError::Conflict(_) => true,
            ReviewServiceError::Repository(err) => matches!(err, RepositoryError::Unavailable(_)),
            ReviewServiceError::Assignment(err) => matches!(
                err,
                AssignmentError::AllOverloaded { .. }
                    | AssignmentError::OracleUnavailable { .. }
                    | AssignmentError::Conflict(_)
                    | AssignmentError::Repository(RepositoryError::Unavailable(_))
            ),
            _ => false,
        }
    }
}

/// Whole days in `1..=MAX_REVIEW_DAYS` as a duration.
fn day_span(days: i64) -> Option<Duration> {
    if !(1..=i64::from(MAX_REVIEW_DAYS)).contains(&days) {
        return None;
    }
    Duration::try_days(days)
}

impl From<RepositoryError> for ReviewServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::StaleState { expected, actual } => {
                ReviewServiceError::Conflict(format!("expected {expected}, found {actual}"))
            }
            other => ReviewServiceError::Repository(other),
        }
    }
}

impl From<LifecycleError> for ReviewServiceError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Transition(err) => ReviewServiceError::Transition(err),
            LifecycleError::Repository(err) => err.into(),
        }
    }
}
