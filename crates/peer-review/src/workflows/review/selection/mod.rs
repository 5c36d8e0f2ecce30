//! Automatic reviewer selection behind a single strategy-agnostic contract.

mod deterministic;
mod oracle;
pub(crate) mod pool;

pub use deterministic::DeterministicEvaluator;
pub use oracle::OracleEvaluator;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    Manuscript, ManuscriptId, ManuscriptStatus, ReviewAssignment, ReviewStatus, ReviewerId,
};
use super::lifecycle::{self, LifecycleError, ReviewLifecycle};
use super::locks::ManuscriptLocks;
use super::oracle::{OracleTier, OracleVerdict};
use super::policy::{AssignmentStrategy, ReviewPolicy};
use super::profile::ReviewerProfile;
use super::qualification::QualificationResult;
use super::repository::{
    ManuscriptRepository, RepositoryError, ReviewAssignmentRepository, ReviewerProfileRepository,
};
use super::workload::WorkloadTracker;

/// One member of the candidate pool with its workload at scan time.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub profile: ReviewerProfile,
    pub current_load: usize,
}

/// Strategy output for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub reviewer: ReviewerId,
    pub name: String,
    pub institution: String,
    pub score: f64,
    pub eligible: bool,
    pub reasons: Vec<String>,
    pub current_load: usize,
    pub available: bool,
    pub first_author_papers_on_topic: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<OracleTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualification: Option<QualificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<OracleVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle_error: Option<String>,
}

impl RankedCandidate {
    pub(crate) fn from_qualification(candidate: &Candidate, qualification: QualificationResult) -> Self {
        Self {
            reviewer: candidate.profile.identity.clone(),
            name: candidate.profile.full_name.clone(),
            institution: candidate.profile.institution.clone(),
            score: qualification.first_author_papers_on_topic as f64,
            eligible: qualification.is_qualified,
            reasons: qualification.reasons(),
            current_load: candidate.current_load,
            available: candidate.profile.available,
            first_author_papers_on_topic: qualification.first_author_papers_on_topic,
            tier: None,
            qualification: Some(qualification),
            verdict: None,
            oracle_error: None,
        }
    }

    pub(crate) fn from_verdict(
        candidate: &Candidate,
        verdict: OracleVerdict,
        qualification: QualificationResult,
    ) -> Self {
        let mut reasons = Vec::with_capacity(verdict.strengths.len() + verdict.concerns.len() + 1);
        if !verdict.reasoning_explanation.is_empty() {
            reasons.push(verdict.reasoning_explanation.clone());
        }
        reasons.extend(verdict.strengths.iter().map(|s| format!("strength: {s}")));
        reasons.extend(verdict.concerns.iter().map(|c| format!("concern: {c}")));

        Self {
            reviewer: candidate.profile.identity.clone(),
            name: candidate.profile.full_name.clone(),
            institution: candidate.profile.institution.clone(),
            score: verdict.overall_score,
            eligible: verdict.recommendation != OracleTier::NotSuitable,
            reasons,
            current_load: candidate.current_load,
            available: candidate.profile.available,
            first_author_papers_on_topic: qualification.first_author_papers_on_topic,
            tier: Some(verdict.recommendation),
            qualification: Some(qualification),
            verdict: Some(verdict),
            oracle_error: None,
        }
    }

    /// Zero-score, ineligible entry for a candidate whose evaluation did not complete.
    pub(crate) fn failed(candidate: &Candidate, reason: &str) -> Self {
        Self {
            reviewer: candidate.profile.identity.clone(),
            name: candidate.profile.full_name.clone(),
            institution: candidate.profile.institution.clone(),
            score: 0.0,
            eligible: false,
            reasons: vec![reason.to_string()],
            current_load: candidate.current_load,
            available: candidate.profile.available,
            first_author_papers_on_topic: 0,
            tier: None,
            qualification: None,
            verdict: None,
            oracle_error: None,
        }
    }
}

/// Shared interface for both assignment strategies.
#[async_trait]
pub trait CandidateEvaluator: Send + Sync {
    fn strategy(&self) -> AssignmentStrategy;

    /// Score the full pool. The result is ordered best first.
    async fn evaluate(&self, pool: Vec<Candidate>, manuscript: &Manuscript) -> Vec<RankedCandidate>;
}

/// Full, ordered candidate list for a manuscript. Nothing is written.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateRanking {
    pub manuscript_id: ManuscriptId,
    pub strategy: AssignmentStrategy,
    pub candidates: Vec<RankedCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_summary: Option<BTreeMap<OracleTier, usize>>,
}

impl CandidateRanking {
    pub fn qualified(&self) -> impl Iterator<Item = &RankedCandidate> {
        self.candidates.iter().filter(|candidate| candidate.eligible)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub assignment: ReviewAssignment,
    pub reviewer: RankedCandidate,
    pub justification: String,
    pub strategy: AssignmentStrategy,
    pub candidates_evaluated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_summary: Option<BTreeMap<OracleTier, usize>>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("manuscript {0} not found")]
    ManuscriptNotFound(ManuscriptId),
    #[error("manuscript {id} is {state} and no longer accepts reviewers", state = .status.label())]
    ManuscriptClosed {
        id: ManuscriptId,
        status: ManuscriptStatus,
    },
    #[error("manuscript {0} has no unassigned review slot")]
    AlreadyAssigned(ManuscriptId),
    #[error("no qualified reviewers found for this topic ({} evaluated)", .candidates.len())]
    NoQualifiedReviewers { candidates: Vec<RankedCandidate> },
    #[error("all qualified reviewers are currently overloaded or unavailable")]
    AllOverloaded { candidates: Vec<RankedCandidate> },
    #[error("oracle failed for every candidate; retry with the deterministic strategy")]
    OracleUnavailable { candidates: Vec<RankedCandidate> },
    #[error("oracle strategy requested but no oracle is configured")]
    OracleNotConfigured,
    #[error("review slot changed concurrently: {0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AssignmentError {
    pub fn candidates(&self) -> &[RankedCandidate] {
        match self {
            AssignmentError::NoQualifiedReviewers { candidates }
            | AssignmentError::AllOverloaded { candidates }
            | AssignmentError::OracleUnavailable { candidates } => candidates,
            _ => &[],
        }
    }
}

impl From<LifecycleError> for AssignmentError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Repository(RepositoryError::StaleState { expected, actual }) => {
                AssignmentError::Conflict(format!("expected {expected}, found {actual}"))
            }
            LifecycleError::Repository(other) => AssignmentError::Repository(other),
            LifecycleError::Transition(other) => AssignmentError::Conflict(other.to_string()),
        }
    }
}

/// Picks a reviewer for a manuscript and fills its open review slot.
pub struct AssignmentSelector<M, P, A> {
    manuscripts: Arc<M>,
    profiles: Arc<P>,
    assignments: Arc<A>,
    workload: WorkloadTracker<A>,
    lifecycle: ReviewLifecycle<A>,
    locks: Arc<ManuscriptLocks>,
    policy: ReviewPolicy,
    deterministic: Arc<dyn CandidateEvaluator>,
    oracle: Option<Arc<dyn CandidateEvaluator>>,
}

impl<M, P, A> AssignmentSelector<M, P, A>
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    pub fn new(
        manuscripts: Arc<M>,
        profiles: Arc<P>,
        assignments: Arc<A>,
        locks: Arc<ManuscriptLocks>,
        policy: ReviewPolicy,
        deterministic: Arc<dyn CandidateEvaluator>,
    ) -> Self {
        Self {
            workload: WorkloadTracker::new(Arc::clone(&assignments)),
            lifecycle: ReviewLifecycle::new(Arc::clone(&assignments)),
            manuscripts,
            profiles,
            assignments,
            locks,
            policy,
            deterministic,
            oracle: None,
        }
    }

    pub fn with_oracle(mut self, evaluator: Arc<dyn CandidateEvaluator>) -> Self {
        self.oracle = Some(evaluator);
        self
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    fn evaluator(&self, strategy: AssignmentStrategy) -> Result<Arc<dyn CandidateEvaluator>, AssignmentError> {
        match strategy {
            AssignmentStrategy::Deterministic => Ok(Arc::clone(&self.deterministic)),
            AssignmentStrategy::Oracle => self
                .oracle
                .as_ref()
                .map(Arc::clone)
                .ok_or(AssignmentError::OracleNotConfigured),
        }
    }

    fn manuscript(&self, id: ManuscriptId) -> Result<Manuscript, AssignmentError> {
        self.manuscripts
            .get(id)?
            .ok_or(AssignmentError::ManuscriptNotFound(id))
    }

    fn candidate_pool(&self) -> Result<Vec<Candidate>, AssignmentError> {
        self.profiles
            .list_all()?
            .into_iter()
            .map(|profile| -> Result<Candidate, AssignmentError> {
                let current_load = self.workload.current_load(&profile.identity)?;
                Ok(Candidate {
                    profile,
                    current_load,
                })
            })
            .collect()
    }

    /// Evaluate every candidate for a manuscript without writing anything.
    pub async fn rank(
        &self,
        manuscript_id: ManuscriptId,
        strategy: AssignmentStrategy,
    ) -> Result<CandidateRanking, AssignmentError> {
        let evaluator = self.evaluator(strategy)?;
        let manuscript = self.manuscript(manuscript_id)?;
        let pool = self.candidate_pool()?;
        let candidates = evaluator.evaluate(pool, &manuscript).await;
        let tier_summary = (strategy == AssignmentStrategy::Oracle).then(|| tier_summary(&candidates));

        Ok(CandidateRanking {
            manuscript_id,
            strategy,
            candidates,
            tier_summary,
        })
    }

    /// Choose a reviewer and fill the manuscript's open review slot.
    ///
    /// Fails with `AlreadyAssigned` when every existing review record already has a
    /// reviewer; a manuscript without any record gets a fresh one.
    pub async fn auto_assign(
        &self,
        manuscript_id: ManuscriptId,
        strategy: AssignmentStrategy,
    ) -> Result<AssignmentOutcome, AssignmentError> {
        let evaluator = self.evaluator(strategy)?;
        let manuscript = self.manuscript(manuscript_id)?;
        ensure_open(&manuscript)?;
        let existing = self.assignments.by_manuscript(manuscript_id)?;
        if !existing.is_empty() && open_slot(&existing).is_none() {
            return Err(AssignmentError::AlreadyAssigned(manuscript_id));
        }

        let pool = self.candidate_pool()?;
        let candidates_evaluated = pool.len();
        let ranked = evaluator.evaluate(pool, &manuscript).await;

        if strategy == AssignmentStrategy::Oracle
            && !ranked.is_empty()
            && ranked.iter().all(|candidate| candidate.oracle_error.is_some())
        {
            warn!(%manuscript_id, "oracle failed for every candidate");
            return Err(AssignmentError::OracleUnavailable { candidates: ranked });
        }
        // The author is never a candidate for their own manuscript.
        if !ranked
            .iter()
            .any(|candidate| candidate.eligible && candidate.reviewer != manuscript.author)
        {
            return Err(AssignmentError::NoQualifiedReviewers { candidates: ranked });
        }

        // Selection and write are serialized per manuscript.
        let _guard = self.locks.acquire(manuscript_id).await?;

        let manuscript = self.manuscript(manuscript_id)?;
        ensure_open(&manuscript)?;
        let existing = self.assignments.by_manuscript(manuscript_id)?;
        let slot = open_slot(&existing).cloned();
        if !existing.is_empty() && slot.is_none() {
            return Err(AssignmentError::AlreadyAssigned(manuscript_id));
        }
        let involved: HashSet<&ReviewerId> =
            existing.iter().filter_map(|record| record.reviewer.as_ref()).collect();

        let mut chosen = None;
        for candidate in ranked.iter().filter(|candidate| candidate.eligible) {
            if candidate.reviewer == manuscript.author
                || involved.contains(&candidate.reviewer)
                || !candidate.available
            {
                continue;
            }
            // Workload may have moved since the scan.
            if self
                .workload
                .is_at_capacity(&candidate.reviewer, self.policy.max_active_reviews)?
            {
                continue;
            }
            chosen = Some(candidate.clone());
            break;
        }

        let Some(reviewer) = chosen else {
            return Err(AssignmentError::AllOverloaded { candidates: ranked });
        };

        let now = Utc::now();
        let window = self.policy.review_window();
        let assignment = match slot {
            Some(record) => self
                .lifecycle
                .assign(&record, &reviewer.reviewer, None, window, now)?,
            None => self.lifecycle.open(
                lifecycle::create(manuscript_id, Some(reviewer.reviewer.clone()), None, window, now)
                    .map_err(LifecycleError::from)?,
            )?,
        };

        mark_under_review(self.manuscripts.as_ref(), &manuscript)?;

        let tier_summary = (strategy == AssignmentStrategy::Oracle).then(|| tier_summary(&ranked));
        let (justification, confidence) = match strategy {
            AssignmentStrategy::Deterministic => (
                format!("Assigned to {} - {}", reviewer.name, reviewer.reasons.join(", ")),
                None,
            ),
            AssignmentStrategy::Oracle => (
                format!(
                    "Assigned to {} (score: {:.2}/100) - {}",
                    reviewer.name,
                    reviewer.score,
                    reviewer.reasons.first().map(String::as_str).unwrap_or("no rationale given")
                ),
                Some(reviewer.score / 100.0),
            ),
        };

        info!(
            %manuscript_id,
            assignment_id = %assignment.id,
            reviewer = %reviewer.reviewer,
            strategy = strategy.label(),
            "reviewer auto-assigned"
        );

        Ok(AssignmentOutcome {
            assignment,
            reviewer,
            justification,
            strategy,
            candidates_evaluated,
            confidence,
            tier_summary,
        })
    }
}

fn ensure_open(manuscript: &Manuscript) -> Result<(), AssignmentError> {
    if manuscript.status.is_open() {
        Ok(())
    } else {
        Err(AssignmentError::ManuscriptClosed {
            id: manuscript.id,
            status: manuscript.status,
        })
    }
}

/// First pending record that has never had a reviewer.
pub(crate) fn open_slot(records: &[ReviewAssignment]) -> Option<&ReviewAssignment> {
    records
        .iter()
        .find(|record| record.status == ReviewStatus::Pending && record.reviewer.is_none())
}

/// Submitted → UnderReview; losing the race to another writer is fine.
pub(crate) fn mark_under_review<M: ManuscriptRepository + ?Sized>(
    manuscripts: &M,
    manuscript: &Manuscript,
) -> Result<(), RepositoryError> {
    if manuscript.status != ManuscriptStatus::Submitted {
        return Ok(());
    }
    match manuscripts.update_status(
        manuscript.id,
        ManuscriptStatus::UnderReview,
        ManuscriptStatus::Submitted,
        None,
    ) {
        Ok(_) | Err(RepositoryError::StaleState { .. }) => Ok(()),
        Err(other) => Err(other),
    }
}

fn tier_summary(candidates: &[RankedCandidate]) -> BTreeMap<OracleTier, usize> {
    let mut summary = BTreeMap::new();
    for tier in candidates.iter().filter_map(|candidate| candidate.tier) {
        *summary.entry(tier).or_insert(0) += 1;
    }
    summary
}
