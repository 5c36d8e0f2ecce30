//! Reviewer assignment, review lifecycle, and publication consensus for submitted manuscripts.
//!
//! Reviewers are chosen either by explainable qualification rules or by an external
//! evaluation oracle. Both strategies share the same candidate contract, and every write
//! to a review record is a conditional transition on its current status.

pub mod consensus;
pub mod domain;
pub mod eligibility;
pub mod fixtures;
pub mod lifecycle;
pub mod locks;
pub mod memory;
pub mod oracle;
pub mod policy;
pub mod profile;
pub mod qualification;
pub mod repository;
pub mod router;
pub mod selection;
pub mod service;
pub mod topics;
pub(crate) mod workload;

#[cfg(test)]
mod tests;

pub use consensus::{ConsensusEngine, ConsensusStatus, NextAction, PublishRecommendation};
pub use domain::{
    AssignmentId, AssignmentView, Manuscript, ManuscriptId, ManuscriptStatus, Recommendation,
    ReviewAssignment, ReviewStatus, ReviewerId, ValidationError,
};
pub use eligibility::{EligibilityReport, Ineligibility, Requirements};
pub use fixtures::{FixtureError, FixtureSet, SeededRepositories};
pub use lifecycle::{DraftUpdate, TransitionError};
pub use memory::{InMemoryAssignments, InMemoryManuscripts, InMemoryProfiles};
pub use oracle::{
    CandidateContext, HttpOracle, ManuscriptContext, Oracle, OracleError, OracleTier,
    OracleVerdict,
};
pub use policy::{AssignmentStrategy, ReviewPolicy};
pub use profile::{CvRecord, ReviewerProfile};
pub use qualification::{QualificationConfig, QualificationEvaluator, QualificationResult};
pub use repository::{
    AssignmentFilter, ManuscriptRepository, RepositoryError, ReviewAssignmentRepository,
    ReviewerProfileRepository,
};
pub use router::review_router;
pub use selection::{AssignmentError, AssignmentOutcome, CandidateRanking, RankedCandidate};
pub use service::{OpenReview, ReviewServiceError, ReviewWorkflowService, SubmitReview, SubmittedReview};
