use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::review::domain::{
    AssignmentId, Manuscript, ManuscriptId, ManuscriptStatus, Recommendation, ReviewAssignment,
    ReviewStatus, ReviewerId,
};
use crate::workflows::review::memory::{InMemoryAssignments, InMemoryManuscripts, InMemoryProfiles};
use crate::workflows::review::oracle::{
    CandidateContext, ManuscriptContext, Oracle, OracleError, OracleTier, OracleVerdict,
};
use crate::workflows::review::policy::ReviewPolicy;
use crate::workflows::review::profile::{EducationRecord, ExperienceEntry, Publication, ReviewerProfile};
use crate::workflows::review::service::ReviewWorkflowService;

pub(super) type TestService =
    ReviewWorkflowService<InMemoryManuscripts, InMemoryProfiles, InMemoryAssignments>;

pub(super) const MANUSCRIPT: ManuscriptId = ManuscriptId(1);
pub(super) const AUTHOR: &str = "author-zoe";
pub(super) const EDITOR: &str = "editor-max";

pub(super) fn reviewer(id: &str) -> ReviewerId {
    ReviewerId::new(id)
}

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub(super) fn manuscript(id: ManuscriptId, author: &str) -> Manuscript {
    Manuscript {
        id,
        title: "Graph neural networks for protein structure prediction".to_string(),
        abstract_text:
            "We propose a graph neural network approach to protein structure prediction using attention mechanisms."
                .to_string(),
        categories: vec!["Machine Learning".to_string(), "Bioinformatics".to_string()],
        author: reviewer(author),
        status: ManuscriptStatus::Submitted,
        decided_by: None,
        decided_at: None,
    }
}

fn publication(title: &str, first_author: &str) -> Publication {
    Publication {
        title: title.to_string(),
        authors: vec![first_author.to_string(), "Lena Fischer".to_string()],
        venue: None,
        date: Some("2023".to_string()),
    }
}

/// PhD in machine learning with three first-author papers on graph neural networks and proteins.
pub(super) fn qualified_profile(id: &str, name: &str) -> ReviewerProfile {
    ReviewerProfile {
        identity: reviewer(id),
        full_name: name.to_string(),
        institution: "Institute of Computation".to_string(),
        field: "Machine Learning".to_string(),
        profession: Some("Research Scientist".to_string()),
        education: vec![EducationRecord {
            degree: "PhD Computer Science".to_string(),
            institution: Some("ETH Zurich".to_string()),
            field: Some("Computer Science".to_string()),
        }],
        publications: vec![
            publication("Message passing graph networks for molecules", name),
            publication("Protein folding with deep attention", name),
            publication("Neural structure prediction at scale", name),
        ],
        experience: vec![ExperienceEntry {
            position: Some("Research Scientist".to_string()),
            company: Some("Institute of Computation".to_string()),
            description: Some("Deep learning for structural biology".to_string()),
        }],
        available: true,
    }
}

/// Bachelor's degree but only one first-author paper, on an unrelated topic.
pub(super) fn unqualified_profile(id: &str, name: &str) -> ReviewerProfile {
    ReviewerProfile {
        identity: reviewer(id),
        full_name: name.to_string(),
        institution: "College of Arts".to_string(),
        field: "Art History".to_string(),
        profession: None,
        education: vec![EducationRecord {
            degree: "BA Art History".to_string(),
            institution: None,
            field: None,
        }],
        publications: vec![publication("Medieval pottery glazes of Tuscany", name)],
        experience: Vec::new(),
        available: true,
    }
}

pub(super) fn record(
    id: u64,
    reviewer_id: Option<&str>,
    status: ReviewStatus,
    recommendation: Option<Recommendation>,
) -> ReviewAssignment {
    let created = fixed_now() - chrono::Duration::days(10);
    ReviewAssignment {
        id: AssignmentId(id),
        manuscript_id: MANUSCRIPT,
        reviewer: reviewer_id.map(reviewer),
        editor: Some(reviewer(EDITOR)),
        status,
        deadline: created + chrono::Duration::days(30),
        created_at: created,
        assigned_at: reviewer_id.map(|_| created),
        completed_at: (status == ReviewStatus::Completed).then_some(fixed_now()),
        comments: None,
        confidential_comments: None,
        recommendation,
        editor_notes: None,
    }
}

/// Record with a deadline far from today's wall clock, for service-level tests.
pub(super) fn live_record(
    id: u64,
    manuscript_id: ManuscriptId,
    reviewer_id: Option<&str>,
    status: ReviewStatus,
) -> ReviewAssignment {
    let created = Utc::now();
    ReviewAssignment {
        id: AssignmentId(id),
        manuscript_id,
        reviewer: reviewer_id.map(reviewer),
        editor: None,
        status,
        deadline: created + chrono::Duration::days(30),
        created_at: created,
        assigned_at: reviewer_id.map(|_| created),
        completed_at: None,
        comments: None,
        confidential_comments: None,
        recommendation: None,
        editor_notes: None,
    }
}

/// Manuscript 1 authored by `AUTHOR`, four qualified reviewers and one unqualified one.
pub(super) struct Harness {
    pub(super) manuscripts: Arc<InMemoryManuscripts>,
    pub(super) profiles: Arc<InMemoryProfiles>,
    pub(super) assignments: Arc<InMemoryAssignments>,
    pub(super) policy: ReviewPolicy,
}

impl Harness {
    pub(super) fn new() -> Self {
        let harness = Self {
            manuscripts: Arc::new(InMemoryManuscripts::new()),
            profiles: Arc::new(InMemoryProfiles::new()),
            assignments: Arc::new(InMemoryAssignments::new()),
            policy: ReviewPolicy::default(),
        };
        harness
            .manuscripts
            .insert(manuscript(MANUSCRIPT, AUTHOR))
            .expect("seed manuscript");
        for (id, name) in [
            ("rev-alice", "Alice Moreau"),
            ("rev-bruno", "Bruno Tanaka"),
            ("rev-chen", "Chen Wei"),
            ("rev-dana", "Dana Okafor"),
            (AUTHOR, "Zoe Author"),
        ] {
            harness.add_profile(qualified_profile(id, name));
        }
        harness.add_profile(unqualified_profile("rev-ugo", "Ugo Bianchi"));
        harness
    }

    /// Only the author and the unqualified reviewer in the pool.
    pub(super) fn without_qualified_reviewers() -> Self {
        let harness = Self {
            manuscripts: Arc::new(InMemoryManuscripts::new()),
            profiles: Arc::new(InMemoryProfiles::new()),
            assignments: Arc::new(InMemoryAssignments::new()),
            policy: ReviewPolicy::default(),
        };
        harness
            .manuscripts
            .insert(manuscript(MANUSCRIPT, AUTHOR))
            .expect("seed manuscript");
        harness.add_profile(qualified_profile(AUTHOR, "Zoe Author"));
        harness.add_profile(unqualified_profile("rev-ugo", "Ugo Bianchi"));
        harness
    }

    pub(super) fn add_profile(&self, profile: ReviewerProfile) {
        self.profiles.upsert(profile).expect("seed profile");
    }

    pub(super) fn add_manuscript(&self, manuscript: Manuscript) {
        self.manuscripts.insert(manuscript).expect("seed manuscript");
    }

    pub(super) fn seed(&self, record: ReviewAssignment) {
        self.assignments.seed(record).expect("seed assignment");
    }

    /// Give `reviewer_id` `count` active reviews on throwaway manuscripts.
    pub(super) fn load_reviewer(&self, reviewer_id: &str, count: u64, first_id: u64) {
        for offset in 0..count {
            let manuscript_id = ManuscriptId(1_000 + first_id + offset);
            self.add_manuscript(manuscript(manuscript_id, "someone-else"));
            self.seed(live_record(
                first_id + offset,
                manuscript_id,
                Some(reviewer_id),
                ReviewStatus::Assigned,
            ));
        }
    }

    pub(super) fn service(&self) -> TestService {
        ReviewWorkflowService::new(
            Arc::clone(&self.manuscripts),
            Arc::clone(&self.profiles),
            Arc::clone(&self.assignments),
            self.policy.clone(),
        )
    }

    pub(super) fn service_with_oracle(&self, oracle: Arc<dyn Oracle>) -> TestService {
        self.service().with_oracle(oracle)
    }
}

pub(super) fn verdict(
    qualification: f64,
    expertise: f64,
    availability: f64,
    tier: OracleTier,
) -> OracleVerdict {
    OracleVerdict {
        overall_score: qualification + expertise + availability,
        qualification_score: qualification,
        expertise_score: expertise,
        availability_score: availability,
        recommendation: tier,
        reasoning_explanation: "strong publication record on the topic".to_string(),
        strengths: vec!["first-author papers".to_string()],
        concerns: Vec::new(),
    }
}

/// Oracle answering from a per-reviewer script; unscripted reviewers get `Unavailable`.
#[derive(Default)]
pub(super) struct ScriptedOracle {
    answers: HashMap<ReviewerId, Result<OracleVerdict, OracleError>>,
    delays: HashMap<ReviewerId, Duration>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub(super) fn answer(mut self, id: &str, answer: Result<OracleVerdict, OracleError>) -> Self {
        self.answers.insert(reviewer(id), answer);
        self
    }

    pub(super) fn delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(reviewer(id), delay);
        self
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn evaluate(
        &self,
        candidate: &CandidateContext,
        _manuscript: &ManuscriptContext,
    ) -> Result<OracleVerdict, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&candidate.identity) {
            tokio::time::sleep(*delay).await;
        }
        self.answers
            .get(&candidate.identity)
            .cloned()
            .unwrap_or_else(|| Err(OracleError::Unavailable("no scripted answer".to_string())))
    }
}

pub(super) async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
