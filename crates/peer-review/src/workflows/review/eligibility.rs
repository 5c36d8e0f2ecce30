use serde::Serialize;

use super::domain::{Manuscript, ManuscriptId, ReviewAssignment, ReviewStatus, ReviewerId};
use super::profile::ReviewerProfile;
use super::qualification::{ManuscriptTopics, QualificationEvaluator, QualificationResult};

/// Why a reviewer may not review (or submit on) a manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Ineligibility {
    #[error("reviewer is the manuscript's author")]
    IsAuthor,
    #[error("reviewer has already completed a review of this manuscript")]
    AlreadyReviewed,
    #[error("review is assigned to {holder}")]
    NotAssignedReviewer { holder: ReviewerId },
    #[error("reviewer has no CV profile on record")]
    MissingProfile,
    #[error("reviewer does not meet the qualification requirements: {}", .qualification.reasons().join("; "))]
    Unqualified { qualification: Box<QualificationResult> },
}

impl Ineligibility {
    pub const fn code(&self) -> &'static str {
        match self {
            Ineligibility::IsAuthor => "is_author",
            Ineligibility::AlreadyReviewed => "already_reviewed",
            Ineligibility::NotAssignedReviewer { .. } => "not_assigned_reviewer",
            Ineligibility::MissingProfile => "missing_profile",
            Ineligibility::Unqualified { .. } => "reviewer_not_qualified",
        }
    }
}

/// Per-requirement flags so an editor can see exactly what is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub not_author: bool,
    pub not_already_reviewed: bool,
    pub has_profile: bool,
    pub has_bachelors: bool,
    pub has_topic_papers: bool,
    pub has_topic_expertise: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityReport {
    pub reviewer: ReviewerId,
    pub manuscript_id: ManuscriptId,
    pub can_review: bool,
    pub requirements: Requirements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualification: Option<QualificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ineligibility: Option<Ineligibility>,
    pub reason: String,
}

/// Inputs gathered by the caller; the check itself is pure.
pub struct EligibilityInput<'a> {
    pub reviewer: &'a ReviewerId,
    pub manuscript: &'a Manuscript,
    pub reviews: &'a [ReviewAssignment],
    pub profile: Option<&'a ReviewerProfile>,
    /// Record being submitted on, when checking a submission.
    pub target: Option<&'a ReviewAssignment>,
}

pub fn check(input: EligibilityInput<'_>, evaluator: &QualificationEvaluator) -> EligibilityReport {
    let EligibilityInput {
        reviewer,
        manuscript,
        reviews,
        profile,
        target,
    } = input;

    let is_author = &manuscript.author == reviewer;
    let already_reviewed = reviews.iter().any(|record| {
        record.manuscript_id == manuscript.id
            && record.status == ReviewStatus::Completed
            && record.is_held_by(reviewer)
    });
    let foreign_holder = target
        .and_then(|record| record.reviewer.as_ref())
        .filter(|holder| *holder != reviewer)
        .cloned();

    let topics = ManuscriptTopics::from_manuscript(manuscript);
    let qualification = profile.map(|profile| evaluator.evaluate(profile, &topics));
    let min_papers = evaluator.config().min_topic_papers;

    let requirements = Requirements {
        not_author: !is_author,
        not_already_reviewed: !already_reviewed,
        has_profile: profile.is_some(),
        has_bachelors: qualification.as_ref().is_some_and(|q| q.has_bachelors),
        has_topic_papers: qualification
            .as_ref()
            .is_some_and(|q| q.first_author_papers_on_topic >= min_papers),
        has_topic_expertise: qualification.as_ref().is_some_and(|q| q.expertise_match),
    };

    let ineligibility = if is_author {
        Some(Ineligibility::IsAuthor)
    } else if already_reviewed {
        Some(Ineligibility::AlreadyReviewed)
    } else if let Some(holder) = foreign_holder {
        Some(Ineligibility::NotAssignedReviewer { holder })
    } else {
        match &qualification {
            None => Some(Ineligibility::MissingProfile),
            Some(result) if !result.is_qualified => Some(Ineligibility::Unqualified {
                qualification: Box::new(result.clone()),
            }),
            Some(_) => None,
        }
    };

    let reason = match &ineligibility {
        Some(problem) => problem.to_string(),
        None => qualification
            .as_ref()
            .map(|q| q.reasons().join("; "))
            .unwrap_or_default(),
    };

    EligibilityReport {
        reviewer: reviewer.clone(),
        manuscript_id: manuscript.id,
        can_review: ineligibility.is_none(),
        requirements,
        qualification,
        ineligibility,
        reason,
    }
}
