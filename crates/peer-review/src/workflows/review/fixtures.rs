//! JSON datasets used to seed the in-memory repositories.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::domain::{Manuscript, ReviewAssignment, ReviewerId, ValidationError};
use super::memory::{InMemoryAssignments, InMemoryManuscripts, InMemoryProfiles};
use super::profile::{CvRecord, ReviewerProfile};
use super::repository::RepositoryError;

/// A reviewer given either as a validated profile or as a raw CV record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FixtureReviewer {
    Cv {
        identity: ReviewerId,
        cv: CvRecord,
        #[serde(default = "available_by_default")]
        available: bool,
    },
    Profile(ReviewerProfile),
}

fn available_by_default() -> bool {
    true
}

impl FixtureReviewer {
    pub fn into_profile(self) -> Result<ReviewerProfile, ValidationError> {
        match self {
            FixtureReviewer::Profile(profile) => Ok(profile),
            FixtureReviewer::Cv {
                identity,
                cv,
                available,
            } => {
                let mut profile = ReviewerProfile::from_cv(identity, cv)?;
                profile.available = available;
                Ok(profile)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureSet {
    #[serde(default)]
    pub manuscripts: Vec<Manuscript>,
    #[serde(default)]
    pub reviewers: Vec<FixtureReviewer>,
    #[serde(default)]
    pub assignments: Vec<ReviewAssignment>,
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed fixtures: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid reviewer in fixtures: {0}")]
    Profile(#[from] ValidationError),
    #[error("failed to seed fixtures: {0}")]
    Repository(#[from] RepositoryError),
}

/// Repositories populated from a fixture set.
#[derive(Default)]
pub struct SeededRepositories {
    pub manuscripts: InMemoryManuscripts,
    pub profiles: InMemoryProfiles,
    pub assignments: InMemoryAssignments,
}

impl FixtureSet {
    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn seed(self) -> Result<SeededRepositories, FixtureError> {
        let seeded = SeededRepositories::default();
        let counts = (
            self.manuscripts.len(),
            self.reviewers.len(),
            self.assignments.len(),
        );

        for manuscript in self.manuscripts {
            seeded.manuscripts.insert(manuscript)?;
        }
        for reviewer in self.reviewers {
            seeded.profiles.upsert(reviewer.into_profile()?)?;
        }
        for record in self.assignments {
            seeded.assignments.seed(record)?;
        }

        info!(
            manuscripts = counts.0,
            reviewers = counts.1,
            assignments = counts.2,
            "fixtures seeded"
        );
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::review::domain::{ManuscriptId, ManuscriptStatus};
    use crate::workflows::review::repository::{ManuscriptRepository, ReviewerProfileRepository};

    #[test]
    fn seeds_profiles_from_cv_records() {
        let raw = r#"{
            "manuscripts": [{
                "id": 7,
                "title": "Sparse attention for protein folding",
                "abstract": "We study sparse attention.",
                "categories": ["machine learning"],
                "author": "author-1",
                "status": "submitted"
            }],
            "reviewers": [{
                "identity": "rev-1",
                "cv": {
                    "selfIdentity": {"fullName": "Ada Lovelace", "institution": "UCL", "field": "Machine Learning"},
                    "education": [{"degree": "PhD Computer Science"}],
                    "publications": [{"title": "Attention everywhere", "authors": ["Ada Lovelace"]}]
                }
            }]
        }"#;

        let seeded = FixtureSet::from_json(raw)
            .and_then(FixtureSet::seed)
            .expect("fixtures seed");

        let manuscript = seeded
            .manuscripts
            .get(ManuscriptId(7))
            .expect("lookup")
            .expect("manuscript present");
        assert_eq!(manuscript.status, ManuscriptStatus::Submitted);
        assert_eq!(
            seeded
                .manuscripts
                .list_by_status(ManuscriptStatus::Submitted)
                .expect("listing")
                .len(),
            1
        );
        assert!(seeded
            .manuscripts
            .list_by_status(ManuscriptStatus::Published)
            .expect("listing")
            .is_empty());

        let profile = seeded
            .profiles
            .get(&ReviewerId::new("rev-1"))
            .expect("lookup")
            .expect("profile present");
        assert_eq!(profile.full_name, "Ada Lovelace");
        assert!(profile.available);
        assert_eq!(profile.publications.len(), 1);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = FixtureSet::from_json("{\"manuscripts\": 3}").expect_err("should fail");
        assert!(matches!(err, FixtureError::Parse(_)));
    }
}
