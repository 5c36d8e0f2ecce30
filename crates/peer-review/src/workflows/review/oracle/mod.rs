//! Contract for the external scoring service used by the oracle assignment strategy.

mod http;

pub use http::HttpOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Manuscript, ManuscriptId, ReviewerId};
use super::profile::ReviewerProfile;

const MAX_PUBLICATIONS: usize = 5;
const MAX_EXPERIENCE: usize = 3;

/// Scores one candidate for one manuscript.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn evaluate(
        &self,
        candidate: &CandidateContext,
        manuscript: &ManuscriptContext,
    ) -> Result<OracleVerdict, OracleError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("oracle returned an invalid verdict: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleTier {
    HighlyRecommended,
    Recommended,
    Suitable,
    NotSuitable,
}

impl OracleTier {
    pub const fn label(self) -> &'static str {
        match self {
            OracleTier::HighlyRecommended => "highly_recommended",
            OracleTier::Recommended => "recommended",
            OracleTier::Suitable => "suitable",
            OracleTier::NotSuitable => "not_suitable",
        }
    }
}

/// Oracle answer. Must pass `validate` before it is trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleVerdict {
    pub overall_score: f64,
    pub qualification_score: f64,
    pub expertise_score: f64,
    pub availability_score: f64,
    pub recommendation: OracleTier,
    #[serde(default)]
    pub reasoning_explanation: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

impl OracleVerdict {
    pub const MAX_OVERALL: f64 = 100.0;
    pub const MAX_QUALIFICATION: f64 = 40.0;
    pub const MAX_EXPERTISE: f64 = 35.0;
    pub const MAX_AVAILABILITY: f64 = 25.0;
    /// Allowed drift between the overall score and the sum of subscores.
    pub const SUM_TOLERANCE: f64 = 1.0;

    pub fn validate(&self) -> Result<(), OracleError> {
        let ranges = [
            ("overallScore", self.overall_score, Self::MAX_OVERALL),
            ("qualificationScore", self.qualification_score, Self::MAX_QUALIFICATION),
            ("expertiseScore", self.expertise_score, Self::MAX_EXPERTISE),
            ("availabilityScore", self.availability_score, Self::MAX_AVAILABILITY),
        ];
        for (name, value, max) in ranges {
            if !value.is_finite() || value < 0.0 || value > max {
                return Err(OracleError::Malformed(format!(
                    "{name} {value} outside 0..={max}"
                )));
            }
        }

        let sum = self.qualification_score + self.expertise_score + self.availability_score;
        if (self.overall_score - sum).abs() > Self::SUM_TOLERANCE {
            return Err(OracleError::Malformed(format!(
                "overallScore {} does not match subscore sum {sum}",
                self.overall_score
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateContext {
    pub identity: ReviewerId,
    pub name: String,
    pub institution: String,
    pub field: String,
    pub degrees: Vec<String>,
    pub publication_count: usize,
    /// Most recent entries as listed on the CV.
    pub publications: Vec<PublicationSummary>,
    pub experience: Vec<String>,
    pub current_load: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationSummary {
    pub title: String,
    pub venue: Option<String>,
    pub date: Option<String>,
    pub authors: Vec<String>,
}

impl CandidateContext {
    pub fn from_profile(profile: &ReviewerProfile, current_load: usize) -> Self {
        Self {
            identity: profile.identity.clone(),
            name: profile.full_name.clone(),
            institution: profile.institution.clone(),
            field: profile.field.clone(),
            degrees: profile
                .education
                .iter()
                .map(|record| match &record.field {
                    Some(field) => format!("{} in {field}", record.degree),
                    None => record.degree.clone(),
                })
                .collect(),
            publication_count: profile.publications.len(),
            publications: profile
                .publications
                .iter()
                .take(MAX_PUBLICATIONS)
                .map(|publication| PublicationSummary {
                    title: publication.title.clone(),
                    venue: publication.venue.clone(),
                    date: publication.date.clone(),
                    authors: publication.authors.iter().take(3).cloned().collect(),
                })
                .collect(),
            experience: profile
                .experience
                .iter()
                .take(MAX_EXPERIENCE)
                .filter_map(|entry| match (&entry.position, &entry.company) {
                    (Some(position), Some(company)) => Some(format!("{position} at {company}")),
                    (Some(position), None) => Some(position.clone()),
                    (None, _) => entry.description.clone(),
                })
                .collect(),
            current_load,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptContext {
    pub id: ManuscriptId,
    pub title: String,
    pub categories: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl From<&Manuscript> for ManuscriptContext {
    fn from(manuscript: &Manuscript) -> Self {
        Self {
            id: manuscript.id,
            title: manuscript.title.clone(),
            categories: manuscript.categories.clone(),
            abstract_text: manuscript.abstract_text.clone(),
        }
    }
}
