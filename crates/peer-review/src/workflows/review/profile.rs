use serde::{Deserialize, Serialize};

use super::domain::{ReviewerId, ValidationError};

const UNKNOWN: &str = "Unknown";

/// Validated reviewer profile consumed by the evaluators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerProfile {
    pub identity: ReviewerId,
    pub full_name: String,
    pub institution: String,
    pub field: String,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub education: Vec<EducationRecord>,
    #[serde(default)]
    pub publications: Vec<Publication>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub degree: String,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    /// Ordered as printed; the first entry is the first author.
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Extracted CV document as produced upstream. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvRecord {
    pub self_identity: Option<CvIdentity>,
    pub education: Vec<CvEducation>,
    pub publications: Vec<CvPublication>,
    pub experience: Vec<CvExperience>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvIdentity {
    pub full_name: Option<String>,
    pub institution: Option<String>,
    pub field: Option<String>,
    pub profession: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvEducation {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub field: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvPublication {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvExperience {
    pub position: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

impl ReviewerProfile {
    /// Normalize a CV record once at the repository boundary.
    pub fn from_cv(identity: ReviewerId, record: CvRecord) -> Result<Self, ValidationError> {
        if identity.as_str().trim().is_empty() {
            return Err(ValidationError::Profile(
                "reviewer identity must not be empty".to_string(),
            ));
        }

        let self_identity = record.self_identity.unwrap_or_default();
        let profession = present(self_identity.profession);
        let field = present(self_identity.field)
            .or_else(|| profession.clone())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let education = record
            .education
            .into_iter()
            .filter_map(|entry| {
                Some(EducationRecord {
                    degree: present(entry.degree)?,
                    institution: present(entry.institution),
                    field: present(entry.field),
                })
            })
            .collect();

        let publications = record
            .publications
            .into_iter()
            .filter_map(|entry| {
                let title = present(entry.title)?;
                let authors = entry
                    .authors
                    .into_iter()
                    .map(|author| author.trim().to_string())
                    .filter(|author| !author.is_empty())
                    .collect();
                Some(Publication {
                    title,
                    authors,
                    venue: present(entry.venue),
                    date: present(entry.date),
                })
            })
            .collect();

        let experience = record
            .experience
            .into_iter()
            .map(|entry| ExperienceEntry {
                position: present(entry.position),
                company: present(entry.company),
                description: present(entry.description),
            })
            .filter(|entry| entry.position.is_some() || entry.description.is_some())
            .collect();

        Ok(Self {
            identity,
            full_name: present(self_identity.full_name).unwrap_or_else(|| UNKNOWN.to_string()),
            institution: present(self_identity.institution)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            field,
            profession,
            education,
            publications,
            experience,
            available: true,
        })
    }
}
