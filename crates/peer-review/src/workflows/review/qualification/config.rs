use serde::{Deserialize, Serialize};

use super::super::policy::ReviewPolicy;

/// Academic degree tiers; Bachelor is the minimum accepted for reviewing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeTier {
    Bachelor,
    Master,
    Doctorate,
}

impl DegreeTier {
    pub const fn label(self) -> &'static str {
        match self {
            DegreeTier::Bachelor => "bachelor",
            DegreeTier::Master => "master",
            DegreeTier::Doctorate => "doctorate",
        }
    }
}

/// Keywords recognising one degree tier inside a free-text degree string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeKeywords {
    pub tier: DegreeTier,
    /// Matched anywhere in the lower-cased degree text.
    pub substrings: Vec<&'static str>,
    /// Matched only as a whole alphanumeric token.
    pub tokens: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualificationConfig {
    pub min_topic_papers: usize,
    pub minimum_degree: DegreeTier,
    pub degree_keywords: Vec<DegreeKeywords>,
}

impl QualificationConfig {
    pub fn from_policy(policy: &ReviewPolicy) -> Self {
        Self {
            min_topic_papers: policy.min_topic_papers,
            ..Self::default()
        }
    }
}

impl Default for QualificationConfig {
    fn default() -> Self {
        Self {
            min_topic_papers: super::super::policy::DEFAULT_MIN_TOPIC_PAPERS,
            minimum_degree: DegreeTier::Bachelor,
            degree_keywords: vec![
                DegreeKeywords {
                    tier: DegreeTier::Bachelor,
                    substrings: vec!["bachelor", "bsc", "b.sc", "b.s", "b.a", "b.eng"],
                    tokens: vec!["bs", "ba", "beng"],
                },
                DegreeKeywords {
                    tier: DegreeTier::Master,
                    substrings: vec!["master", "msc", "m.sc", "m.s", "m.a", "m.eng"],
                    tokens: vec!["ms", "ma", "mba", "meng"],
                },
                DegreeKeywords {
                    tier: DegreeTier::Doctorate,
                    substrings: vec!["phd", "ph.d", "doctorate", "doctoral", "doctor", "dphil"],
                    tokens: vec![],
                },
            ],
        }
    }
}
