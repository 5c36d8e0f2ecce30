mod config;
mod names;
mod rules;

pub use config::{DegreeKeywords, DegreeTier, QualificationConfig};
pub use names::{ApproximateNameMatcher, NameMatcher};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{Manuscript, ReviewerId};
use super::profile::ReviewerProfile;
use super::topics::KeywordBag;

/// Keyword bag for a manuscript: categories, then title and abstract keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManuscriptTopics {
    bag: KeywordBag,
}

impl ManuscriptTopics {
    pub fn from_manuscript(manuscript: &Manuscript) -> Self {
        Self::from_parts(
            &manuscript.categories,
            &manuscript.title,
            &manuscript.abstract_text,
        )
    }

    pub fn from_parts(categories: &[String], title: &str, abstract_text: &str) -> Self {
        let mut bag = KeywordBag::new();
        for category in categories {
            bag.push_term(category);
        }
        bag.push_text(title);
        bag.push_text(abstract_text);
        Self { bag }
    }

    pub fn bag(&self) -> &KeywordBag {
        &self.bag
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Degree,
    TopicPapers,
    ExpertiseMatch,
}

/// Outcome of one qualification criterion, kept for audit and editor feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionCheck {
    pub criterion: Criterion,
    pub satisfied: bool,
    pub notes: String,
}

/// Structured qualification verdict. Always produced, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub reviewer: ReviewerId,
    pub name: String,
    pub institution: String,
    pub is_qualified: bool,
    pub checks: Vec<CriterionCheck>,
    pub highest_degree: Option<DegreeTier>,
    pub has_bachelors: bool,
    pub publication_count: usize,
    pub first_author_papers: usize,
    pub first_author_papers_on_topic: usize,
    pub expertise_match: bool,
    pub matched_topics: Vec<String>,
}

impl QualificationResult {
    pub fn reasons(&self) -> Vec<String> {
        self.checks.iter().map(|check| check.notes.clone()).collect()
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CriterionCheck> {
        self.checks.iter().filter(|check| !check.satisfied)
    }
}

/// Applies the qualification criteria to reviewer profiles.
#[derive(Clone)]
pub struct QualificationEvaluator {
    config: QualificationConfig,
    name_matcher: Arc<dyn NameMatcher>,
}

impl QualificationEvaluator {
    pub fn new(config: QualificationConfig) -> Self {
        Self::with_name_matcher(config, Arc::new(ApproximateNameMatcher))
    }

    pub fn with_name_matcher(config: QualificationConfig, name_matcher: Arc<dyn NameMatcher>) -> Self {
        Self {
            config,
            name_matcher,
        }
    }

    pub fn config(&self) -> &QualificationConfig {
        &self.config
    }

    /// Qualification of `profile` for a specific manuscript.
    pub fn evaluate(&self, profile: &ReviewerProfile, topics: &ManuscriptTopics) -> QualificationResult {
        let matcher = self.name_matcher.as_ref();
        let required = self.config.min_topic_papers;

        let highest_degree = rules::highest_degree(&profile.education, &self.config);
        let has_bachelors = highest_degree.is_some_and(|tier| tier >= self.config.minimum_degree);
        let first_author_papers = rules::count_first_author(profile, matcher);
        let on_topic = rules::count_first_author_on_topic(profile, matcher, topics.bag());
        let matched_topics = rules::expertise_bag(profile).matches_in(topics.bag());
        let expertise_match = !matched_topics.is_empty();

        let checks = vec![
            self.degree_check(highest_degree, has_bachelors),
            CriterionCheck {
                criterion: Criterion::TopicPapers,
                satisfied: on_topic >= required,
                notes: if on_topic >= required {
                    format!("{on_topic} first-author papers on the manuscript topic")
                } else {
                    format!("only {on_topic} first-author papers on topic, need {required}")
                },
            },
            CriterionCheck {
                criterion: Criterion::ExpertiseMatch,
                satisfied: expertise_match,
                notes: if expertise_match {
                    format!("expertise match: {}", matched_topics.join(", "))
                } else {
                    "no expertise match with manuscript topic".to_string()
                },
            },
        ];

        QualificationResult {
            reviewer: profile.identity.clone(),
            name: profile.full_name.clone(),
            institution: profile.institution.clone(),
            is_qualified: checks.iter().all(|check| check.satisfied),
            checks,
            highest_degree,
            has_bachelors,
            publication_count: profile.publications.len(),
            first_author_papers,
            first_author_papers_on_topic: on_topic,
            expertise_match,
            matched_topics,
        }
    }

    /// Qualification without manuscript context: degree plus total first-author papers.
    ///
    /// The expertise criterion is reported unsatisfied and does not count toward `is_qualified`.
    pub fn evaluate_general(&self, profile: &ReviewerProfile) -> QualificationResult {
        let matcher = self.name_matcher.as_ref();
        let required = self.config.min_topic_papers;

        let highest_degree = rules::highest_degree(&profile.education, &self.config);
        let has_bachelors = highest_degree.is_some_and(|tier| tier >= self.config.minimum_degree);
        let first_author_papers = rules::count_first_author(profile, matcher);
        let papers_ok = first_author_papers >= required;

        let checks = vec![
            self.degree_check(highest_degree, has_bachelors),
            CriterionCheck {
                criterion: Criterion::TopicPapers,
                satisfied: papers_ok,
                notes: format!(
                    "{first_author_papers} first-author papers in total, need {required} on topic (no manuscript context)"
                ),
            },
            CriterionCheck {
                criterion: Criterion::ExpertiseMatch,
                satisfied: false,
                notes: "expertise match not evaluated (no manuscript context)".to_string(),
            },
        ];

        QualificationResult {
            reviewer: profile.identity.clone(),
            name: profile.full_name.clone(),
            institution: profile.institution.clone(),
            is_qualified: has_bachelors && papers_ok,
            checks,
            highest_degree,
            has_bachelors,
            publication_count: profile.publications.len(),
            first_author_papers,
            first_author_papers_on_topic: 0,
            expertise_match: false,
            matched_topics: rules::expertise_bag(profile).terms().to_vec(),
        }
    }

    fn degree_check(&self, highest: Option<DegreeTier>, has_bachelors: bool) -> CriterionCheck {
        CriterionCheck {
            criterion: Criterion::Degree,
            satisfied: has_bachelors,
            notes: match highest {
                Some(tier) if has_bachelors => {
                    format!("has {} degree (bachelor's or higher)", tier.label())
                }
                _ => "missing Bachelor's degree or higher".to_string(),
            },
        }
    }
}

impl Default for QualificationEvaluator {
    fn default() -> Self {
        Self::new(QualificationConfig::default())
    }
}

impl std::fmt::Debug for QualificationEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualificationEvaluator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
