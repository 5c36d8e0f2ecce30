use super::super::profile::{EducationRecord, Publication, ReviewerProfile};
use super::super::topics::KeywordBag;
use super::config::{DegreeTier, QualificationConfig};
use super::names::NameMatcher;

pub(crate) fn highest_degree(
    education: &[EducationRecord],
    config: &QualificationConfig,
) -> Option<DegreeTier> {
    education
        .iter()
        .filter_map(|record| degree_tier(&record.degree, config))
        .max()
}

fn degree_tier(degree: &str, config: &QualificationConfig) -> Option<DegreeTier> {
    let text = degree.to_lowercase();
    let tokens: Vec<&str> = text
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();

    config
        .degree_keywords
        .iter()
        .filter(|keywords| {
            keywords.substrings.iter().any(|needle| text.contains(needle))
                || keywords.tokens.iter().any(|needle| tokens.contains(needle))
        })
        .map(|keywords| keywords.tier)
        .max()
}

pub(crate) fn is_first_author(
    publication: &Publication,
    reviewer_name: &str,
    matcher: &dyn NameMatcher,
) -> bool {
    publication
        .authors
        .first()
        .map(|first| matcher.is_same_person(reviewer_name, first))
        .unwrap_or(false)
}

pub(crate) fn count_first_author(profile: &ReviewerProfile, matcher: &dyn NameMatcher) -> usize {
    profile
        .publications
        .iter()
        .filter(|publication| is_first_author(publication, &profile.full_name, matcher))
        .count()
}

pub(crate) fn publication_bag(publication: &Publication) -> KeywordBag {
    let mut bag = KeywordBag::new();
    bag.push_text(&publication.title);
    if let Some(venue) = &publication.venue {
        bag.push_text(venue);
    }
    bag
}

pub(crate) fn count_first_author_on_topic(
    profile: &ReviewerProfile,
    matcher: &dyn NameMatcher,
    manuscript: &KeywordBag,
) -> usize {
    profile
        .publications
        .iter()
        .filter(|publication| is_first_author(publication, &profile.full_name, matcher))
        .filter(|publication| publication_bag(publication).overlaps(manuscript))
        .count()
}

/// Field, profession, publication history and experience, in that order.
pub(crate) fn expertise_bag(profile: &ReviewerProfile) -> KeywordBag {
    let mut bag = KeywordBag::new();
    if !profile.field.eq_ignore_ascii_case("unknown") {
        bag.push_term(&profile.field);
    }
    if let Some(profession) = &profile.profession {
        bag.push_term(profession);
    }
    for publication in &profile.publications {
        if let Some(venue) = &publication.venue {
            bag.push_term(venue);
        }
        bag.push_text(&publication.title);
    }
    for entry in &profile.experience {
        if let Some(position) = &entry.position {
            bag.push_term(position);
        }
        if let Some(description) = &entry.description {
            bag.push_text(description);
        }
    }
    bag
}
