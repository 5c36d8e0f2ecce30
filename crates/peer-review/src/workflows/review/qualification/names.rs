/// Decides whether a printed author name refers to a reviewer.
///
/// Profiles do not carry stable author identifiers yet, so the default implementation is a
/// heuristic. Two reviewers sharing a name are both credited with the same papers.
pub trait NameMatcher: Send + Sync {
    fn is_same_person(&self, reviewer_name: &str, printed_author: &str) -> bool;
}

/// Printed author must contain the reviewer's first and last name tokens (case-insensitive).
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateNameMatcher;

impl NameMatcher for ApproximateNameMatcher {
    fn is_same_person(&self, reviewer_name: &str, printed_author: &str) -> bool {
        let name = reviewer_name.to_lowercase();
        let mut tokens = name.split_whitespace();
        let Some(first) = tokens.next() else {
            return false;
        };
        let last = tokens.last().unwrap_or(first);

        let author = printed_author.to_lowercase();
        author.contains(first) && author.contains(last)
    }
}
