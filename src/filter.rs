use std::collections::BTreeSet;

use crate::config::Configuration;

/// Pure predicate deciding whether an image's metadata matches the
/// configured criteria. Tags are expected lowercased on both sides.
#[derive(Debug, Clone, Default)]
pub struct FilterPredicate {
    min_rating: u8,
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl FilterPredicate {
    pub fn new(min_rating: u8, include: BTreeSet<String>, exclude: BTreeSet<String>) -> Self {
        Self {
            min_rating,
            include,
            exclude,
        }
    }

    pub fn from_config(cfg: &Configuration) -> Self {
        Self::new(cfg.min_rating, cfg.include_tag_set(), cfg.exclude_tag_set())
    }

    /// An absent rating compares as 0. Exclusion wins over inclusion.
    pub fn matches(&self, rating: Option<u8>, tags: &BTreeSet<String>) -> bool {
        if rating.unwrap_or(0) < self.min_rating {
            return false;
        }
        if tags.iter().any(|t| self.exclude.contains(t)) {
            return false;
        }
        self.include.is_empty() || tags.iter().any(|t| self.include.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn absent_rating_fails_positive_minimum() {
        let pred = FilterPredicate::new(3, BTreeSet::new(), BTreeSet::new());
        assert!(!pred.matches(None, &BTreeSet::new()));
        assert!(!pred.matches(Some(2), &BTreeSet::new()));
        assert!(pred.matches(Some(3), &BTreeSet::new()));
    }

    #[test]
    fn include_matches_on_intersection() {
        let pred = FilterPredicate::new(0, tags(&["vacation", "family"]), BTreeSet::new());
        assert!(pred.matches(Some(0), &tags(&["family"])));
        assert!(!pred.matches(Some(5), &tags(&["work"])));
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        let pred = FilterPredicate::new(0, tags(&["family"]), tags(&["private"]));
        assert!(!pred.matches(Some(5), &tags(&["private", "family"])));
        assert!(pred.matches(Some(0), &tags(&["family"])));
    }

    #[test]
    fn empty_include_matches_untagged() {
        let pred = FilterPredicate::new(0, BTreeSet::new(), tags(&["private"]));
        assert!(pred.matches(None, &BTreeSet::new()));
        assert!(!pred.matches(None, &tags(&["private"])));
    }
}
