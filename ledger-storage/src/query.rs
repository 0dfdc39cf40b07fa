//! Ancestor-scoped contest queries.

use ledger_core::{Category, Contest, Key, CONTEST_KIND};

/// Filter over stored contests.
///
/// Mirrors what the durable store can index: an ancestor constraint plus
/// equality filters on `applied` and the category code. Unset filters
/// match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContestQuery {
    ancestor: Option<Key>,
    applied: Option<bool>,
    category_code: Option<i32>,
    keys_only: bool,
}

impl ContestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to contests owned (directly or transitively) by `ancestor`.
    pub fn ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    pub fn applied(mut self, applied: bool) -> Self {
        self.applied = Some(applied);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category_code = Some(category.code());
        self
    }

    /// Project matches to their keys.
    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    pub fn ancestor_key(&self) -> Option<&Key> {
        self.ancestor.as_ref()
    }

    pub fn applied_filter(&self) -> Option<bool> {
        self.applied
    }

    pub fn category_filter(&self) -> Option<Category> {
        self.category_code.and_then(Category::from_code)
    }

    pub fn is_keys_only(&self) -> bool {
        self.keys_only
    }

    /// Whether a stored contest satisfies every filter.
    pub fn matches(&self, contest: &Contest) -> bool {
        contest.key.kind() == CONTEST_KIND
            && self
                .ancestor
                .as_ref()
                .map_or(true, |ancestor| ancestor.is_ancestor_of(&contest.key))
            && self.applied.map_or(true, |applied| contest.applied == applied)
            && self
                .category_code
                .map_or(true, |code| contest.category.code() == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::GameResult;

    fn contest(owner: &Key, id: i64, category: Category, applied: bool) -> Contest {
        let mut contest = Contest::new(
            id,
            owner,
            &GameResult {
                game_id: 1,
                category,
                r: 1500.0,
                rd: 350.0,
                outcome: 0.5,
            },
        );
        contest.applied = applied;
        contest
    }

    #[test]
    fn test_empty_query_matches_contests() {
        let owner = Key::owner(1);
        let query = ContestQuery::new();
        assert!(query.matches(&contest(&owner, 1, Category::Elo, true)));
        assert!(!query.is_keys_only());
        assert_eq!(query.category_filter(), None);
    }

    #[test]
    fn test_unapplied_for_owner_and_category() {
        let owner = Key::owner(1);
        let other = Key::owner(2);
        let query = ContestQuery::new()
            .ancestor(owner.clone())
            .applied(false)
            .category(Category::Tammany)
            .keys_only();

        assert!(query.is_keys_only());
        assert_eq!(query.category_filter(), Some(Category::Tammany));
        assert!(query.matches(&contest(&owner, 1, Category::Tammany, false)));
        assert!(!query.matches(&contest(&owner, 2, Category::Tammany, true)));
        assert!(!query.matches(&contest(&owner, 3, Category::Confucius, false)));
        assert!(!query.matches(&contest(&other, 4, Category::Tammany, false)));
    }

    #[test]
    fn test_other_kinds_never_match() {
        let owner = Key::owner(1);
        let mut c = contest(&owner, 1, Category::Elo, false);
        c.key = Key::new("Rating", 1, Some(owner.clone()));
        assert!(!ContestQuery::new().ancestor(owner).matches(&c));
    }
}
