//! Contest ledger entities.

use crate::{contest_key, Category, Key, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A pending rating adjustment produced by one finished game.
///
/// Contests are children of the owning user's key. `applied` only ever
/// moves from `false` to `true`; undoing an application is outside this
/// crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub key: Key,
    pub game_id: i64,
    pub category: Category,
    /// Rating at the time of the game
    pub r: f64,
    /// Rating deviation at the time of the game
    pub rd: f64,
    /// Normalized result, 1.0 win / 0.5 draw / 0.0 loss
    pub outcome: f64,
    pub applied: bool,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl Contest {
    /// Build an unapplied, unsaved contest for `owner` from one game result.
    pub fn new(id: i64, owner: &Key, result: &GameResult) -> Self {
        Self {
            key: contest_key(id, owner),
            game_id: result.game_id,
            category: result.category,
            r: result.r,
            rd: result.rd,
            outcome: result.outcome,
            applied: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Key of the owning user.
    pub fn owner(&self) -> Option<&Key> {
        self.key.parent()
    }

    /// Flag the adjustment as folded into the owner's rating.
    ///
    /// Returns `true` if this call made the transition.
    pub fn mark_applied(&mut self) -> bool {
        if self.applied {
            return false;
        }
        self.applied = true;
        true
    }

    /// Refresh persistence timestamps. Called by stores on every save.
    pub fn stamp(&mut self, now: Timestamp) {
        let created_at = *self.created_at.get_or_insert(now);
        self.updated_at = Some(now.max(created_at));
    }
}

/// One participant's outcome from one game.
///
/// Never persisted; only used to generate contests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub game_id: i64,
    pub category: Category,
    pub r: f64,
    pub rd: f64,
    pub outcome: f64,
}

/// Results of one game keyed by the owning user.
pub type ResultsMap = HashMap<Key, Vec<GameResult>>;

/// One [`ResultsMap`] per placement.
pub type Places = Vec<ResultsMap>;

/// Unapplied contests grouped by category.
///
/// Categories without contests have no entry.
pub type ContestMap = BTreeMap<Category, Vec<Contest>>;
