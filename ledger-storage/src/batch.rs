//! Positional results of a multi-key lookup.

use ledger_core::{BatchError, Contest, ContestError, ContestResult, MultiError};

/// One lookup outcome per requested key, in request order.
///
/// A batch never aborts early: every key gets its own slot. Callers choose
/// between collecting everything ([`Batch::iter`]), failing fast
/// ([`Batch::first_error`]) or the all-or-partial view of
/// [`Batch::into_result`].
#[derive(Debug, Clone, Default)]
pub struct Batch {
    slots: Vec<ContestResult<Contest>>,
}

impl Batch {
    pub fn new(slots: Vec<ContestResult<Contest>>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Outcome for the key at `index`.
    pub fn get(&self, index: usize) -> Option<&ContestResult<Contest>> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContestResult<Contest>> {
        self.slots.iter()
    }

    pub fn into_slots(self) -> Vec<ContestResult<Contest>> {
        self.slots
    }

    /// True when every key resolved.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Result::is_ok)
    }

    /// Position and error of the first failed key.
    pub fn first_error(&self) -> Option<(usize, &ContestError)> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(i, slot)| slot.as_ref().err().map(|e| (i, e)))
    }

    /// All contests, or the partial results plus per-key errors.
    pub fn into_result(self) -> Result<Vec<Contest>, BatchError> {
        if self.is_complete() {
            return Ok(self.slots.into_iter().flatten().collect());
        }

        let (partial, errors) = self
            .slots
            .into_iter()
            .map(|slot| match slot {
                Ok(contest) => (Some(contest), None),
                Err(e) => (None, Some(e)),
            })
            .unzip();
        Err(BatchError::new(partial, MultiError::new(errors)))
    }
}

impl FromIterator<ContestResult<Contest>> for Batch {
    fn from_iter<I: IntoIterator<Item = ContestResult<Contest>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Batch {
    type Item = ContestResult<Contest>;
    type IntoIter = std::vec::IntoIter<ContestResult<Contest>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{Category, GameResult, Key, StoreError};

    fn contest(id: i64) -> Contest {
        Contest::new(
            id,
            &Key::owner(1),
            &GameResult {
                game_id: id,
                category: Category::Elo,
                r: 1500.0,
                rd: 200.0,
                outcome: 1.0,
            },
        )
    }

    fn missing(id: i64) -> ContestError {
        ContestError::Store(StoreError::NotFound {
            key: ledger_core::contest_key(id, &Key::owner(1)),
        })
    }

    #[test]
    fn test_empty_batch_is_ok() {
        let batch = Batch::default();
        assert!(batch.is_complete());
        assert!(batch.first_error().is_none());
        assert!(batch.into_result().unwrap().is_empty());
    }

    #[test]
    fn test_complete_batch_keeps_order() {
        let batch: Batch = vec![Ok(contest(3)), Ok(contest(1)), Ok(contest(2))]
            .into_iter()
            .collect();
        let ids: Vec<i64> = batch.into_result().unwrap().iter().map(|c| c.key.id()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_partial_batch_reports_positions() {
        let batch = Batch::new(vec![Ok(contest(1)), Err(missing(2)), Ok(contest(3))]);
        assert!(!batch.is_complete());
        assert_eq!(batch.first_error().map(|(i, _)| i), Some(1));

        let err = batch.into_result().unwrap_err();
        assert_eq!(err.partial().len(), 3);
        assert!(err.partial()[0].is_some());
        assert!(err.partial()[1].is_none());
        assert!(err.partial()[2].is_some());

        let failures: Vec<usize> = err.errors().failures().map(|(i, _)| i).collect();
        assert_eq!(failures, vec![1]);
        assert!(err.errors().get(1).is_some_and(ContestError::is_not_found));
    }
}
