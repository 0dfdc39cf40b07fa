//! Contest generation from finished games.

use crate::{Contest, Places};

/// Flatten the per-placement results of a game into unsaved contests.
///
/// One contest is produced per result, keyed as an incomplete child of the
/// result's owner. Output order follows map iteration and is not stable.
pub fn gen_contests(places: &Places) -> Vec<Contest> {
    let capacity = places
        .iter()
        .flat_map(|results| results.values())
        .map(Vec::len)
        .sum();

    let mut contests = Vec::with_capacity(capacity);
    for results in places {
        for (owner, owner_results) in results {
            contests.extend(owner_results.iter().map(|r| Contest::new(0, owner, r)));
        }
    }

    tracing::debug!(places = places.len(), contests = contests.len(), "Generated contests");
    contests
}
