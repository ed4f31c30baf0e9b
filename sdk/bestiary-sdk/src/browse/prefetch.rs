//! Best-effort cache warming for neighboring entities.

use bestiary_catalog::CreatureId;

use crate::cache::CatalogStore;
use crate::models::registry::MAX_CREATURE_ID;
use crate::providers::catalog::Client;

/// Immediate predecessor and successor of `focused` in the ordered sequence.
///
/// Without a sequence (or when `focused` is not in it), falls back to
/// `focused ± 1` clamped to the known valid ID range.
pub fn neighbor_ids(
    focused: CreatureId,
    ordered: &[CreatureId],
) -> (Option<CreatureId>, Option<CreatureId>) {
    if let Some(position) = ordered.iter().position(|&id| id == focused) {
        let previous = position.checked_sub(1).map(|index| ordered[index]);
        let next = ordered.get(position + 1).copied();
        return (previous, next);
    }
    let previous = (focused > 1).then(|| focused - 1);
    let next = (focused < MAX_CREATURE_ID).then(|| focused + 1);
    (previous, next)
}

/// Issue non-blocking hydration requests for both neighbors, ignoring
/// results and errors. No observable contract beyond possibly reducing a
/// future fetch's latency.
pub fn prefetch_neighbors(
    store: &CatalogStore,
    client: &Client,
    focused: CreatureId,
    ordered: &[CreatureId],
) {
    let (previous, next) = neighbor_ids(focused, ordered);
    for id in [previous, next].into_iter().flatten() {
        let store = store.clone();
        let client = client.clone();
        tokio::spawn(async move {
            let _ = store.detail(&client, id).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn neighbors_come_from_the_ordered_sequence() {
        assert_eq!(neighbor_ids(7, &[4, 7, 9]), (Some(4), Some(9)));
        assert_eq!(neighbor_ids(4, &[4, 7, 9]), (None, Some(7)));
        assert_eq!(neighbor_ids(9, &[4, 7, 9]), (Some(7), None));
    }

    #[test]
    fn fallback_is_adjacent_ids_clamped_to_the_valid_range() {
        assert_eq!(neighbor_ids(25, &[]), (Some(24), Some(26)));
        assert_eq!(neighbor_ids(1, &[]), (None, Some(2)));
        assert_eq!(
            neighbor_ids(MAX_CREATURE_ID, &[]),
            (Some(MAX_CREATURE_ID - 1), None)
        );
    }

    #[test]
    fn unknown_focus_falls_back_to_adjacent_ids() {
        assert_eq!(neighbor_ids(25, &[4, 7, 9]), (Some(24), Some(26)));
    }
}
