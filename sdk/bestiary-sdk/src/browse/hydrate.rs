//! Detail hydration: turning summary-only IDs into full records.

use std::collections::{BTreeMap, BTreeSet};

use bestiary_catalog::CreatureId;
use tracing::warn;

use crate::cache::CatalogStore;
use crate::models::creature::Creature;
use crate::providers::catalog::Client;

/// Call sites cap hydration requests at this many IDs per round; concurrency
/// within a round is bounded by the store's in-flight de-duplication rather
/// than an explicit worker pool.
pub const HYDRATION_BATCH: usize = 20;

/// Fetch full details for exactly the given IDs, deduplicated.
///
/// Fetches run in parallel through the request cache. A failing ID never
/// fails the others and never drops out of the result: it yields a
/// placeholder record instead, so the result always has one entry per
/// requested ID. Not-found and malformed responses are treated alike.
pub async fn hydrate(
    store: &CatalogStore,
    client: &Client,
    ids: impl IntoIterator<Item = CreatureId>,
) -> BTreeMap<CreatureId, Creature> {
    let unique: BTreeSet<CreatureId> = ids.into_iter().collect();
    let fetches = unique.into_iter().map(|id| async move {
        match store.detail(client, id).await {
            Ok(detail) => (id, Creature::from((*detail).clone())),
            Err(err) => {
                warn!(%id, error = %err, "detail fetch failed, synthesizing placeholder");
                (id, Creature::placeholder(id))
            },
        }
    });
    futures::future::join_all(fetches).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bestiary_catalog::CreatureDetail;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::providers::catalog::MockClient;

    fn detail(id: CreatureId, name: &str) -> CreatureDetail {
        CreatureDetail {
            id,
            name: name.to_string(),
            category_tags: vec!["grass".to_string()],
            height: 7,
            weight: 69,
            abilities: vec![],
            base_stats: vec![],
            moves: vec![],
            species_ref: None,
        }
    }

    #[tokio::test]
    async fn every_requested_id_gets_exactly_one_entry() {
        let mock = MockClient::new();
        mock.seed_detail(detail(1, "bulbasaur"));
        mock.seed_detail(detail(2, "ivysaur"));
        let client = Client::Mock(mock);
        let store = CatalogStore::new();

        // 999 is unknown to the catalog
        let result = hydrate(&store, &client, [1, 2, 999]).await;

        assert_eq!(result.len(), 3);
        assert!(!result[&1].is_summary());
        assert!(!result[&2].is_summary());
        let fallback = &result[&999];
        assert!(fallback.is_placeholder());
        assert!(fallback.category_tags().is_empty());
        assert_eq!(fallback.display_name(), "creature-999");
    }

    #[tokio::test]
    async fn input_ids_are_deduplicated() {
        let mock = MockClient::new();
        mock.seed_detail(detail(1, "bulbasaur"));
        let client = Client::Mock(mock.clone());
        let store = CatalogStore::new();

        let result = hydrate(&store, &client, [1, 1, 1]).await;

        assert_eq!(result.len(), 1);
        assert_eq!(mock.detail_calls(1), 1);
    }

    #[tokio::test]
    async fn concurrent_hydration_of_one_id_issues_one_call() {
        let mock = MockClient::new();
        mock.seed_detail(detail(1, "bulbasaur"));
        mock.set_detail_delay(Duration::from_millis(20));
        let client = Client::Mock(mock.clone());
        let store = CatalogStore::new();

        let (first, second) = tokio::join!(
            hydrate(&store, &client, [1]),
            hydrate(&store, &client, [1])
        );

        assert!(!first[&1].is_summary());
        assert!(!second[&1].is_summary());
        assert_eq!(mock.detail_calls(1), 1);
    }

    #[tokio::test]
    async fn failed_ids_are_retried_on_the_next_round() {
        let mock = MockClient::new();
        let client = Client::Mock(mock.clone());
        let store = CatalogStore::new();

        let first = hydrate(&store, &client, [7]).await;
        assert!(first[&7].is_placeholder());

        // the failure was not cached; once the catalog knows the entity,
        // hydration succeeds
        mock.seed_detail(detail(7, "squirtle"));
        let second = hydrate(&store, &client, [7]).await;
        assert!(!second[&7].is_summary());
        assert_eq!(mock.detail_calls(7), 2);
    }
}
