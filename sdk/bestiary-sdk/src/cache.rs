//! Keyed asynchronous request cache.
//!
//! One store memoizes every remote operation the SDK performs. Keys are a
//! typed enum derived from the full parameter set of each operation kind, so
//! collisions are impossible by construction. Concurrent requests for the
//! same key share a single in-flight producer; failures are never cached and
//! propagate to every waiter, leaving the key free for an immediate retry.
//!
//! Every completed insert is published on a broadcast channel so reactive
//! consumers can recompute when a key they depend on updates, instead of
//! polling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bestiary_catalog::{
    CatalogClientError,
    CatalogPage,
    CreatureDetail,
    CreatureId,
    EvolutionNode,
    PageCursor,
    SpeciesInfo,
    SummaryRef,
};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::broadcast;
use tracing::debug;

use crate::providers::catalog::{Client, ClientTrait};

/// Catalog pages go stale after five minutes.
pub const PAGE_FRESHNESS: Option<Duration> = Some(Duration::from_secs(5 * 60));
/// Per-entity detail and species metadata go stale after ten minutes.
pub const DETAIL_FRESHNESS: Option<Duration> = Some(Duration::from_secs(10 * 60));
/// Grouping membership, evolution graphs and the roster are immutable
/// reference data; they never go stale.
pub const REFERENCE_FRESHNESS: Option<Duration> = None;

/// Typed cache key: one variant per operation kind, carrying the operation's
/// full parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Page { offset: u32 },
    Detail(CreatureId),
    Species(CreatureId),
    Evolution(String),
    Group(u8),
    Tag(String),
    Roster,
}

/// Cached payload; variants correspond one-to-one with [`CacheKey`] kinds
/// (group, tag and roster listings share the `Listing` shape).
#[derive(Debug, Clone)]
pub enum CachedValue {
    Page(Arc<CatalogPage>),
    Detail(Arc<CreatureDetail>),
    Species(Arc<SpeciesInfo>),
    Evolution(Arc<EvolutionNode>),
    Listing(Arc<Vec<SummaryRef>>),
}

type FetchError = Arc<CatalogClientError>;
type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, FetchError>>>;

enum Slot {
    /// A producer is in flight; concurrent callers await the same future.
    Pending(SharedFetch),
    /// A value is present; freshness is judged against the entry's age.
    Ready {
        value: CachedValue,
        fetched_at: Instant,
    },
}

/// The keyed store.
#[derive(Clone)]
pub struct CatalogStore {
    slots: Arc<Mutex<HashMap<CacheKey, Slot>>>,
    events: broadcast::Sender<CacheKey>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Subscribe to key-update notifications.
    pub fn updates(&self) -> broadcast::Receiver<CacheKey> {
        self.events.subscribe()
    }

    /// Non-fetching read of a cached detail record, regardless of age.
    pub fn peek_detail(&self, id: CreatureId) -> Option<Arc<CreatureDetail>> {
        let slots = self.slots.lock().expect("cache lock poisoned");
        match slots.get(&CacheKey::Detail(id)) {
            Some(Slot::Ready {
                value: CachedValue::Detail(detail),
                ..
            }) => Some(Arc::clone(detail)),
            _ => None,
        }
    }

    /// Return the cached value for `key` if unexpired, otherwise run
    /// `producer` — at most once per key, no matter how many callers race.
    pub async fn get_or_fetch<F>(
        &self,
        key: CacheKey,
        window: Option<Duration>,
        producer: F,
    ) -> Result<CachedValue, FetchError>
    where
        F: std::future::Future<Output = Result<CachedValue, CatalogClientError>> + Send + 'static,
    {
        let fetch = {
            let mut slots = self.slots.lock().expect("cache lock poisoned");
            match slots.get(&key) {
                Some(Slot::Ready { value, fetched_at }) if is_fresh(*fetched_at, window) => {
                    return Ok(value.clone());
                },
                Some(Slot::Pending(shared)) => shared.clone(),
                _ => {
                    // absent or stale: install one shared producer
                    let slots_handle = Arc::clone(&self.slots);
                    let events = self.events.clone();
                    let producer_key = key.clone();
                    let shared = async move {
                        match producer.await {
                            Ok(value) => {
                                slots_handle.lock().expect("cache lock poisoned").insert(
                                    producer_key.clone(),
                                    Slot::Ready {
                                        value: value.clone(),
                                        fetched_at: Instant::now(),
                                    },
                                );
                                let _ = events.send(producer_key);
                                Ok(value)
                            },
                            Err(err) => {
                                // failures are never cached; the key is
                                // immediately retryable
                                slots_handle
                                    .lock()
                                    .expect("cache lock poisoned")
                                    .remove(&producer_key);
                                debug!(key = ?producer_key, error = %err, "producer failed");
                                Err(Arc::new(err))
                            },
                        }
                    }
                    .boxed()
                    .shared();
                    slots.insert(key.clone(), Slot::Pending(shared.clone()));
                    shared
                },
            }
        };
        fetch.await
    }

    // -----------------------------------------------------------------------
    // Typed read-throughs, one per operation kind
    // -----------------------------------------------------------------------

    pub async fn page(
        &self,
        client: &Client,
        cursor: PageCursor,
    ) -> Result<Arc<CatalogPage>, FetchError> {
        let owned = client.clone();
        let value = self
            .get_or_fetch(
                CacheKey::Page {
                    offset: cursor.offset(),
                },
                PAGE_FRESHNESS,
                async move {
                    owned
                        .list_page(cursor)
                        .await
                        .map(|page| CachedValue::Page(Arc::new(page)))
                },
            )
            .await?;
        match value {
            CachedValue::Page(page) => Ok(page),
            _ => unreachable!("page key always stores a page"),
        }
    }

    pub async fn detail(
        &self,
        client: &Client,
        id: CreatureId,
    ) -> Result<Arc<CreatureDetail>, FetchError> {
        let owned = client.clone();
        let value = self
            .get_or_fetch(CacheKey::Detail(id), DETAIL_FRESHNESS, async move {
                owned
                    .get_creature(id)
                    .await
                    .map(|detail| CachedValue::Detail(Arc::new(detail)))
            })
            .await?;
        match value {
            CachedValue::Detail(detail) => Ok(detail),
            _ => unreachable!("detail key always stores a detail"),
        }
    }

    pub async fn species(
        &self,
        client: &Client,
        id: CreatureId,
    ) -> Result<Arc<SpeciesInfo>, FetchError> {
        let owned = client.clone();
        let value = self
            .get_or_fetch(CacheKey::Species(id), DETAIL_FRESHNESS, async move {
                owned
                    .get_species(id)
                    .await
                    .map(|species| CachedValue::Species(Arc::new(species)))
            })
            .await?;
        match value {
            CachedValue::Species(species) => Ok(species),
            _ => unreachable!("species key always stores species info"),
        }
    }

    pub async fn evolution(
        &self,
        client: &Client,
        graph_url: &str,
    ) -> Result<Arc<EvolutionNode>, FetchError> {
        let owned = client.clone();
        let url = graph_url.to_string();
        let value = self
            .get_or_fetch(
                CacheKey::Evolution(url.clone()),
                REFERENCE_FRESHNESS,
                async move {
                    owned
                        .get_evolution_graph(&url)
                        .await
                        .map(|graph| CachedValue::Evolution(Arc::new(graph)))
                },
            )
            .await?;
        match value {
            CachedValue::Evolution(graph) => Ok(graph),
            _ => unreachable!("evolution key always stores a graph"),
        }
    }

    pub async fn group_members(
        &self,
        client: &Client,
        group: u8,
    ) -> Result<Arc<Vec<SummaryRef>>, FetchError> {
        let owned = client.clone();
        let value = self
            .get_or_fetch(CacheKey::Group(group), REFERENCE_FRESHNESS, async move {
                owned
                    .list_by_group(group)
                    .await
                    .map(|members| CachedValue::Listing(Arc::new(members)))
            })
            .await?;
        match value {
            CachedValue::Listing(members) => Ok(members),
            _ => unreachable!("group key always stores a listing"),
        }
    }

    pub async fn tag_members(
        &self,
        client: &Client,
        tag: &str,
    ) -> Result<Arc<Vec<SummaryRef>>, FetchError> {
        let owned = client.clone();
        let tag_owned = tag.to_string();
        let value = self
            .get_or_fetch(
                CacheKey::Tag(tag_owned.clone()),
                REFERENCE_FRESHNESS,
                async move {
                    owned
                        .list_by_tag(&tag_owned)
                        .await
                        .map(|members| CachedValue::Listing(Arc::new(members)))
                },
            )
            .await?;
        match value {
            CachedValue::Listing(members) => Ok(members),
            _ => unreachable!("tag key always stores a listing"),
        }
    }

    pub async fn roster(&self, client: &Client) -> Result<Arc<Vec<SummaryRef>>, FetchError> {
        let owned = client.clone();
        let value = self
            .get_or_fetch(CacheKey::Roster, REFERENCE_FRESHNESS, async move {
                owned
                    .list_roster()
                    .await
                    .map(|roster| CachedValue::Listing(Arc::new(roster)))
            })
            .await?;
        match value {
            CachedValue::Listing(roster) => Ok(roster),
            _ => unreachable!("roster key always stores a listing"),
        }
    }
}

fn is_fresh(fetched_at: Instant, window: Option<Duration>) -> bool {
    match window {
        Some(window) => fetched_at.elapsed() <= window,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn listing(id: CreatureId, name: &str) -> Result<CachedValue, CatalogClientError> {
        Ok(CachedValue::Listing(Arc::new(vec![SummaryRef {
            id,
            name: name.to_string(),
        }])))
    }

    fn unwrap_listing(value: CachedValue) -> Vec<SummaryRef> {
        match value {
            CachedValue::Listing(listing) => (*listing).clone(),
            other => panic!("expected listing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fresh_hit_skips_the_producer() {
        let store = CatalogStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let value = store
                .get_or_fetch(CacheKey::Roster, REFERENCE_FRESHNESS, async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    listing(1, "bulbasaur")
                })
                .await
                .unwrap();
            assert_eq!(unwrap_listing(value)[0].id, 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_producer() {
        let store = CatalogStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |store: CatalogStore, calls: Arc<AtomicUsize>| async move {
            store
                .get_or_fetch(CacheKey::Detail(25), DETAIL_FRESHNESS, async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // hold the slot long enough for the second caller to join
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(CachedValue::Detail(Arc::new(CreatureDetail {
                        id: 25,
                        name: "pikachu".to_string(),
                        category_tags: vec![],
                        height: 4,
                        weight: 60,
                        abilities: vec![],
                        base_stats: vec![],
                        moves: vec![],
                        species_ref: None,
                    })))
                })
                .await
        };

        let (first, second) = tokio::join!(
            fetch(store.clone(), Arc::clone(&calls)),
            fetch(store.clone(), Arc::clone(&calls))
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_propagate_to_all_waiters_and_are_not_cached() {
        let store = CatalogStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = |store: CatalogStore, calls: Arc<AtomicUsize>| async move {
            store
                .get_or_fetch(CacheKey::Roster, REFERENCE_FRESHNESS, async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err::<CachedValue, _>(CatalogClientError::NotFound("/roster".to_string()))
                })
                .await
        };

        let (first, second) = tokio::join!(
            failing(store.clone(), Arc::clone(&calls)),
            failing(store.clone(), Arc::clone(&calls))
        );
        assert!(first.is_err());
        assert!(second.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // the failure was not cached: a retry invokes the producer again
        let calls_for_retry = Arc::clone(&calls);
        let retried = store
            .get_or_fetch(CacheKey::Roster, REFERENCE_FRESHNESS, async move {
                calls_for_retry.fetch_add(1, Ordering::SeqCst);
                listing(1, "bulbasaur")
            })
            .await;
        assert!(retried.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let store = CatalogStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            store
                .get_or_fetch(
                    CacheKey::Page { offset: 0 },
                    Some(Duration::ZERO),
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        listing(1, "bulbasaur")
                    },
                )
                .await
                .unwrap();
            // anything older than a zero-width window is stale
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn completed_inserts_are_published() {
        let store = CatalogStore::new();
        let mut updates = store.updates();

        store
            .get_or_fetch(CacheKey::Group(1), REFERENCE_FRESHNESS, async {
                listing(1, "bulbasaur")
            })
            .await
            .unwrap();

        assert_eq!(updates.recv().await.unwrap(), CacheKey::Group(1));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_share_producers() {
        let store = CatalogStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |store: CatalogStore, calls: Arc<AtomicUsize>, tag: &'static str| async move {
            store
                .get_or_fetch(CacheKey::Tag(tag.to_string()), REFERENCE_FRESHNESS, {
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        listing(4, "charmander")
                    }
                })
                .await
        };

        let (first, second) = tokio::join!(
            fetch(store.clone(), Arc::clone(&calls), "fire"),
            fetch(store.clone(), Arc::clone(&calls), "water")
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
