//! The consumer-facing browse surface.
//!
//! `CatalogBrowser` owns the request cache and the per-session browse state,
//! and republishes a fresh [`BrowseView`] whenever any of its inputs change:
//! a page arriving, a hydration patch landing, criteria changing, or a
//! cache key updating in the background. The merge itself never suspends;
//! all fetching happens here, around it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use bestiary_catalog::{
    CatalogClientError,
    CreatureDetail,
    CreatureId,
    EvolutionNode,
    SpeciesInfo,
    SummaryRef,
};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browse::engine::{self, DimensionPool, MergeInputs, MergeOutcome};
use crate::browse::hydrate::{hydrate, HYDRATION_BATCH};
use crate::browse::pagination::{PaginationController, PaginationError};
use crate::browse::prefetch;
use crate::cache::{CacheKey, CatalogStore};
use crate::models::creature::Creature;
use crate::models::criteria::FilterCriteria;
use crate::providers::catalog::Client;

/// What consumers render: the merged, ordered view plus the signal that it
/// may still be incomplete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseView {
    pub items: Vec<Creature>,
    pub still_resolving: bool,
}

/// Reactive browser over the remote catalog.
pub struct CatalogBrowser {
    inner: Arc<BrowserInner>,
    listener: JoinHandle<()>,
}

struct BrowserInner {
    client: Client,
    store: CatalogStore,
    state: Mutex<BrowserState>,
    views: watch::Sender<BrowseView>,
}

#[derive(Default)]
struct BrowserState {
    criteria: FilterCriteria,
    pagination: PaginationController,
    /// Enrichments keyed by ID; only ever upgraded, never downgraded.
    details: HashMap<CreatureId, Creature>,
    group_pool: Option<DimensionPool>,
    tag_pool: Option<DimensionPool>,
    curated: Option<DimensionPool>,
}

impl CatalogBrowser {
    /// Requires a tokio runtime: a background task follows cache updates so
    /// out-of-band arrivals (e.g. prefetched details) reach the view.
    pub fn new(client: Client) -> Self {
        let (views, _) = watch::channel(BrowseView::default());
        let inner = Arc::new(BrowserInner {
            client,
            store: CatalogStore::new(),
            state: Mutex::new(BrowserState::default()),
            views,
        });
        let listener = spawn_detail_listener(Arc::clone(&inner));
        Self { inner, listener }
    }

    /// Subscribe to view updates; the receiver always holds the latest view.
    pub fn subscribe(&self) -> watch::Receiver<BrowseView> {
        self.inner.views.subscribe()
    }

    /// Fetch the next listing page and republish.
    ///
    /// The one operation that surfaces a fetch failure to the caller;
    /// already-accumulated data stays in the view and a later call retries.
    pub async fn fetch_next_page(&self) -> Result<(), PaginationError> {
        let mut state = self.inner.state.lock().await;
        state
            .pagination
            .fetch_next(&self.inner.store, &self.inner.client)
            .await?;
        self.inner.resolve_and_publish(&mut state).await;
        Ok(())
    }

    /// Replace the filter criteria and republish.
    pub async fn set_criteria(&self, criteria: FilterCriteria) {
        let mut state = self.inner.state.lock().await;
        state.criteria = criteria;
        self.inner.refresh_dimension_pools(&mut state).await;
        self.inner.resolve_and_publish(&mut state).await;
    }

    /// Browse an externally supplied curated ID list (favorites, a team),
    /// or stop doing so. Just another bounded ID set: it is intersected and
    /// hydrated like any dimension pool.
    pub async fn set_curated_list(&self, ids: Option<Vec<CreatureId>>) {
        let mut state = self.inner.state.lock().await;
        state.curated = ids.map(DimensionPool::from_ids);
        self.inner.resolve_and_publish(&mut state).await;
    }

    /// Warm the cache around the focused entity; fire-and-forget.
    pub fn prefetch_neighbors(&self, focused: CreatureId, ordered: &[CreatureId]) {
        prefetch::prefetch_neighbors(&self.inner.store, &self.inner.client, focused, ordered);
    }

    /// Cached read-through of one full record.
    pub async fn creature(
        &self,
        id: CreatureId,
    ) -> Result<Arc<CreatureDetail>, Arc<CatalogClientError>> {
        self.inner.store.detail(&self.inner.client, id).await
    }

    /// Cached read-through of one species record.
    pub async fn species(
        &self,
        id: CreatureId,
    ) -> Result<Arc<SpeciesInfo>, Arc<CatalogClientError>> {
        self.inner.store.species(&self.inner.client, id).await
    }

    /// The entity's evolution graph, via its species record.
    pub async fn evolution_graph(
        &self,
        id: CreatureId,
    ) -> Result<Arc<EvolutionNode>, Arc<CatalogClientError>> {
        let species = self.inner.store.species(&self.inner.client, id).await?;
        let Some(graph_url) = species.evolution_graph.as_deref() else {
            return Err(Arc::new(CatalogClientError::NotFound(format!(
                "no evolution graph for {id}"
            ))));
        };
        self.inner.store.evolution(&self.inner.client, graph_url).await
    }

    /// The global name+ID index, for autocomplete.
    pub async fn roster(&self) -> Result<Arc<Vec<SummaryRef>>, Arc<CatalogClientError>> {
        self.inner.store.roster(&self.inner.client).await
    }
}

impl Drop for CatalogBrowser {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl BrowserInner {
    /// Fetch membership for every selected group and tag through the cache.
    /// A failed membership fetch degrades that slice to an empty set rather
    /// than failing the view.
    async fn refresh_dimension_pools(&self, state: &mut BrowserState) {
        if state.criteria.groups.is_empty() {
            state.group_pool = None;
        } else {
            let mut pool = DimensionPool::default();
            for group in state.criteria.groups.clone() {
                match self.store.group_members(&self.client, group).await {
                    Ok(members) => pool.absorb_listing(&members),
                    Err(err) => {
                        warn!(group, error = %err, "group membership fetch failed; contributing empty set")
                    },
                }
            }
            state.group_pool = Some(pool);
        }
        if state.criteria.tags.is_empty() {
            state.tag_pool = None;
        } else {
            let mut pool = DimensionPool::default();
            for tag in state.criteria.tags.clone() {
                match self.store.tag_members(&self.client, &tag).await {
                    Ok(members) => pool.absorb_listing(&members),
                    Err(err) => {
                        warn!(tag = %tag, error = %err, "tag membership fetch failed; contributing empty set")
                    },
                }
            }
            state.tag_pool = Some(pool);
        }
    }

    fn recompute(&self, state: &BrowserState) -> MergeOutcome {
        engine::merge(
            &MergeInputs {
                paginated: state.pagination.accumulated(),
                details: &state.details,
                group_pool: state.group_pool.as_ref(),
                tag_pool: state.tag_pool.as_ref(),
                curated: state.curated.as_ref(),
            },
            &state.criteria,
        )
    }

    /// Recompute and publish, then keep hydrating in bounded batches and
    /// republishing until the view settles.
    async fn resolve_and_publish(&self, state: &mut BrowserState) {
        loop {
            let outcome = self.recompute(state);
            let wanted = outcome.hydration_wanted;
            self.views.send_replace(BrowseView {
                items: outcome.items,
                still_resolving: outcome.still_resolving,
            });
            if wanted.is_empty() {
                break;
            }
            let batch: Vec<CreatureId> = wanted.into_iter().take(HYDRATION_BATCH).collect();
            debug!(n_ids = batch.len(), "hydrating candidate batch");
            let patch = hydrate(&self.store, &self.client, batch).await;
            for (id, record) in patch {
                merge_detail(&mut state.details, id, record);
            }
        }
    }
}

fn merge_detail(details: &mut HashMap<CreatureId, Creature>, id: CreatureId, record: Creature) {
    match details.entry(id) {
        Entry::Occupied(mut occupied) => occupied.get_mut().merge(record),
        Entry::Vacant(vacant) => {
            vacant.insert(record);
        },
    }
}

/// Follow cache updates so details arriving outside an explicit operation
/// (prefetch warming, another surface's read-through) show up in the view.
/// Superseded or irrelevant arrivals merge harmlessly; merging is keyed by
/// ID and idempotent.
fn spawn_detail_listener(inner: Arc<BrowserInner>) -> JoinHandle<()> {
    let mut updates = inner.store.updates();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(CacheKey::Detail(id)) => absorb_detail(&inner, id).await,
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "cache event stream lagged");
                },
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn absorb_detail(inner: &BrowserInner, id: CreatureId) {
    let Some(detail) = inner.store.peek_detail(id) else {
        return;
    };
    let incoming = Creature::from((*detail).clone());
    let mut state = inner.state.lock().await;
    let changed = state.details.get(&id) != Some(&incoming);
    if !changed {
        return;
    }
    merge_detail(&mut state.details, id, incoming);
    let outcome = inner.recompute(&state);
    inner.views.send_replace(BrowseView {
        items: outcome.items,
        still_resolving: outcome.still_resolving,
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bestiary_catalog::{CatalogPage, PageCursor};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::registry;
    use crate::providers::catalog::MockClient;

    fn summaries(ids: &[CreatureId]) -> Vec<SummaryRef> {
        ids.iter()
            .map(|&id| SummaryRef {
                id,
                name: format!("name-{id}"),
            })
            .collect()
    }

    fn page(ids: &[CreatureId], next: Option<PageCursor>) -> CatalogPage {
        CatalogPage {
            summaries: summaries(ids),
            next,
            total: 1025,
        }
    }

    fn detail(id: CreatureId, name: &str, height: u32, weight: u32) -> CreatureDetail {
        CreatureDetail {
            id,
            name: name.to_string(),
            category_tags: vec!["grass".to_string()],
            height,
            weight,
            abilities: vec![],
            base_stats: vec![],
            moves: vec![],
            species_ref: None,
        }
    }

    #[tokio::test]
    async fn paginated_browsing_publishes_the_sorted_view() {
        let mock = MockClient::new();
        mock.push_page(page(&[1, 2], Some(PageCursor::at(20, 20))));
        mock.push_page(page(&[3, 4], None));
        let browser = CatalogBrowser::new(Client::Mock(mock));
        let rx = browser.subscribe();

        browser.fetch_next_page().await.unwrap();
        browser.fetch_next_page().await.unwrap();

        let view = rx.borrow().clone();
        let ids: Vec<_> = view.items.iter().map(Creature::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(!view.still_resolving);
    }

    #[tokio::test]
    async fn group_and_tag_selections_intersect_without_touching_pagination() {
        let mock = MockClient::new();
        mock.seed_group(1, summaries(&[1, 2, 3]));
        mock.seed_tag("fire", summaries(&[2, 3, 9]));
        let browser = CatalogBrowser::new(Client::Mock(mock));
        let rx = browser.subscribe();

        browser
            .set_criteria(FilterCriteria {
                groups: [1].into(),
                tags: ["fire".to_string()].into(),
                ..Default::default()
            })
            .await;

        let view = rx.borrow().clone();
        let ids: Vec<_> = view.items.iter().map(Creature::id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(!view.still_resolving);
    }

    #[tokio::test]
    async fn failed_dimension_degrades_to_an_empty_view_not_an_error() {
        let mock = MockClient::new();
        // group 1 is never seeded: the membership fetch fails
        let browser = CatalogBrowser::new(Client::Mock(mock));
        let rx = browser.subscribe();

        browser
            .set_criteria(FilterCriteria {
                groups: [1].into(),
                ..Default::default()
            })
            .await;

        let view = rx.borrow().clone();
        assert!(view.items.is_empty());
        assert!(!view.still_resolving);
    }

    #[tokio::test]
    async fn detail_filters_hydrate_and_settle() {
        let mock = MockClient::new();
        mock.push_page(page(&[1, 2], None));
        // only entity 1 is known to the detail endpoint
        mock.seed_detail(detail(1, "name-1", 10, 100));
        let browser = CatalogBrowser::new(Client::Mock(mock.clone()));
        let rx = browser.subscribe();

        browser.fetch_next_page().await.unwrap();
        browser
            .set_criteria(FilterCriteria {
                min_height: Some(1.0),
                ..Default::default()
            })
            .await;

        let view = rx.borrow().clone();
        let ids: Vec<_> = view.items.iter().map(Creature::id).collect();
        assert_eq!(ids, vec![1]);
        assert!(!view.still_resolving);
        // the failing ID was requested once and became a placeholder,
        // not re-requested on every recomputation
        assert_eq!(mock.detail_calls(2), 1);
    }

    #[tokio::test]
    async fn curated_lists_browse_like_any_pool() {
        let mock = MockClient::new();
        mock.seed_detail(detail(4, "charmander", 6, 85));
        mock.seed_detail(detail(7, "squirtle", 5, 90));
        let browser = CatalogBrowser::new(Client::Mock(mock));
        let rx = browser.subscribe();

        browser.set_curated_list(Some(vec![7, 4])).await;

        let view = rx.borrow().clone();
        let names: Vec<_> = view.items.iter().map(Creature::display_name).collect();
        assert_eq!(names, vec!["charmander", "squirtle"]);
        assert!(!view.still_resolving);

        browser.set_curated_list(None).await;
        assert!(rx.borrow().items.is_empty());
    }

    #[tokio::test]
    async fn tier_selection_pools_from_static_data() {
        let mock = MockClient::new();
        let browser = CatalogBrowser::new(Client::Mock(mock));
        let rx = browser.subscribe();

        browser
            .set_criteria(FilterCriteria {
                tier_a: true,
                tier_b: true,
                ..Default::default()
            })
            .await;

        let view = rx.borrow().clone();
        assert_eq!(
            view.items.len(),
            registry::TIER_A.len() + registry::TIER_B.len()
        );
        // nothing seeded: every member resolved to a placeholder, done
        assert!(!view.still_resolving);
    }

    #[tokio::test]
    async fn page_failure_surfaces_but_keeps_the_view() {
        let mock = MockClient::new();
        let browser = CatalogBrowser::new(Client::Mock(mock.clone()));
        let rx = browser.subscribe();

        assert!(browser.fetch_next_page().await.is_err());
        assert!(rx.borrow().items.is_empty());

        mock.push_page(page(&[1], None));
        browser.fetch_next_page().await.unwrap();
        assert_eq!(rx.borrow().items.len(), 1);
    }

    #[tokio::test]
    async fn prefetched_details_reach_the_view_through_the_listener() {
        let mock = MockClient::new();
        mock.push_page(page(&[1, 2, 3], None));
        mock.seed_detail(detail(1, "name-1", 7, 69));
        mock.seed_detail(detail(3, "name-3", 20, 1000));
        let browser = CatalogBrowser::new(Client::Mock(mock.clone()));
        let mut rx = browser.subscribe();

        browser.fetch_next_page().await.unwrap();
        browser.prefetch_neighbors(2, &[1, 2, 3]);

        let view = tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|view| {
                view.items.first().is_some_and(|first| !first.is_summary())
                    && view.items.last().is_some_and(|last| !last.is_summary())
            }),
        )
        .await
        .expect("prefetched details should reach the view")
        .unwrap()
        .clone();

        assert_eq!(mock.detail_calls(1), 1);
        assert_eq!(mock.detail_calls(3), 1);
        // the focused entity itself was not prefetched
        assert_eq!(mock.detail_calls(2), 0);
        assert!(view.items[1].is_summary());
    }

    #[tokio::test]
    async fn species_and_evolution_chain_read_through_the_cache() {
        let mock = MockClient::new();
        mock.seed_species(SpeciesInfo {
            id: 1,
            name: "bulbasaur".to_string(),
            description: "A strange seed.".to_string(),
            generation: "generation-i".to_string(),
            capture_rate: 45,
            habitat: Some("grassland".to_string()),
            legendary: false,
            mythical: false,
            evolution_graph: Some("https://catalog.test/evolution/1/".to_string()),
        });
        mock.seed_graph("https://catalog.test/evolution/1/", EvolutionNode {
            id: 1,
            name: "bulbasaur".to_string(),
            evolves_to: vec![EvolutionNode {
                id: 2,
                name: "ivysaur".to_string(),
                evolves_to: vec![],
            }],
        });
        let browser = CatalogBrowser::new(Client::Mock(mock.clone()));

        let first = browser.evolution_graph(1).await.unwrap();
        let second = browser.evolution_graph(1).await.unwrap();
        assert_eq!(first.flatten().len(), 2);
        assert_eq!(first, second);
        // both lookups were served from cache after the first round trip
        assert_eq!(
            mock.calls()
                .iter()
                .filter(|call| matches!(
                    call,
                    crate::providers::catalog::MockCall::Species(_)
                        | crate::providers::catalog::MockCall::EvolutionGraph(_)
                ))
                .count(),
            2
        );
    }
}
