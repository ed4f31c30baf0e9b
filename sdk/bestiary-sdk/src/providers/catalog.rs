//! Catalog provider: the consumed API contract and its implementations.
//!
//! Either a client for the actual remote catalog, or a mock client seeded
//! with canned responses for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bestiary_catalog::{
    CatalogClientError,
    CatalogHttpClient,
    CatalogPage,
    CreatureDetail,
    CreatureId,
    EvolutionNode,
    PageCursor,
    SpeciesInfo,
    SummaryRef,
};
use enum_dispatch::enum_dispatch;

/// The catalog API surface the SDK consumes.
#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// One fixed-size page of the catalog listing.
    async fn list_page(&self, cursor: PageCursor) -> Result<CatalogPage, CatalogClientError>;

    /// Full record for one entity.
    async fn get_creature(&self, id: CreatureId) -> Result<CreatureDetail, CatalogClientError>;

    /// Classification and narrative metadata for one entity.
    async fn get_species(&self, id: CreatureId) -> Result<SpeciesInfo, CatalogClientError>;

    /// Evolution graph by resource URL.
    async fn get_evolution_graph(
        &self,
        graph_url: &str,
    ) -> Result<EvolutionNode, CatalogClientError>;

    /// Full membership of one category group.
    async fn list_by_group(&self, group: u8) -> Result<Vec<SummaryRef>, CatalogClientError>;

    /// Full membership of one tag.
    async fn list_by_tag(&self, tag: &str) -> Result<Vec<SummaryRef>, CatalogClientError>;

    /// The global name+ID index.
    async fn list_roster(&self) -> Result<Vec<SummaryRef>, CatalogClientError>;
}

/// Either a client for the actual catalog service, or a mock client for
/// testing.
#[derive(Debug, Clone)]
#[enum_dispatch(ClientTrait)]
pub enum Client {
    Http(CatalogHttpClient),
    Mock(MockClient),
}

impl ClientTrait for CatalogHttpClient {
    async fn list_page(&self, cursor: PageCursor) -> Result<CatalogPage, CatalogClientError> {
        CatalogHttpClient::list_page(self, cursor).await
    }

    async fn get_creature(&self, id: CreatureId) -> Result<CreatureDetail, CatalogClientError> {
        CatalogHttpClient::get_creature(self, id).await
    }

    async fn get_species(&self, id: CreatureId) -> Result<SpeciesInfo, CatalogClientError> {
        CatalogHttpClient::get_species(self, id).await
    }

    async fn get_evolution_graph(
        &self,
        graph_url: &str,
    ) -> Result<EvolutionNode, CatalogClientError> {
        CatalogHttpClient::get_evolution_graph(self, graph_url).await
    }

    async fn list_by_group(&self, group: u8) -> Result<Vec<SummaryRef>, CatalogClientError> {
        CatalogHttpClient::list_by_group(self, group).await
    }

    async fn list_by_tag(&self, tag: &str) -> Result<Vec<SummaryRef>, CatalogClientError> {
        CatalogHttpClient::list_by_tag(self, tag).await
    }

    async fn list_roster(&self) -> Result<Vec<SummaryRef>, CatalogClientError> {
        CatalogHttpClient::list_roster(self).await
    }
}

// ---------------------------------------------------------------------------
// Mock client
// ---------------------------------------------------------------------------

// Arc/Mutex so seeded data can be pushed from outside the client and shared
// across tasks.
type MockField<T> = Arc<Mutex<T>>;

/// One recorded call against the mock, used by tests asserting request
/// de-duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListPage(u32),
    Detail(CreatureId),
    Species(CreatureId),
    EvolutionGraph(String),
    Group(u8),
    Tag(String),
    Roster,
}

/// A catalog client that can be seeded with canned responses.
///
/// Unseeded lookups answer `NotFound`, which is exactly the shape of a
/// permanent miss in production.
#[derive(Debug, Default, Clone)]
pub struct MockClient {
    pages: MockField<VecDeque<CatalogPage>>,
    details: MockField<HashMap<CreatureId, CreatureDetail>>,
    species: MockField<HashMap<CreatureId, SpeciesInfo>>,
    graphs: MockField<HashMap<String, EvolutionNode>>,
    groups: MockField<HashMap<u8, Vec<SummaryRef>>>,
    tags: MockField<HashMap<String, Vec<SummaryRef>>>,
    roster: MockField<Option<Vec<SummaryRef>>>,
    /// Artificial latency per detail call, so tests can overlap requests.
    detail_delay: MockField<Option<Duration>>,
    calls: MockField<Vec<MockCall>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next listing page; pages are served in push order.
    pub fn push_page(&self, page: CatalogPage) {
        self.pages
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(page);
    }

    pub fn seed_detail(&self, detail: CreatureDetail) {
        self.details
            .lock()
            .expect("couldn't acquire mock lock")
            .insert(detail.id, detail);
    }

    pub fn seed_species(&self, species: SpeciesInfo) {
        self.species
            .lock()
            .expect("couldn't acquire mock lock")
            .insert(species.id, species);
    }

    pub fn seed_graph(&self, url: impl Into<String>, graph: EvolutionNode) {
        self.graphs
            .lock()
            .expect("couldn't acquire mock lock")
            .insert(url.into(), graph);
    }

    pub fn seed_group(&self, group: u8, members: Vec<SummaryRef>) {
        self.groups
            .lock()
            .expect("couldn't acquire mock lock")
            .insert(group, members);
    }

    pub fn seed_tag(&self, tag: impl Into<String>, members: Vec<SummaryRef>) {
        self.tags
            .lock()
            .expect("couldn't acquire mock lock")
            .insert(tag.into(), members);
    }

    pub fn seed_roster(&self, roster: Vec<SummaryRef>) {
        *self.roster.lock().expect("couldn't acquire mock lock") = Some(roster);
    }

    pub fn set_detail_delay(&self, delay: Duration) {
        *self.detail_delay.lock().expect("couldn't acquire mock lock") = Some(delay);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    /// How many detail calls were made for `id`.
    pub fn detail_calls(&self, id: CreatureId) -> usize {
        self.calls()
            .into_iter()
            .filter(|call| *call == MockCall::Detail(id))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.calls
            .lock()
            .expect("couldn't acquire mock lock")
            .push(call);
    }
}

impl ClientTrait for MockClient {
    async fn list_page(&self, cursor: PageCursor) -> Result<CatalogPage, CatalogClientError> {
        self.record(MockCall::ListPage(cursor.offset()));
        self.pages
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front()
            .ok_or_else(|| CatalogClientError::NotFound("mock listing exhausted".to_string()))
    }

    async fn get_creature(&self, id: CreatureId) -> Result<CreatureDetail, CatalogClientError> {
        self.record(MockCall::Detail(id));
        let delay = *self.detail_delay.lock().expect("couldn't acquire mock lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.details
            .lock()
            .expect("couldn't acquire mock lock")
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogClientError::NotFound(format!("/creature/{id}")))
    }

    async fn get_species(&self, id: CreatureId) -> Result<SpeciesInfo, CatalogClientError> {
        self.record(MockCall::Species(id));
        self.species
            .lock()
            .expect("couldn't acquire mock lock")
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogClientError::NotFound(format!("/species/{id}")))
    }

    async fn get_evolution_graph(
        &self,
        graph_url: &str,
    ) -> Result<EvolutionNode, CatalogClientError> {
        self.record(MockCall::EvolutionGraph(graph_url.to_string()));
        self.graphs
            .lock()
            .expect("couldn't acquire mock lock")
            .get(graph_url)
            .cloned()
            .ok_or_else(|| CatalogClientError::NotFound(graph_url.to_string()))
    }

    async fn list_by_group(&self, group: u8) -> Result<Vec<SummaryRef>, CatalogClientError> {
        self.record(MockCall::Group(group));
        self.groups
            .lock()
            .expect("couldn't acquire mock lock")
            .get(&group)
            .cloned()
            .ok_or_else(|| CatalogClientError::NotFound(format!("/group/{group}")))
    }

    async fn list_by_tag(&self, tag: &str) -> Result<Vec<SummaryRef>, CatalogClientError> {
        self.record(MockCall::Tag(tag.to_string()));
        self.tags
            .lock()
            .expect("couldn't acquire mock lock")
            .get(tag)
            .cloned()
            .ok_or_else(|| CatalogClientError::NotFound(format!("/tag/{tag}")))
    }

    async fn list_roster(&self) -> Result<Vec<SummaryRef>, CatalogClientError> {
        self.record(MockCall::Roster);
        self.roster
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
            .ok_or_else(|| CatalogClientError::NotFound("/creature".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn mock_serves_pages_in_push_order() {
        let mock = MockClient::new();
        mock.push_page(CatalogPage {
            summaries: vec![SummaryRef {
                id: 1,
                name: "bulbasaur".to_string(),
            }],
            next: Some(PageCursor::start(20)),
            total: 2,
        });
        mock.push_page(CatalogPage {
            summaries: vec![SummaryRef {
                id: 2,
                name: "ivysaur".to_string(),
            }],
            next: None,
            total: 2,
        });

        let client = Client::Mock(mock);
        let first = client.list_page(PageCursor::start(20)).await.unwrap();
        let second = client.list_page(PageCursor::start(20)).await.unwrap();
        assert_eq!(first.summaries[0].id, 1);
        assert_eq!(second.summaries[0].id, 2);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn unseeded_lookups_answer_not_found() {
        let client = Client::Mock(MockClient::new());
        let err = client.get_creature(999).await.unwrap_err();
        assert!(err.is_permanent_miss());
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let mock = MockClient::new();
        mock.seed_tag("fire", vec![]);
        let client = Client::Mock(mock.clone());
        let _ = client.list_by_tag("fire").await;
        let _ = client.get_creature(4).await;
        assert_eq!(mock.calls(), vec![
            MockCall::Tag("fire".to_string()),
            MockCall::Detail(4)
        ]);
    }
}
