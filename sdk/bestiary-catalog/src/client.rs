//! Catalog client wrapper around the remote creature-catalog HTTP API.

use std::str::FromStr;
use std::time::Duration;

use async_stream::try_stream;
use futures::stream::Stream;
use futures::TryStreamExt;
use http::StatusCode;
use reqwest::header::{self, HeaderMap};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::CatalogClientError;
use crate::types::*;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Transient failures are retried this many times before giving up.
const MAX_RETRIES: u8 = 2;
const BACKOFF_BASE_MS: u64 = 300;

/// Page size used when depaging the full roster.
const ROSTER_PAGE_SIZE: u32 = 200;

/// A client for the remote creature catalog.
///
/// This is a thin typed wrapper that handles:
/// - HTTP client configuration with timeouts
/// - Bounded retry with backoff for transient failures
/// - Normalization of raw responses into the SDK's entity shapes
///
/// It holds no cache; every call goes to the network.
#[derive(Debug, Clone)]
pub struct CatalogHttpClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogHttpClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CatalogClientError::InvalidRequest(format!("bad base url: {e}")))?;
        let http = build_http_client(&config)?;
        Ok(Self { http, base_url })
    }

    /// Fetch one fixed-size page of the catalog listing.
    ///
    /// Summaries carry ID and name only; the follow-up cursor comes from the
    /// server's `next` link.
    #[instrument(skip_all, fields(offset = cursor.offset(), limit = cursor.limit()))]
    pub async fn list_page(&self, cursor: PageCursor) -> Result<CatalogPage, CatalogClientError> {
        let mut url = self.endpoint(&["creature"])?;
        url.query_pairs_mut()
            .append_pair("offset", &cursor.offset().to_string())
            .append_pair("limit", &cursor.limit().to_string());
        let raw: RawPage = self.get_json(url, "list_page").await?;
        let page = CatalogPage::from(raw);
        debug!(
            n_summaries = page.summaries.len(),
            has_next = page.next.is_some(),
            "received listing page"
        );
        Ok(page)
    }

    /// Fetch the full record for one entity.
    #[instrument(skip_all, fields(id = id))]
    pub async fn get_creature(&self, id: CreatureId) -> Result<CreatureDetail, CatalogClientError> {
        let url = self.endpoint(&["creature", &id.to_string()])?;
        let raw: RawCreature = self.get_json(url, "get_creature").await?;
        Ok(CreatureDetail::from(raw))
    }

    /// Fetch classification and narrative metadata for one entity.
    #[instrument(skip_all, fields(id = id))]
    pub async fn get_species(&self, id: CreatureId) -> Result<SpeciesInfo, CatalogClientError> {
        let url = self.endpoint(&["species", &id.to_string()])?;
        let raw: RawSpecies = self.get_json(url, "get_species").await?;
        Ok(SpeciesInfo::from(raw))
    }

    /// Fetch an evolution graph by the resource URL a species linked.
    #[instrument(skip_all)]
    pub async fn get_evolution_graph(
        &self,
        graph_url: &str,
    ) -> Result<EvolutionNode, CatalogClientError> {
        let url = Url::parse(graph_url).map_err(|e| {
            CatalogClientError::InvalidRequest(format!("bad evolution graph url: {e}"))
        })?;
        let raw: RawEvolutionGraph = self.get_json(url, "get_evolution_graph").await?;
        EvolutionNode::try_from(raw.chain)
    }

    /// Full membership of one category group, in one call.
    #[instrument(skip_all, fields(group = group))]
    pub async fn list_by_group(&self, group: u8) -> Result<Vec<SummaryRef>, CatalogClientError> {
        let url = self.endpoint(&["group", &group.to_string()])?;
        let raw: RawMembership = self.get_json(url, "list_by_group").await?;
        Ok(raw.into())
    }

    /// Full membership of one tag, in one call.
    #[instrument(skip_all, fields(tag = tag))]
    pub async fn list_by_tag(&self, tag: &str) -> Result<Vec<SummaryRef>, CatalogClientError> {
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CatalogClientError::InvalidRequest(format!(
                "tag {tag:?} does not meet API requirements"
            )));
        }
        let url = self.endpoint(&["tag", tag])?;
        let raw: RawMembership = self.get_json(url, "list_by_tag").await?;
        Ok(raw.into())
    }

    /// The global name+ID index, depaged into one sequence.
    #[instrument(skip_all)]
    pub async fn list_roster(&self) -> Result<Vec<SummaryRef>, CatalogClientError> {
        let roster: Vec<SummaryRef> = self.roster_stream().try_collect().await?;
        debug!(n_entries = roster.len(), "depaged full roster");
        Ok(roster)
    }

    /// Stream every listing entry, page by page, until the server reports no
    /// further page.
    fn roster_stream(
        &self,
    ) -> impl Stream<Item = Result<SummaryRef, CatalogClientError>> + '_ {
        try_stream! {
            let mut cursor = Some(PageCursor::start(ROSTER_PAGE_SIZE));
            while let Some(current) = cursor {
                let page = self.list_page(current).await?;
                for summary in page.summaries {
                    yield summary;
                }
                cursor = page.next;
            }
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                CatalogClientError::InvalidRequest("base url cannot carry paths".to_string())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        label: &'static str,
    ) -> Result<T, CatalogClientError> {
        let response = self.send_with_retry(url.clone(), label).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogClientError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            return Err(CatalogClientError::UnexpectedStatus { status });
        }
        response
            .json()
            .await
            .map_err(|e| CatalogClientError::Malformed(e.to_string()))
    }

    /// Issue a GET, retrying transient failures (transport errors, 429, 5xx)
    /// a bounded number of times with exponential backoff.
    async fn send_with_retry(
        &self,
        url: Url,
        label: &'static str,
    ) -> Result<reqwest::Response, CatalogClientError> {
        let mut attempt = 0u8;
        loop {
            match self.http.get(url.clone()).send().await {
                Ok(response) if retryable_status(response.status()) && attempt < MAX_RETRIES => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    debug!(
                        label,
                        attempt,
                        status = %response.status(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying catalog request"
                    );
                    tokio::time::sleep(delay).await;
                },
                Ok(response) => return Ok(response),
                Err(err) if transient(&err) && attempt < MAX_RETRIES => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    debug!(
                        label,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "retrying catalog request"
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn backoff_delay(attempt: u8) -> Duration {
    Duration::from_millis(BACKOFF_BASE_MS << (attempt.min(4) - 1))
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key)
                .map_err(|e| CatalogClientError::InvalidRequest(e.to_string()))?,
            header::HeaderValue::from_str(value)
                .map_err(|e| CatalogClientError::InvalidRequest(e.to_string()))?,
        );
    }

    debug!(
        base_url = %config.base_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT);

    let builder = if let Some(ref user_agent) = config.user_agent {
        builder.user_agent(user_agent)
    } else {
        builder
    };

    builder.build().map_err(CatalogClientError::Request)
}
