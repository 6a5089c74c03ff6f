use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::CatalogConfig;

use super::{
    CatalogCandidateRecord, CatalogClient, CatalogDetails,
    error::{CatalogError, CatalogResult},
    xml::{parse_search_response, parse_thing_response},
};

const SEARCH_ENDPOINT: &str = "search";
const THING_ENDPOINT: &str = "thing";
/// Only board games are searched; expansions and accessories are separate item types.
const SEARCH_ITEM_TYPE: &str = "boardgame";

/// Catalog client speaking the BoardGameGeek XML API v2.
#[derive(Clone)]
pub struct BggCatalogClient {
    client: Client,
    base_url: Arc<str>,
    max_results: usize,
}

impl BggCatalogClient {
    /// Build a client from the catalog section of the application configuration.
    pub fn new(config: &CatalogConfig) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|source| CatalogError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            max_results: config.max_results,
        })
    }

    async fn fetch(&self, endpoint: &'static str, query: &[(&str, &str)]) -> CatalogResult<String> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| CatalogError::Request { endpoint, source })?;

        match response.status() {
            StatusCode::ACCEPTED => Err(CatalogError::Busy { endpoint }),
            status if !status.is_success() => Err(CatalogError::Status { endpoint, status }),
            _ => response
                .text()
                .await
                .map_err(|source| CatalogError::Request { endpoint, source }),
        }
    }

    async fn search_candidates(&self, query: String) -> CatalogResult<Vec<CatalogCandidateRecord>> {
        let body = self
            .fetch(
                SEARCH_ENDPOINT,
                &[("query", query.as_str()), ("type", SEARCH_ITEM_TYPE)],
            )
            .await?;
        let mut records = parse_search_response(&body)?;
        debug!(%query, total = records.len(), "catalog search answered");
        records.truncate(self.max_results);
        Ok(records)
    }

    async fn fetch_details(&self, id: String) -> CatalogResult<Option<CatalogDetails>> {
        let body = self
            .fetch(THING_ENDPOINT, &[("id", id.as_str()), ("stats", "1")])
            .await?;
        parse_thing_response(&body)
    }
}

impl CatalogClient for BggCatalogClient {
    fn search(&self, query: &str) -> BoxFuture<'static, CatalogResult<Vec<CatalogCandidateRecord>>> {
        let this = self.clone();
        let query = query.to_owned();
        Box::pin(async move { this.search_candidates(query).await })
    }

    fn details(&self, id: &str) -> BoxFuture<'static, CatalogResult<Option<CatalogDetails>>> {
        let this = self.clone();
        let id = id.to_owned();
        Box::pin(async move { this.fetch_details(id).await })
    }
}
