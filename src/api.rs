use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::config::{ClientConfig, Hosts};
use crate::convert::{self, ListOutcome};
use crate::model::{Author, Edition, Review, ReviewsSort, Work, WorkPreview};
use crate::paginator::{PageLoader, Paginator};

/// One catalog endpoint together with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Work { id: u64 },
    Author { id: u64 },
    Edition { id: u64 },
    WorkReviews { work_id: u64, sort: ReviewsSort, page: u32 },
    WorkAnalogs { work_id: u64 },
}

impl ApiRequest {
    /// Path and query relative to the API base URL.
    pub fn path(&self) -> String {
        match self {
            Self::Work { id } => format!("/work/{id}/extended"),
            Self::Author { id } => format!("/autor/{id}/extended"),
            Self::Edition { id } => format!("/edition/{id}"),
            Self::WorkReviews {
                work_id,
                sort,
                page,
            } => format!("/work/{work_id}/responses?sort={sort}&page={page}"),
            Self::WorkAnalogs { work_id } => format!("/work/{work_id}/similars"),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &ApiRequest) -> anyhow::Result<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("catalog-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn endpoint(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url, request.path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &ApiRequest) -> anyhow::Result<Value> {
        let endpoint = self.endpoint(request);
        tracing::debug!(%endpoint, "fetching");

        let response = self
            .client
            .get(&endpoint)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .with_context(|| format!("read response body: {endpoint}"))?;
        if !status.is_success() {
            anyhow::bail!("catalog API error ({status}) for {endpoint}: {}", raw.trim());
        }

        serde_json::from_str(&raw).with_context(|| format!("parse json from {endpoint}"))
    }
}

/// Typed access to the catalog: each call fetches through the transport and
/// converts the payload.
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    hosts: Hosts,
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn Transport>, hosts: Hosts) -> Self {
        Self { transport, hosts }
    }

    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.hosts.clone()))
    }

    pub async fn work(&self, id: u64) -> anyhow::Result<Work> {
        let json = self.transport.fetch(&ApiRequest::Work { id }).await?;
        convert::convert_work(&json, &self.hosts).with_context(|| format!("work {id}"))
    }

    pub async fn author(&self, id: u64) -> anyhow::Result<Author> {
        let json = self.transport.fetch(&ApiRequest::Author { id }).await?;
        convert::convert_author(&json, &self.hosts).with_context(|| format!("author {id}"))
    }

    pub async fn edition(&self, id: u64) -> anyhow::Result<Edition> {
        let json = self.transport.fetch(&ApiRequest::Edition { id }).await?;
        convert::convert_edition(&json, &self.hosts).with_context(|| format!("edition {id}"))
    }

    pub async fn work_analogs(&self, work_id: u64) -> anyhow::Result<ListOutcome<WorkPreview>> {
        let json = self
            .transport
            .fetch(&ApiRequest::WorkAnalogs { work_id })
            .await?;
        Ok(convert::convert_work_previews(&json, &self.hosts))
    }

    pub async fn work_reviews(
        &self,
        work_id: u64,
        sort: ReviewsSort,
        page: u32,
    ) -> anyhow::Result<ListOutcome<Review>> {
        let json = self
            .transport
            .fetch(&ApiRequest::WorkReviews {
                work_id,
                sort,
                page,
            })
            .await?;
        Ok(convert::convert_work_reviews(&json, &self.hosts))
    }

    /// A reviews list for `work_id`, sorted by rating until told otherwise.
    pub fn reviews_paginator(&self, work_id: u64) -> Paginator<Review, ReviewsSort> {
        let loader = ReviewsLoader {
            client: self.clone(),
            work_id,
        };
        Paginator::with_default_sort(Arc::new(loader), ReviewsSort::default())
    }
}

pub struct ReviewsLoader {
    client: CatalogClient,
    work_id: u64,
}

impl ReviewsLoader {
    pub fn new(client: CatalogClient, work_id: u64) -> Self {
        Self { client, work_id }
    }
}

#[async_trait]
impl PageLoader<Review, ReviewsSort> for ReviewsLoader {
    async fn load(&self, sort: &ReviewsSort, page: u32) -> anyhow::Result<Vec<Review>> {
        let outcome = self
            .client
            .work_reviews(self.work_id, *sort, page)
            .await
            .with_context(|| format!("reviews page {page} of work {}", self.work_id))?;

        // A page whose every entry was unreadable must not look like the end of the list.
        if outcome.is_all_skipped() {
            let first = &outcome.skipped[0];
            anyhow::bail!(
                "reviews page {page} of work {}: all {} entries malformed (first: {first})",
                self.work_id,
                outcome.skipped.len()
            );
        }
        Ok(outcome.items)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::paginator::PageState;

    #[derive(Default)]
    struct MemoryTransport {
        responses: HashMap<String, Value>,
        requests: Mutex<Vec<String>>,
    }

    impl MemoryTransport {
        fn with(mut self, request: ApiRequest, body: Value) -> Self {
            self.responses.insert(request.path(), body);
            self
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn fetch(&self, request: &ApiRequest) -> anyhow::Result<Value> {
            let path = request.path();
            self.requests.lock().unwrap().push(path.clone());
            self.responses
                .get(&path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("404 for {path}"))
        }
    }

    fn review(id: u64) -> Value {
        json!({ "response_id": id, "user_id": 1, "response_text": format!("r{id}") })
    }

    fn reviews_request(page: u32) -> ApiRequest {
        ApiRequest::WorkReviews {
            work_id: 42,
            sort: ReviewsSort::Rating,
            page,
        }
    }

    #[test]
    fn request_paths() {
        assert_eq!(ApiRequest::Work { id: 1 }.path(), "/work/1/extended");
        assert_eq!(ApiRequest::Author { id: 2 }.path(), "/autor/2/extended");
        assert_eq!(ApiRequest::Edition { id: 3 }.path(), "/edition/3");
        assert_eq!(
            ApiRequest::WorkReviews {
                work_id: 4,
                sort: ReviewsSort::Mark,
                page: 2
            }
            .path(),
            "/work/4/responses?sort=mark&page=2"
        );
        assert_eq!(ApiRequest::WorkAnalogs { work_id: 5 }.path(), "/work/5/similars");
    }

    #[test]
    fn endpoint_joins_base_url() {
        let config = ClientConfig::default()
            .with_api_base_url("http://127.0.0.1:9000/")
            .unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.endpoint(&ApiRequest::Work { id: 7 }),
            "http://127.0.0.1:9000/work/7/extended"
        );
    }

    #[tokio::test]
    async fn client_converts_work() {
        let transport = MemoryTransport::default().with(
            ApiRequest::Work { id: 9 },
            json!({ "work_id": 9, "work_name": "Обитаемый остров" }),
        );
        let client = CatalogClient::new(Arc::new(transport), Hosts::default());
        let work = client.work(9).await.unwrap();
        assert_eq!(work.name, "Обитаемый остров");
    }

    #[tokio::test]
    async fn client_reports_conversion_failure_with_context() {
        let transport =
            MemoryTransport::default().with(ApiRequest::Edition { id: 3 }, json!({ "year": 1990 }));
        let client = CatalogClient::new(Arc::new(transport), Hosts::default());
        let err = client.edition(3).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("edition 3"));
        assert!(message.contains("edition_id"));
    }

    #[tokio::test]
    async fn loader_fails_when_every_review_is_malformed() {
        let transport = MemoryTransport::default()
            .with(reviews_request(1), json!({ "items": [{ "response_text": "?" }] }));
        let loader = ReviewsLoader::new(
            CatalogClient::new(Arc::new(transport), Hosts::default()),
            42,
        );
        let err = loader.load(&ReviewsSort::Rating, 1).await.unwrap_err();
        assert!(err.to_string().contains("all 1 entries malformed"));
    }

    #[tokio::test]
    async fn reviews_paginator_loads_through_transport() {
        let transport = Arc::new(
            MemoryTransport::default()
                .with(reviews_request(1), json!({ "items": [review(1), review(2)] }))
                .with(reviews_request(2), json!({ "items": [] })),
        );
        let client = CatalogClient::new(transport.clone(), Hosts::default());
        let paginator = client.reviews_paginator(42);
        let mut states = paginator.subscribe();
        states.recv().await;

        paginator.load_next_page();
        states.recv().await;
        let state = states.recv().await.unwrap();
        let ids: Vec<u64> = state.items().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);

        paginator.load_next_page();
        states.recv().await;
        assert!(matches!(
            states.recv().await,
            Some(PageState::Loaded { has_more: false, .. })
        ));
        assert_eq!(
            transport.requests.lock().unwrap().as_slice(),
            [
                "/work/42/responses?sort=rating&page=1",
                "/work/42/responses?sort=rating&page=2",
            ]
        );
    }
}
