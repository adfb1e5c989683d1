//! Memory service client.
//!
//! `MemoryService` is the seam the orchestrators are written against;
//! `HttpMemoryClient` implements it over the service's REST API with a
//! blocking client, since every hook is a short-lived synchronous process.

use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result, tolerate_outage};
use crate::schema::{
    CreateSummaryView, MemoryHit, SearchRequest, SearchResponse, SummaryPartition, SummaryView,
    TaskRef, WorkingMemory,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};

/// Operations consumed from the memory service.
pub trait MemoryService {
    fn search_long_term(&self, request: &SearchRequest) -> Result<Vec<MemoryHit>>;

    /// Working memory for a session, `None` if the session has none yet.
    fn get_working_memory(
        &self,
        session_id: &str,
        namespace: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Option<WorkingMemory>>;

    /// Store working memory, replacing what the server holds for the session.
    fn put_working_memory(&self, memory: &WorkingMemory) -> Result<()>;

    fn list_summary_views(&self) -> Result<Vec<SummaryView>>;

    fn create_summary_view(&self, request: &CreateSummaryView) -> Result<SummaryView>;

    /// Compute the summary of one group of a view synchronously.
    fn run_summary_partition(
        &self,
        view_id: &str,
        group: &Map<String, Value>,
    ) -> Result<SummaryPartition>;

    /// Start an asynchronous refresh of every partition of a view.
    fn run_summary_view(&self, view_id: &str) -> Result<TaskRef>;
}

/// REST client bounded by the hook's time budget.
#[derive(Debug, Clone)]
pub struct HttpMemoryClient {
    http: Client,
    base_url: Url,
    config: MemoryConfig,
    deadline: Instant,
}

impl HttpMemoryClient {
    /// Create a client whose requests all finish within `budget` from now.
    pub fn new(config: &MemoryConfig, budget: Duration) -> Result<Self> {
        let base_url = Url::parse(config.server_url.trim_end_matches('/')).map_err(|e| {
            MemoryError::config(format!("invalid server URL {:?}: {e}", config.server_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(MemoryError::config(format!(
                "server URL {:?} cannot carry API paths",
                config.server_url
            )));
        }

        let http = Client::builder()
            .user_agent(concat!("hook-memory/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MemoryError::unavailable("client setup", e))?;

        Ok(Self {
            http,
            base_url,
            config: config.clone(),
            deadline: Instant::now() + budget,
        })
    }

    /// Like [`HttpMemoryClient::new`], but a client that cannot be set up for
    /// reasons other than configuration yields `None` so the hook can degrade.
    pub fn connect(config: &MemoryConfig, budget: Duration) -> Result<Option<Self>> {
        tolerate_outage(Self::new(config, budget))
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, operation: &'static str, method: Method, url: Url) -> Result<RequestBuilder> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(MemoryError::unavailable(operation, "hook time budget exhausted"));
        }

        let mut builder = self
            .http
            .request(method, url)
            .timeout(self.config.request_timeout(remaining));
        if let Some(token) = &self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &self.config.api_key {
            builder = builder.header("X-API-Key", key);
        }
        Ok(builder)
    }

    fn send(&self, operation: &'static str, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .map_err(|e| MemoryError::unavailable(operation, e))?;
        tracing::debug!(operation, status = %response.status(), "memory service response");
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> Result<T> {
        let response = response
            .error_for_status()
            .map_err(|e| MemoryError::unavailable(operation, e))?;
        response
            .json()
            .map_err(|e| MemoryError::unavailable(operation, e))
    }
}

fn working_memory_query<'a>(
    namespace: Option<&'a str>,
    user_id: Option<&'a str>,
) -> Vec<(&'static str, &'a str)> {
    let mut query = Vec::new();
    if let Some(ns) = namespace {
        query.push(("namespace", ns));
    }
    if let Some(user) = user_id {
        query.push(("user_id", user));
    }
    query
}

impl MemoryService for HttpMemoryClient {
    fn search_long_term(&self, request: &SearchRequest) -> Result<Vec<MemoryHit>> {
        const OP: &str = "search";
        let url = self.url(&["v1", "long-term-memory", "search"]);
        let builder = self.request(OP, Method::POST, url)?.json(request);
        let response: SearchResponse = Self::decode(OP, self.send(OP, builder)?)?;
        Ok(response.memories.into_iter().map(MemoryHit::from).collect())
    }

    fn get_working_memory(
        &self,
        session_id: &str,
        namespace: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Option<WorkingMemory>> {
        const OP: &str = "get working memory";
        let url = self.url(&["v1", "working-memory", session_id]);
        let builder = self
            .request(OP, Method::GET, url)?
            .query(&working_memory_query(namespace, user_id));
        let response = self.send(OP, builder)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(OP, response).map(Some)
    }

    fn put_working_memory(&self, memory: &WorkingMemory) -> Result<()> {
        const OP: &str = "put working memory";
        let url = self.url(&["v1", "working-memory", &memory.session_id]);
        let builder = self
            .request(OP, Method::PUT, url)?
            .query(&working_memory_query(
                memory.namespace.as_deref(),
                memory.user_id.as_deref(),
            ))
            .json(memory);
        self.send(OP, builder)?
            .error_for_status()
            .map_err(|e| MemoryError::unavailable(OP, e))?;
        Ok(())
    }

    fn list_summary_views(&self) -> Result<Vec<SummaryView>> {
        const OP: &str = "list summary views";
        let url = self.url(&["v1", "summary-views"]);
        let builder = self.request(OP, Method::GET, url)?;
        Self::decode(OP, self.send(OP, builder)?)
    }

    fn create_summary_view(&self, request: &CreateSummaryView) -> Result<SummaryView> {
        const OP: &str = "create summary view";
        let url = self.url(&["v1", "summary-views"]);
        let builder = self.request(OP, Method::POST, url)?.json(request);
        Self::decode(OP, self.send(OP, builder)?)
    }

    fn run_summary_partition(
        &self,
        view_id: &str,
        group: &Map<String, Value>,
    ) -> Result<SummaryPartition> {
        const OP: &str = "run summary partition";
        let url = self.url(&["v1", "summary-views", view_id, "partitions", "run"]);
        let builder = self
            .request(OP, Method::POST, url)?
            .json(&json!({ "group": group }));
        Self::decode(OP, self.send(OP, builder)?)
    }

    fn run_summary_view(&self, view_id: &str) -> Result<TaskRef> {
        const OP: &str = "run summary view";
        let url = self.url(&["v1", "summary-views", view_id, "run"]);
        let builder = self.request(OP, Method::POST, url)?.json(&json!({}));
        Self::decode(OP, self.send(OP, builder)?)
    }
}
