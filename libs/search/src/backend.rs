//! Backends that execute search requests

use async_trait::async_trait;
use common::{ApiClient, error::ApiResult};
use serde_json::Value;
use tracing::debug;

use crate::filters::SearchRequest;

/// Executes one normalized search request and returns the raw page body
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn fetch(&self, request: &SearchRequest) -> ApiResult<Value>;
}

#[async_trait]
impl<B: SearchBackend + ?Sized> SearchBackend for std::sync::Arc<B> {
    async fn fetch(&self, request: &SearchRequest) -> ApiResult<Value> {
        (**self).fetch(request).await
    }
}

/// Search backend over the clinic HTTP API: `GET /search/<entity>?<filters>`
#[derive(Debug, Clone)]
pub struct HttpSearchBackend {
    client: ApiClient,
}

impl HttpSearchBackend {
    /// Create a backend using an (authorized) API client
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn fetch(&self, request: &SearchRequest) -> ApiResult<Value> {
        debug!("Searching {} with {} parameters", request.entity, request.query.len());
        self.client.get_json(request.path(), &request.query).await
    }
}
