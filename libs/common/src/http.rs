//! HTTP client for the clinic API
//!
//! Thin wrapper over `reqwest` that joins paths onto the configured API
//! root, attaches the bearer token and request id, and turns non-success
//! responses into [`ApiError`] values.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::ApiConfig,
    error::{ApiError, ApiResult},
};

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Client for the remote clinic API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new client from configuration
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        config.validate()?;

        // A trailing slash makes Url::join append instead of replacing the last segment
        let mut root = config.base_url.trim_end_matches('/').to_string();
        root.push('/');
        let base_url = Url::parse(&root)
            .map_err(|e| ApiError::Configuration(format!("Invalid base URL: {}", e)))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Return a copy of this client authenticated with `token`
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replace or clear the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Whether a bearer token is attached
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// API root every path is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path relative to the API root
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Configuration(format!("Invalid request path {}: {}", path, e)))
    }

    /// GET `path` with query parameters and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ApiResult<T> {
        let request = self.request(Method::GET, path)?.query(query);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// POST a JSON body to `path` and decode the JSON response
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.request(Method::POST, path)?.json(body);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// POST a JSON body to `path`, ignoring the response body
    pub async fn post_empty<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        let request = self.request(Method::POST, path)?.json(body);
        self.send(request).await?;
        Ok(())
    }

    /// PUT a JSON body to `path` and decode the JSON response
    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.request(Method::PUT, path)?.json(body);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// DELETE `path`
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let request = self.request(Method::DELETE, path)?;
        self.send(request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self.url(path)?;
        let mut request = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        Ok(request)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!("{} {}", method, url.path());

        let response = self.client.execute(request).await.map_err(|e| {
            warn!("{} {} failed: {}", method, url.path(), e);
            ApiError::Network(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("{} {} rejected the bearer token", method, url.path());
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body
            }
        });
        warn!("{} {} returned {}: {}", method, url.path(), status, message);

        Err(ApiError::Status { status, message })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Pull a human-readable message out of a JSON error body
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "error", "message"]
        .iter()
        .find_map(|key| match value.get(*key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        ApiClient::new(&config).expect("client")
    }

    #[test]
    fn test_paths_are_joined_under_the_api_root() {
        let client = client("http://localhost:8000/api");
        assert_eq!(
            client.url("/search/patients").expect("url").as_str(),
            "http://localhost:8000/api/search/patients"
        );

        let client = client_with_slash();
        assert_eq!(
            client.url("users/7").expect("url").as_str(),
            "http://localhost:8000/api/users/7"
        );
    }

    fn client_with_slash() -> ApiClient {
        client("http://localhost:8000/api/")
    }

    #[test]
    fn test_error_message_prefers_detail() {
        assert_eq!(
            error_message(r#"{"detail":"Page out of range"}"#),
            Some("Page out of range".to_string())
        );
        assert_eq!(
            error_message(r#"{"error":"boom","message":"ignored"}"#),
            Some("boom".to_string())
        );
        assert_eq!(error_message("<html>oops</html>"), None);
    }

    #[test]
    fn test_token_is_optional() {
        let mut client = client("http://localhost:8000/api");
        assert!(!client.has_token());
        client.set_token(Some("abc".to_string()));
        assert!(client.has_token());
        client.set_token(None);
        assert!(!client.has_token());
    }
}
