//! HTTP/JSON client for the record service.
//!
//! Wraps the service's REST endpoints using [`reqwest`]. Every failure is
//! classified into the core's error kinds: transport failures become
//! `Network`, 404 `NotFound`, other 4xx `Validation` and 5xx `Server`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::RollRepository;
use crate::config::ServiceConfig;
use crate::error::{Result, TelasError};
use crate::model::{
    Client, ClientId, ClientPatch, NewClient, NewRoll, Roll, RollFilter, RollId, RollPatch,
};

/// HTTP client for one record service.
pub struct HttpRollRepository {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRollRepository {
    /// Create a client for the configured service.
    ///
    /// Cookies set by the service are kept and sent back, so session
    /// authentication enforced by the service keeps working.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| TelasError::Network {
                message: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self::with_client(client, config.normalized_base_url()))
    }

    /// Create a repository reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    // ---- private helpers ----

    /// Send the request and turn transport failures and non-2xx statuses
    /// into core errors.
    async fn execute(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Response> {
        tracing::debug!(%method, path, "Calling record service");

        let response = request.send().await.map_err(|e| TelasError::Network {
            message: format!("{} {}: {}", method, path, e),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let err = classify_status(&method, path, status.as_u16(), &body);
        tracing::debug!(%method, path, status = status.as_u16(), error = %err, "Record service refused call");
        Err(err)
    }

    /// Execute and decode a JSON body.
    ///
    /// The body is read in full first: failing to receive it is a network
    /// error, failing to decode what arrived is a server error.
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(method.clone(), path, request).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| TelasError::Network {
            message: format!("{} {}: body not received: {}", method, path, e),
        })?;
        serde_json::from_slice(&body).map_err(|e| TelasError::Server {
            status,
            message: format!("malformed response from {} {}: {}", method, path, e),
        })
    }

    /// Execute and discard the body.
    async fn send_only(&self, method: Method, path: &str, request: RequestBuilder) -> Result<()> {
        self.execute(method, path, request).await?;
        Ok(())
    }
}

/// Map a non-success status to an error, preferring the service's own message.
pub(crate) fn classify_status(method: &Method, path: &str, status: u16, body: &str) -> TelasError {
    let detail = extract_detail(body);
    let fallback = || format!("{} {} failed with HTTP {}", method, path, status);

    match status {
        404 => TelasError::NotFound {
            message: detail.unwrap_or_else(|| format!("{} not found", path)),
        },
        400..=499 => TelasError::Validation {
            message: detail.unwrap_or_else(fallback),
        },
        _ => TelasError::Server {
            status,
            message: detail.unwrap_or_else(fallback),
        },
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, field-error maps such as
/// `{"numero_rollo": ["This field may not be blank."]}`, bare string lists
/// and bare strings. Anything else yields `None`.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    use serde_json::Value;

    fn flatten(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().filter_map(flatten).collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            }
            Value::Object(map) => {
                if let Some(detail) = map.get("detail").and_then(flatten) {
                    return Some(detail);
                }
                let parts: Vec<String> = map
                    .iter()
                    .filter_map(|(field, v)| flatten(v).map(|msg| format!("{}: {}", field, msg)))
                    .collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            _ => None,
        }
    }

    let value: Value = serde_json::from_str(body).ok()?;
    flatten(&value)
}

#[async_trait]
impl RollRepository for HttpRollRepository {
    async fn list_rolls(&self, filter: &RollFilter) -> Result<Vec<Roll>> {
        let path = "/rollos/";
        let request = self
            .request(Method::GET, path)
            .query(&filter.to_query_pairs());
        self.fetch(Method::GET, path, request).await
    }

    async fn list_client_rolls(
        &self,
        cliente_id: ClientId,
        disponible: Option<bool>,
    ) -> Result<Vec<Roll>> {
        let path = format!("/clientes/{}/rollos/", cliente_id);
        let mut request = self.request(Method::GET, &path);
        if let Some(d) = disponible {
            request = request.query(&[("disponible", d.to_string())]);
        }
        self.fetch(Method::GET, &path, request).await
    }

    async fn get_roll(&self, id: RollId) -> Result<Roll> {
        let path = format!("/rollos/{}/", id);
        let request = self.request(Method::GET, &path);
        self.fetch(Method::GET, &path, request).await
    }

    async fn create_roll(&self, roll: &NewRoll) -> Result<Roll> {
        let path = "/rollos/";
        let request = self.request(Method::POST, path).json(roll);
        self.fetch(Method::POST, path, request).await
    }

    async fn patch_roll(&self, id: RollId, patch: &RollPatch) -> Result<Roll> {
        let path = format!("/rollos/{}/", id);
        let request = self.request(Method::PATCH, &path).json(patch);
        self.fetch(Method::PATCH, &path, request).await
    }

    async fn delete_roll(&self, id: RollId) -> Result<()> {
        let path = format!("/rollos/{}/", id);
        let request = self.request(Method::DELETE, &path);
        self.send_only(Method::DELETE, &path, request).await
    }

    async fn list_clients(&self, search: Option<&str>) -> Result<Vec<Client>> {
        let path = "/clientes/";
        let mut request = self.request(Method::GET, path);
        if let Some(text) = search.map(str::trim).filter(|s| !s.is_empty()) {
            request = request.query(&[("search", text)]);
        }
        self.fetch(Method::GET, path, request).await
    }

    async fn get_client(&self, id: ClientId) -> Result<Client> {
        let path = format!("/clientes/{}/", id);
        let request = self.request(Method::GET, &path);
        self.fetch(Method::GET, &path, request).await
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client> {
        let path = "/clientes/";
        let request = self.request(Method::POST, path).json(client);
        self.fetch(Method::POST, path, request).await
    }

    async fn patch_client(&self, id: ClientId, patch: &ClientPatch) -> Result<Client> {
        let path = format!("/clientes/{}/", id);
        let request = self.request(Method::PATCH, &path).json(patch);
        self.fetch(Method::PATCH, &path, request).await
    }

    async fn delete_client(&self, id: ClientId) -> Result<()> {
        let path = format!("/clientes/{}/", id);
        let request = self.request(Method::DELETE, &path);
        self.send_only(Method::DELETE, &path, request).await
    }
}
