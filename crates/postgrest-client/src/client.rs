//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::endpoint::TableEndpoint;
use crate::error::{Error, ErrorResponse, Result};
use crate::filter::Filter;

/// Endpoint root used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:6000";

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Media type asking PostgREST for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgREST client.
///
/// Cheap to clone; clones share one connection pool.
///
/// # Example
///
/// ```no_run
/// use postgrest_client::PostgrestClient;
///
/// # fn example() -> postgrest_client::Result<()> {
/// let client = PostgrestClient::builder()
///     .base_url("http://localhost:6000")
///     .build()?;
/// assert_eq!(client.base_url().as_str(), "http://localhost:6000/");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PostgrestClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

impl PostgrestClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client pointing at [`DEFAULT_BASE_URL`].
    pub fn localhost() -> Result<Self> {
        Self::builder().build()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build the URL for a table resource.
    pub(crate) fn url(&self, table: &str) -> Result<Url> {
        let table = table.trim_start_matches('/');
        if table.is_empty() {
            return Err(Error::Config("table name is required".to_string()));
        }
        self.inner.base_url.join(table).map_err(Error::from)
    }

    fn request(
        &self,
        method: reqwest::Method,
        table: &str,
        filter: &Filter,
    ) -> Result<reqwest::RequestBuilder> {
        let url = self.url(table)?;
        trace!(%method, %url, filter = %filter, "Building request");
        Ok(self
            .inner
            .http
            .request(method, url)
            .query(&filter.to_query())
            .timeout(self.inner.timeout))
    }

    /// Read the response body as JSON, treating an empty body as `null`.
    async fn body_json(response: reqwest::Response) -> Result<Value> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Succeed on 2xx, otherwise turn the response into an error.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    async fn extract_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => Error::Api {
                status,
                code: err.code.unwrap_or_else(|| "unknown".to_string()),
                message: err
                    .message
                    .or(err.details)
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            },
            Err(_) => Error::Api {
                status,
                code: "unknown".to_string(),
                message: if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body
                },
            },
        }
    }
}

#[async_trait]
impl TableEndpoint for PostgrestClient {
    async fn read_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>> {
        debug!(table, filter = %filter, "read_one");
        let response = self
            .request(reqwest::Method::GET, table, filter)?
            .header(ACCEPT, SINGLE_OBJECT)
            .header("Prefer", "plurality=singular")
            .send()
            .await?;

        // PostgREST answers 406 when a singular request matches no rows
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            trace!(table, "Singular read matched no rows");
            return Ok(None);
        }

        let body = Self::body_json(Self::check(response).await?).await?;
        Ok(match body {
            Value::Null => None,
            Value::Array(rows) => rows.into_iter().next(),
            row => Some(row),
        })
    }

    async fn read_many(&self, table: &str, filter: &Filter) -> Result<Vec<Value>> {
        debug!(table, filter = %filter, "read_many");
        let response = self
            .request(reqwest::Method::GET, table, filter)?
            .send()
            .await?;

        match Self::body_json(Self::check(response).await?).await? {
            Value::Null => Ok(Vec::new()),
            Value::Array(rows) => Ok(rows),
            row => Ok(vec![row]),
        }
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<()> {
        debug!(table, "insert");
        let response = self
            .request(reqwest::Method::POST, table, &Filter::new())?
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Value) -> Result<()> {
        debug!(table, filter = %filter, "update");
        let response = self
            .request(reqwest::Method::PATCH, table, filter)?
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<()> {
        debug!(table, filter = %filter, "delete");
        let response = self
            .request(reqwest::Method::DELETE, table, filter)?
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Builder for creating a [`PostgrestClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the endpoint root. Defaults to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add several headers sent with every request.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<PostgrestClient> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Config(format!("Invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::Config(format!("Invalid value for header {}", name)))?;
            headers.insert(name, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("postgrest-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(PostgrestClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
