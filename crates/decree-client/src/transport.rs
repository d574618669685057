//! HTTP transport for operation exchanges.
//!
//! A thin wrapper over `reqwest`: one POST per operation, JSON in, JSON
//! out. Timeout behavior is caller policy, set here at construction; the
//! query client on top never retries or re-times anything.

use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::error::TransportError;
use crate::wire::{WireRequest, WireResponse};

/// Configuration for the transport.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Default user agent.
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: Some(format!("Decree/{} (Rust)", env!("CARGO_PKG_VERSION"))),
        }
    }
}

/// Builder for creating a [`Transport`] with custom configuration.
#[derive(Debug)]
pub struct TransportBuilder {
    endpoint: String,
    config: TransportConfig,
    default_headers: HeaderMap,
}

impl TransportBuilder {
    /// Create a new builder for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            config: TransportConfig::default(),
            default_headers: HeaderMap::new(),
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable the request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Add a default header to every request.
    pub fn header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, TransportError> {
        let name: HeaderName = name.as_ref().parse()?;
        let value: HeaderValue = value.as_ref().parse()?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Set bearer token authentication.
    pub fn bearer_auth(mut self, token: impl AsRef<str>) -> Result<Self, TransportError> {
        let value: HeaderValue = format!("Bearer {}", token.as_ref()).parse()?;
        self.default_headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Build the transport.
    pub fn build(self) -> Result<Transport, TransportError> {
        let endpoint = Url::parse(&self.endpoint)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(ref user_agent) = self.config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Transport {
            client,
            endpoint,
            config: self.config,
            default_headers: self.default_headers,
        })
    }
}

/// The HTTP collaborator: one POST exchange per operation.
#[derive(Clone, Debug)]
pub struct Transport {
    client: reqwest::Client,
    endpoint: Url,
    config: TransportConfig,
    default_headers: HeaderMap,
}

impl Transport {
    /// Create a transport for the given endpoint with default configuration.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        TransportBuilder::new(endpoint).build()
    }

    /// Create a builder for custom configuration.
    pub fn builder(endpoint: impl Into<String>) -> TransportBuilder {
        TransportBuilder::new(endpoint)
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Send one operation exchange.
    ///
    /// A non-success HTTP status is a transport failure; the body, if any,
    /// is carried along for diagnostics. A success status with a body that
    /// is not a well-formed envelope yields
    /// [`TransportError::InvalidBody`].
    pub async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .headers(self.default_headers.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.ok().filter(|body| !body.is_empty());
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TransportError::InvalidBody(e.to_string()))
    }
}
