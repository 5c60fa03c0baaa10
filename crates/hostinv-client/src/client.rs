//! Report upload client.

use hostinv_core::{InventoryError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Path appended to the configured server address
pub const UPLOAD_PATH: &str = "/upload-report";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const OCTET_STREAM: &str = "application/octet-stream";

const USER_AGENT: &str = concat!("hostinv/", env!("CARGO_PKG_VERSION"));

/// What the collector answered to an accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// HTTP status code (2xx)
    pub status: u16,
    /// Response body, verbatim
    pub body: String,
}

/// Posts sealed envelopes to `<server>/upload-report`
#[derive(Clone)]
pub struct UploadClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    endpoint: Url,
    timeout: Duration,
}

impl UploadClient {
    /// Create a client for `server` with default settings
    pub fn new(server: &str) -> Result<Self> {
        UploadClientBuilder::new(server).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(server: impl Into<String>) -> UploadClientBuilder {
        UploadClientBuilder::new(server)
    }

    /// Full upload URL
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// POST `envelope` as an opaque octet stream.
    ///
    /// One attempt only; a 2xx answer yields the body verbatim, anything
    /// else is [`InventoryError::Rejected`].
    pub async fn upload(
        &self,
        envelope: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt> {
        let bytes = envelope.len();
        debug!(url = %self.inner.endpoint, bytes, "POST envelope");

        let request = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(envelope)
            .send();

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(InventoryError::Cancelled),
            response = request => response.map_err(|e| self.map_send_error(&e))?,
        };

        let status = response.status();
        let body = tokio::select! {
            () = cancel.cancelled() => return Err(InventoryError::Cancelled),
            body = response.text() => body.map_err(|e| self.map_send_error(&e))?,
        };

        if status.is_success() {
            info!(status = status.as_u16(), bytes, "report uploaded");
            Ok(UploadReceipt {
                status: status.as_u16(),
                body,
            })
        } else {
            warn!(status = status.as_u16(), "upload rejected");
            Err(InventoryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn map_send_error(&self, error: &reqwest::Error) -> InventoryError {
        if error.is_timeout() {
            InventoryError::Timeout {
                operation: "report upload".to_string(),
                seconds: self.inner.timeout.as_secs(),
            }
        } else {
            InventoryError::Transport(error.to_string())
        }
    }
}

/// Builder for configuring an [`UploadClient`]
pub struct UploadClientBuilder {
    server: String,
    timeout: Duration,
}

impl UploadClientBuilder {
    /// Create a new builder for the given server address
    #[must_use]
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidUrl`] unless the server address is an
    /// absolute `http` or `https` URL.
    pub fn build(self) -> Result<UploadClient> {
        let endpoint = upload_endpoint(&self.server)?;

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| InventoryError::Transport(e.to_string()))?;

        Ok(UploadClient {
            inner: Arc::new(ClientInner {
                http,
                endpoint,
                timeout: self.timeout,
            }),
        })
    }
}

/// `<server>/upload-report`, keeping any path prefix on the server address
pub fn upload_endpoint(server: &str) -> Result<Url> {
    let base = Url::parse(server.trim())
        .map_err(|e| InventoryError::InvalidUrl(format!("{server}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(InventoryError::InvalidUrl(format!(
            "{server}: scheme must be http or https"
        )));
    }
    let joined = format!("{}{UPLOAD_PATH}", base.as_str().trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| InventoryError::InvalidUrl(format!("{joined}: {e}")))
}
