//! REST implementation of [`InventoryService`]

use crate::config::ClientConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use cellar_layout::{Assignment, Move};
use cellar_review::{
    ExecuteResponse, InventoryError, InventoryService, MoveBatch, ProposedLayout, ValidationReport,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const PROPOSAL_PATH: &str = "/api/cellar/layout/proposal";
const LAYOUT_PATH: &str = "/api/cellar/layout";
const VALIDATE_PATH: &str = "/api/cellar/validate-moves";
const EXECUTE_PATH: &str = "/api/cellar/execute-moves";

/// Header naming the cellar a request is about
pub const CELLAR_ID_HEADER: &str = "X-Cellar-Id";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Inventory backend reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpInventory {
    base_url: String,
    cellar_id: Option<String>,
    client: reqwest::Client,
}

impl HttpInventory {
    /// Build a client from `config`
    ///
    /// # Errors
    /// - `ClientError::Config` if the base URL is not http(s)
    /// - `ClientError::Build` if the HTTP client cannot be initialised
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base url must start with http:// or https://, got {base_url:?}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            base_url,
            cellar_id: config.cellar_id,
            client,
        })
    }

    /// API root requests are sent to
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header("Accept", "application/json");
        match &self.cellar_id {
            Some(id) => builder.header(CELLAR_ID_HEADER, id),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response, InventoryError> {
        debug!(path, "inventory request");
        builder
            .send()
            .await
            .map_err(|e| InventoryError::Transport(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, InventoryError> {
        let response = self.send(self.request(Method::GET, path), path).await?;
        let (status, body) = read_body(response).await?;
        if !status.is_success() {
            return Err(backend_error(status, &body));
        }
        decode(&body)
    }

    async fn post_moves(&self, path: &str, moves: &[Move]) -> Result<(StatusCode, String), InventoryError> {
        let builder = self.request(Method::POST, path).json(&MoveBatch::new(moves));
        let response = self.send(builder, path).await?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<(StatusCode, String), InventoryError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| InventoryError::Transport(e.to_string()))?;
    Ok((status, body))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, InventoryError> {
    serde_json::from_str(body).map_err(|e| InventoryError::Decode(e.to_string()))
}

/// Error for a non-2xx response; prefers the body's `error` field
fn backend_error(status: StatusCode, body: &str) -> InventoryError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    InventoryError::Backend {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl InventoryService for HttpInventory {
    async fn get_proposed_layout(&self) -> Result<ProposedLayout, InventoryError> {
        self.get_json(PROPOSAL_PATH).await
    }

    async fn fetch_current_layout(&self) -> Result<Assignment, InventoryError> {
        self.get_json(LAYOUT_PATH).await
    }

    async fn validate_moves(&self, moves: &[Move]) -> Result<ValidationReport, InventoryError> {
        let (status, body) = self.post_moves(VALIDATE_PATH, moves).await?;
        if !status.is_success() {
            // A rejected batch may still come back as a report
            return decode::<ValidationReport>(&body).map_err(|_| backend_error(status, &body));
        }
        decode(&body)
    }

    async fn execute_moves(&self, moves: &[Move]) -> Result<ExecuteResponse, InventoryError> {
        let (status, body) = self.post_moves(EXECUTE_PATH, moves).await?;
        if !status.is_success() {
            return decode::<ExecuteResponse>(&body).map_err(|_| backend_error(status, &body));
        }
        decode(&body)
    }
}
