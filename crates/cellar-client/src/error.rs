//! Client construction errors
//!
//! Request-time failures are reported as
//! [`InventoryError`](cellar_review::InventoryError) so sessions can treat
//! every backend the same way.

/// Client could not be built
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration is unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client failed to initialise
    #[error("http client error: {0}")]
    Build(#[from] reqwest::Error),
}
