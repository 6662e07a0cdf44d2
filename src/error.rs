//! Unified error types.

/// Error type returned by handlers and propagated through middleware.
///
/// Any `std::error::Error + Send + Sync` converts into it with `?` or
/// `.into()`, including plain strings: `Err("order not found".into())`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by lambda-chain's fallible operations.
///
/// Business failures are expressed by handlers as [`BoxError`] values and
/// reported to the Runtime API per invocation. This type surfaces
/// infrastructure failures: missing configuration, or a Runtime API that
/// cannot be reached or answers unexpectedly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required config key `{0}`")]
    MissingConfig(String),

    #[error("invalid runtime api address `{0}`")]
    InvalidAddress(String),

    #[error("runtime api request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("runtime api body: {0}")]
    Body(#[from] hyper::Error),

    #[error("runtime api returned {status} for {path}")]
    UnexpectedStatus { status: http::StatusCode, path: String },

    #[error("invocation has a missing or malformed `{0}` header")]
    BadHeader(&'static str),

    #[error("http: {0}")]
    Http(#[from] http::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("installing the SIGTERM handler: {0}")]
    Signal(#[from] std::io::Error),
}
