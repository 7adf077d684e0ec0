use thiserror::Error;

use speak_core_types::Response;

pub type HandlerError = anyhow::Error;

/// Result produced by a registered handler method.
pub type HandlerResult = Result<Response, HandlerError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForgeryError {
    #[error("anti-forgery cookie `{0}` is missing")]
    MissingCookie(String),
    #[error("anti-forgery token `{0}` is missing")]
    MissingToken(String),
    #[error("anti-forgery token does not match its cookie")]
    Mismatch,
}

/// Faults that escape the pipeline and reach the outer boundary.
///
/// Security denials are not faults; they are answered inside the pipeline.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("could not retrieve request arguments from url: {url}")]
    MissingArgs { url: String },
    #[error("could not retrieve request class for url: {url}")]
    MissingHandler { url: String },
    #[error("anti-forgery validation failed: {0}")]
    Forgery(#[from] ForgeryError),
    #[error("method `{method}` is not registered on `{handler}`")]
    MethodNotFound { handler: String, method: String },
    #[error("{target} failed: {source:#}")]
    Handler {
        target: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("response serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl DispatchError {
    /// Routing or hosting bugs rather than faults raised while serving.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DispatchError::MissingArgs { .. } | DispatchError::MissingHandler { .. }
        )
    }
}
