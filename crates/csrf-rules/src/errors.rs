use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsrfConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
