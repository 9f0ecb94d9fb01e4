use thiserror::Error;

/// Errors raised at the vendor API boundary
#[derive(Debug, Error)]
pub enum MwsError {
    /// Structured error returned by the API itself
    #[error("[{code}]: {reason} : {message} (Request ID: {request_id})")]
    Api {
        code: String,
        reason: String,
        message: String,
        request_id: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Parse(String),
}

impl MwsError {
    /// Log the error with full context. API errors carry four fields
    /// and all four must end up in the log.
    pub fn log(&self, context: &str) {
        match self {
            MwsError::Api {
                code,
                reason,
                message,
                request_id,
            } => {
                tracing::error!(
                    "{}: [{}]: {} : {} (Request ID: {})",
                    context,
                    code,
                    reason,
                    message,
                    request_id
                );
            }
            other => tracing::error!("{}: {}", context, other),
        }
    }
}
