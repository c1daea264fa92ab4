use shipwright_core::DeployError;

/// Failure talking to the repository platform.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict on {what}: {message}")]
    Conflict { what: String, message: String },
    #[error("repository `{0}` has no commits yet")]
    EmptyRepository(String),
    #[error("repository platform unreachable: {0}")]
    Unavailable(String),
    #[error("repository platform returned {status} for {what}: {message}")]
    Api {
        status: u16,
        what: String,
        message: String,
    },
    #[error("unexpected response for {what}: {message}")]
    Decode { what: String, message: String },
}

impl RemoteError {
    /// Classify a non-success HTTP status. `body` is GitHub's error document
    /// when it has one.
    pub fn from_status(status: u16, what: &str, body: &str) -> Self {
        let message = error_message(body);
        match status {
            404 => RemoteError::NotFound(what.to_string()),
            409 | 422 => RemoteError::Conflict {
                what: what.to_string(),
                message,
            },
            500..=599 => RemoteError::Unavailable(format!("{status} for {what}: {message}")),
            _ => RemoteError::Api {
                status,
                what: what.to_string(),
                message,
            },
        }
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl From<RemoteError> for DeployError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(_) => DeployError::NotFound(err.to_string()),
            RemoteError::Conflict { .. } | RemoteError::EmptyRepository(_) => {
                DeployError::Conflict(err.to_string())
            }
            RemoteError::Unavailable(_) => DeployError::RemoteUnavailable(err.to_string()),
            RemoteError::Api { .. } | RemoteError::Decode { .. } => {
                DeployError::Internal(anyhow::Error::new(err))
            }
        }
    }
}
