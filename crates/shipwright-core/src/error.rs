use serde::Serialize;

/// Coarse classification of a failed deployment, used for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    RemoteUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RemoteUnavailable => "remote_unavailable",
            ErrorKind::Internal => "internal",
        }
    }

    /// Caller-facing text. Remote error details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "invalid task request",
            ErrorKind::NotFound => "repository not found",
            ErrorKind::Conflict => "repository state conflicts with the requested change",
            ErrorKind::RemoteUnavailable => "repository platform is unavailable",
            ErrorKind::Internal => "internal error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid task request: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("repository platform unavailable: {0}")]
    RemoteUnavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Validation(_) => ErrorKind::Validation,
            DeployError::NotFound(_) => ErrorKind::NotFound,
            DeployError::Conflict(_) => ErrorKind::Conflict,
            DeployError::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            DeployError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to return over HTTP. Validation errors are produced
    /// locally and are returned verbatim; everything else is reduced to the
    /// kind's generic text.
    pub fn public_message(&self) -> String {
        match self {
            DeployError::Validation(msg) => msg.clone(),
            other => other.kind().public_message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_variants() {
        assert_eq!(
            DeployError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(DeployError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(DeployError::Conflict("x".into()).kind(), ErrorKind::Conflict);
        assert_eq!(
            DeployError::RemoteUnavailable("x".into()).kind(),
            ErrorKind::RemoteUnavailable
        );
        assert_eq!(
            DeployError::from(anyhow::anyhow!("boom")).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn public_message_hides_remote_detail() {
        let err = DeployError::RemoteUnavailable("connect to 10.0.0.7:443 refused".into());
        assert_eq!(err.public_message(), "repository platform is unavailable");
        assert!(err.to_string().contains("10.0.0.7"));

        let err = DeployError::from(anyhow::anyhow!("token ghp_secret rejected"));
        assert!(!err.public_message().contains("ghp_secret"));
    }

    #[test]
    fn public_message_keeps_validation_text() {
        let err = DeployError::Validation("missing task field".into());
        assert_eq!(err.public_message(), "missing task field");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_value(ErrorKind::RemoteUnavailable).unwrap();
        assert_eq!(json, "remote_unavailable");
    }
}
