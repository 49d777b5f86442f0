use thiserror::Error;

/// Main error type for the coordination core
#[derive(Error, Debug)]
pub enum SamError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors (adapter construction only; call-time errors become AgentError)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Inventory store contract errors
    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    // Engine invariants
    #[error("Snapshot version mismatch: expected {expected}, found {found} (agent {agent_id})")]
    SnapshotVersionMismatch {
        expected: u64,
        found: u64,
        agent_id: String,
    },

    #[error("Scheduler overload: {0}")]
    SchedulerOverload(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for SamError
pub type Result<T> = std::result::Result<T, SamError>;

/// Errors an agent adapter may return from `propose`.
///
/// The engine enforces deadlines itself; `DeadlineExceeded` covers adapters
/// whose own I/O timed out first. Both are recorded as `AgentOutcome::TimedOut`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Connection-level or 5xx-style failure; retried once per cycle.
    #[error("transient agent error: {0}")]
    Transient(String),

    /// Terminal failure for this cycle.
    #[error("agent failure: {0}")]
    Failure(String),

    /// The agent's own I/O ran out of time. Recorded as a timeout, never retried.
    #[error("agent deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

impl AgentError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self::Failure(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AgentError::Transient(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::DeadlineExceeded(_))
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        // timeouts also report is_request()
        if err.is_timeout() {
            return AgentError::DeadlineExceeded(err.to_string());
        }
        if err.is_connect() || err.is_request() {
            return AgentError::Transient(err.to_string());
        }
        match err.status() {
            Some(status) if status.is_server_error() || status.as_u16() == 429 => {
                AgentError::Transient(err.to_string())
            }
            _ => AgentError::Failure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_transient_flag() {
        assert!(AgentError::transient("reset by peer").is_transient());
        assert!(!AgentError::failure("bad payload").is_transient());
    }

    #[tokio::test]
    async fn test_request_timeout_is_not_transient() {
        // accepts the connection and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let err = reqwest::Client::new()
            .get(format!("http://{addr}/recipes"))
            .timeout(std::time::Duration::from_millis(200))
            .send()
            .await
            .unwrap_err();
        let mapped = AgentError::from(err);

        assert!(mapped.is_timeout(), "{mapped:?}");
        assert!(!mapped.is_transient());
    }

    #[tokio::test]
    async fn test_refused_connection_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{addr}/recipes"))
            .send()
            .await
            .unwrap_err();

        assert!(AgentError::from(err).is_transient());
    }

    #[test]
    fn test_version_mismatch_message() {
        let err = SamError::SnapshotVersionMismatch {
            expected: 4,
            found: 3,
            agent_id: "recipes".into(),
        };
        assert_eq!(
            err.to_string(),
            "Snapshot version mismatch: expected 4, found 3 (agent recipes)"
        );
    }
}
