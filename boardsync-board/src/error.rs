//! Error types for boardsync-board.

use thiserror::Error;

/// Failure of a single board-service call.
///
/// `op` names the call (`"GET cards/<id>"`); it never contains credentials.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Network failure, DNS failure or timeout.
    #[error("{op}: transport error: {detail}")]
    Transport { op: String, detail: String },

    /// The service answered with a non-2xx status.
    #[error("{op}: HTTP {code}: {body}")]
    Status { op: String, code: u16, body: String },

    /// The requested entity does not exist or is not visible to us.
    #[error("{op}: not found")]
    NotFound { op: String },

    /// The response body did not match the expected shape.
    #[error("{op}: could not decode response: {detail}")]
    Decode { op: String, detail: String },
}

impl BoardError {
    /// Whether retrying on a later run may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BoardError::Transport { .. } => true,
            BoardError::Status { code, .. } => *code == 429 || *code >= 500,
            BoardError::NotFound { .. } | BoardError::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let timeout = BoardError::Transport {
            op: "GET x".into(),
            detail: "timed out".into(),
        };
        let throttled = BoardError::Status {
            op: "POST y".into(),
            code: 429,
            body: String::new(),
        };
        let forbidden = BoardError::Status {
            op: "GET z".into(),
            code: 403,
            body: "no".into(),
        };
        assert!(timeout.is_transient());
        assert!(throttled.is_transient());
        assert!(!forbidden.is_transient());
        assert!(!BoardError::NotFound { op: "GET c".into() }.is_transient());
    }
}
