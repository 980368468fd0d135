use reqwest::StatusCode;

use crate::models::{ItemId, ListKind};

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Remote list API error ({status}): {message}")]
    Remote { status: StatusCode, message: String },

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Invalid item id: {0}")]
    InvalidItemId(String),

    #[error("Unknown list kind: {0}")]
    UnknownListKind(String),

    #[error("A {list} change for item {item} is already in flight")]
    ToggleInFlight { list: ListKind, item: ItemId },

    #[error("Membership cache is already attached to a session")]
    AlreadyAttached,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a remote error for a non-success response
    pub fn remote(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Remote {
            status,
            message: message.into(),
        }
    }

    /// Whether the error means the session is gone or was never there
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, AppError::Unauthenticated)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = AppError::remote(StatusCode::CONFLICT, "already present");
        assert_eq!(
            err.to_string(),
            "Remote list API error (409 Conflict): already present"
        );
    }

    #[test]
    fn test_toggle_in_flight_display() {
        let err = AppError::ToggleInFlight {
            list: ListKind::Favorites,
            item: ItemId::new(10),
        };
        assert_eq!(
            err.to_string(),
            "A favorites change for item 10 is already in flight"
        );
    }

    #[test]
    fn test_is_unauthenticated() {
        assert!(AppError::Unauthenticated.is_unauthenticated());
        assert!(!AppError::Internal("boom".to_string()).is_unauthenticated());
    }
}
