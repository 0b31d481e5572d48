// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed after {attempts} attempt(s): {cause}")]
    RequestFailed {
        attempts: u32,
        #[source]
        cause: RequestFailure,
    },

    #[error("maximum retry attempts exceeded (attempt {attempt}, max {max_retries})")]
    AttemptsExceeded { attempt: u32, max_retries: u32 },

    #[error("invalid catalog client configuration: {0}")]
    InvalidConfiguration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),
}

impl CatalogError {
    /// HTTP status of the last failed attempt, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::RequestFailed {
                cause: RequestFailure::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

/// Why a single attempt against the catalog failed.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response from catalog: {0}")]
    InvalidResponse(String),
}

impl RequestFailure {
    /// Rate limiting, gateway errors and connection problems are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestFailure::Status { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            RequestFailure::Network(_) => true,
            RequestFailure::InvalidResponse(_) => false,
        }
    }
}
