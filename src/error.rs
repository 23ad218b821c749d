//! Error types for the cache providers
//!
//! Two categories are kept apart: [`CacheError`] covers runtime conditions a
//! caller can recover from, [`ConfigFault`] covers broken startup wiring.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Recoverable runtime errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No provider is registered under the requested name
    #[error("unknown cache provider \"{name}\" (registered: {})", .registered.join(", "))]
    UnknownProvider {
        name: String,
        registered: Vec<String>,
    },

    /// The provider configuration is unusable
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// The networked backend could not be reached at construction time
    #[error("failed to connect to redis at {address}")]
    Connect {
        address: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A backend command or script failed
    #[error("redis command failed")]
    Backend(#[from] redis::RedisError),

    /// No pooled connection became available in time
    #[error("redis connection pool exhausted")]
    Pool(#[from] r2d2::Error),

    /// The cache has been closed
    #[error("cache is closed")]
    Closed,

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            CacheError::Closed | CacheError::Connect { .. } | CacheError::Pool(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Configuration Fault ==
/// Programmer errors in provider registration.
///
/// These indicate broken wiring discovered at startup. The composition root
/// is expected to call [`ConfigFault::fatal`] rather than recover.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigFault {
    #[error("cache: provider \"{0}\" registered twice")]
    DuplicateProvider(String),

    #[error("cache: provider \"{0}\" registered without a constructor")]
    MissingConstructor(String),
}

impl ConfigFault {
    /// Terminates with the fault's fixed message.
    pub fn fatal(self) -> ! {
        tracing::error!(fault = %self, "fatal cache configuration fault");
        panic!("{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_lists_registered_names() {
        let err = CacheError::UnknownProvider {
            name: "memcached".to_string(),
            registered: vec!["memory".to_string(), "redis".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown cache provider \"memcached\" (registered: memory, redis)"
        );
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = CacheError::NotFound("k".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_closed_maps_to_503() {
        let response = CacheError::Closed.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    #[should_panic(expected = "cache: provider \"memory\" registered twice")]
    fn test_fatal_panics_with_fixed_message() {
        ConfigFault::DuplicateProvider("memory".to_string()).fatal();
    }
}
