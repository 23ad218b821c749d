//! Logging capability injected into providers.

use std::error::Error;

use tracing::error;

/// Receives backend failures that providers swallow.
pub trait CacheLogger: Send + Sync {
    /// Reports that `operation` on `key` failed and was answered with a default.
    fn operation_failed(&self, operation: &'static str, key: Option<&str>, err: &(dyn Error + 'static));
}

/// Default logger, forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl CacheLogger for TracingLogger {
    fn operation_failed(&self, operation: &'static str, key: Option<&str>, err: &(dyn Error + 'static)) {
        error!(
            operation,
            key = key.unwrap_or(""),
            error = %err,
            source = ?err.source().map(ToString::to_string),
            "cache operation failed"
        );
    }
}
