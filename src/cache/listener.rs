//! Eviction Listeners
//!
//! Single-method callback invoked when a provider drops an entry to stay
//! within capacity.

use std::fmt;
use std::sync::Arc;

// == Eviction Listener ==
/// Receives capacity evictions.
///
/// Called synchronously from the `set` that triggered the eviction, possibly
/// from several threads at once. Implementations must not block for long.
///
/// `value` is `Some` for the in-process provider and `None` for the Redis
/// provider.
pub trait EvictionListener: Send + Sync {
    fn on_evict(&self, key: &str, value: Option<&[u8]>);
}

impl<F> EvictionListener for F
where
    F: Fn(&str, Option<&[u8]>) + Send + Sync,
{
    fn on_evict(&self, key: &str, value: Option<&[u8]>) {
        self(key, value)
    }
}

// == Fan Out Listener ==
/// Forwards every eviction to each inner listener in registration order.
#[derive(Clone, Default)]
pub struct FanOutListener {
    listeners: Vec<Arc<dyn EvictionListener>>,
}

impl FanOutListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener.
    pub fn with(mut self, listener: Arc<dyn EvictionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Appends a listener if one is given.
    pub fn with_optional(self, listener: Option<Arc<dyn EvictionListener>>) -> Self {
        match listener {
            Some(listener) => self.with(listener),
            None => self,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl EvictionListener for FanOutListener {
    fn on_evict(&self, key: &str, value: Option<&[u8]>) {
        for listener in &self.listeners {
            listener.on_evict(key, value);
        }
    }
}

impl fmt::Debug for FanOutListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutListener")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
