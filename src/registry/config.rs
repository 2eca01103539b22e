//! Registry configuration

/// Subscriber registry configuration
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Maximum live subscribers across all scopes (0 = unlimited)
    pub max_subscribers: usize,
}

impl RegistryConfig {
    /// Set maximum live subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }
}
