//! Adapter configuration.

use std::time::Duration;

use bounded_integer::bounded_integer;
use serde::{Deserialize, Serialize};

bounded_integer! {
    /// Page size bound for fetches and deliveries (1-65535).
    /// A page is "full", and triggers a preload, exactly when it carries
    /// this many transactions.
    #[repr(u16)]
    pub struct PageSize { 1..=65535 }
}

/// Configuration of a [`PollingAdapter`](crate::PollingAdapter).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tailcast::{AdapterConfig, PageSize};
///
/// let config = AdapterConfig::builder()
///     .cache_size(10_000)
///     .poll_interval(Duration::from_millis(250))
///     .max_page_size(PageSize::new_saturating(500))
///     .build();
/// # assert_eq!(config.cache_size, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Maximum number of checkpoint cache entries. Zero disables the cache.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Minimum wall time between re-polls of the same tail checkpoint.
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Maximum transactions per page.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: PageSize,
}

fn default_cache_size() -> usize {
    1000
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_max_page_size() -> PageSize {
    PageSize::new_saturating(100)
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            poll_interval: default_poll_interval(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl AdapterConfig {
    /// Creates a new [`AdapterConfigBuilder`] seeded with the defaults.
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AdapterConfig`].
#[derive(Debug, Default)]
pub struct AdapterConfigBuilder {
    config: AdapterConfig,
}

impl AdapterConfigBuilder {
    /// Sets the checkpoint cache capacity.
    pub fn cache_size(mut self, cache_size: usize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    /// Sets the minimum wall time between re-polls of the same tail.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Sets the maximum transactions per page.
    pub fn max_page_size(mut self, max_page_size: PageSize) -> Self {
        self.config.max_page_size = max_page_size;
        self
    }

    /// Builds the [`AdapterConfig`].
    pub fn build(self) -> AdapterConfig {
        self.config
    }
}
