//! Configuration for the proxy pool.

use crate::error::PoolError;
use crate::proxy::Proxy;
use crate::supplier::Supplier;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of uses allowed per proxy.
pub const DEFAULT_MAX_USES: u32 = 5;
/// Default lifetime of a proxy.
pub const DEFAULT_TTL: Duration = Duration::from_secs(180);
/// Default live-entry count under which a background refresh starts.
pub const DEFAULT_MIN_HEALTHY: usize = 3;

/// Called with the snapshot of every proxy handed out by `acquire`.
pub type OnAcquire = Arc<dyn Fn(&Proxy) + Send + Sync>;
/// Called once per refresh attempt with the number of inserted proxies or the error.
pub type OnReplenish = Arc<dyn Fn(usize, Option<&PoolError>) + Send + Sync>;

/// Configuration for the proxy pool.
#[derive(Clone)]
pub struct ProxyPoolConfig {
    /// Identifier handed to the supplier, usually the provider's API URL.
    pub source: Option<String>,
    /// Number of uses before a proxy is retired.
    pub max_uses: u32,
    /// Lifetime of a proxy from the moment it enters the pool.
    pub ttl: Duration,
    /// Live-entry count under which `acquire` starts a background refresh.
    pub min_healthy: usize,
    /// Where new proxies come from.
    pub supplier: Option<Arc<dyn Supplier>>,
    pub on_acquire: Option<OnAcquire>,
    pub on_replenish: Option<OnReplenish>,
}

impl ProxyPoolConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProxyPoolConfigBuilder {
        ProxyPoolConfigBuilder::new()
    }
}

impl Default for ProxyPoolConfig {
    fn default() -> Self {
        ProxyPoolConfigBuilder::new().build()
    }
}

impl fmt::Debug for ProxyPoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyPoolConfig")
            .field("source", &self.source)
            .field("max_uses", &self.max_uses)
            .field("ttl", &self.ttl)
            .field("min_healthy", &self.min_healthy)
            .field("supplier", &self.supplier.is_some())
            .field("on_acquire", &self.on_acquire.is_some())
            .field("on_replenish", &self.on_replenish.is_some())
            .finish()
    }
}

/// Builder for `ProxyPoolConfig`.
///
/// Zero values for the numeric settings fall back to their defaults.
#[derive(Default)]
pub struct ProxyPoolConfigBuilder {
    source: Option<String>,
    max_uses: Option<u32>,
    ttl: Option<Duration>,
    min_healthy: Option<usize>,
    supplier: Option<Arc<dyn Supplier>>,
    on_acquire: Option<OnAcquire>,
    on_replenish: Option<OnReplenish>,
}

impl ProxyPoolConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source identifier handed to the supplier.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set how many times each proxy may be handed out.
    pub fn max_uses(mut self, max_uses: u32) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    /// Set the lifetime of each proxy.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the lifetime of each proxy in seconds.
    pub fn ttl_secs(self, secs: u64) -> Self {
        self.ttl(Duration::from_secs(secs))
    }

    /// Set the live-entry count under which a background refresh starts.
    pub fn min_healthy(mut self, count: usize) -> Self {
        self.min_healthy = Some(count);
        self
    }

    /// Set the supplier used by `refresh`.
    pub fn supplier(mut self, supplier: impl Supplier + 'static) -> Self {
        self.supplier = Some(Arc::new(supplier));
        self
    }

    /// Set an already shared supplier.
    pub fn shared_supplier(mut self, supplier: Arc<dyn Supplier>) -> Self {
        self.supplier = Some(supplier);
        self
    }

    /// Set the callback run for every proxy handed out.
    pub fn on_acquire(mut self, f: impl Fn(&Proxy) + Send + Sync + 'static) -> Self {
        self.on_acquire = Some(Arc::new(f));
        self
    }

    /// Set the callback run after every refresh attempt.
    pub fn on_replenish(
        mut self,
        f: impl Fn(usize, Option<&PoolError>) + Send + Sync + 'static,
    ) -> Self {
        self.on_replenish = Some(Arc::new(f));
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ProxyPoolConfig {
        ProxyPoolConfig {
            source: self.source.filter(|s| !s.is_empty()),
            max_uses: self.max_uses.filter(|n| *n > 0).unwrap_or(DEFAULT_MAX_USES),
            ttl: self.ttl.filter(|d| !d.is_zero()).unwrap_or(DEFAULT_TTL),
            min_healthy: self.min_healthy.filter(|n| *n > 0).unwrap_or(DEFAULT_MIN_HEALTHY),
            supplier: self.supplier,
            on_acquire: self.on_acquire,
            on_replenish: self.on_replenish,
        }
    }
}
