//! Core proxy pool implementation.

use crate::config::ProxyPoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::proxy::{Proxy, ProxyEntry};
use crate::supplier::{HttpSupplier, Supplier};

use log::{debug, trace, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

/// Point-in-time counts of the pool's entries.
///
/// `expired` and `exhausted` can overlap: an entry past its TTL that also
/// used up its uses is counted in both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub available: usize,
    pub expired: usize,
    pub exhausted: usize,
}

#[derive(Default)]
struct PoolState {
    entries: Vec<ProxyEntry>,
    /// Round-robin position over the available entries.
    cursor: usize,
}

impl PoolState {
    /// Drop every entry that can no longer be handed out.
    fn compact(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.is_available_at(now));
        before - self.entries.len()
    }

    /// Pick the next available entry round-robin and claim one use of it.
    fn select(&mut self, now: Instant) -> PoolResult<Proxy> {
        let PoolState { entries, cursor } = self;

        let available: Vec<&ProxyEntry> =
            entries.iter().filter(|e| e.is_available_at(now)).collect();
        if available.is_empty() {
            return Err(PoolError::NoAvailableProxy);
        }

        let idx = *cursor % available.len();
        *cursor = cursor.wrapping_add(1);
        let entry = available[idx];

        // Losing the race to another claimer is reported, not retried.
        if entry.claim_use() {
            Ok(entry.snapshot())
        } else {
            Err(PoolError::NoAvailableProxy)
        }
    }
}

/// A self-replenishing pool of short-lived, usage-limited proxies.
///
/// Entries expire after the configured TTL and are retired after the
/// configured number of uses. `acquire` drops stale entries, refreshes from
/// the supplier when the pool runs low and hands out a snapshot of the
/// selected proxy. Uses are counted when a proxy is handed out; the pool is
/// never told whether the caller's request succeeded.
pub struct ProxyPool {
    /// All proxies in the pool.
    state: RwLock<PoolState>,
    /// Configuration for the pool.
    config: ProxyPoolConfig,
    supplier: Option<Arc<dyn Supplier>>,
    /// Held for the duration of a refresh. Only ever `try_lock`ed.
    refreshing: tokio::sync::Mutex<()>,
}

impl ProxyPool {
    /// Create a new, empty proxy pool.
    ///
    /// When a source is configured without a supplier, the source is fetched
    /// over HTTP with [`HttpSupplier`].
    pub fn new(config: ProxyPoolConfig) -> Arc<Self> {
        let supplier = match (&config.supplier, &config.source) {
            (Some(supplier), _) => Some(Arc::clone(supplier)),
            (None, Some(_)) => match HttpSupplier::new() {
                Ok(http) => Some(Arc::new(http) as Arc<dyn Supplier>),
                Err(e) => {
                    warn!("Failed to build HTTP supplier: {}", e);
                    None
                }
            },
            (None, None) => None,
        };

        Arc::new(Self {
            state: RwLock::new(PoolState::default()),
            config,
            supplier,
            refreshing: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ProxyPoolConfig {
        &self.config
    }

    /// Add a proxy with the pool's default use limit and TTL.
    ///
    /// Returns `false` if a proxy with the same host and port is already
    /// pooled.
    pub fn add(&self, host: impl Into<String>, port: impl Into<String>) -> bool {
        let (host, port) = (host.into(), port.into());
        let mut state = self.state.write();

        if state.entries.iter().any(|e| e.matches(&host, &port)) {
            return false;
        }

        state
            .entries
            .push(ProxyEntry::new(host, port, self.config.max_uses, self.config.ttl));
        true
    }

    /// Fetch one batch from the supplier and add every new proxy in it.
    ///
    /// Returns the number of proxies inserted. If another refresh is already
    /// running this returns `Ok(0)` straight away without calling the
    /// supplier; the running refresh has the same effect.
    pub async fn refresh(&self) -> PoolResult<usize> {
        let supplier = match &self.supplier {
            Some(supplier) => Arc::clone(supplier),
            None => return Err(PoolError::SupplierUnconfigured),
        };

        let _guard = match self.refreshing.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                trace!("Refresh already in progress, skipping");
                return Ok(0);
            }
        };

        let source = self.config.source.as_deref().unwrap_or_default();
        match supplier.fetch(source).await {
            Ok(candidates) => {
                let fetched = candidates.len();
                let inserted = candidates
                    .into_iter()
                    .filter(|addr| self.add(addr.host.as_str(), addr.port.as_str()))
                    .count();
                debug!("Refresh added {} of {} fetched proxies", inserted, fetched);

                if let Some(on_replenish) = &self.config.on_replenish {
                    on_replenish(inserted, None);
                }
                Ok(inserted)
            }
            Err(e) => {
                let err = PoolError::SupplierFailure(e);
                debug!("Refresh failed: {}", err);

                if let Some(on_replenish) = &self.config.on_replenish {
                    on_replenish(0, Some(&err));
                }
                Err(err)
            }
        }
    }

    /// Hand out the next proxy, counting one use of it.
    ///
    /// Stale entries are dropped first. An empty pool is refreshed before
    /// selecting, and the caller waits for that refresh. A pool that is
    /// merely below `min_healthy` is refreshed in the background.
    pub async fn acquire(self: &Arc<Self>) -> PoolResult<Proxy> {
        {
            let mut state = self.state.write();
            let now = Instant::now();
            let dropped = state.compact(now);
            if dropped > 0 {
                trace!("Dropped {} stale proxies", dropped);
            }

            if !state.entries.is_empty() {
                if state.entries.len() < self.config.min_healthy {
                    self.spawn_refresh();
                }
                let selected = state.select(now);
                drop(state);
                return self.finish_acquire(selected);
            }
        }

        debug!("Proxy pool is empty, refreshing before selection");
        if let Err(e) = self.refresh().await {
            debug!("Refresh on empty pool failed: {}", e);
        }

        let selected = self.state.write().select(Instant::now());
        self.finish_acquire(selected)
    }

    /// Hand out the next proxy as `host:port`.
    pub async fn acquire_addr(self: &Arc<Self>) -> PoolResult<String> {
        self.acquire().await.map(|proxy| proxy.addr())
    }

    /// Hand out the next proxy as `http://host:port`.
    pub async fn acquire_url(self: &Arc<Self>) -> PoolResult<String> {
        self.acquire().await.map(|proxy| proxy.http_url())
    }

    fn finish_acquire(&self, selected: PoolResult<Proxy>) -> PoolResult<Proxy> {
        let proxy = selected?;
        trace!("Acquired proxy {} ({}/{} uses)", proxy, proxy.used, proxy.max_uses);
        if let Some(on_acquire) = &self.config.on_acquire {
            on_acquire(&proxy);
        }
        Ok(proxy)
    }

    fn spawn_refresh(self: &Arc<Self>) {
        if self.supplier.is_none() {
            return;
        }
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = pool.refresh().await {
                debug!("Background refresh failed: {}", e);
            }
        });
    }

    /// Remove the proxy with the given host and port.
    pub fn remove(&self, host: &str, port: &str) -> bool {
        let mut state = self.state.write();
        match state.entries.iter().position(|e| e.matches(host, port)) {
            Some(idx) => {
                state.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove the pooled proxy a snapshot was taken from.
    pub fn remove_proxy(&self, proxy: &Proxy) -> bool {
        self.remove(&proxy.host, &proxy.port)
    }

    /// Remove a proxy given as `host:port`.
    pub fn remove_addr(&self, addr: &str) -> bool {
        let mut state = self.state.write();
        match state.entries.iter().position(|e| e.addr() == addr) {
            Some(idx) => {
                state.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop every expired or used-up proxy. Returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        self.state.write().compact(Instant::now())
    }

    /// Remove every proxy.
    pub fn clear(&self) {
        self.state.write().entries.clear();
    }

    /// Number of pooled proxies, available or not.
    pub fn size(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn available_count(&self) -> usize {
        let now = Instant::now();
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| e.is_available_at(now))
            .count()
    }

    /// Get statistics about the proxy pool.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.read();
        let now = Instant::now();

        let mut stats = PoolStats {
            total: state.entries.len(),
            ..PoolStats::default()
        };
        for entry in &state.entries {
            let expired = entry.is_expired_at(now);
            let exhausted = entry.is_exhausted();
            if !expired && !exhausted {
                stats.available += 1;
            }
            if expired {
                stats.expired += 1;
            }
            if exhausted {
                stats.exhausted += 1;
            }
        }
        stats
    }

    /// Snapshots of every pooled proxy.
    pub fn all(&self) -> Vec<Proxy> {
        self.state.read().entries.iter().map(ProxyEntry::snapshot).collect()
    }

    /// Snapshots of the proxies that can currently be handed out.
    pub fn available(&self) -> Vec<Proxy> {
        let now = Instant::now();
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| e.is_available_at(now))
            .map(ProxyEntry::snapshot)
            .collect()
    }
}
