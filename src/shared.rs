//! Optional process-wide pool for applications that want one.
//!
//! Library code should take an `Arc<ProxyPool>` explicitly; this helper is
//! meant to be set up once by the application at startup.

use crate::config::ProxyPoolConfig;
use crate::pool::ProxyPool;

use parking_lot::{const_rwlock, RwLock};
use std::sync::Arc;

static DEFAULT_POOL: RwLock<Option<Arc<ProxyPool>>> = const_rwlock(None);

/// Build the shared pool from `config`.
///
/// Only the first call builds anything. Later calls, including those with a
/// different config, return the existing pool.
pub fn init_default(config: ProxyPoolConfig) -> Arc<ProxyPool> {
    if let Some(pool) = DEFAULT_POOL.read().as_ref() {
        return Arc::clone(pool);
    }

    let mut slot = DEFAULT_POOL.write();
    Arc::clone(slot.get_or_insert_with(|| ProxyPool::new(config)))
}

/// The shared pool, built with the default configuration if nothing has
/// initialised it yet.
pub fn default_pool() -> Arc<ProxyPool> {
    init_default(ProxyPoolConfig::default())
}

/// Forget the shared pool so the next call builds a fresh one.
///
/// Intended for test isolation.
pub fn reset_default() {
    DEFAULT_POOL.write().take();
}
