//! # rotating-proxy-pool
//!
//! A self-replenishing pool of short-lived, usage-limited proxies.
//!
//! Every proxy in the pool expires after a time-to-live and is retired after a
//! fixed number of uses. When the pool runs low it asks a [`Supplier`] for a
//! fresh batch. A [`ProxyRouter`] chooses between direct connections, spoofed
//! forwarding headers, pooled proxies and a fixed credentialed proxy, and
//! [`ProxyPoolMiddleware`] applies that choice to reqwest requests.

pub mod config;
pub mod error;
pub mod middleware;
pub mod pool;
pub mod proxy;
pub mod router;
pub mod shared;
pub mod supplier;
mod utils;

pub use config::{ProxyPoolConfig, ProxyPoolConfigBuilder};
pub use error::{PoolError, PoolResult, RouterError};
pub use middleware::ProxyPoolMiddleware;
pub use pool::{PoolStats, ProxyPool};
pub use proxy::{Proxy, ProxyAddr, ProxyEntry};
pub use router::{
    Endpoint, ProxyMode, ProxyRoute, ProxyRouter, ProxyRouterBuilder, ProxyScheme, RetryPolicy,
};
pub use supplier::{supplier_fn, FnSupplier, HttpSupplier, Supplier};
pub use utils::extract_ip_port;
