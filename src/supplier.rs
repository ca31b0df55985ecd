//! Suppliers that fetch fresh proxy candidates for the pool.

use crate::proxy::ProxyAddr;
use crate::utils;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

/// Source of new proxy candidates.
///
/// One call returns one batch. The pool never retries a failed fetch on its
/// own, so implementations that want retries or deadlines handle them here.
#[async_trait]
pub trait Supplier: Send + Sync {
    async fn fetch(&self, source: &str) -> anyhow::Result<Vec<ProxyAddr>>;
}

/// Adapter turning an async closure into a [`Supplier`].
pub struct FnSupplier<F> {
    f: F,
}

/// Wrap `f` as a [`Supplier`]. The closure receives the configured source.
pub fn supplier_fn<F, Fut>(f: F) -> FnSupplier<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<ProxyAddr>>> + Send + 'static,
{
    FnSupplier { f }
}

#[async_trait]
impl<F, Fut> Supplier for FnSupplier<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<ProxyAddr>>> + Send + 'static,
{
    async fn fetch(&self, source: &str) -> anyhow::Result<Vec<ProxyAddr>> {
        (self.f)(source.to_string()).await
    }
}

/// Fetches the source URL over HTTP and extracts every `ip:port` in the body.
#[derive(Clone)]
pub struct HttpSupplier {
    client: Client,
}

impl HttpSupplier {
    /// Supplier with a plain client and a 10 second timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client })
    }

    /// Supplier using a caller-provided client, e.g. one that itself goes
    /// through a proxy.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Supplier for HttpSupplier {
    async fn fetch(&self, source: &str) -> anyhow::Result<Vec<ProxyAddr>> {
        let response = match self.client.get(source).send().await {
            Ok(resp) => resp.error_for_status()?,
            Err(e) => {
                warn!("Failed to fetch proxies from {}: {}", source, e);
                return Err(e.into());
            }
        };
        let body = response.text().await?;
        debug!("Proxy source {} returned {} bytes", source, body.len());

        let proxies = utils::extract_ip_port(&body);
        info!("Fetched {} proxies from {}", proxies.len(), source);
        Ok(proxies)
    }
}
