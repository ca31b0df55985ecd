//! Middleware implementation for reqwest.

use crate::router::{ProxyRoute, ProxyRouter};

use anyhow::anyhow;
use async_trait::async_trait;
use log::{info, warn};
use reqwest_middleware::{Error, Middleware, Next, Result};
use std::sync::Arc;
use std::time::Duration;

/// Middleware that routes each request according to a [`ProxyRouter`].
///
/// Spoofed headers are added to the request and it continues down the chain.
/// Proxied requests are sent on a client built for the chosen proxy. Uses are
/// counted by the pool when the proxy is handed out, so nothing is reported
/// back once the request finishes.
#[derive(Clone)]
pub struct ProxyPoolMiddleware {
    router: Arc<ProxyRouter>,
    /// Timeout for requests sent through a proxy.
    timeout: Duration,
}

impl ProxyPoolMiddleware {
    /// Create middleware for `router` with a 30 second proxied request timeout.
    pub fn new(router: Arc<ProxyRouter>) -> Self {
        Self {
            router,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the timeout for requests sent through a proxy.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn router(&self) -> &Arc<ProxyRouter> {
        &self.router
    }

    fn proxied_client(&self, route: &ProxyRoute) -> Result<reqwest::Client> {
        let url = match route.proxy_url() {
            Some(Ok(url)) => url,
            Some(Err(e)) => {
                return Err(Error::Middleware(anyhow!("invalid proxy {}: {}", route.display, e)))
            }
            None => return Err(Error::Middleware(anyhow!("route has no proxy endpoint"))),
        };

        let proxy = reqwest::Proxy::all(url.as_str()).map_err(Error::Reqwest)?;
        reqwest::Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .build()
            .map_err(Error::Reqwest)
    }
}

#[async_trait]
impl Middleware for ProxyPoolMiddleware {
    async fn handle(
        &self,
        mut req: reqwest::Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<reqwest::Response> {
        let route = self.router.resolve().await.map_err(|e| {
            warn!("Failed to resolve proxy route: {}", e);
            Error::Middleware(anyhow!(e))
        })?;

        for (name, value) in &route.headers {
            req.headers_mut().insert(name.clone(), value.clone());
        }

        if !route.is_proxied() {
            return next.run(req, extensions).await;
        }

        info!("Using proxy: {}", route.display);
        let client = self.proxied_client(&route)?;
        client.execute(req).await.map_err(|err| {
            warn!("Request failed with proxy {}: {}", route.display, err);
            Error::Reqwest(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyPoolConfig;
    use crate::pool::ProxyPool;
    use crate::router::{Endpoint, ProxyMode, ProxyScheme};
    use reqwest_middleware::ClientBuilder;

    #[test]
    fn builds_client_for_credentialed_route() {
        let router = ProxyRouter::builder()
            .mode(ProxyMode::Credentialed)
            .scheme(ProxyScheme::Socks5)
            .credentials(Endpoint::new("127.0.0.1", "1080").with_credentials("u", "p"))
            .build();
        let middleware =
            ProxyPoolMiddleware::new(Arc::new(router)).with_timeout(Duration::from_secs(5));

        let route = ProxyRoute {
            scheme: Some(ProxyScheme::Socks5),
            endpoint: Some(Endpoint::new("127.0.0.1", "1080").with_credentials("u", "p")),
            ..ProxyRoute::default()
        };
        assert!(middleware.proxied_client(&route).is_ok());
        assert!(middleware.proxied_client(&ProxyRoute::default()).is_err());
    }

    #[tokio::test]
    async fn empty_pool_fails_the_request() {
        let pool = ProxyPool::new(ProxyPoolConfig::default());
        let router = ProxyRouter::builder()
            .mode(ProxyMode::Pool)
            .pool(pool)
            .retry(1, Duration::ZERO)
            .build();
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(ProxyPoolMiddleware::new(Arc::new(router)))
            .build();

        let err = client.get("http://127.0.0.1:9/").send().await.unwrap_err();
        assert!(matches!(err, Error::Middleware(_)));
        assert!(err.to_string().contains("after 1 attempts"));
    }
}
