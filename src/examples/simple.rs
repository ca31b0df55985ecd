//! Simple example of using rotating-proxy-pool.

use reqwest_middleware::ClientBuilder;
use rotating_proxy_pool::{
    ProxyMode, ProxyPool, ProxyPoolConfig, ProxyPoolMiddleware, ProxyRouter, ProxyScheme,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Initializing proxy pool...");

    let config = ProxyPoolConfig::builder()
        // provider API returning `ip:port` pairs, fetched with the built-in HTTP supplier
        .source(
            "https://cdn.jsdelivr.net/gh/proxifly/free-proxy-list@main/proxies/protocols/socks5/data.txt",
        )
        .max_uses(5)
        .ttl(Duration::from_secs(180))
        .min_healthy(3)
        .on_acquire(|proxy| {
            println!("Using proxy {} ({}/{} uses)", proxy, proxy.used, proxy.max_uses)
        })
        .on_replenish(|count, err| match err {
            Some(e) => println!("Refresh failed: {}", e),
            None => println!("Refresh added {} proxies", count),
        })
        .build();
    let pool = ProxyPool::new(config);

    let router = ProxyRouter::builder()
        .mode(ProxyMode::Pool)
        .scheme(ProxyScheme::Socks5)
        .pool(Arc::clone(&pool))
        .retry(3, Duration::from_secs(1))
        .build();

    let client = ClientBuilder::new(reqwest::Client::new())
        .with(ProxyPoolMiddleware::new(Arc::new(router)).with_timeout(Duration::from_secs(10)))
        .build();

    println!("Sending request...");
    let response = client.get("https://httpbin.org/ip").send().await?;

    println!("Status: {}", response.status());
    println!("Response: {}", response.text().await?);
    println!("Pool: {:?}", pool.stats());

    Ok(())
}
