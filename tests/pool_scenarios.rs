use futures::future::join_all;
use rotating_proxy_pool::{
    supplier_fn, PoolError, ProxyAddr, ProxyMode, ProxyPool, ProxyPoolConfig, ProxyRouter,
    RouterError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acquires_respect_use_limits() {
    init_logging();
    let pool = ProxyPool::new(
        ProxyPoolConfig::builder()
            .max_uses(3)
            .min_healthy(1)
            .build(),
    );
    for i in 1..=4 {
        pool.add(format!("10.0.0.{}", i), "8080");
    }

    let attempts = (0..40).map(|_| {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.acquire().await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let mut per_proxy: HashMap<String, usize> = HashMap::new();
    for proxy in results.iter().filter_map(|r| r.as_ref().ok()) {
        *per_proxy.entry(proxy.addr()).or_default() += 1;
    }

    // 4 proxies with 3 uses each.
    assert_eq!(per_proxy.values().sum::<usize>(), 12);
    assert!(per_proxy.values().all(|n| *n == 3));
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(PoolError::NoAvailableProxy))));
    assert_eq!(pool.size(), 0);
}

#[tokio::test]
async fn pool_replenishes_from_closure_supplier() {
    init_logging();
    let batches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&batches);
    let replenished = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&replenished);

    let pool = ProxyPool::new(
        ProxyPoolConfig::builder()
            .source("batch-api")
            .max_uses(1)
            .min_healthy(1)
            .supplier(supplier_fn(move |source: String| {
                let batch = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    assert_eq!(source, "batch-api");
                    Ok(vec![
                        ProxyAddr::new(format!("10.{}.0.1", batch), "8080"),
                        ProxyAddr::new(format!("10.{}.0.2", batch), "8080"),
                    ])
                }
            }))
            .on_replenish(move |count, err| {
                assert!(err.is_none());
                seen.fetch_add(count, Ordering::SeqCst);
            })
            .build(),
    );

    // Each batch holds two single-use proxies, so every second acquire
    // empties the pool and the next one refreshes before selecting.
    let mut hosts = Vec::new();
    for _ in 0..4 {
        hosts.push(pool.acquire().await.unwrap().host);
    }

    assert_eq!(batches.load(Ordering::SeqCst), 2);
    assert_eq!(replenished.load(Ordering::SeqCst), 4);
    assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "10.1.0.1", "10.1.0.2"]);
}

#[tokio::test]
async fn expired_proxies_are_never_handed_out() {
    init_logging();
    let pool = ProxyPool::new(
        ProxyPoolConfig::builder()
            .ttl(Duration::from_millis(50))
            .min_healthy(1)
            .build(),
    );
    pool.add("10.0.0.1", "8080");
    assert!(pool.acquire().await.is_ok());

    tokio::time::sleep(Duration::from_millis(80)).await;

    let stats = pool.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.available, 0);
    assert_eq!(stats.expired, 1);
    assert!(matches!(pool.acquire().await, Err(PoolError::NoAvailableProxy)));
    assert_eq!(pool.size(), 0);
}

#[tokio::test]
async fn router_recovers_once_supplier_delivers() {
    init_logging();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let pool = ProxyPool::new(
        ProxyPoolConfig::builder()
            .supplier(supplier_fn(move |_source: String| {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(anyhow::anyhow!("provider warming up"))
                    } else {
                        Ok(vec![ProxyAddr::new("10.5.5.5", "1080")])
                    }
                }
            }))
            .build(),
    );
    let router = ProxyRouter::builder()
        .mode(ProxyMode::Pool)
        .pool(Arc::clone(&pool))
        .retry(5, Duration::from_millis(10))
        .build();

    let route = router.resolve().await.unwrap();
    assert_eq!(route.display, "10.5.5.5:1080");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn router_reports_exhaustion_distinctly() {
    init_logging();
    let pool = ProxyPool::new(ProxyPoolConfig::default());
    let router = ProxyRouter::builder()
        .mode(ProxyMode::Pool)
        .pool(pool)
        .retry(2, Duration::from_millis(1))
        .build();

    match router.resolve().await {
        Err(RouterError::RetriesExhausted { attempts }) => assert_eq!(attempts, 2),
        other => panic!("unexpected result: {:?}", other),
    }
}
