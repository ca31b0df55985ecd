//! Proxy entries and the snapshots handed out to callers.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Stand-in expiry for TTLs too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 86_400);

/// `from + ttl`, clamped to a far-future instant instead of overflowing.
fn expiry_after(from: Instant, ttl: Duration) -> Instant {
    from.checked_add(ttl)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

/// A `host:port` pair as returned by a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyAddr {
    pub host: String,
    pub port: String,
}

impl ProxyAddr {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for ProxyAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A live proxy held by the pool, limited both in time and in number of uses.
#[derive(Debug)]
pub struct ProxyEntry {
    host: String,
    port: String,
    created_at: Instant,
    expires_at: RwLock<Instant>,
    used: AtomicU32,
    max_uses: u32,
    last_used: Mutex<Option<Instant>>,
}

impl ProxyEntry {
    /// Create an entry that expires after `ttl` and allows `max_uses` claims.
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        max_uses: u32,
        ttl: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            host: host.into(),
            port: port.into(),
            created_at: now,
            expires_at: RwLock::new(expiry_after(now, ttl)),
            used: AtomicU32::new(0),
            max_uses,
            last_used: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// `host:port`, the identity used for deduplication and removal.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn matches(&self, host: &str, port: &str) -> bool {
        self.host == host && self.port == port
    }

    /// Record one use if the limit has not been reached yet.
    ///
    /// Safe to race from any number of threads: the count never goes past
    /// `max_uses` and no increment is lost.
    pub fn claim_use(&self) -> bool {
        let mut current = self.used.load(Ordering::Acquire);
        loop {
            if current >= self.max_uses {
                return false;
            }
            match self.used.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    *self.last_used.lock() = Some(Instant::now());
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Whether the entry is unexpired and under its use limit.
    pub fn is_available(&self) -> bool {
        self.is_available_at(Instant::now())
    }

    pub(crate) fn is_available_at(&self, now: Instant) -> bool {
        !self.is_expired_at(now) && !self.is_exhausted()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        now >= *self.expires_at.read()
    }

    /// Whether every allowed use has been claimed.
    pub fn is_exhausted(&self) -> bool {
        self.used.load(Ordering::Acquire) >= self.max_uses
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::Acquire)
    }

    pub fn max_uses(&self) -> u32 {
        self.max_uses
    }

    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.used())
    }

    pub fn remaining_ttl(&self) -> Duration {
        self.expires_at.read().saturating_duration_since(Instant::now())
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn expires_at(&self) -> Instant {
        *self.expires_at.read()
    }

    pub fn last_used(&self) -> Option<Instant> {
        *self.last_used.lock()
    }

    /// Push the expiry further out by `extra`.
    pub fn extend_ttl(&self, extra: Duration) {
        let mut expires_at = self.expires_at.write();
        *expires_at = expiry_after(*expires_at, extra);
    }

    /// Make the entry usable again: zero uses, expiring `ttl` from now.
    pub fn reset(&self, ttl: Duration) {
        self.used.store(0, Ordering::Release);
        *self.expires_at.write() = expiry_after(Instant::now(), ttl);
    }

    /// Copy out the current identity and counters.
    pub fn snapshot(&self) -> Proxy {
        Proxy {
            host: self.host.clone(),
            port: self.port.clone(),
            used: self.used(),
            max_uses: self.max_uses,
            created_at: self.created_at,
            expires_at: self.expires_at(),
            last_used: self.last_used(),
        }
    }
}

/// Read-only view of a pooled proxy at the moment it was handed out.
///
/// Later changes to the pooled entry are not reflected here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub host: String,
    pub port: String,
    /// Uses claimed so far, including the one this snapshot was taken for.
    pub used: u32,
    pub max_uses: u32,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub last_used: Option<Instant>,
}

impl Proxy {
    /// `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `http://host:port`.
    pub fn http_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `socks5://host:port`.
    pub fn socks5_url(&self) -> String {
        format!("socks5://{}:{}", self.host, self.port)
    }

    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.used)
    }

    pub fn remaining_ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
