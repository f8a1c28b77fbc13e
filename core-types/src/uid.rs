//! Opaque unique string tokens for payments and favorites.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use blake3::Hasher;

/// Raw digest length of a token; tokens render as twice this many hex chars.
pub const UID_LEN: usize = 16;

/// Source of globally-unique opaque string tokens. The ledger only assumes
/// uniqueness, nothing structural.
pub trait UidSource: Send + Sync {
    fn next_uid(&self) -> String;
}

/// Default token source: a per-process seed plus a monotonic counter, mixed
/// through a domain-separated hash.
pub struct TokenUidSource {
    seed: u64,
    counter: AtomicU64,
}

impl TokenUidSource {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            seed,
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for TokenUidSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UidSource for TokenUidSource {
    fn next_uid(&self) -> String {
        let mut hasher = Hasher::new();
        hasher.update(b"ledger_uid.v1");
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(&self.counter.fetch_add(1, Ordering::Relaxed).to_le_bytes());
        let hash = hasher.finalize();
        hash.to_hex()[..UID_LEN * 2].to_string()
    }
}
