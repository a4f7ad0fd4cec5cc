//! Thread-safe TTL map keyed by `(program, args)`, shared between
//! background tasks behind a multi-reader/single-writer lock.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use std::collections::HashMap;

/// Delimiter used to join the program and its arguments into a cache key.
/// Chosen because it cannot appear in a shell argument token the way a
/// space or `:` could, so distinct invocations never collide.
const KEY_SEP: char = '\u{1F}';

#[derive(Debug, Clone)]
pub struct CacheEntry {
   pub bytes:     Vec<u8>,
   pub error:     Option<String>,
   pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
   pub size:          usize,
   pub ttl:           Duration,
   pub expired_count: usize,
}

pub struct ResultCache {
   ttl:     Duration,
   entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResultCache {
   pub fn new(ttl: Duration) -> Self {
      Self { ttl, entries: RwLock::new(HashMap::new()) }
   }

   pub fn key(program: &str, args: &[&str]) -> String {
      let mut key = String::from(program);
      for arg in args {
         key.push(KEY_SEP);
         key.push_str(arg);
      }
      key
   }

   /// Returns `(bytes, error, hit)`. Expired entries are reported as
   /// misses but are not evicted here — `clean_expired` is the only
   /// eviction path, keeping reads lock-cheap.
   pub fn get(&self, key: &str) -> (Option<Vec<u8>>, Option<String>, bool) {
      let entries = self.entries.read();
      match entries.get(key) {
         Some(entry) if entry.timestamp.elapsed() <= self.ttl => {
            (Some(entry.bytes.clone()), entry.error.clone(), true)
         },
         _ => (None, None, false),
      }
   }

   pub fn set(&self, key: String, bytes: Vec<u8>, error: Option<String>) {
      let mut entries = self.entries.write();
      entries.insert(key, CacheEntry { bytes, error, timestamp: Instant::now() });
   }

   pub fn clear(&self) {
      self.entries.write().clear();
   }

   pub fn clean_expired(&self) -> usize {
      let mut entries = self.entries.write();
      let before = entries.len();
      entries.retain(|_, entry| entry.timestamp.elapsed() <= self.ttl);
      before - entries.len()
   }

   pub fn stats(&self) -> CacheStats {
      let entries = self.entries.read();
      let expired_count = entries.values().filter(|e| e.timestamp.elapsed() > self.ttl).count();
      CacheStats { size: entries.len(), ttl: self.ttl, expired_count }
   }
}

#[cfg(test)]
mod tests {
   use std::{thread::sleep, time::Duration};

   use super::ResultCache;

   #[test]
   fn set_then_get_within_ttl_hits() {
      let cache = ResultCache::new(Duration::from_secs(60));
      let key = ResultCache::key("git", &["rev-parse", "--abbrev-ref", "HEAD"]);
      cache.set(key.clone(), b"main\n".to_vec(), None);
      let (bytes, err, hit) = cache.get(&key);
      assert!(hit);
      assert_eq!(bytes.unwrap(), b"main\n");
      assert!(err.is_none());
   }

   #[test]
   fn expired_entry_is_a_miss() {
      let cache = ResultCache::new(Duration::from_millis(10));
      let key = ResultCache::key("git", &["status"]);
      cache.set(key.clone(), b"ok".to_vec(), None);
      sleep(Duration::from_millis(30));
      let (_, _, hit) = cache.get(&key);
      assert!(!hit);
   }

   #[test]
   fn clean_expired_reports_count_and_evicts() {
      let cache = ResultCache::new(Duration::from_millis(5));
      cache.set("a".to_string(), vec![], None);
      cache.set("b".to_string(), vec![], None);
      sleep(Duration::from_millis(20));
      assert_eq!(cache.clean_expired(), 2);
      assert_eq!(cache.stats().size, 0);
   }

   #[test]
   fn keys_for_distinct_args_never_collide() {
      let a = ResultCache::key("git", &["log", "-1"]);
      let b = ResultCache::key("git", &["log-1"]);
      assert_ne!(a, b);
   }
}
