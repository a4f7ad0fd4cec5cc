//! Exponential-backoff wrapper classifying errors as retryable or
//! terminal. Grounded on the synchronous `RetryExecutor` pattern used
//! elsewhere in the pack for command retries, adapted to an async thunk
//! driven by `tokio::time::sleep` instead of `std::thread::sleep` so it
//! can run inside the single-threaded orchestrator event loop.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::CatmitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
   Retryable,
   Terminal,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
   pub max_retries:    u32,
   pub initial_delay:  Duration,
   pub max_delay:      Duration,
   pub backoff_factor: f64,
}

impl Default for RetryPolicy {
   fn default() -> Self {
      Self {
         max_retries:    3,
         initial_delay:  Duration::from_millis(100),
         max_delay:      Duration::from_secs(5),
         backoff_factor: 2.0,
      }
   }
}

impl RetryPolicy {
   pub const fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration, backoff_factor: f64) -> Self {
      Self { max_retries, initial_delay, max_delay, backoff_factor }
   }

   fn delay_for(&self, attempt: u32) -> Duration {
      let scaled = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
      Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
   }

   /// Classifies an error by message substring per the spec's retry
   /// table. This is the one place outside [`crate::error::classify_git_stderr`]
   /// permitted to inspect error text, since the classification rule is
   /// itself defined in terms of substrings rather than typed kinds.
   pub fn classify(err: &CatmitError) -> Classification {
      if err.retryable() {
         return Classification::Retryable;
      }
      let message = err.to_string().to_lowercase();
      let retryable_markers =
         ["network", "timeout", "connection", "resource temporarily unavailable", "device busy"];
      if retryable_markers.iter().any(|marker| message.contains(marker)) {
         return Classification::Retryable;
      }
      Classification::Terminal
   }

   /// Executes `f` repeatedly until it succeeds, exhausts retries, or
   /// `cancel` fires. Between attempts, sleeps `min(initial * factor^n,
   /// max)`, racing the sleep against cancellation.
   pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut f: F) -> Result<T, CatmitError>
   where
      F: FnMut() -> Fut,
      Fut: std::future::Future<Output = Result<T, CatmitError>>,
   {
      let mut attempt = 0;
      let mut last_err;
      loop {
         if cancel.is_cancelled() {
            return Err(CatmitError::Canceled);
         }
         match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
               if Self::classify(&err) == Classification::Terminal {
                  return Err(err);
               }
               last_err = err;
            },
         }

         if attempt >= self.max_retries {
            return Err(CatmitError::RetryExhausted { attempts: attempt + 1, source: Box::new(last_err) });
         }

         let delay = self.delay_for(attempt);
         tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CatmitError::Canceled),
            () = tokio::time::sleep(delay) => {},
         }
         attempt += 1;
      }
   }
}

#[cfg(test)]
mod tests {
   use std::sync::atomic::{AtomicU32, Ordering};

   use tokio_util::sync::CancellationToken;

   use super::*;

   #[tokio::test]
   async fn succeeds_after_retryable_failures_within_budget() {
      let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 2.0);
      let attempts = AtomicU32::new(0);
      let cancel = CancellationToken::new();

      let result = policy
         .execute(&cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
               if n < 2 {
                  Err(CatmitError::Network("connection refused".into()))
               } else {
                  Ok("ok")
               }
            }
         })
         .await;

      assert_eq!(result.unwrap(), "ok");
      assert_eq!(attempts.load(Ordering::SeqCst), 3);
   }

   #[tokio::test]
   async fn terminal_error_is_not_retried() {
      let policy = RetryPolicy::default();
      let attempts = AtomicU32::new(0);
      let cancel = CancellationToken::new();

      let result: Result<(), CatmitError> = policy
         .execute(&cancel, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(CatmitError::Validation("bad input".into())) }
         })
         .await;

      assert!(result.is_err());
      assert_eq!(attempts.load(Ordering::SeqCst), 1);
   }

   #[tokio::test]
   async fn exhaustion_wraps_with_attempt_count() {
      let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2), 2.0);
      let cancel = CancellationToken::new();

      let result: Result<(), CatmitError> = policy
         .execute(&cancel, || async { Err(CatmitError::Network("timeout".into())) })
         .await;

      match result {
         Err(CatmitError::RetryExhausted { attempts, .. }) => assert_eq!(attempts, 3),
         other => panic!("expected RetryExhausted, got {other:?}"),
      }
   }

   #[test]
   fn classification_matches_substring_table() {
      assert_eq!(
         RetryPolicy::classify(&CatmitError::Other("device busy".into())),
         Classification::Retryable
      );
      assert_eq!(
         RetryPolicy::classify(&CatmitError::Other("permission denied".into())),
         Classification::Terminal
      );
   }
}
