//! Fan-out of N independent operations, gathered when all complete. No
//! early return on first failure — the two output lists are positionally
//! aligned with the input regardless of which tasks failed.

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::error::CatmitError;

/// Runs every future in `tasks` concurrently and waits for all of them.
/// Each task is itself responsible for observing `cancel` at its own
/// suspension points; this function only gathers.
pub async fn run_batch<T, F>(tasks: Vec<F>) -> (Vec<T>, Vec<Option<CatmitError>>)
where
   F: std::future::Future<Output = Result<T, CatmitError>>,
   T: Default,
{
   let results = join_all(tasks).await;
   let mut values = Vec::with_capacity(results.len());
   let mut errors = Vec::with_capacity(results.len());
   for result in results {
      match result {
         Ok(value) => {
            values.push(value);
            errors.push(None);
         },
         Err(err) => {
            values.push(T::default());
            errors.push(Some(err));
         },
      }
   }
   (values, errors)
}

/// Convenience wrapper matching the spec's "closures over a cancellation
/// token" framing, for callers that want to build their futures lazily
/// from a shared token rather than pre-building them.
pub async fn run_batch_with<T, F, Fut>(
   cancel: &CancellationToken,
   thunks: Vec<F>,
) -> (Vec<T>, Vec<Option<CatmitError>>)
where
   F: FnOnce(CancellationToken) -> Fut,
   Fut: std::future::Future<Output = Result<T, CatmitError>>,
   T: Default,
{
   let tasks: Vec<_> = thunks.into_iter().map(|thunk| thunk(cancel.clone())).collect();
   run_batch(tasks).await
}

#[cfg(test)]
mod tests {
   use tokio_util::sync::CancellationToken;

   use super::*;

   #[tokio::test]
   async fn gathers_all_results_positionally() {
      let cancel = CancellationToken::new();
      let (values, errors) = run_batch_with::<i32, _, _>(&cancel, vec![
         |_| async { Ok(1) },
         |_| async { Err(CatmitError::Other("boom".into())) },
         |_| async { Ok(3) },
      ])
      .await;

      assert_eq!(values, vec![1, 0, 3]);
      assert!(errors[0].is_none());
      assert!(errors[1].is_some());
      assert!(errors[2].is_none());
   }

   #[tokio::test]
   async fn one_failure_does_not_cancel_siblings() {
      let cancel = CancellationToken::new();
      let (values, errors) = run_batch_with::<&'static str, _, _>(&cancel, vec![
         |_| async { Err(CatmitError::NoDiff) },
         |_| async { Ok("done") },
      ])
      .await;
      assert_eq!(values[1], "done");
      assert!(errors[0].is_some());
   }
}
