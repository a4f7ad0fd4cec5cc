//! Abstracted process runner. Every higher-level component accepts a
//! `CommandExecutor` rather than shelling out directly, so collection and
//! resolution logic can be exercised against a fake in tests without a real
//! git binary or network access.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::error::{CatmitError, classify_git_stderr};

#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
   /// Runs `program` with `args` in `cwd`, returning raw stdout bytes on a
   /// zero exit. A cancelled token must fail with [`CatmitError::Canceled`],
   /// never a generic command-failure error, even if the process also
   /// happened to exit non-zero concurrently.
   async fn run(
      &self,
      cancel: &CancellationToken,
      program: &str,
      args: &[&str],
      cwd: &Path,
   ) -> Result<Vec<u8>, CatmitError>;
}

/// Lets an `Arc<E>` stand in for `E` itself, so callers that hold a
/// shared executor behind an `Arc` (to fan it out across background
/// tasks) can still pass it to APIs generic over `CommandExecutor`
/// without cloning the underlying executor.
#[async_trait::async_trait]
impl<T: CommandExecutor + ?Sized> CommandExecutor for std::sync::Arc<T> {
   async fn run(
      &self,
      cancel: &CancellationToken,
      program: &str,
      args: &[&str],
      cwd: &Path,
   ) -> Result<Vec<u8>, CatmitError> {
      (**self).run(cancel, program, args, cwd).await
   }
}

/// Production executor backed by `tokio::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandExecutor;

#[async_trait::async_trait]
impl CommandExecutor for TokioCommandExecutor {
   async fn run(
      &self,
      cancel: &CancellationToken,
      program: &str,
      args: &[&str],
      cwd: &Path,
   ) -> Result<Vec<u8>, CatmitError> {
      let mut child = tokio::process::Command::new(program)
         .args(args)
         .current_dir(cwd)
         .stdout(std::process::Stdio::piped())
         .stderr(std::process::Stdio::piped())
         .spawn()
         .map_err(CatmitError::Io)?;

      let output = tokio::select! {
         biased;
         () = cancel.cancelled() => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(CatmitError::Canceled);
         }
         result = child.wait_with_output() => result.map_err(CatmitError::Io)?,
      };

      if !output.status.success() {
         let stderr = String::from_utf8_lossy(&output.stderr);
         if program == "git" {
            return Err(classify_git_stderr(&stderr, output.status.code()));
         }
         return Err(CatmitError::Other(format!(
            "{program} {} failed (exit {}): {}",
            args.join(" "),
            output
               .status
               .code()
               .map_or_else(|| "signal".to_string(), |c| c.to_string()),
            stderr.trim()
         )));
      }

      Ok(output.stdout)
   }
}

#[cfg(test)]
pub mod fake {
   use std::{collections::HashMap, path::Path, sync::Mutex};

   use tokio_util::sync::CancellationToken;

   use super::CommandExecutor;
   use crate::error::CatmitError;

   /// Test double returning canned output keyed by `"program arg1 arg2"`,
   /// with an optional call counter per key so tests can assert caching
   /// behavior without spawning real processes.
   #[derive(Default)]
   pub struct FakeExecutor {
      responses: HashMap<String, Result<Vec<u8>, String>>,
      calls:     Mutex<HashMap<String, u32>>,
   }

   impl FakeExecutor {
      pub fn new() -> Self {
         Self::default()
      }

      pub fn with(mut self, program: &str, args: &[&str], output: &str) -> Self {
         self
            .responses
            .insert(Self::key(program, args), Ok(output.as_bytes().to_vec()));
         self
      }

      pub fn with_failure(mut self, program: &str, args: &[&str], message: &str) -> Self {
         self
            .responses
            .insert(Self::key(program, args), Err(message.to_string()));
         self
      }

      pub fn call_count(&self, program: &str, args: &[&str]) -> u32 {
         *self.calls.lock().unwrap().get(&Self::key(program, args)).unwrap_or(&0)
      }

      fn key(program: &str, args: &[&str]) -> String {
         format!("{program} {}", args.join(" "))
      }
   }

   #[async_trait::async_trait]
   impl CommandExecutor for FakeExecutor {
      async fn run(
         &self,
         cancel: &CancellationToken,
         program: &str,
         args: &[&str],
         _cwd: &Path,
      ) -> Result<Vec<u8>, CatmitError> {
         if cancel.is_cancelled() {
            return Err(CatmitError::Canceled);
         }
         let key = Self::key(program, args);
         *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
         match self.responses.get(&key) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(message)) => Err(CatmitError::Git { message: message.clone(), suggestion: None }),
            None => Err(CatmitError::Other(format!("FakeExecutor: no response registered for `{key}`"))),
         }
      }
   }
}

#[cfg(test)]
mod tests {
   use std::path::Path;

   use tokio_util::sync::CancellationToken;

   use super::{CommandExecutor, fake::FakeExecutor};

   #[tokio::test]
   async fn fake_executor_returns_registered_output() {
      let exec = FakeExecutor::new().with("git", &["rev-parse", "--abbrev-ref", "HEAD"], "main\n");
      let out = exec
         .run(&CancellationToken::new(), "git", &["rev-parse", "--abbrev-ref", "HEAD"], Path::new("."))
         .await
         .unwrap();
      assert_eq!(out, b"main\n");
      assert_eq!(exec.call_count("git", &["rev-parse", "--abbrev-ref", "HEAD"]), 1);
   }

   #[tokio::test]
   async fn cancelled_token_short_circuits() {
      let exec = FakeExecutor::new().with("git", &["status"], "");
      let token = CancellationToken::new();
      token.cancel();
      let err = exec.run(&token, "git", &["status"], Path::new(".")).await.unwrap_err();
      assert!(matches!(err, crate::error::CatmitError::Canceled));
   }
}
