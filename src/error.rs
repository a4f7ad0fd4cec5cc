use thiserror::Error;

/// The kind of a surfaced error, used for exit-code mapping and
/// programmatic dispatch. Never matched against by message text outside
/// of the boundary adapter in [`classify_git_stderr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
   Git,
   Provider,
   Pr,
   Config,
   Network,
   Auth,
   Timeout,
   Validation,
   Llm,
   CliNotInstalled,
   PermissionDenied,
   Unknown,
}

#[derive(Debug, Error)]
pub enum CatmitError {
   #[error("{message}")]
   Git { message: String, suggestion: Option<String> },

   #[error("{0}")]
   Provider(String),

   #[error("{0}")]
   Pr(String),

   #[error("pull request already exists: {url}")]
   PrAlreadyExists { url: String },

   #[error("{0}")]
   Config(String),

   #[error("{0}")]
   Network(String),

   #[error("{0}")]
   Auth(String),

   #[error("timed out after {0:?}")]
   Timeout(std::time::Duration),

   #[error("{0}")]
   Validation(String),

   #[error("{0}")]
   Llm(String),

   #[error("{0} is not installed")]
   CliNotInstalled(String),

   #[error("{message}")]
   PermissionDenied { message: String },

   #[error("operation canceled")]
   Canceled,

   #[error("no changes to process")]
   NoDiff,

   #[error("command failed after {attempts} attempts: {source}")]
   RetryExhausted { attempts: u32, #[source] source: Box<Self> },

   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   #[error("JSON error: {0}")]
   Json(#[from] serde_json::Error),

   #[error("HTTP error: {0}")]
   Http(#[from] reqwest::Error),

   #[error("{0}")]
   Other(String),
}

pub type Result<T> = std::result::Result<T, CatmitError>;

impl CatmitError {
   pub const fn kind(&self) -> ErrorKind {
      match self {
         Self::Git { .. } => ErrorKind::Git,
         Self::Provider(_) => ErrorKind::Provider,
         Self::Pr(_) | Self::PrAlreadyExists { .. } => ErrorKind::Pr,
         Self::Config(_) => ErrorKind::Config,
         Self::Network(_) | Self::Http(_) => ErrorKind::Network,
         Self::Auth(_) => ErrorKind::Auth,
         Self::Timeout(_) => ErrorKind::Timeout,
         Self::Validation(_) => ErrorKind::Validation,
         Self::Llm(_) => ErrorKind::Llm,
         Self::CliNotInstalled(_) => ErrorKind::CliNotInstalled,
         Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
         Self::Canceled | Self::NoDiff | Self::RetryExhausted { .. } | Self::Io(_)
         | Self::Json(_) | Self::Other(_) => ErrorKind::Unknown,
      }
   }

   /// Retryability is decided once, here, at construction time — never
   /// re-derived at the call site by matching on the message again.
   pub const fn retryable(&self) -> bool {
      matches!(self, Self::Network(_) | Self::Timeout(_) | Self::Http(_))
   }

   pub fn suggestion(&self) -> Option<String> {
      match self {
         Self::Git { suggestion, .. } => suggestion.clone(),
         Self::Auth(_) => Some("check that you are logged in to the provider CLI".to_string()),
         Self::Provider(_) => Some("set the provider explicitly in the config file".to_string()),
         Self::PrAlreadyExists { url } => Some(format!("existing pull request: {url}")),
         Self::NoDiff => Some("stage some changes first, or pass --all".to_string()),
         Self::CliNotInstalled(bin) => Some(format!("install {bin} and make sure it is on PATH")),
         Self::PermissionDenied { .. } => {
            Some("check your credentials and repository access rights".to_string())
         },
         _ => None,
      }
   }

   /// Maps a kind to the CLI exit code contract in the external-interfaces
   /// section. `PrAlreadyExists` is handled separately by the caller since
   /// it is reclassified as success, not a failure.
   pub const fn exit_code(&self) -> i32 {
      match self {
         Self::Canceled => 0,
         Self::Git { .. } => 8,
         Self::Network(_) | Self::Http(_) => 5,
         Self::Auth(_) => 3,
         Self::Provider(_) => 7,
         Self::PrAlreadyExists { .. } => 4,
         Self::CliNotInstalled(_) => 2,
         Self::PermissionDenied { .. } => 6,
         Self::Timeout(_) => 124,
         _ => 1,
      }
   }

   pub fn render(&self, verbose: bool) -> String {
      use std::error::Error as _;

      let mut out = self.to_string();
      if let Some(hint) = self.suggestion() {
         out.push_str(&format!("\n💡 {hint}"));
      }
      if verbose {
         let mut cause = self.source();
         while let Some(e) = cause {
            out.push_str(&format!("\ncaused by: {e}"));
            cause = e.source();
         }
      }
      out
   }
}

/// The single permitted place in the codebase where subprocess stderr
/// text is pattern-matched. Rewrites "not a git repository" style
/// failures (including git's documented exit status 129 on the
/// plumbing commands this tool uses) into a dedicated, stably-suggested
/// error kind instead of a bare command-failure message. Permission
/// failures (denied local access, or a remote rejecting credentials) are
/// likewise rewritten into a dedicated kind instead of the generic `Git`
/// bucket, since they carry their own exit code.
pub fn classify_git_stderr(stderr: &str, exit_code: Option<i32>) -> CatmitError {
   let lower = stderr.to_lowercase();
   if lower.contains("not a git repository") || lower.contains("fatal: not a git repository")
      || exit_code == Some(129)
   {
      return CatmitError::Git {
         message: "not a git repository".to_string(),
         suggestion: Some("run this inside a git working tree, or `git init` one".to_string()),
      };
   }
   if lower.contains("permission denied") || lower.contains("could not read from remote repository") {
      return CatmitError::PermissionDenied { message: stderr.trim().to_string() };
   }
   CatmitError::Git { message: stderr.trim().to_string(), suggestion: None }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn not_a_git_repo_is_reclassified() {
      let err = classify_git_stderr("fatal: not a git repository (or any of the parent directories): .git", None);
      assert!(matches!(err, CatmitError::Git { ref message, .. } if message == "not a git repository"));
      assert!(err.suggestion().is_some());
   }

   #[test]
   fn exit_status_129_is_reclassified() {
      let err = classify_git_stderr("some unrelated error", Some(129));
      assert!(matches!(err, CatmitError::Git { ref message, .. } if message == "not a git repository"));
   }

   #[test]
   fn generic_git_error_keeps_message() {
      let err = classify_git_stderr("error: pathspec 'foo' did not match any files", None);
      assert!(matches!(err, CatmitError::Git { ref message, .. } if message.contains("pathspec")));
   }

   #[test]
   fn retryable_flag_is_precomputed() {
      assert!(CatmitError::Network("connection refused".into()).retryable());
      assert!(!CatmitError::Validation("bad input".into()).retryable());
   }

   #[test]
   fn exit_codes_match_contract() {
      assert_eq!(CatmitError::Canceled.exit_code(), 0);
      assert_eq!(CatmitError::Auth("x".into()).exit_code(), 3);
      assert_eq!(CatmitError::PrAlreadyExists { url: "x".into() }.exit_code(), 4);
      assert_eq!(CatmitError::CliNotInstalled("gh".into()).exit_code(), 2);
      assert_eq!(CatmitError::PermissionDenied { message: "x".into() }.exit_code(), 6);
      assert_eq!(CatmitError::Timeout(std::time::Duration::from_secs(1)).exit_code(), 124);
   }

   #[test]
   fn permission_denied_stderr_is_reclassified() {
      let err = classify_git_stderr("remote: Permission denied (publickey).\nfatal: Could not read from remote repository.", None);
      assert!(matches!(err, CatmitError::PermissionDenied { .. }));
      assert_eq!(err.exit_code(), 6);
   }
}
