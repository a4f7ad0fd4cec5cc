//! CLI argument surface and the small display types shared between
//! the orchestrator and `main`.

use std::time::Duration;

use clap::Parser;

/// `catmit` — generate a Conventional Commits message from the pending
/// changes in a git working tree, optionally committing, pushing, and
/// opening a pull request.
#[derive(Parser, Debug, Clone)]
#[command(name = "catmit", version, about, long_about = None)]
pub struct Args {
   /// Optional free-form text seeding the generated message (e.g. "fixes
   /// the login redirect").
   pub seed: Option<String>,

   /// Skip the interactive review and commit immediately.
   #[arg(short = 'y', long = "yes")]
   pub auto_accept: bool,

   /// Print the generated message without committing, pushing, or
   /// creating a pull request.
   #[arg(long = "dry-run")]
   pub dry_run: bool,

   /// Output language for the generated message.
   #[arg(short = 'l', long = "lang", default_value = "en", value_parser = ["en", "zh"])]
   pub language: String,

   /// API timeout in seconds.
   #[arg(short = 't', long = "timeout", default_value_t = 30)]
   pub timeout_secs: u64,

   /// Push the commit to its upstream after committing.
   #[arg(long = "push")]
   pub push: bool,

   /// Stage all changes (`git add -A`) before committing, if nothing is
   /// already staged.
   #[arg(long = "all")]
   pub stage_all: bool,

   /// Create a pull request after pushing.
   #[arg(long = "pr")]
   pub create_pr: bool,
}

impl Args {
   pub fn timeout(&self) -> Duration {
      Duration::from_secs(self.timeout_secs)
   }
}

/// A parsed Conventional Commits message, used when rendering the
/// review screen and when committing the final text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConventionalCommit {
   pub raw: String,
}

impl ConventionalCommit {
   pub fn new(raw: impl Into<String>) -> Self {
      Self { raw: raw.into() }
   }

   /// The `<type>(<scope>): <subject>` first line, or the whole message
   /// if it does not follow the convention.
   pub fn subject(&self) -> &str {
      self.raw.lines().next().unwrap_or(&self.raw)
   }

   pub fn body(&self) -> Option<&str> {
      let mut lines = self.raw.splitn(2, '\n');
      lines.next();
      lines.next().map(str::trim).filter(|s| !s.is_empty())
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn subject_is_first_line() {
      let commit = ConventionalCommit::new("feat(auth): add login\n\nBody text.");
      assert_eq!(commit.subject(), "feat(auth): add login");
      assert_eq!(commit.body(), Some("Body text."));
   }

   #[test]
   fn body_is_none_without_a_second_line() {
      let commit = ConventionalCommit::new("fix: typo");
      assert_eq!(commit.body(), None);
   }
}
