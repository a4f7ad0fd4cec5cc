//! Terminal styling utilities for the final outcome rendering in `main`.
//!
//! Respects `NO_COLOR` and terminal capabilities. The TUI rendering layer
//! itself (the interactive review screen) is out of scope per the
//! specification; this module only covers the handful of colored lines
//! `main` prints once a run finishes.

use std::sync::OnceLock;

use owo_colors::OwoColorize;

/// Whether color output is enabled (cached on first call).
static COLOR_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if colors should be used.
pub fn colors_enabled() -> bool {
   *COLOR_ENABLED.get_or_init(|| {
      // NO_COLOR takes precedence (https://no-color.org/)
      if std::env::var("NO_COLOR").is_ok() {
         return false;
      }
      supports_color::on(supports_color::Stream::Stdout).is_some_and(|level| level.has_basic)
   })
}

/// Success: checkmarks, completed actions (green + bold).
pub fn success(s: &str) -> String {
   if colors_enabled() { s.green().bold().to_string() } else { s.to_string() }
}

/// Warning: soft limit violations, non-fatal issues (yellow).
pub fn warning(s: &str) -> String {
   if colors_enabled() { s.yellow().to_string() } else { s.to_string() }
}

/// Error: failures, hard errors (red + bold).
pub fn error(s: &str) -> String {
   if colors_enabled() { s.red().bold().to_string() } else { s.to_string() }
}

/// Info: informational messages (cyan).
pub fn info(s: &str) -> String {
   if colors_enabled() { s.cyan().to_string() } else { s.to_string() }
}

/// Bold: headers, key values.
pub fn bold(s: &str) -> String {
   if colors_enabled() { s.bold().to_string() } else { s.to_string() }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn colors_disabled_returns_plain_text() {
      // NO_COLOR is not asserted here since `colors_enabled` caches
      // globally per process; instead we check the plain-text fallback
      // functions compose correctly regardless of the cached value.
      let s = error("boom");
      assert!(s.contains("boom"));
   }
}
