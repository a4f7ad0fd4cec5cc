//! Centralized sanitization. Any subprocess output destined for a
//! user-visible file list or error message passes through here exactly
//! once, at the boundary where the external string enters the trusted
//! domain — never re-sanitized downstream.

/// Strips control characters (`\x00-\x1F`, `\x7F-\x9F`) and shell
/// metacharacters (`; & | $`) from `input`.
pub fn sanitize(input: &str) -> String {
   input
      .chars()
      .filter(|c| {
         let code = *c as u32;
         !(code <= 0x1F || (0x7F..=0x9F).contains(&code) || matches!(c, ';' | '&' | '|' | '$'))
      })
      .collect()
}

#[cfg(test)]
mod tests {
   use super::sanitize;

   #[test]
   fn strips_control_and_shell_metacharacters() {
      assert_eq!(sanitize("main;rm -rf /\n"), "mainrm -rf /");
      assert_eq!(sanitize("a$(b)|c&d"), "a(b)cd");
   }

   #[test]
   fn leaves_ordinary_paths_untouched() {
      assert_eq!(sanitize("src/main.rs"), "src/main.rs");
   }
}
