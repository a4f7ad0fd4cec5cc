//! Prompt-build stage.
//! The *assembly contract* — which fields feed the system and user
//! prompts — is in scope; the English wording is not, so the
//! bundled templates are a minimal placeholder a deployment is expected
//! to override. Grounded on the teacher's `templates.rs` user-override-
//! then-embedded `Tera` loading idiom, narrowed from its
//! analysis/summary two-variant system down to a single system/user
//! pair.

use std::path::PathBuf;

use rust_embed::RustEmbed;
use tera::{Context, Tera};

use crate::{collector::ChangesSummary, error::CatmitError};

#[derive(RustEmbed)]
#[folder = "prompts/"]
struct Prompts;

fn user_prompts_dir() -> Option<PathBuf> {
   std::env::var("HOME")
      .or_else(|_| std::env::var("USERPROFILE"))
      .ok()
      .map(|home| PathBuf::from(home).join(".config/catmit/prompts"))
}

/// Loads `name` (e.g. `"system.md.tera"`), preferring a user override
/// under `~/.config/catmit/prompts/` over the embedded default.
fn load_template(name: &str) -> Result<String, CatmitError> {
   if let Some(dir) = user_prompts_dir() {
      let path = dir.join(name);
      if path.exists() {
         return std::fs::read_to_string(&path).map_err(CatmitError::Io);
      }
   }
   Prompts::get(name)
      .and_then(|file| std::str::from_utf8(&file.data).ok().map(str::to_string))
      .ok_or_else(|| CatmitError::Other(format!("prompt template {name} is missing")))
}

/// The two strings the orchestrator's query sub-stage hands to the
/// (external, opaque) LLM client.
pub struct AssembledPrompt {
   pub system: String,
   pub user:   String,
}

/// Assembles the system/user prompt pair from a [`ChangesSummary`], the
/// comprehensive diff, recent commit subjects, and an optional free-form
/// seed supplied on the command line.
pub fn assemble(
   summary: &ChangesSummary,
   branch: &str,
   diff: &str,
   recent_commits: &[String],
   seed: Option<&str>,
   language: &str,
) -> Result<AssembledPrompt, CatmitError> {
   let mut system_ctx = Context::new();
   system_ctx.insert("language", language);
   let system_template = load_template("system.md.tera")?;
   let system = Tera::one_off(&system_template, &system_ctx, false)
      .map_err(|e| CatmitError::Other(format!("failed to render system prompt: {e}")))?;

   let mut user_ctx = Context::new();
   user_ctx.insert("branch", branch);
   user_ctx.insert("suggested_prefix", summary.suggested_prefix.as_str());
   user_ctx.insert("affected_areas", &summary.affected_areas.join(", "));
   user_ctx.insert("magnitude", match summary.magnitude {
      crate::collector::Magnitude::Small => "small",
      crate::collector::Magnitude::Medium => "medium",
      crate::collector::Magnitude::Large => "large",
   });
   if !recent_commits.is_empty() {
      user_ctx.insert("recent_commits", &recent_commits.join("\n"));
   }
   if let Some(seed) = seed.filter(|s| !s.is_empty()) {
      user_ctx.insert("seed", seed);
   }
   user_ctx.insert("diff", diff);

   let user_template = load_template("user.md.tera")?;
   let user = Tera::one_off(&user_template, &user_ctx, false)
      .map_err(|e| CatmitError::Other(format!("failed to render user prompt: {e}")))?;

   Ok(AssembledPrompt { system, user })
}

#[cfg(test)]
mod tests {
   use indexmap::IndexMap;

   use super::assemble;
   use crate::collector::{ChangesSummary, CommitType, Magnitude};

   fn sample_summary() -> ChangesSummary {
      ChangesSummary {
         has_staged_changes:   true,
         has_unstaged_changes: false,
         has_untracked_files:  false,
         total_files:          2,
         total_changed_files:  2,
         change_types:         IndexMap::new(),
         primary_change_type:  CommitType::Feat,
         affected_areas:       vec!["src".to_string()],
         untracked_files:      Vec::new(),
         files_by_priority:    Vec::new(),
         magnitude:            Magnitude::Small,
         priority:             50,
         suggested_prefix:     CommitType::Feat,
      }
   }

   #[test]
   fn assembles_system_and_user_prompts_from_summary() {
      let summary = sample_summary();
      let assembled =
         assemble(&summary, "main", "diff --git a/x b/x", &["prior commit".to_string()], Some("fixes login"), "en")
            .unwrap();
      assert!(assembled.user.contains("main"));
      assert!(assembled.user.contains("feat"));
      assert!(assembled.user.contains("fixes login"));
      assert!(assembled.user.contains("diff --git"));
      assert!(!assembled.system.is_empty());
   }

   #[test]
   fn omits_seed_section_when_absent() {
      let summary = sample_summary();
      let assembled = assemble(&summary, "main", "diff", &[], None, "en").unwrap();
      assert!(!assembled.user.contains("Additional context"));
   }
}
