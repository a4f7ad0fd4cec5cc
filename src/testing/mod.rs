//! Golden-fixture test harness for the Change Collection Engine.
//! Adapted from the teacher's `src/testing/` module, scoped down to
//! this crate's domain: fixtures pair a `git status --porcelain -b`
//! snapshot with the `ChangesSummary` shape it must produce, rather
//! than an LLM analysis/message pair. Driven entirely through
//! [`crate::executor::fake::FakeExecutor`], so no real git process or
//! network call is ever involved.

pub mod fixture;

pub use fixture::{discover_fixtures, fixtures_dir, Fixture, FixtureEntry, FixtureMeta, GoldenShape, Manifest};

#[cfg(test)]
mod tests {
   use std::{path::PathBuf, sync::Arc};

   use tokio_util::sync::CancellationToken;

   use super::*;
   use crate::{
      collector::{ChangeCollector, CommitType, Magnitude},
      executor::fake::FakeExecutor,
   };

   fn collector_for(fixture: &Fixture) -> ChangeCollector {
      let executor = FakeExecutor::new().with(
         "git",
         &["status", "--porcelain", "-b"],
         &fixture.input.porcelain_status,
      );
      ChangeCollector::new(Arc::new(executor), PathBuf::from("."))
   }

   fn commit_type_from(name: &str) -> CommitType {
      match name {
         "feat" => CommitType::Feat,
         "fix" => CommitType::Fix,
         "refactor" => CommitType::Refactor,
         _ => CommitType::Chore,
      }
   }

   fn magnitude_from(name: &str) -> Magnitude {
      match name {
         "small" => Magnitude::Small,
         "medium" => Magnitude::Medium,
         _ => Magnitude::Large,
      }
   }

   #[tokio::test]
   async fn every_discovered_fixture_matches_its_golden_shape() {
      let fixtures = discover_fixtures().expect("fixtures must parse");
      assert!(!fixtures.is_empty(), "expected at least one checked-in fixture");

      for fixture in fixtures {
         let collector = collector_for(&fixture);
         let summary = collector
            .analyze_changes(&CancellationToken::new())
            .await
            .unwrap_or_else(|e| panic!("fixture {}: analyze_changes failed: {e}", fixture.name));

         assert_eq!(
            summary.total_changed_files, fixture.golden.total_changed_files,
            "fixture {}: total_changed_files",
            fixture.name
         );
         assert_eq!(
            summary.has_untracked_files, fixture.golden.has_untracked_files,
            "fixture {}: has_untracked_files",
            fixture.name
         );
         assert_eq!(
            summary.primary_change_type,
            commit_type_from(&fixture.golden.primary_change_type),
            "fixture {}: primary_change_type",
            fixture.name
         );
         assert_eq!(
            summary.magnitude,
            magnitude_from(&fixture.golden.magnitude),
            "fixture {}: magnitude",
            fixture.name
         );
         assert_eq!(summary.affected_areas, fixture.golden.affected_areas, "fixture {}: affected_areas", fixture.name);
      }
   }
}
