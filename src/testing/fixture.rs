//! Golden-fixture loading for the Change Collection Engine. Adapted
//! from the teacher's `testing::fixture` module (manifest + per-fixture
//! meta/input/golden directories), narrowed to this crate's domain:
//! a fixture captures a `git status --porcelain -b` snapshot and the
//! `ChangesSummary` shape it is expected to produce, rather than an
//! LLM-facing analysis/message pair.

use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatmitError, Result};

/// Directory (relative to the crate root) holding fixture subdirectories.
pub const FIXTURES_DIR: &str = "tests/fixtures";

pub fn fixtures_dir() -> PathBuf {
   PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(FIXTURES_DIR)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureEntry {
   pub name: String,
   #[serde(default)]
   pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
   #[serde(default)]
   pub fixtures: Vec<FixtureEntry>,
}

impl Manifest {
   pub fn load(path: &std::path::Path) -> Result<Self> {
      let contents = fs::read_to_string(path).map_err(CatmitError::Io)?;
      toml::from_str(&contents).map_err(|e| CatmitError::Config(e.to_string()))
   }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureMeta {
   pub description: String,
   #[serde(default)]
   pub tags:        Vec<String>,
}

/// What `git status --porcelain -b` reported for the captured tree,
/// plus the untracked-file bytes `comprehensive_diff` would need to
/// synthesize a diff header for any `??` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureInput {
   pub porcelain_status: String,
}

/// Expected shape of [`crate::collector::ChangesSummary`] for this
/// fixture's input. Intentionally mirrors only the fields a reviewer
/// would check by hand, not the full struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenShape {
   pub total_changed_files: usize,
   pub has_untracked_files: bool,
   pub primary_change_type: String,
   pub magnitude:           String,
   pub affected_areas:      Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Fixture {
   pub name:  String,
   pub meta:  FixtureMeta,
   pub input: FixtureInput,
   pub golden: GoldenShape,
}

impl Fixture {
   /// Loads `tests/fixtures/<name>/{meta.toml, input/porcelain.txt, golden/shape.toml}`.
   pub fn load(name: &str) -> Result<Self> {
      let dir = fixtures_dir().join(name);

      let meta_raw = fs::read_to_string(dir.join("meta.toml")).map_err(CatmitError::Io)?;
      let meta: FixtureMeta = toml::from_str(&meta_raw).map_err(|e| CatmitError::Config(e.to_string()))?;

      let porcelain_status =
         fs::read_to_string(dir.join("input").join("porcelain.txt")).map_err(CatmitError::Io)?;
      let input = FixtureInput { porcelain_status };

      let golden_raw = fs::read_to_string(dir.join("golden").join("shape.toml")).map_err(CatmitError::Io)?;
      let golden: GoldenShape = toml::from_str(&golden_raw).map_err(|e| CatmitError::Config(e.to_string()))?;

      Ok(Self { name: name.to_string(), meta, input, golden })
   }
}

/// Reads `manifest.toml` and loads every listed fixture. A missing
/// manifest yields an empty list rather than an error, so a fresh
/// checkout without fixtures still builds and tests cleanly.
pub fn discover_fixtures() -> Result<Vec<Fixture>> {
   let manifest_path = fixtures_dir().join("manifest.toml");
   if !manifest_path.exists() {
      return Ok(Vec::new());
   }
   let manifest = Manifest::load(&manifest_path)?;
   manifest.fixtures.iter().map(|entry| Fixture::load(&entry.name)).collect()
}
