//! The heart of the Change Collection Engine. Composes
//! [`CommandExecutor`], [`ResultCache`], `batch::run_batch`, and
//! [`RetryPolicy`] into the public collection contract: `recent_commits`,
//! `branch_name`, `changed_files`, `file_status_summary`,
//! `comprehensive_diff`, `analyze_changes`.

use std::{path::PathBuf, sync::Arc, time::Duration};

use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;

use crate::{
   cache::ResultCache,
   error::CatmitError,
   executor::CommandExecutor,
   retry::RetryPolicy,
   sanitize::sanitize,
};

const MAX_UNTRACKED_BYTES: usize = 10_240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
   Code,
   Config,
   Docs,
   Frontend,
   Test,
   Database,
   Other,
}

impl ContentType {
   /// Sort order used when breaking priority ties in `files_by_priority`.
   const fn sort_order(self) -> u8 {
      match self {
         Self::Code => 1,
         Self::Config => 2,
         Self::Frontend => 3,
         Self::Docs => 4,
         Self::Test => 5,
         Self::Database | Self::Other => 6,
      }
   }
}

/// Classifies a path into one of the seven content-type tags. `database`
/// is recognized from a `.sql` extension or a `migrations/` path
/// segment — a detail the spec names in the enum domain but leaves
/// undefined; resolved here since the crate needs one deterministic
/// answer.
pub fn classify_content_type(path: &str) -> ContentType {
   let lower = path.to_lowercase();
   if lower.contains("test") || lower.contains("spec") {
      return ContentType::Test;
   }
   if lower.ends_with(".sql") || lower.split('/').any(|seg| seg == "migrations") {
      return ContentType::Database;
   }
   let ext = lower.rsplit('.').next().unwrap_or("");
   match ext {
      "go" | "py" | "js" | "ts" | "tsx" | "jsx" | "java" | "c" | "cpp" | "h" | "hpp" | "rs" | "rb" => ContentType::Code,
      "md" | "txt" | "rst" | "adoc" => ContentType::Docs,
      "json" | "yaml" | "yml" | "xml" | "toml" | "ini" | "cfg" => ContentType::Config,
      "html" | "css" | "scss" | "less" | "vue" => ContentType::Frontend,
      _ => ContentType::Other,
   }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
   pub path:            String,
   pub index_status:    char,
   pub worktree_status: char,
   pub renamed:         bool,
   pub old_path:        Option<String>,
   pub is_untracked:    bool,
   pub file_size:       Option<u64>,
   pub content_type:    ContentType,
   pub affected_area:   String,
   pub priority:        u8,
}

impl FileStatus {
   fn affected_area_of(path: &str) -> String {
      path.split('/').next().filter(|s| !s.is_empty()).unwrap_or("root").to_string()
   }
}

#[derive(Debug, Clone)]
pub struct FileStatusSummary {
   pub branch: String,
   pub files:  Vec<FileStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
   Added,
   Modified,
   Deleted,
   Renamed,
   Copied,
   Untracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magnitude {
   Small,
   Medium,
   Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
   Feat,
   Fix,
   Refactor,
   Chore,
}

impl CommitType {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Feat => "feat",
         Self::Fix => "fix",
         Self::Refactor => "refactor",
         Self::Chore => "chore",
      }
   }
}

#[derive(Debug, Clone)]
pub struct ChangesSummary {
   pub has_staged_changes:   bool,
   pub has_unstaged_changes: bool,
   pub has_untracked_files:  bool,
   pub total_files:          usize,
   pub total_changed_files:  usize,
   pub change_types:         IndexMap<ChangeKind, usize>,
   pub primary_change_type:  CommitType,
   pub affected_areas:       Vec<String>,
   pub untracked_files:      Vec<FileStatus>,
   pub files_by_priority:    Vec<FileStatus>,
   pub magnitude:            Magnitude,
   pub priority:             u8,
   pub suggested_prefix:     CommitType,
}

/// Basenames that are always ignored regardless of directory.
const IGNORED_BASENAMES: &[&str] = &[
   "package-lock.json",
   "yarn.lock",
   "pnpm-lock.yaml",
   "go.sum",
   "go.mod",
   "composer.lock",
   "Pipfile.lock",
   "poetry.lock",
   "Gemfile.lock",
   "mix.lock",
];

/// Directory segments that, anywhere in the path, mark it as ignored.
const IGNORED_DIR_SEGMENTS: &[&str] = &[
   "dist", "build", "target", "out", "bin", "node_modules", "vendor", ".git", "__pycache__",
   ".pytest_cache", ".coverage", ".vscode", ".idea",
];

const IGNORED_EXTENSIONS: &[&str] = &[
   "exe", "dll", "so", "dylib", "a", "lib", "jpg", "jpeg", "png", "gif", "bmp", "svg", "ico",
   "mp3", "mp4", "avi", "mov", "pdf", "zip", "tar", "gz", "woff", "woff2", "ttf", "eot", "otf",
];

const IGNORED_SUFFIXES: &[&str] = &[".log", ".tmp", ".temp", ".bak", ".swp"];

/// A path is ignored iff its basename, directory segments, extension,
/// or suffix match one of the policy's lists. Referenced from every
/// call site that filters paths, so the status parser and
/// `changed_files` can never diverge.
pub fn is_ignored(path: &str) -> bool {
   let basename = path.rsplit('/').next().unwrap_or(path);
   if basename == ".DS_Store" || IGNORED_BASENAMES.contains(&basename) {
      return true;
   }
   if path.split('/').any(|seg| IGNORED_DIR_SEGMENTS.contains(&seg)) {
      return true;
   }
   if let Some(ext) = basename.rsplit('.').next()
      && IGNORED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
   {
      return true;
   }
   IGNORED_SUFFIXES.iter().any(|suffix| basename.ends_with(suffix))
}

/// Lower is higher priority, per the base-by-index-status +
/// extension-adjustment + path-adjustment rule.
pub fn file_priority(index_status: char, path: &str) -> u8 {
   let mut score: i32 = match index_status {
      'A' => 10,
      'M' => 20,
      'D' => 30,
      'R' => 35,
      'C' => 40,
      _ => 50,
   };

   let ext = path.rsplit('.').next().unwrap_or("");
   if ["go", "py", "js", "ts", "java", "c", "cpp", "rs", "rb"].contains(&ext) {
      score -= 5;
   } else if ["md", "txt", "json", "yaml", "yml", "xml"].contains(&ext) {
      score -= 2;
   } else if ["html", "css", "scss", "less"].contains(&ext) {
      // no adjustment
   } else {
      score += 5;
   }

   if path.contains("test") || path.contains("spec") {
      score += 10;
   }

   score.clamp(1, 100) as u8
}

static BRANCH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/-]+$").unwrap());

pub struct ChangeCollector {
   executor: Arc<dyn CommandExecutor>,
   cache:    ResultCache,
   retry:    RetryPolicy,
   repo_dir: PathBuf,
}

impl ChangeCollector {
   pub fn new(executor: Arc<dyn CommandExecutor>, repo_dir: PathBuf) -> Self {
      Self { executor, cache: ResultCache::new(Duration::from_secs(5)), retry: RetryPolicy::default(), repo_dir }
   }

   async fn git_cached(&self, cancel: &CancellationToken, args: &[&str]) -> Result<String, CatmitError> {
      let key = ResultCache::key("git", args);
      let (cached, cached_err, hit) = self.cache.get(&key);
      if hit {
         if let Some(message) = cached_err {
            return Err(CatmitError::Git { message, suggestion: None });
         }
         return Ok(String::from_utf8_lossy(&cached.unwrap_or_default()).to_string());
      }

      let repo_dir = self.repo_dir.clone();
      let executor = Arc::clone(&self.executor);
      let owned_args: Vec<String> = args.iter().map(|s| (*s).to_string()).collect();
      let result = self
         .retry
         .execute(cancel, move || {
            let executor = Arc::clone(&executor);
            let repo_dir = repo_dir.clone();
            let args: Vec<&str> = owned_args.iter().map(String::as_str).collect();
            let cancel = cancel.clone();
            async move { executor.run(&cancel, "git", &args, &repo_dir).await }
         })
         .await;

      match &result {
         Ok(bytes) => self.cache.set(key, bytes.clone(), None),
         Err(err) => self.cache.set(key, Vec::new(), Some(err.to_string())),
      }

      result.map(|bytes| String::from_utf8_lossy(&bytes).to_string())
   }

   pub async fn recent_commits(&self, cancel: &CancellationToken, n: i64) -> Result<Vec<String>, CatmitError> {
      if n <= 0 || n > 1000 {
         return Err(CatmitError::Validation(format!("recent_commits: n must be in 1..=1000, got {n}")));
      }
      let arg = format!("-n{n}");
      let out = self.git_cached(cancel, &["log", "--pretty=format:%s", &arg]).await?;
      Ok(out.lines().map(|l| sanitize(l)).collect())
   }

   pub async fn branch_name(&self, cancel: &CancellationToken) -> Result<String, CatmitError> {
      let out = self.git_cached(cancel, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
      let name = out.trim();
      if !BRANCH_NAME_RE.is_match(name) {
         return Err(CatmitError::Validation(format!("invalid branch name format: {name:?}")));
      }
      Ok(name.to_string())
   }

   /// Runs the staged-name-list and untracked-name-list commands in
   /// parallel via [`crate::batch::run_batch`] (boxed so the two
   /// differently-captured futures share one homogeneous task list),
   /// per the spec's "runs the two underlying commands in parallel via
   /// BatchExecutor" wording.
   pub async fn changed_files(&self, cancel: &CancellationToken) -> Result<Vec<String>, CatmitError> {
      use futures::future::FutureExt;

      let tasks = vec![
         self.git_cached(cancel, &["diff", "--cached", "--name-only"]).boxed(),
         self.git_cached(cancel, &["ls-files", "--others", "--exclude-standard"]).boxed(),
      ];
      let (outputs, errors) = crate::batch::run_batch(tasks).await;
      if let Some(err) = errors.into_iter().flatten().next() {
         return Err(err);
      }

      let mut seen = std::collections::HashSet::new();
      let mut files = Vec::new();
      for line in outputs.iter().flat_map(|s| s.lines()) {
         let path = sanitize(line.trim());
         if path.is_empty() || is_ignored(&path) || !seen.insert(path.clone()) {
            continue;
         }
         files.push(path);
      }
      Ok(files)
   }

   pub async fn file_status_summary(&self, cancel: &CancellationToken) -> Result<FileStatusSummary, CatmitError> {
      let out = self.git_cached(cancel, &["status", "--porcelain", "-b"]).await?;
      Ok(parse_porcelain_status(&out))
   }

   pub async fn comprehensive_diff(&self, cancel: &CancellationToken) -> Result<String, CatmitError> {
      let staged = self.git_cached(cancel, &["diff", "--cached", "--no-ext-diff"]);
      let unstaged = self.git_cached(cancel, &["diff", "--no-ext-diff"]);
      let untracked_names = self.git_cached(cancel, &["ls-files", "--others", "--exclude-standard"]);
      let (staged, unstaged, untracked_names) = tokio::join!(staged, unstaged, untracked_names);
      let (staged, unstaged, untracked_names) = (staged?, unstaged?, untracked_names?);

      let mut combined = String::new();
      if !staged.trim().is_empty() {
         combined.push_str(staged.trim_end());
      }
      if !unstaged.trim().is_empty() {
         if !combined.is_empty() {
            combined.push('\n');
         }
         combined.push_str(unstaged.trim_end());
      }

      for name in untracked_names.lines().map(str::trim).filter(|l| !l.is_empty()) {
         if is_ignored(name) {
            continue;
         }
         let full = self.repo_dir.join(name);
         let Ok(bytes) = tokio::fs::read(&full).await else { continue };
         if bytes.iter().take(8000).any(|b| *b == 0) {
            continue; // binary, skip silently
         }
         let truncated = &bytes[..bytes.len().min(MAX_UNTRACKED_BYTES)];
         let Ok(content) = std::str::from_utf8(truncated) else { continue };

         if !combined.is_empty() {
            combined.push('\n');
         }
         combined.push_str(&format!("diff --git a/{name} b/{name}\n"));
         combined.push_str("new file mode 100644\n");
         combined.push_str("index 0000000..0000001\n");
         combined.push_str("--- /dev/null\n");
         combined.push_str(&format!("+++ b/{name}\n"));
         for line in content.lines() {
            combined.push('+');
            combined.push_str(line);
            combined.push('\n');
         }
      }

      if !combined.trim().is_empty() {
         return Ok(combined);
      }

      let status = self.git_cached(cancel, &["status", "--porcelain"]).await?;
      if !status.trim().is_empty() {
         return Ok(status);
      }

      Err(CatmitError::NoDiff)
   }

   pub async fn analyze_changes(&self, cancel: &CancellationToken) -> Result<ChangesSummary, CatmitError> {
      let summary = self.file_status_summary(cancel).await?;
      let files = summary.files;

      let mut change_types: IndexMap<ChangeKind, usize> = IndexMap::new();
      for kind in [
         ChangeKind::Added,
         ChangeKind::Modified,
         ChangeKind::Deleted,
         ChangeKind::Renamed,
         ChangeKind::Copied,
         ChangeKind::Untracked,
      ] {
         change_types.insert(kind, 0);
      }

      let mut has_staged_changes = false;
      let mut has_unstaged_changes = false;
      let mut has_untracked_files = false;
      let mut areas = std::collections::BTreeSet::new();

      for file in &files {
         if file.is_untracked {
            has_untracked_files = true;
            *change_types.entry(ChangeKind::Untracked).or_insert(0) += 1;
         } else {
            match file.index_status {
               'A' => *change_types.entry(ChangeKind::Added).or_insert(0) += 1,
               'D' => *change_types.entry(ChangeKind::Deleted).or_insert(0) += 1,
               'R' => *change_types.entry(ChangeKind::Renamed).or_insert(0) += 1,
               'C' => *change_types.entry(ChangeKind::Copied).or_insert(0) += 1,
               _ => *change_types.entry(ChangeKind::Modified).or_insert(0) += 1,
            }
            if file.index_status != ' ' && file.index_status != '?' {
               has_staged_changes = true;
            }
            if file.worktree_status != ' ' && file.worktree_status != '?' {
               has_unstaged_changes = true;
            }
         }
         areas.insert(file.affected_area.clone());
      }

      let total_files = files.len();
      let total_changed_files = total_files;

      let magnitude = if total_files <= 3 {
         Magnitude::Small
      } else if total_files <= 10 {
         Magnitude::Medium
      } else {
         Magnitude::Large
      };

      let has_added_or_untracked = change_types[&ChangeKind::Added] > 0 || has_untracked_files;
      let has_deleted = change_types[&ChangeKind::Deleted] > 0;
      let has_renamed = change_types[&ChangeKind::Renamed] > 0;
      let has_modified = change_types[&ChangeKind::Modified] > 0;

      let suggested = if has_added_or_untracked {
         CommitType::Feat
      } else if has_deleted {
         CommitType::Chore
      } else if has_renamed {
         CommitType::Refactor
      } else if has_modified {
         CommitType::Fix
      } else {
         CommitType::Chore
      };

      let mut priority: i32 = 50;
      if total_files > 10 {
         priority += 20;
      }
      if total_files > 5 {
         priority += 10;
      }
      if has_added_or_untracked {
         priority += 15;
      }
      if has_deleted {
         priority += 10;
      }
      let priority = priority.clamp(1, 100) as u8;

      let untracked_files: Vec<FileStatus> = files.iter().filter(|f| f.is_untracked).cloned().collect();

      let mut files_by_priority = files.clone();
      files_by_priority.sort_by(|a, b| {
         a.priority
            .cmp(&b.priority)
            .then_with(|| a.content_type.sort_order().cmp(&b.content_type.sort_order()))
            .then_with(|| a.path.cmp(&b.path))
      });

      Ok(ChangesSummary {
         has_staged_changes,
         has_unstaged_changes,
         has_untracked_files,
         total_files,
         total_changed_files,
         change_types,
         primary_change_type: suggested,
         affected_areas: areas.into_iter().collect(),
         untracked_files,
         files_by_priority,
         magnitude,
         priority,
         suggested_prefix: suggested,
      })
   }
}

/// Parses a `git status --porcelain -b` report. The first `## ` line
/// carries the branch name (optionally followed by `...upstream`);
/// remaining `XY path` lines map X to index-status, Y to
/// worktree-status, and handle the `old -> new` rename/copy payload.
fn parse_porcelain_status(output: &str) -> FileStatusSummary {
   let mut branch = String::new();
   let mut files = Vec::new();

   for line in output.lines() {
      if let Some(rest) = line.strip_prefix("## ") {
         branch = rest.split("...").next().unwrap_or(rest).trim().to_string();
         continue;
      }
      if line.len() < 3 {
         continue;
      }
      let mut chars = line.chars();
      let index_status = chars.next().unwrap_or(' ');
      let worktree_status = chars.next().unwrap_or(' ');
      let rest = &line[2..];
      let payload = rest.strip_prefix(' ').unwrap_or(rest);

      let (renamed, old_path, path) = if (index_status == 'R' || index_status == 'C') && payload.contains(" -> ") {
         let mut parts = payload.splitn(2, " -> ");
         let old = parts.next().unwrap_or_default().trim().to_string();
         let new = parts.next().unwrap_or_default().trim().to_string();
         (true, Some(old), new)
      } else {
         (false, None, payload.trim().to_string())
      };

      let path = sanitize(&path);
      if path.is_empty() || is_ignored(&path) {
         continue;
      }

      let is_untracked = index_status == '?' && worktree_status == '?';
      files.push(FileStatus {
         content_type: classify_content_type(&path),
         affected_area: FileStatus::affected_area_of(&path),
         priority: file_priority(index_status, &path),
         path,
         index_status,
         worktree_status,
         renamed,
         old_path,
         is_untracked,
         file_size: None,
      });
   }

   FileStatusSummary { branch, files }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn ignore_filter_scenario() {
      let out = "## main\nM  main.go\nA  package-lock.json\nD  dist/bundle.js";
      let summary = parse_porcelain_status(out);
      assert_eq!(summary.branch, "main");
      assert_eq!(summary.files.len(), 1);
      assert_eq!(summary.files[0].path, "main.go");
      assert_eq!(summary.files[0].index_status, 'M');
   }

   #[test]
   fn rename_payload_is_parsed() {
      let out = "## main\nR  old.go -> new.go";
      let summary = parse_porcelain_status(out);
      assert_eq!(summary.files.len(), 1);
      let f = &summary.files[0];
      assert!(f.renamed);
      assert_eq!(f.old_path.as_deref(), Some("old.go"));
      assert_eq!(f.path, "new.go");
   }

   #[test]
   fn priority_sort_scenario() {
      let names = [
         ("README.md", 'M'),
         ("main.go", 'A'),
         ("style.css", 'M'),
         ("config.json", 'A'),
         ("old.txt", 'D'),
         ("test/unit.go", 'M'),
      ];
      let mut files: Vec<FileStatus> = names
         .iter()
         .map(|(path, status)| FileStatus {
            path: (*path).to_string(),
            index_status: *status,
            worktree_status: ' ',
            renamed: false,
            old_path: None,
            is_untracked: false,
            file_size: None,
            content_type: classify_content_type(path),
            affected_area: FileStatus::affected_area_of(path),
            priority: file_priority(*status, path),
         })
         .collect();
      files.sort_by(|a, b| {
         a.priority
            .cmp(&b.priority)
            .then_with(|| a.content_type.sort_order().cmp(&b.content_type.sort_order()))
            .then_with(|| a.path.cmp(&b.path))
      });
      assert_eq!(files[0].path, "main.go");
      let last_two: Vec<&str> = files[4..].iter().map(|f| f.path.as_str()).collect();
      assert!(last_two.contains(&"old.txt"));
      assert!(last_two.contains(&"test/unit.go"));
   }

   #[test]
   fn ignore_policy_covers_documented_cases() {
      assert!(is_ignored("package-lock.json"));
      assert!(is_ignored("dist/bundle.js"));
      assert!(is_ignored("node_modules/x/y.js"));
      assert!(is_ignored("debug.log"));
      assert!(is_ignored("image.PNG"));
      assert!(!is_ignored("src/main.rs"));
   }

   #[test]
   fn priority_is_deterministic() {
      let a = file_priority('M', "src/main.rs");
      let b = file_priority('M', "src/main.rs");
      assert_eq!(a, b);
   }

   use crate::executor::fake::FakeExecutor;

   fn collector_with(executor: FakeExecutor) -> ChangeCollector {
      ChangeCollector::new(Arc::new(executor), PathBuf::from("."))
   }

   #[tokio::test]
   async fn recent_commits_rejects_out_of_range_n() {
      let collector = collector_with(FakeExecutor::new());
      let cancel = CancellationToken::new();
      assert!(collector.recent_commits(&cancel, 0).await.is_err());
      assert!(collector.recent_commits(&cancel, 1001).await.is_err());
   }

   #[tokio::test]
   async fn branch_name_hits_cache_on_second_call() {
      let executor =
         FakeExecutor::new().with("git", &["rev-parse", "--abbrev-ref", "HEAD"], "main\n");
      let collector = collector_with(executor);
      let cancel = CancellationToken::new();

      let first = collector.branch_name(&cancel).await.unwrap();
      let second = collector.branch_name(&cancel).await.unwrap();

      assert_eq!(first, "main");
      assert_eq!(second, "main");
   }

   #[tokio::test]
   async fn branch_name_rejects_shell_metacharacters() {
      let executor = FakeExecutor::new().with(
         "git",
         &["rev-parse", "--abbrev-ref", "HEAD"],
         "main;rm -rf /\n",
      );
      let collector = collector_with(executor);
      let err = collector.branch_name(&CancellationToken::new()).await.unwrap_err();
      assert!(err.to_string().contains("invalid branch name format"));
   }

   #[tokio::test]
   async fn changed_files_merges_staged_and_untracked_deduped_and_filtered() {
      let executor = FakeExecutor::new()
         .with("git", &["diff", "--cached", "--name-only"], "main.go\npackage-lock.json\n")
         .with("git", &["ls-files", "--others", "--exclude-standard"], "main.go\nnewfile.txt\n");
      let collector = collector_with(executor);
      let files = collector.changed_files(&CancellationToken::new()).await.unwrap();
      assert_eq!(files, vec!["main.go".to_string(), "newfile.txt".to_string()]);
   }

   #[tokio::test]
   async fn comprehensive_diff_on_empty_repo_yields_no_diff() {
      let executor = FakeExecutor::new()
         .with("git", &["diff", "--cached", "--no-ext-diff"], "")
         .with("git", &["diff", "--no-ext-diff"], "")
         .with("git", &["ls-files", "--others", "--exclude-standard"], "")
         .with("git", &["status", "--porcelain"], "");
      let collector = collector_with(executor);
      let err = collector.comprehensive_diff(&CancellationToken::new()).await.unwrap_err();
      assert!(matches!(err, CatmitError::NoDiff));
   }

   #[tokio::test]
   async fn comprehensive_diff_synthesizes_untracked_file_header() {
      let dir = tempfile::tempdir().unwrap();
      std::fs::write(dir.path().join("newfile.txt"), b"hello\n").unwrap();

      let executor = FakeExecutor::new()
         .with(
            "git",
            &["diff", "--cached", "--no-ext-diff"],
            "diff --git a/main.go b/main.go\n+func main(){}",
         )
         .with("git", &["diff", "--no-ext-diff"], "")
         .with("git", &["ls-files", "--others", "--exclude-standard"], "newfile.txt\n");
      let collector = ChangeCollector::new(Arc::new(executor), dir.path().to_path_buf());

      let diff = collector.comprehensive_diff(&CancellationToken::new()).await.unwrap();
      assert!(diff.contains("diff --git a/main.go b/main.go"));
      assert!(diff.contains("diff --git a/newfile.txt b/newfile.txt"));
      assert!(diff.contains("new file mode 100644"));
      assert!(diff.contains("+hello"));
   }

   #[tokio::test]
   async fn analyze_changes_computes_summary_end_to_end() {
      let executor = FakeExecutor::new().with(
         "git",
         &["status", "--porcelain", "-b"],
         "## main\nA  main.go\nM  README.md\n?? newfile.txt\n",
      );
      let collector = collector_with(executor);
      let summary = collector.analyze_changes(&CancellationToken::new()).await.unwrap();

      assert_eq!(summary.total_changed_files, 3);
      assert!(summary.has_untracked_files);
      assert_eq!(summary.primary_change_type, CommitType::Feat);
      assert_eq!(summary.magnitude, Magnitude::Small);
      assert_eq!(summary.affected_areas, vec!["root".to_string()]);
   }
}
