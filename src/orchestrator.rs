//! The phase state machine driving a whole run. A
//! single-threaded cooperative event loop — one `tokio::sync::mpsc`
//! channel, one task reading it — processes messages one at a time;
//! actual work (subprocesses, HTTP, the LLM call, timers) runs on
//! `tokio::spawn`'d background tasks that report back as messages, so
//! the loop itself never blocks longer than it takes to enqueue a
//! follow-up task.

use std::{
   sync::Arc,
   time::{Duration, Instant},
};

use crossterm::event::{self, Event, KeyEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
   collector::{ChangeCollector, ChangesSummary},
   config::Config,
   error::CatmitError,
   executor::CommandExecutor,
   llm::LlmClient,
   pr::{PrCreator, PrOptions},
   prompt,
   provider::{self, ProviderResolver},
   tui::{self, Action, CommitStage, LoadingStage, Phase, ReviewButton, ReviewState},
};

/// Minimum time a loading sub-stage is visible before the next one
/// starts.
const MIN_DWELL: Duration = Duration::from_millis(500);
const COMMIT_SMOOTHING: Duration = Duration::from_millis(200);
const PUSH_SMOOTHING: Duration = Duration::from_millis(500);
const SUCCESS_HOLD: Duration = Duration::from_millis(1500);
const FAILURE_HOLD: Duration = Duration::from_millis(3000);

/// Options threaded in from the CLI surface.
#[derive(Debug, Clone)]
pub struct RunOptions {
   pub seed:        Option<String>,
   pub auto_accept: bool,
   pub dry_run:     bool,
   pub language:    String,
   pub timeout:     Duration,
   pub push:        bool,
   pub stage_all:   bool,
   pub create_pr:   bool,
}

/// What the run produced, for `main` to render and translate into an
/// exit code.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
   pub canceled:    bool,
   pub message:     Option<String>,
   pub pr_url:      Option<String>,
   pub pr_existed:  bool,
   pub push_failed: bool,
   pub error:       Option<String>,
   pub exit_code:   i32,
}

impl RunOutcome {
   const fn canceled() -> Self {
      Self {
         canceled:    true,
         message:     None,
         pr_url:      None,
         pr_existed:  false,
         push_failed: false,
         error:       None,
         exit_code:   0,
      }
   }
}

type Collected = (ChangesSummary, String, String, Vec<String>);

enum Msg {
   StageCompleted { stage: LoadingStage, started_at: Instant, result: Result<StageOutput, CatmitError> },
   Key(KeyEvent),
   Requeue(Box<Msg>),
   CommitAdvance { stage: CommitStage, pr_url: Option<String>, result: Result<(), CatmitError> },
}

enum StageOutput {
   Collected(Collected),
   Preprocessed,
   PromptBuilt { system: String, user: String },
   Queried { message: String },
}

/// Drives `collect -> preprocess -> prompt -> query -> review ->
/// commit{...}` for one invocation. Owned state mirrors the top-level
/// pipeline phase: `phase`, the active loading sub-stage, review
/// sub-state, commit sub-stage, and the accumulated message/error, all
/// mutated only from within `run`'s message handlers.
pub struct Orchestrator<E: CommandExecutor> {
   collector: Arc<ChangeCollector>,
   llm:       Arc<dyn LlmClient>,
   executor:  Arc<E>,
   repo_dir:  std::path::PathBuf,
   config:    Config,
   cancel:    CancellationToken,
   opts:      RunOptions,

   phase:         Phase,
   loading_stage: LoadingStage,
   review:        ReviewState,
   commit_stage:  CommitStage,
   message:       Option<String>,
}

impl<E: CommandExecutor + 'static> Orchestrator<E> {
   #[allow(clippy::too_many_arguments, reason = "every field is independently supplied by main")]
   pub fn new(
      collector: Arc<ChangeCollector>,
      llm: Arc<dyn LlmClient>,
      executor: Arc<E>,
      repo_dir: std::path::PathBuf,
      config: Config,
      cancel: CancellationToken,
      opts: RunOptions,
   ) -> Self {
      Self {
         collector,
         llm,
         executor,
         repo_dir,
         config,
         cancel,
         opts,
         phase: Phase::Loading,
         loading_stage: LoadingStage::Collect,
         review: ReviewState::default(),
         commit_stage: CommitStage::Init,
         message: None,
      }
   }

   pub async fn run(mut self) -> RunOutcome {
      let (tx, mut rx) = mpsc::channel::<Msg>(32);

      // Ctrl+C triggers cancellation and a `canceled` result distinguishable
      // from an operational failure.
      let cancel_for_signal = self.cancel.clone();
      tokio::spawn(async move {
         if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
         }
      });

      self.spawn_collect(&tx);

      let mut collected: Option<Collected> = None;
      let mut generated_message: Option<String> = None;
      let mut pr_url: Option<String> = None;
      let mut outcome_error: Option<CatmitError> = None;

      while let Some(msg) = rx.recv().await {
         if self.cancel.is_cancelled() {
            return RunOutcome::canceled();
         }

         match msg {
            Msg::StageCompleted { stage, started_at, result } => {
               let elapsed = started_at.elapsed();
               if elapsed < MIN_DWELL {
                  let deficit = MIN_DWELL - elapsed;
                  let tx2 = tx.clone();
                  tokio::spawn(async move {
                     tokio::time::sleep(deficit).await;
                     let _ = tx2.send(Msg::Requeue(Box::new(Msg::StageCompleted { stage, started_at, result }))).await;
                  });
                  continue;
               }

               log::debug!("loading stage completed: {stage:?}");

               match result {
                  Err(err) => {
                     outcome_error = Some(err);
                     break;
                  },
                  Ok(StageOutput::Collected(c)) => {
                     collected = Some(c);
                     self.loading_stage = LoadingStage::Preprocess;
                     self.spawn_preprocess(&tx);
                  },
                  Ok(StageOutput::Preprocessed) => {
                     self.loading_stage = LoadingStage::Prompt;
                     self.spawn_prompt_build(collected.clone(), &tx);
                  },
                  Ok(StageOutput::PromptBuilt { system, user }) => {
                     self.loading_stage = LoadingStage::Query;
                     self.spawn_query(system, user, &tx);
                  },
                  Ok(StageOutput::Queried { message }) => {
                     generated_message = Some(message.clone());
                     self.message = Some(message);
                     self.phase = Phase::Review;
                     if self.opts.auto_accept {
                        self.phase = Phase::Commit;
                        self.commit_stage = CommitStage::Init;
                        self.spawn_commit_advance(&tx);
                     } else {
                        self.enter_review_key_reader(&tx);
                     }
                  },
               }
            },

            // Re-posted completion: the deficit has elapsed, so the next
            // pass through this handler is guaranteed to clear the dwell
            // check and transition immediately.
            Msg::Requeue(inner) => {
               let _ = tx.send(*inner).await;
            },

            Msg::Key(key) if self.phase == Phase::Review => {
               match tui::dispatch_key(&self.review, key) {
                  Action::MoveSelection(button) => self.review.selected = button,
                  Action::StartEdit => self.review.editing = true,
                  Action::CommitEdit | Action::AbortEdit => self.review.editing = false,
                  Action::Cancel | Action::Activate(ReviewButton::Cancel) => return RunOutcome::canceled(),
                  Action::Activate(ReviewButton::Edit) => self.review.editing = true,
                  Action::Activate(ReviewButton::Accept) => {
                     self.phase = Phase::Commit;
                     self.commit_stage = CommitStage::Init;
                     self.spawn_commit_advance(&tx);
                  },
                  Action::None => {},
               }
            },
            Msg::Key(_) => {},

            Msg::CommitAdvance { stage, pr_url: new_pr_url, result } => {
               let dwell = match stage {
                  CommitStage::Committing => COMMIT_SMOOTHING,
                  CommitStage::Pushing => PUSH_SMOOTHING,
                  s if s.is_failure() => FAILURE_HOLD,
                  CommitStage::Done | CommitStage::PrCreated => SUCCESS_HOLD,
                  _ => Duration::ZERO,
               };
               tokio::time::sleep(dwell).await;

               if new_pr_url.is_some() {
                  pr_url = new_pr_url;
               }

               if let Err(err) = result {
                  outcome_error = Some(err);
                  self.commit_stage = stage;
                  break;
               }
               log::debug!("commit sub-stage advanced: {stage:?}");
               self.commit_stage = stage;
               if stage.is_terminal() {
                  break;
               }
               self.spawn_commit_advance(&tx);
            },
         }
      }

      if self.cancel.is_cancelled() {
         return RunOutcome::canceled();
      }

      if let Some(err) = outcome_error {
         // Push failure holds the UI but does not change the process exit
         // code, because the preceding commit already succeeded.
         if matches!(self.commit_stage, CommitStage::PushFailed) {
            return RunOutcome {
               canceled: false,
               message: generated_message,
               pr_url: None,
               pr_existed: false,
               push_failed: true,
               error: Some(err.render(false)),
               exit_code: 0,
            };
         }
         // PR-already-exists is reclassified as success.
         if let CatmitError::PrAlreadyExists { url } = &err {
            return RunOutcome {
               canceled: false,
               message: generated_message,
               pr_url: Some(url.clone()),
               pr_existed: true,
               push_failed: false,
               error: None,
               exit_code: 0,
            };
         }
         return RunOutcome {
            canceled: false,
            message: generated_message,
            pr_url,
            pr_existed: false,
            push_failed: false,
            exit_code: err.exit_code(),
            error: Some(err.render(false)),
         };
      }

      RunOutcome {
         canceled: false,
         message: generated_message,
         pr_url,
         pr_existed: false,
         push_failed: false,
         error: None,
         exit_code: 0,
      }
   }

   fn spawn_collect(&self, tx: &mpsc::Sender<Msg>) {
      let started_at = Instant::now();
      let tx = tx.clone();
      let cancel = self.cancel.clone();
      let collector = Arc::clone(&self.collector);
      tokio::spawn(async move {
         let result = collect(&collector, &cancel).await;
         let _ = tx.send(Msg::StageCompleted { stage: LoadingStage::Collect, started_at, result }).await;
      });
   }

   /// No work of its own in this crate (the diff is already normalized
   /// by the collector), but still participates in the dwell schedule,
   /// matching the spec's four named loading sub-stages.
   fn spawn_preprocess(&self, tx: &mpsc::Sender<Msg>) {
      let started_at = Instant::now();
      let tx = tx.clone();
      tokio::spawn(async move {
         let _ = tx
            .send(Msg::StageCompleted { stage: LoadingStage::Preprocess, started_at, result: Ok(StageOutput::Preprocessed) })
            .await;
      });
   }

   fn spawn_prompt_build(&self, collected: Option<Collected>, tx: &mpsc::Sender<Msg>) {
      let started_at = Instant::now();
      let tx = tx.clone();
      let opts = self.opts.clone();
      tokio::spawn(async move {
         let result = (|| {
            let (summary, branch, diff, recent_commits) =
               collected.ok_or_else(|| CatmitError::Other("missing collected state".to_string()))?;
            let assembled =
               prompt::assemble(&summary, &branch, &diff, &recent_commits, opts.seed.as_deref(), &opts.language)?;
            Ok(StageOutput::PromptBuilt { system: assembled.system, user: assembled.user })
         })();
         let _ = tx.send(Msg::StageCompleted { stage: LoadingStage::Prompt, started_at, result }).await;
      });
   }

   fn spawn_query(&self, system: String, user: String, tx: &mpsc::Sender<Msg>) {
      let started_at = Instant::now();
      let tx = tx.clone();
      let llm = Arc::clone(&self.llm);
      let cancel = self.cancel.clone();
      let timeout = self.opts.timeout;
      tokio::spawn(async move {
         // The LLM call carries its own derived deadline: parent
         // cancellation intersected with the per-call budget.
         let deadline = cancel.child_token();
         let deadline_for_sleep = deadline.clone();
         let timeout_task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            deadline_for_sleep.cancel();
         });
         let result = llm.complete(&deadline, &system, &user).await.map(|message| StageOutput::Queried { message });
         timeout_task.abort();
         let _ = tx.send(Msg::StageCompleted { stage: LoadingStage::Query, started_at, result }).await;
      });
   }

   /// Raw-mode key capture for the review sub-state, active only while
   /// `Phase::Review` holds. Spawned as a blocking task since
   /// `crossterm::event::read` is a blocking call; forwards key events
   /// onto the single event-loop channel so dispatch stays serialized.
   fn enter_review_key_reader(&self, tx: &mpsc::Sender<Msg>) {
      let tx = tx.clone();
      let cancel = self.cancel.clone();
      tokio::task::spawn_blocking(move || {
         loop {
            if cancel.is_cancelled() {
               return;
            }
            match event::poll(Duration::from_millis(100)) {
               Ok(true) => {
                  if let Ok(Event::Key(key)) = event::read()
                     && tx.blocking_send(Msg::Key(key)).is_err()
                  {
                     return;
                  }
               },
               Ok(false) => {},
               Err(_) => return,
            }
         }
      });
   }

   /// Advances the commit sub-state machine one step: `init ->
   /// committing -> committed -> [pushing -> pushed|push_failed] ->
   /// [creating_pr -> pr_created|pr_failed] -> done`. Each `-ing`
   /// sub-stage is announced on its own `CommitAdvance` with no work
   /// done yet, so the message-handler's dwell (`COMMIT_SMOOTHING` /
   /// `PUSH_SMOOTHING`) is actually paid before the sub-stage's real
   /// work runs on the following advance. Staging ("stage all") runs
   /// before the commit command when the option is set and nothing is
   /// already staged.
   fn spawn_commit_advance(&self, tx: &mpsc::Sender<Msg>) {
      let tx = tx.clone();
      let cancel = self.cancel.clone();
      let executor = Arc::clone(&self.executor);
      let repo_dir = self.repo_dir.clone();
      let message = self.message.clone().unwrap_or_default();
      let opts = self.opts.clone();
      let collector = Arc::clone(&self.collector);
      let config = self.config.clone();
      let current_stage = self.commit_stage;

      tokio::spawn(async move {
         let (next_stage, pr_url, result) = match current_stage {
            CommitStage::Init => (CommitStage::Committing, None, Ok(())),
            CommitStage::Committing => {
               let result: Result<(), CatmitError> = async {
                  if opts.stage_all {
                     let summary = collector.analyze_changes(&cancel).await?;
                     if !summary.has_staged_changes {
                        executor.run(&cancel, "git", &["add", "-A"], &repo_dir).await?;
                     }
                  }
                  if opts.dry_run {
                     return Ok(());
                  }
                  executor.run(&cancel, "git", &["commit", "-m", &message], &repo_dir).await?;
                  Ok(())
               }
               .await;
               (CommitStage::Committed, None, result)
            },
            CommitStage::Committed if opts.push && !opts.dry_run => (CommitStage::Pushing, None, Ok(())),
            CommitStage::Pushing => {
               match executor.run(&cancel, "git", &["push"], &repo_dir).await {
                  Ok(_) => (CommitStage::Pushed, None, Ok(())),
                  Err(err) => (CommitStage::PushFailed, None, Err(err)),
               }
            },
            CommitStage::Committed | CommitStage::Pushed if opts.create_pr && !opts.dry_run => {
               (CommitStage::CreatingPr, None, Ok(()))
            },
            CommitStage::CreatingPr => {
               match create_pull_request(&cancel, &executor, &repo_dir, &config, &message).await {
                  Ok(url) => (CommitStage::PrCreated, Some(url), Ok(())),
                  Err(CatmitError::PrAlreadyExists { url }) => {
                     (CommitStage::PrCreated, Some(url.clone()), Err(CatmitError::PrAlreadyExists { url }))
                  },
                  Err(err) => (CommitStage::PrFailed, None, Err(err)),
               }
            },
            _ => (CommitStage::Done, None, Ok(())),
         };

         let _ = tx.send(Msg::CommitAdvance { stage: next_stage, pr_url, result }).await;
      });
   }
}

async fn collect(collector: &ChangeCollector, cancel: &CancellationToken) -> Result<StageOutput, CatmitError> {
   let (summary, branch, diff, recent_commits) = tokio::try_join!(
      collector.analyze_changes(cancel),
      collector.branch_name(cancel),
      collector.comprehensive_diff(cancel),
      collector.recent_commits(cancel, 10),
   )?;
   Ok(StageOutput::Collected((summary, branch, diff, recent_commits)))
}

/// The pull-request creation sequence, driven from the commit sub-state
/// machine: resolve the remote, resolve its provider identity, then
/// hand off to [`PrCreator`].
async fn create_pull_request<E: CommandExecutor + 'static>(
   cancel: &CancellationToken,
   executor: &Arc<E>,
   repo_dir: &std::path::Path,
   config: &Config,
   message: &str,
) -> Result<String, CatmitError> {
   let remote_url =
      String::from_utf8_lossy(&executor.run(cancel, "git", &["remote", "get-url", "origin"], repo_dir).await?)
         .trim()
         .to_string();
   let mut remote = provider::parse_git_remote_url(&remote_url)?;
   let mut config = config.clone();
   remote.provider = ProviderResolver::default().resolve(cancel, &mut config, &remote.host, remote.port).await?;

   if remote.provider == provider::Provider::Unknown {
      return Err(CatmitError::Provider("provider-not-supported".to_string()));
   }

   let creator = PrCreator::new(Arc::clone(executor), repo_dir.to_path_buf());
   let title = message.lines().next().unwrap_or(message).to_string();
   let options = PrOptions { title, body: message.to_string(), fill: false, ..Default::default() };
   creator.create(cancel, &remote, options).await
}
