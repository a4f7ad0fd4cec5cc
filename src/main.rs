use std::{process::ExitCode, sync::Arc};

use catmit::{
   collector::ChangeCollector,
   config::Config,
   error::CatmitError,
   executor::{CommandExecutor, TokioCommandExecutor},
   llm::HttpLlmClient,
   orchestrator::{Orchestrator, RunOptions},
   style,
   types::Args,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;

fn main() -> ExitCode {
   dotenvy::dotenv().ok();
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

   let args = Args::parse();

   let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
      Ok(rt) => rt,
      Err(err) => {
         eprintln!("{}", style::error(&format!("failed to start async runtime: {err}")));
         return ExitCode::from(1);
      },
   };

   runtime.block_on(run(args))
}

async fn run(args: Args) -> ExitCode {
   let config = match Config::load() {
      Ok(config) => config,
      Err(err) => return exit_with_error(&err),
   };

   if config.llm_api_key.is_none() {
      return exit_with_error(&CatmitError::Auth(
         "CATMIT_LLM_API_KEY is not set".to_string(),
      ));
   }

   let repo_dir = match std::env::current_dir() {
      Ok(dir) => dir,
      Err(err) => return exit_with_error(&CatmitError::Io(err)),
   };

   let executor = Arc::new(TokioCommandExecutor);
   let collector =
      Arc::new(ChangeCollector::new(Arc::clone(&executor) as Arc<dyn CommandExecutor>, repo_dir.clone()));

   let llm = Arc::new(HttpLlmClient::new(
      config.llm_api_url.clone(),
      config.llm_api_key.clone().unwrap_or_default(),
      config.llm_model.clone(),
      config.llm_max_tokens,
      config.llm_temperature,
      args.timeout(),
   ));

   let opts = RunOptions {
      seed:        args.seed.clone(),
      auto_accept: args.auto_accept,
      dry_run:     args.dry_run,
      language:    args.language.clone(),
      timeout:     args.timeout(),
      push:        args.push,
      stage_all:   args.stage_all,
      create_pr:   args.create_pr,
   };

   let cancel = CancellationToken::new();
   let orchestrator = Orchestrator::new(collector, llm, executor, repo_dir, config, cancel, opts);
   let outcome = orchestrator.run().await;

   if outcome.canceled {
      println!("{}", style::info("canceled"));
      return ExitCode::from(0);
   }

   if let Some(message) = &outcome.message {
      println!("{}", style::bold(message));
   }

   if outcome.pr_existed {
      if let Some(url) = &outcome.pr_url {
         println!("{}", style::warning(&format!("pull request already exists: {url}")));
      }
   } else if let Some(url) = &outcome.pr_url {
      println!("{}", style::success(&format!("pull request created: {url}")));
   }

   if outcome.push_failed {
      eprintln!("{}", style::warning("push failed; the commit was created locally"));
      if let Some(err) = &outcome.error {
         eprintln!("{err}");
      }
      return ExitCode::from(0);
   }

   if let Some(err) = &outcome.error {
      eprintln!("{}", style::error(err));
      return exit_code(outcome.exit_code);
   }

   ExitCode::from(0)
}

fn exit_with_error(err: &CatmitError) -> ExitCode {
   eprintln!("{}", style::error(&err.render(false)));
   exit_code(err.exit_code())
}

fn exit_code(code: i32) -> ExitCode {
   u8::try_from(code).map_or(ExitCode::from(1), ExitCode::from)
}
