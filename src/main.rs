use anyhow::{Context, Result};

use triage::{
    cli::CliArgs,
    config::Config,
    logging::init_tracing,
    pipeline::{RunOptions, TriageRun},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let logging_guard = init_tracing(&config.logging).context("failed to initialize logging")?;

    let run = TriageRun::from_config(&config)?;
    let options = RunOptions {
        dry_run: args.dry_run,
    };

    match run.execute(options).await {
        Ok(outcome) => {
            tracing::info!(
                target: "triage",
                run_id = logging_guard.run_id(),
                records_fetched = outcome.records_fetched,
                submitted = outcome.submission.is_some(),
                accepted = outcome.submission.as_ref().is_some_and(|s| s.success),
                "run_completed"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                target: "triage",
                run_id = logging_guard.run_id(),
                error = %format!("{err:#}"),
                "run_failed"
            );
            Err(err)
        }
    }
}
