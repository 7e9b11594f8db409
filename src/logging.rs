use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "triage.log";

/// Keeps the non-blocking file writer alive; drop it only at process exit.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

/// Installs the global subscriber: JSON lines into `triage.log.*` under
/// `logging.dir`, plus an optional plain stderr stream for the operator.
pub fn init_tracing(logging_config: &LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = build_env_filter(&logging_config.filter)?;
    let stderr_level = parse_stderr_level(&logging_config.stderr_level)?;
    let log_dir = prepare_log_dir(&logging_config.dir)?;

    let (writer, worker_guard) =
        tracing_appender::non_blocking(build_rolling_appender(&log_dir, &logging_config.rotation));
    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter);
    let stderr_layer = logging_config.stderr_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(stderr_level)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        filter = %logging_config.filter,
        rotation = ?logging_config.rotation,
        stderr_enabled = logging_config.stderr_enabled,
        "logging_initialized"
    );

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
    })
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    if filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    EnvFilter::try_new(filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", filter))
}

fn parse_stderr_level(level: &str) -> Result<LevelFilter> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|err| anyhow!("failed to parse logging.stderr_level '{}': {}", level, err))
}

fn build_rolling_appender(log_dir: &Path, rotation: &LoggingRotation) -> RollingFileAppender {
    match rotation {
        LoggingRotation::Daily => rolling::daily(log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(log_dir, LOG_FILE_PREFIX),
    }
}

/// Resolves a relative `logging.dir` against the working directory and
/// creates it.
fn prepare_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }

    let log_dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to read current working directory for logging.dir")?
            .join(dir)
    };
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;
    Ok(log_dir)
}
