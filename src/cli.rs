use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str = "usage: triage [--config <path>] [--dry-run]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub dry_run: bool,
}

impl CliArgs {
    pub fn from_env() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let mut config_path = None;
        let mut dry_run = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("missing value for --config"))?;
                    config_path = Some(PathBuf::from(value));
                }
                "--dry-run" => dry_run = true,
                other => {
                    return Err(anyhow!("unknown argument: {other}. {USAGE}"));
                }
            }
        }

        Ok(Self {
            config_path: config_path.unwrap_or_else(|| PathBuf::from("./triage.jsonc")),
            dry_run,
        })
    }
}
