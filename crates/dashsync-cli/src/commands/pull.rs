//! `dashsync pull`: one pull pass, or a pull pass on a fixed schedule.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use dashsync::{App, Config};

use super::shutdown_signal;

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Repeat the pull every N seconds until interrupted.
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub every: Option<u64>,
}

impl PullArgs {
    pub async fn run(self, config: Config) -> Result<()> {
        let app = App::from_config(config, false).context("invalid configuration")?;

        if let Some(seconds) = self.every {
            app.pull_every(Duration::from_secs(seconds), shutdown_signal())
                .await?;
            return Ok(());
        }

        let report = app.pull().await.context("pull failed")?;
        for diff in &report.diffs {
            println!(
                "{}: {} => {}",
                diff.identifier, diff.old_version, diff.new_version
            );
        }
        if report.diffs.is_empty() {
            println!("Dashboards already up to date.");
        }
        Ok(())
    }
}
