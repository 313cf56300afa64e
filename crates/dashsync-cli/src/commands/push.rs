//! `dashsync push`: runs the configured webhook listener or poller.

use anyhow::{Context, Result};
use clap::Args;
use dashsync::{App, Config};

use super::shutdown_signal;

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Delete dashboards whose files were removed from the repository.
    #[arg(long)]
    pub delete_removed: bool,
}

impl PushArgs {
    pub async fn run(self, config: Config) -> Result<()> {
        let app = App::from_config(config, self.delete_removed).context("invalid configuration")?;
        app.push(shutdown_signal()).await.context("pusher stopped")?;
        Ok(())
    }
}
