use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::{build_controller, print_update};
use crate::core::config::{AppConfig, MIN_REFRESH_INTERVAL_SECS};

/// Poll on a timer and print every display update until Ctrl-C.
pub async fn run(config: &AppConfig, interval_secs: Option<u64>, opts: &OutputOptions) -> Result<()> {
    let secs = interval_secs.unwrap_or(config.settings.refresh_interval_secs);
    if secs < MIN_REFRESH_INTERVAL_SECS {
        anyhow::bail!(
            "--interval must be at least {} seconds (got {})",
            MIN_REFRESH_INTERVAL_SECS,
            secs
        );
    }

    let controller = build_controller(&config.settings, Duration::from_secs(secs));
    let mut updates = controller.subscribe();
    controller.start();
    tracing::info!(interval_secs = secs, "watching balance");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            received = updates.recv() => match received {
                Ok(update) => {
                    if matches!(opts.format, OutputFormat::Text) {
                        let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
                        println!("{}", stamp.dimmed());
                    }
                    let last_good = controller.last_snapshot();
                    print_update(&update, last_good.as_deref(), opts)?;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "display fell behind, dropped updates");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    controller.stop();
    Ok(())
}
