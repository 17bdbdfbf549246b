use anyhow::Result;

use crate::cli::output::{to_json, OutputFormat, OutputOptions};
use crate::cli::renderer::{self, ListPayload};
use crate::cli::{build_controller, manage_url, start_spinner, stop_spinner};
use crate::core::config::AppConfig;
use crate::core::controller::{RefreshController, RefreshError};

pub async fn run(config: &AppConfig, show_all: bool, opts: &OutputOptions) -> Result<()> {
    let controller = build_controller(&config.settings, config.settings.refresh_interval());
    show(&controller, &config.settings.base_url, show_all, opts).await
}

/// List active subscriptions from the controller's snapshot, fetching one
/// if none is cached. Exits with status 1 when no snapshot can be had.
pub async fn show(
    controller: &RefreshController,
    base_url: &str,
    show_all: bool,
    opts: &OutputOptions,
) -> Result<()> {
    let spinner = start_spinner(opts, "Fetching subscriptions...");
    let result = controller.ensure_snapshot().await;
    stop_spinner(spinner);

    let snapshot = match result {
        Ok(snapshot) => snapshot,
        Err(RefreshError::Unconfigured) => {
            eprintln!("No API key found.");
            eprintln!(
                "Set `api_key` in {} or export key88.",
                AppConfig::config_path().display()
            );
            std::process::exit(1);
        }
        Err(RefreshError::Failed(reason)) => {
            eprintln!("Failed to load subscriptions: {}", reason);
            std::process::exit(1);
        }
    };

    let manage = manage_url(base_url);
    match opts.format {
        OutputFormat::Text => println!(
            "{}",
            renderer::render_snapshot(&snapshot, &manage, show_all, opts.use_color)
        ),
        OutputFormat::Json => println!("{}", to_json(&ListPayload::new(&snapshot, &manage), opts)?),
    }
    Ok(())
}
