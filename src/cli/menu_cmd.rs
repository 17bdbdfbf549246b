use anyhow::{Context, Result};

use crate::cli::menu::{self, Choice, MenuAction};
use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::{build_controller, list_cmd, manage_url, print_update, reset_cmd};
use crate::cli::{start_spinner, stop_spinner};
use crate::core::config::AppConfig;

/// Interactive picker over the refresh/manage actions and the active
/// subscriptions. Without a terminal this is `list`.
pub async fn run(config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let controller = build_controller(&config.settings, config.settings.refresh_interval());
    let base_url = &config.settings.base_url;

    if !menu::is_interactive() || matches!(opts.format, OutputFormat::Json) {
        return list_cmd::show(&controller, base_url, false, opts).await;
    }

    let manage = manage_url(base_url);
    let spinner = start_spinner(opts, "Fetching subscriptions...");
    let mut snapshot = controller.ensure_snapshot().await.ok();
    stop_spinner(spinner);

    loop {
        if let Some(update) = controller.last_update() {
            let last_good = controller.last_snapshot();
            print_update(&update, last_good.as_deref(), opts)?;
            println!();
        }

        let entries = menu::build_entries(snapshot.as_deref(), &manage);
        let picker_entries = entries.clone();
        let picked =
            tokio::task::spawn_blocking(move || menu::choose("88code credits", &picker_entries))
                .await
                .context("menu picker panicked")?;

        let index = match picked.context("menu picker failed")? {
            Choice::Picked(index) => index,
            Choice::NotInteractive => {
                return list_cmd::show(&controller, base_url, false, opts).await
            }
            Choice::Cancelled => {
                eprintln!("Cancelled.");
                return Ok(());
            }
        };

        match &entries[index].action {
            MenuAction::Refresh => {
                let spinner = start_spinner(opts, "Refreshing...");
                controller.refresh().await;
                stop_spinner(spinner);
                // Still the last good snapshot when degraded.
                snapshot = controller.last_snapshot();
            }
            MenuAction::OpenManagePage => {
                println!("Manage your subscriptions at {}", manage);
                return Ok(());
            }
            MenuAction::Reset { id, name } => {
                let question = format!("Reset credits for {} (#{})?", name, id);
                let confirmed = tokio::task::spawn_blocking(move || menu::confirm(&question))
                    .await
                    .context("confirmation prompt panicked")?
                    .context("failed to read confirmation")?;
                if !confirmed {
                    println!("Reset cancelled.");
                    return Ok(());
                }
                if !reset_cmd::reset_and_report(&controller, &id.to_string(), opts).await? {
                    std::process::exit(1);
                }
                return Ok(());
            }
        }
    }
}
