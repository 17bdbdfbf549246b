use anyhow::Result;

use crate::cli::output::OutputOptions;
use crate::cli::{build_controller, print_update, start_spinner, stop_spinner};
use crate::core::config::AppConfig;

/// Run one refresh cycle and print its display update. Exits with status 1
/// unless the balance could be read.
pub async fn run(config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let controller = build_controller(&config.settings, config.settings.refresh_interval());

    let spinner = start_spinner(opts, "Fetching balance...");
    let update = controller.refresh().await;
    stop_spinner(spinner);

    print_update(&update, controller.last_snapshot().as_deref(), opts)?;
    if !update.is_ready() {
        std::process::exit(1);
    }
    Ok(())
}
