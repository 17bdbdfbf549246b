pub mod config_cmd;
pub mod list_cmd;
pub mod menu;
pub mod menu_cmd;
pub mod output;
pub mod renderer;
pub mod reset_cmd;
pub mod status_cmd;
pub mod watch_cmd;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::core::auth::discover_api_key;
use crate::core::client::ApiClient;
use crate::core::config::Settings;
use crate::core::controller::{AggregateSnapshot, CredentialSupplier, RefreshController};
use crate::core::models::display::DisplayUpdate;
use crate::core::repository::SubscriptionRepository;

const MANAGE_PAGE_PATH: &str = "/my-subscription";

/// Wire the HTTP repository and key discovery into a controller.
///
/// The key is looked up again on every cycle so edits to tool configs or
/// the environment are picked up by long-running `watch` sessions.
pub fn build_controller(settings: &Settings, interval: Duration) -> RefreshController {
    let client = ApiClient::new(&settings.base_url, settings.timeout());
    let source = Arc::new(SubscriptionRepository::new(client));
    let configured = settings.api_key.clone();
    let credentials: CredentialSupplier =
        Arc::new(move || discover_api_key(configured.as_deref()));
    RefreshController::new(source, credentials, interval)
}

/// The web page where subscriptions are managed.
pub fn manage_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), MANAGE_PAGE_PATH)
}

/// Show a spinner on stderr while waiting on the network (text mode only).
pub fn start_spinner(opts: &OutputOptions, msg: &'static str) -> Option<JoinHandle<()>> {
    if !matches!(opts.format, OutputFormat::Text) {
        return None;
    }
    Some(tokio::spawn(async move {
        let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
        let mut i = 0usize;
        loop {
            eprint!("\r {} {}", frames[i % frames.len()], msg);
            i = i.wrapping_add(1);
            tokio::time::sleep(Duration::from_millis(80)).await;
        }
    }))
}

/// Stop the spinner and clear its line.
pub fn stop_spinner(spinner: Option<JoinHandle<()>>) {
    if let Some(s) = spinner {
        s.abort();
        eprint!("\r\x1b[2K");
    }
}

/// Print one display update in the selected output format.
pub fn print_update(
    update: &DisplayUpdate,
    last_good: Option<&AggregateSnapshot>,
    opts: &OutputOptions,
) -> anyhow::Result<()> {
    match opts.format {
        OutputFormat::Text => println!(
            "{}",
            renderer::render_update(update, last_good, opts.use_color)
        ),
        OutputFormat::Json => println!("{}", output::to_json(update, opts)?),
    }
    Ok(())
}
