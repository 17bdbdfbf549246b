use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{to_json, OutputFormat, OutputOptions};
use crate::cli::{build_controller, print_update};
use crate::core::config::AppConfig;
use crate::core::controller::RefreshController;
use crate::core::models::display::DisplayUpdate;

#[derive(Serialize)]
struct ResetPayload<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<DisplayUpdate>,
}

pub async fn run(config: &AppConfig, subscription_id: &str, opts: &OutputOptions) -> Result<()> {
    let controller = build_controller(&config.settings, config.settings.refresh_interval());
    if !reset_and_report(&controller, subscription_id, opts).await? {
        std::process::exit(1);
    }
    Ok(())
}

/// Reset one subscription, then print the confirmation and the refreshed
/// balance. Returns `false` when the reset failed; the error is already
/// printed.
pub async fn reset_and_report(
    controller: &RefreshController,
    subscription_id: &str,
    opts: &OutputOptions,
) -> Result<bool> {
    let message = match controller.reset_credits(subscription_id).await {
        Ok(message) => message,
        Err(e) => {
            eprintln!("Failed to reset credits: {}", e);
            return Ok(false);
        }
    };
    tracing::info!(subscription_id, "credits reset");

    let update = controller.last_update();
    match opts.format {
        OutputFormat::Text => {
            println!("{}", message);
            if let Some(update) = &update {
                let last_good = controller.last_snapshot();
                print_update(update, last_good.as_deref(), opts)?;
            }
        }
        OutputFormat::Json => {
            let payload = ResetPayload {
                message: &message,
                update,
            };
            println!("{}", to_json(&payload, opts)?);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_omits_missing_update() {
        let payload = ResetPayload {
            message: "done",
            update: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"message": "done"}));
    }

    #[test]
    fn payload_embeds_update() {
        let payload = ResetPayload {
            message: "done",
            update: Some(DisplayUpdate::Unconfigured),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["update"]["status"], "unconfigured");
    }
}
