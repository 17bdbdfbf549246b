use colored::{control, ColoredString, Colorize};
use serde::Serialize;

use crate::core::controller::AggregateSnapshot;
use crate::core::credits::{effective_total, remaining_resets};
use crate::core::formatter::{
    format_balance_bar, format_currency, format_date, format_expiry_countdown, format_remaining,
};
use crate::core::models::display::DisplayUpdate;
use crate::core::models::subscription::Subscription;

const BAR_WIDTH: usize = 12;

/// Render one display update as a colored (or plain) string.
///
/// `last_good` is the most recent successful snapshot; a degraded update
/// keeps showing its total, marked stale, above the failure reason.
///
/// Layout:
/// ```text
///  88code  $52.34 remaining
///   PRO | current $12.34 | total $52.34 | limit $20.00 | resets 2 | cycle Monthly
/// ```
pub fn render_update(
    update: &DisplayUpdate,
    last_good: Option<&AggregateSnapshot>,
    use_color: bool,
) -> String {
    control::set_override(use_color);

    match update {
        DisplayUpdate::Ready {
            sum_text,
            detail_lines,
            changed,
        } => {
            let mut lines: Vec<String> = Vec::new();
            let sum = format!("{} remaining", sum_text);
            let sum: ColoredString = if *changed {
                sum.yellow().bold()
            } else {
                sum.bold()
            };
            let marker = if *changed { " (changed)" } else { "" };
            lines.push(format!(" {}  {}{}", "88code".bold(), sum, marker.yellow()));

            if detail_lines.is_empty() {
                lines.push(format!("  {}", "No active subscriptions".dimmed()));
            }
            for line in detail_lines {
                lines.push(format!("  {}", line));
            }
            lines.join("\n")
        }
        DisplayUpdate::Degraded { reason_text } => {
            let failure = format!("Refresh failed: {}", reason_text).red();
            match last_good {
                Some(snapshot) => format!(
                    " {}  {} {}\n  {}",
                    "88code".bold(),
                    format_remaining(snapshot.total).bold(),
                    "(stale)".dimmed(),
                    failure
                ),
                None => format!("{}\n  {}", " 88code (error)".bold(), failure),
            }
        }
        DisplayUpdate::Unconfigured => format!(
            "{}\n  {}",
            " 88code".bold(),
            "No API key found. Set key88 or api_key in the config file.".dimmed()
        ),
    }
}

/// Render the subscription listing.
///
/// Layout:
/// ```text
///  PRO (#7)
///   Balance   $12.34 [████████░░░░]
///   Total     $52.34
///   Limit     $20.00
///   Resets    2
///   Cycle     Monthly
///   Ends      2025-11-30
///             Expires in 12d 4h
/// ```
pub fn render_snapshot(
    snapshot: &AggregateSnapshot,
    manage_url: &str,
    show_all: bool,
    use_color: bool,
) -> String {
    control::set_override(use_color);

    let mut sections: Vec<String> = snapshot
        .subscriptions
        .iter()
        .map(render_subscription)
        .collect();

    if sections.is_empty() {
        sections.push(format!(" {}", "No active subscriptions".dimmed()));
    }

    let mut footer: Vec<String> = Vec::new();
    footer.push(format!(
        " {}  {}",
        "Total".bold(),
        format_remaining(snapshot.total).bold()
    ));
    if show_all {
        footer.push(format!(
            " {}  {}",
            "Spendable now".cyan(),
            format_currency(snapshot.active_sum)
        ));
    }
    footer.push(format!(" {}  {}", "Manage".cyan(), manage_url.underline()));
    sections.push(footer.join("\n"));

    sections.join("\n\n")
}

fn render_subscription(sub: &Subscription) -> String {
    let mut lines: Vec<String> = Vec::new();
    let limit = sub.subscription_plan.credit_limit;

    lines.push(format!(" {} (#{})", sub.plan_name(), sub.id).bold().to_string());
    lines.push(format!(
        "  {}   {} {}",
        "Balance".cyan(),
        color_by_balance(sub.current_credits, limit, &format_currency(sub.current_credits)),
        format_balance_bar(sub.current_credits, limit, BAR_WIDTH).magenta()
    ));
    lines.push(format!(
        "  {}     {}",
        "Total".cyan(),
        format_currency(effective_total(sub))
    ));
    lines.push(format!("  {}     {}", "Limit".cyan(), format_currency(limit)));
    lines.push(format!("  {}    {}", "Resets".cyan(), remaining_resets(sub)));
    lines.push(format!("  {}     {}", "Cycle".cyan(), sub.cycle_label()));
    if let Some(end) = &sub.end_date {
        lines.push(format!("  {}      {}", "Ends".cyan(), format_date(end)));
        lines.push(format!("            {}", format_expiry_countdown(end).dimmed()));
    }

    lines.join("\n")
}

/// Color the balance green/yellow/red by how much of the cycle limit is left.
fn color_by_balance(current: f64, limit: f64, text: &str) -> ColoredString {
    if !(limit.is_finite() && limit > 0.0) {
        return text.normal();
    }
    let left = current / limit;
    if left >= 0.25 {
        text.green()
    } else if left >= 0.10 {
        text.yellow()
    } else {
        text.red()
    }
}

/// JSON shape of one listed subscription: the API fields plus the derived
/// figures.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPayload<'a> {
    #[serde(flatten)]
    pub subscription: &'a Subscription,
    pub effective_total: f64,
    pub remaining_resets: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPayload<'a> {
    pub subscriptions: Vec<SubscriptionPayload<'a>>,
    pub total: f64,
    pub active_sum: f64,
    pub manage_url: &'a str,
    pub fetched_at: String,
}

impl<'a> ListPayload<'a> {
    pub fn new(snapshot: &'a AggregateSnapshot, manage_url: &'a str) -> Self {
        Self {
            subscriptions: snapshot
                .subscriptions
                .iter()
                .map(|sub| SubscriptionPayload {
                    subscription: sub,
                    effective_total: effective_total(sub),
                    remaining_resets: remaining_resets(sub),
                })
                .collect(),
            total: snapshot.total,
            active_sum: snapshot.active_sum,
            manage_url,
            fetched_at: snapshot.fetched_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::subscription::{PlanType, SubscriptionPlan};
    use chrono::{Duration, Utc};

    fn make_subscription() -> Subscription {
        Subscription {
            id: 7,
            current_credits: 12.34,
            reset_times: 2,
            is_active: true,
            end_date: Some(Utc::now() + Duration::days(12)),
            subscription_plan_name: Some("PRO".into()),
            billing_cycle_desc: Some("Monthly".into()),
            subscription_plan: SubscriptionPlan {
                credit_limit: 20.0,
                plan_type: PlanType::Other("STANDARD".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn make_snapshot() -> AggregateSnapshot {
        AggregateSnapshot {
            subscriptions: vec![make_subscription()],
            total: 52.34,
            active_sum: 12.34,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn ready_update_shows_sum_and_details() {
        let update = DisplayUpdate::Ready {
            sum_text: "$52.34".into(),
            detail_lines: vec!["PRO | current $12.34".into()],
            changed: false,
        };
        let output = render_update(&update, None, false);
        assert!(output.contains("88code"));
        assert!(output.contains("$52.34 remaining"));
        assert!(output.contains("  PRO | current $12.34"));
        assert!(!output.contains("(changed)"));
    }

    #[test]
    fn changed_update_is_marked() {
        let update = DisplayUpdate::Ready {
            sum_text: "$10.00".into(),
            detail_lines: vec![],
            changed: true,
        };
        let output = render_update(&update, None, false);
        assert!(output.contains("(changed)"));
        assert!(output.contains("No active subscriptions"));
    }

    #[test]
    fn degraded_update_shows_reason() {
        let update = DisplayUpdate::Degraded {
            reason_text: "HTTP 500".into(),
        };
        let output = render_update(&update, None, false);
        assert!(output.contains("Refresh failed: HTTP 500"));
    }

    #[test]
    fn degraded_update_keeps_last_good_total() {
        let update = DisplayUpdate::Degraded {
            reason_text: "Request timed out after 8000 ms".into(),
        };
        let snapshot = make_snapshot();
        let output = render_update(&update, Some(&snapshot), false);
        assert!(output.contains("$52.34 remaining (stale)"));
        assert!(output.contains("Refresh failed: Request timed out after 8000 ms"));
        assert!(!output.contains("(error)"));
    }

    #[test]
    fn unconfigured_update_hints_at_key() {
        let output = render_update(&DisplayUpdate::Unconfigured, None, false);
        assert!(output.contains("key88"));
    }

    #[test]
    fn snapshot_lists_every_figure() {
        let output = render_snapshot(
            &make_snapshot(),
            "https://www.88code.org/my-subscription",
            false,
            false,
        );
        assert!(output.contains("PRO (#7)"));
        assert!(output.contains("$12.34"));
        assert!(output.contains("$52.34"));
        assert!(output.contains("$20.00"));
        assert!(output.contains("Monthly"));
        assert!(output.contains("Expires in"));
        assert!(output.contains("$52.34 remaining"));
        assert!(output.contains("https://www.88code.org/my-subscription"));
        assert!(!output.contains("Spendable now"));
    }

    #[test]
    fn snapshot_all_shows_spendable_sum() {
        let output = render_snapshot(&make_snapshot(), "https://x/my-subscription", true, false);
        assert!(output.contains("Spendable now  $12.34"));
    }

    #[test]
    fn empty_snapshot_still_has_footer() {
        let snapshot = AggregateSnapshot {
            subscriptions: vec![],
            total: 0.0,
            active_sum: 0.0,
            fetched_at: Utc::now(),
        };
        let output = render_snapshot(&snapshot, "https://x/my-subscription", false, false);
        assert!(output.contains("No active subscriptions"));
        assert!(output.contains("$0.00 remaining"));
    }

    #[test]
    fn render_no_ansi_when_color_false() {
        let output = render_snapshot(&make_snapshot(), "https://x", true, false);
        assert!(!output.contains('\x1b'), "output should not contain ANSI codes");
    }

    #[test]
    fn list_payload_flattens_subscription() {
        let snapshot = make_snapshot();
        let payload = ListPayload::new(&snapshot, "https://x/my-subscription");
        let json = serde_json::to_value(&payload).unwrap();
        let first = &json["subscriptions"][0];
        assert_eq!(first["id"], 7);
        assert_eq!(first["currentCredits"], 12.34);
        assert!((first["effectiveTotal"].as_f64().unwrap() - 52.34).abs() < 1e-9);
        assert_eq!(first["remainingResets"], 2);
        assert_eq!(json["total"], 52.34);
        assert_eq!(json["manageUrl"], "https://x/my-subscription");
    }
}
