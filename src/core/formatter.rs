use chrono::{DateTime, Utc};

use crate::core::credits::{effective_total, remaining_resets};
use crate::core::models::subscription::Subscription;

/// Returns "$123.45". Non-finite values render as zero.
pub fn format_currency(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let text = format!("{:.2}", value);
    // Negative zero and tiny negatives round to "-0.00".
    if text == "-0.00" {
        "$0.00".to_string()
    } else {
        format!("${}", text)
    }
}

/// Returns "$123.45 remaining".
pub fn format_remaining(total: f64) -> String {
    format!("{} remaining", format_currency(total))
}

/// One-line summary of a subscription:
/// "PRO | current $12.34 | total $52.34 | limit $20.00 | resets 2 | cycle Monthly"
pub fn format_detail_line(sub: &Subscription) -> String {
    format!(
        "{} | current {} | total {} | limit {} | resets {} | cycle {}",
        sub.plan_name(),
        format_currency(sub.current_credits),
        format_currency(effective_total(sub)),
        format_currency(sub.subscription_plan.credit_limit),
        remaining_resets(sub),
        sub.cycle_label()
    )
}

/// Returns "Expires in Xd Yh" relative to now. If past, returns "Expired".
pub fn format_expiry_countdown(ends_at: &DateTime<Utc>) -> String {
    let total_seconds = (*ends_at - Utc::now()).num_seconds();

    if total_seconds <= 0 {
        return "Expired".to_string();
    }

    let total_minutes = total_seconds / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 24 {
        let days = hours / 24;
        let remaining_hours = hours % 24;
        if remaining_hours == 0 {
            format!("Expires in {}d", days)
        } else {
            format!("Expires in {}d {}h", days, remaining_hours)
        }
    } else if hours > 0 {
        format!("Expires in {}h {}m", hours, minutes)
    } else {
        format!("Expires in {}m", total_minutes.max(1))
    }
}

/// Returns "[████████░░░░]" where █ = balance left of the per-cycle limit.
/// Width is the number of block characters inside the brackets.
pub fn format_balance_bar(current: f64, limit: f64, width: usize) -> String {
    let fraction = if limit.is_finite() && limit > 0.0 && current.is_finite() {
        (current / limit).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled_blocks = (fraction * width as f64).round() as usize;
    let empty_blocks = width.saturating_sub(filled_blocks);

    format!("[{}{}]", "█".repeat(filled_blocks), "░".repeat(empty_blocks))
}

/// Local calendar date, e.g. "2025-11-30".
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.with_timezone(&chrono::Local).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::subscription::{PlanType, SubscriptionPlan};
    use chrono::Duration;

    #[test]
    fn format_currency_two_decimals() {
        assert_eq!(format_currency(52.34), "$52.34");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(5.0), "$5.00");
        assert_eq!(format_currency(1.005), "$1.00");
        assert_eq!(format_currency(f64::NAN), "$0.00");
    }

    #[test]
    fn format_currency_never_shows_negative_zero() {
        assert_eq!(format_currency(-0.0), "$0.00");
        assert_eq!(format_currency(-0.001), "$0.00");
        assert_eq!(format_currency(-0.0f64 + -0.0), "$0.00");
        assert_eq!(format_currency(-1.5), "$-1.50");
    }

    #[test]
    fn format_remaining_suffix() {
        assert_eq!(format_remaining(208.2), "$208.20 remaining");
    }

    #[test]
    fn detail_line_contains_every_figure() {
        let sub = Subscription {
            current_credits: 12.34,
            reset_times: 2,
            subscription_plan_name: Some("PRO".into()),
            billing_cycle_desc: Some("Monthly".into()),
            subscription_plan: SubscriptionPlan {
                credit_limit: 20.0,
                plan_type: PlanType::Other("STANDARD".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            format_detail_line(&sub),
            "PRO | current $12.34 | total $52.34 | limit $20.00 | resets 2 | cycle Monthly"
        );
    }

    #[test]
    fn detail_line_pay_per_use_shows_zero_resets() {
        let sub = Subscription {
            current_credits: 3.0,
            reset_times: 5,
            subscription_plan: SubscriptionPlan {
                credit_limit: 10.0,
                plan_type: PlanType::PayPerUse,
                ..Default::default()
            },
            ..Default::default()
        };
        let line = format_detail_line(&sub);
        assert!(line.starts_with("(unnamed)"));
        assert!(line.contains("resets 0"));
        assert!(line.contains("total $3.00"));
    }

    #[test]
    fn balance_bar_width() {
        assert_eq!(format_balance_bar(20.0, 20.0, 12), "[████████████]");
        assert_eq!(format_balance_bar(0.0, 20.0, 12), "[░░░░░░░░░░░░]");
        assert_eq!(format_balance_bar(10.0, 20.0, 12), "[██████░░░░░░]");
    }

    #[test]
    fn balance_bar_degenerate_inputs() {
        assert_eq!(format_balance_bar(5.0, 0.0, 4), "[░░░░]");
        assert_eq!(format_balance_bar(f64::NAN, 10.0, 4), "[░░░░]");
        assert_eq!(format_balance_bar(50.0, 10.0, 4), "[████]");
    }

    #[test]
    fn expiry_countdown_past() {
        let past = Utc::now() - Duration::seconds(10);
        assert_eq!(format_expiry_countdown(&past), "Expired");
    }

    #[test]
    fn expiry_countdown_hours_and_minutes() {
        let future = Utc::now() + Duration::minutes(135);
        let result = format_expiry_countdown(&future);
        assert!(result.starts_with("Expires in "));
        assert!(result.contains('h'));
        assert!(result.contains('m'));
    }

    #[test]
    fn expiry_countdown_days() {
        let future = Utc::now() + Duration::hours(50);
        assert!(format_expiry_countdown(&future).contains('d'));
    }
}
