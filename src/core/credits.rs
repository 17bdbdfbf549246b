//! Credit derivation. Pure functions over subscription snapshots; none of
//! them fail, and malformed numbers contribute zero instead of poisoning a sum.

use crate::core::models::subscription::{PlanType, Subscription};

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}

/// Refill cycles still available. Pay-per-use plans never refill.
pub fn remaining_resets(sub: &Subscription) -> i64 {
    match sub.subscription_plan.plan_type {
        PlanType::PayPerUse => 0,
        PlanType::Other(_) => sub.reset_times,
    }
}

/// Balance now plus what every remaining refill would add.
pub fn effective_total(sub: &Subscription) -> f64 {
    let credits = non_negative(sub.current_credits);
    let limit = non_negative(sub.subscription_plan.credit_limit);
    let resets = remaining_resets(sub).max(0) as f64;
    credits + resets * limit
}

/// Spendable right now: balances of active subscriptions, resets ignored.
pub fn aggregate_active_sum(subs: &[Subscription]) -> f64 {
    subs.iter()
        .filter(|s| s.is_active)
        .map(|s| finite_or_zero(s.current_credits))
        .fold(0.0, |acc, v| acc + v)
}

/// Sum of [`effective_total`]; callers pass an already filtered list.
pub fn aggregate_total_sum(subs: &[Subscription]) -> f64 {
    subs.iter().map(effective_total).fold(0.0, |acc, v| acc + v)
}
