// src/strategy/optimization.rs

//! Order-up-to targets for perishable stock.
//!
//! The newsvendor quantile over the replenishment horizon sets the target;
//! the shelf life caps it, since stock beyond what can be used before it
//! expires only turns into waste.

use crate::model::{PIPELINE_SLOTS, SHELF_LIFE_DAYS};
use crate::simulation::config::EnvConfig;

/// Probability of covering a day's demand that balances shortage against
/// holding: `shortage / (shortage + holding)`.
pub fn service_level(shortage_cost: f64, holding_cost: f64) -> f64 {
    let total = shortage_cost + holding_cost;
    if total <= 0.0 {
        0.0
    } else {
        shortage_cost / total
    }
}

fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Quantile of the standard normal distribution (Acklam's rational
/// approximation, relative error below 1.2e-9).
fn standard_normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 6] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
        1.0,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 5] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
        1.0,
    ];
    const TAIL: f64 = 0.02425;

    let p = p.clamp(f64::EPSILON, 1.0 - f64::EPSILON);
    if p < TAIL {
        let q = (-2.0 * p.ln()).sqrt();
        horner(&C, q) / horner(&D, q)
    } else if p > 1.0 - TAIL {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -horner(&C, q) / horner(&D, q)
    } else {
        let q = p - 0.5;
        let r = q * q;
        q * horner(&A, r) / horner(&B, r)
    }
}

/// Target inventory position (on hand plus in transit) for the environment's
/// costs and the given daily demand moments.
///
/// An order placed today is first usable after the lead time and covers one
/// review day, so the risk horizon is `PIPELINE_SLOTS + 1` days. Demand is
/// assumed i.i.d. across days. The target never exceeds mean demand over the
/// risk horizon plus the remaining shelf life.
pub fn order_up_to_level(config: &EnvConfig, mean_daily: f64, std_daily: f64) -> u32 {
    let z = standard_normal_quantile(service_level(config.shortage_cost, config.holding_cost));

    let risk_days = (PIPELINE_SLOTS + 1) as f64;
    let newsvendor = mean_daily * risk_days + z * std_daily * risk_days.sqrt();
    let usable = mean_daily * (risk_days + (SHELF_LIFE_DAYS - 1) as f64);

    let target = newsvendor.min(usable);
    if !target.is_finite() || target <= 0.0 {
        0
    } else {
        target.round().min(f64::from(u32::MAX)) as u32
    }
}
