//! Tolerance band calculation
//!
//! # Formula
//! percentage component = expected × percentage / 100
//! absolute component   = absolute_grams / 1000
//!
//! With a scaling curve, the base band is multiplied by a factor that falls
//! from 1 to 0 between `min_portions` and `max_portions`, clamped into
//! `[min_tolerance, max_tolerance]`, and never allowed below the absolute
//! component.

use crate::model::{ToleranceKind, WeightTolerancePolicy};

/// Comparison slack for floating point sums of kg values
const WEIGHT_EPSILON: f64 = 1e-9;

pub fn percentage_component(expected_weight: f64, policy: &WeightTolerancePolicy) -> f64 {
    expected_weight * policy.percentage / 100.0
}

pub fn absolute_component(policy: &WeightTolerancePolicy) -> f64 {
    policy.absolute_grams / 1000.0
}

/// Tolerance margin in kg for an item of `expected_weight` kg and `portions` portions
pub fn calculate_tolerance(expected_weight: f64, portions: u32, policy: &WeightTolerancePolicy) -> f64 {
    let fallback;
    let policy = if policy.validate().is_ok() {
        policy
    } else {
        fallback = WeightTolerancePolicy::default();
        &fallback
    };
    let expected = sanitize_weight(expected_weight);

    let absolute = match policy.kind {
        ToleranceKind::Percentage => 0.0,
        ToleranceKind::Absolute | ToleranceKind::Combined => absolute_component(policy),
    };

    // Nothing to take a percentage of
    if expected == 0.0 {
        return absolute;
    }

    let base = match policy.kind {
        ToleranceKind::Percentage => percentage_component(expected, policy),
        ToleranceKind::Absolute => absolute,
        ToleranceKind::Combined => percentage_component(expected, policy) + absolute,
    };

    match policy.scaling {
        None => base,
        Some(curve) => {
            let factor = portion_factor(portions, policy, curve.exponent);
            (base * factor)
                .clamp(policy.min_tolerance, policy.max_tolerance)
                .max(absolute)
        }
    }
}

/// Whether `actual` lies inside `expected ± tolerance`
pub fn is_within_tolerance(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance + WEIGHT_EPSILON
}

/// 1.0 at or below `min_portions`, 0.0 at or above `max_portions`
fn portion_factor(portions: u32, policy: &WeightTolerancePolicy, exponent: f64) -> f64 {
    let min = policy.min_portions as f64;
    let max = policy.max_portions as f64;
    let p = portions as f64;

    let t = if max <= min {
        if p >= max {
            1.0
        } else {
            0.0
        }
    } else {
        ((p - min) / (max - min)).clamp(0.0, 1.0)
    };

    1.0 - t.powf(exponent)
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        if weight != 0.0 {
            tracing::debug!(weight, "invalid expected weight, treating as zero");
        }
        0.0
    }
}
