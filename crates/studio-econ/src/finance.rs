//! Time-value-of-money helpers: NPV, IRR and simple payback.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lower bound for IRR iterates; at -1 the discount factor is undefined.
const MIN_RATE: f64 = -0.99;
/// Upper bound for IRR iterates.
const MAX_RATE: f64 = 100.0;

fn period(t: usize) -> i32 {
    i32::try_from(t).unwrap_or(i32::MAX)
}

/// Net present value of `cash_flows` discounted at `rate`.
///
/// `cash_flows[0]` is undiscounted (t = 0).
///
/// Example:
/// let v = npv(&[-100.0, 110.0], 0.10);
/// assert!(v.abs() < 1e-9);
pub fn npv(cash_flows: &[f64], rate: f64) -> f64 {
    let base = 1.0 + rate;
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / base.powi(period(t)))
        .sum()
}

/// Newton-Raphson settings for [`irr_with`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IrrOptions {
    /// Starting rate (fraction).
    pub initial_guess: f64,
    /// Iteration cap.
    pub max_iterations: u32,
    /// Convergence threshold on |NPV|.
    pub tolerance: f64,
}

impl Default for IrrOptions {
    fn default() -> Self {
        Self {
            initial_guess: 0.10,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Internal rate of return with default options. See [`irr_with`].
pub fn irr(cash_flows: &[f64]) -> f64 {
    irr_with(cash_flows, &IrrOptions::default())
}

/// Internal rate of return as a fraction (0.12 = 12%).
///
/// Best effort: returns the current iterate when |NPV| drops below the
/// tolerance, when the derivative is exactly zero, or when the iteration
/// cap is reached. Never fails.
pub fn irr_with(cash_flows: &[f64], opts: &IrrOptions) -> f64 {
    let mut rate = opts.initial_guess;
    for _ in 0..opts.max_iterations {
        let base = 1.0 + rate;
        let mut value = 0.0;
        let mut slope = 0.0;
        for (t, cf) in cash_flows.iter().enumerate() {
            let n = period(t);
            value += cf / base.powi(n);
            if t > 0 {
                slope -= (t as f64) * cf / base.powi(n.saturating_add(1));
            }
        }
        if value.abs() < opts.tolerance {
            return rate;
        }
        if !(value.is_finite() && slope.is_finite()) || slope == 0.0 {
            debug!(rate, value, slope, "irr stopped on degenerate derivative");
            return rate;
        }
        rate = (rate - value / slope).clamp(MIN_RATE, MAX_RATE);
    }
    debug!(rate, "irr did not converge within iteration cap");
    rate
}

/// Years needed to recover `capital` from a constant annual cash flow.
/// Infinite when the flow is not positive.
pub fn simple_payback(capital: f64, annual_cash_flow: f64) -> f64 {
    if annual_cash_flow > 0.0 {
        capital / annual_cash_flow
    } else {
        f64::INFINITY
    }
}

/// `[-capital, annual, annual, ...]` with `years` positive entries.
pub fn annuity_cash_flows(capital: f64, annual_cash_flow: f64, years: u32) -> Vec<f64> {
    let mut flows = Vec::with_capacity(years as usize + 1);
    flows.push(-capital);
    flows.extend(std::iter::repeat(annual_cash_flow).take(years as usize));
    flows
}
