#![deny(warnings)]

//! Economic models for the studio's business simulators.
//!
//! This crate provides:
//! - NPV, IRR (Newton-Raphson) and simple payback helpers
//! - Monte Carlo viability analysis with a seeded RNG
//! - A serializable task record for handing results downstream

use thiserror::Error;

pub mod finance;
pub mod task;
pub mod viability;

pub use finance::{annuity_cash_flows, irr, irr_with, npv, simple_payback, IrrOptions};
pub use task::TaskRecord;
pub use viability::{
    run_viability, FinancialScenario, MonteCarloConfig, Verdict, ViabilityReport, MAX_YEARS,
    NO_RETURN_IRR,
};

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Inputs rejected before any computation runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Numeric conversion to floating point failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}
