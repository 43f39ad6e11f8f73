//! Monte Carlo viability analysis of a financed project.
//!
//! Asset value and production costs are jittered by a uniform factor in
//! `[1 - u, 1 + u]`; each sample is evaluated with [`crate::finance`] and the
//! results are aggregated into a [`ViabilityReport`].

use crate::finance::{annuity_cash_flows, irr, npv, simple_payback};
use crate::EconError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// IRR recorded for samples that never return the invested capital.
pub const NO_RETURN_IRR: f64 = -1.0;

/// Longest project horizon accepted, in years.
pub const MAX_YEARS: u32 = 200;

/// Base-case inputs of a project to be financed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialScenario {
    /// Value of the asset produced over the whole project (USD).
    pub asset_value: Decimal,
    /// Capital raised up front (USD, > 0).
    pub capital_to_raise: Decimal,
    /// Production costs over the whole project (USD).
    pub production_costs: Decimal,
    /// Project duration in years, in `1..=MAX_YEARS`.
    pub years: u32,
    /// Uncertainty band on the asset value, in percent.
    pub asset_uncertainty_pct: f64,
    /// Uncertainty band on production costs, in percent.
    pub cost_uncertainty_pct: f64,
}

/// Scenario converted to floats after validation.
#[derive(Clone, Copy, Debug)]
struct Base {
    asset: f64,
    capital: f64,
    costs: f64,
    years: f64,
}

fn to_f64(d: Decimal) -> Result<f64, EconError> {
    d.to_f64()
        .filter(|v| v.is_finite())
        .ok_or(EconError::NonFinite)
}

fn check_uncertainty(name: &str, pct: f64) -> Result<(), EconError> {
    if !pct.is_finite() || pct < 0.0 {
        return Err(EconError::InvalidInput(format!(
            "{name} uncertainty must be a non-negative percentage, got {pct}"
        )));
    }
    Ok(())
}

impl FinancialScenario {
    fn base(&self) -> Result<Base, EconError> {
        if self.capital_to_raise <= Decimal::ZERO {
            return Err(EconError::InvalidInput(format!(
                "capital to raise must be > 0, got {}",
                self.capital_to_raise
            )));
        }
        if self.years == 0 {
            return Err(EconError::InvalidInput(
                "project duration must be at least one year".into(),
            ));
        }
        if self.years > MAX_YEARS {
            return Err(EconError::InvalidInput(format!(
                "project duration must be at most {MAX_YEARS} years, got {}",
                self.years
            )));
        }
        check_uncertainty("asset value", self.asset_uncertainty_pct)?;
        check_uncertainty("production cost", self.cost_uncertainty_pct)?;
        Ok(Base {
            asset: to_f64(self.asset_value)?,
            capital: to_f64(self.capital_to_raise)?,
            costs: to_f64(self.production_costs)?,
            years: f64::from(self.years),
        })
    }

    /// Constant yearly cash flow of the base case.
    pub fn annual_cash_flow(&self) -> Result<f64, EconError> {
        let b = self.base()?;
        Ok(b.asset / b.years - b.costs / b.years)
    }

    /// `[-capital, cf, ..., cf]` for the base case.
    pub fn cash_flows(&self) -> Result<Vec<f64>, EconError> {
        let b = self.base()?;
        Ok(annuity_cash_flows(
            b.capital,
            b.asset / b.years - b.costs / b.years,
            self.years,
        ))
    }
}

/// Sampler settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Number of sampled scenarios (> 0).
    pub iterations: u32,
    /// Discount rate and IRR hurdle (fraction).
    pub cost_of_capital: f64,
    /// Seed for deterministic RNG.
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            cost_of_capital: 0.12,
            seed: 42,
        }
    }
}

/// Pass/fail outcome of a viability analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Viable,
    NotViable,
}

impl Verdict {
    /// Viable iff more than half the samples beat the hurdle and the mean
    /// IRR also beats it.
    pub fn decide(profitability_pct: f64, mean_irr: f64, cost_of_capital: f64) -> Self {
        if profitability_pct > 50.0 && mean_irr > cost_of_capital {
            Verdict::Viable
        } else {
            Verdict::NotViable
        }
    }

    pub fn is_viable(self) -> bool {
        matches!(self, Verdict::Viable)
    }
}

/// Aggregated result of a viability run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViabilityReport {
    pub iterations: u32,
    pub cost_of_capital: f64,
    /// Mean NPV at the cost of capital (USD).
    pub mean_npv: f64,
    /// Mean IRR as a fraction; loss samples count as -1.
    pub mean_irr: f64,
    /// Mean payback over samples that pay back at all.
    pub mean_payback_years: Option<f64>,
    /// Share of samples whose IRR beats the cost of capital, in percent.
    pub profitability_pct: f64,
    pub verdict: Verdict,
}

impl ViabilityReport {
    /// Evaluate the base case once, ignoring uncertainty bands.
    pub fn deterministic(
        scenario: &FinancialScenario,
        cost_of_capital: f64,
    ) -> Result<Self, EconError> {
        let b = scenario.base()?;
        let s = evaluate(b, b.asset, b.costs, scenario.years, cost_of_capital);
        let mut agg = Aggregate::default();
        agg.push(&s, cost_of_capital);
        Ok(agg.finish(cost_of_capital))
    }

    /// One-line human readable verdict.
    pub fn summary(&self) -> String {
        let payback = match self.mean_payback_years {
            Some(y) => format!("{y:.1} years"),
            None => "never".to_string(),
        };
        let head = if self.verdict.is_viable() {
            "Viable"
        } else {
            "Not viable"
        };
        format!(
            "{head}: {:.1}% of {} scenarios beat the {:.1}% cost of capital (mean IRR {:.2}%, mean NPV {:.0}, payback {payback})",
            self.profitability_pct,
            self.iterations,
            self.cost_of_capital * 100.0,
            self.mean_irr * 100.0,
            self.mean_npv,
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    npv: f64,
    irr: f64,
    payback: f64,
}

fn evaluate(b: Base, asset: f64, costs: f64, years: u32, cost_of_capital: f64) -> Sample {
    let annual = asset / b.years - costs / b.years;
    if annual > 0.0 {
        let flows = annuity_cash_flows(b.capital, annual, years);
        Sample {
            npv: npv(&flows, cost_of_capital),
            irr: irr(&flows),
            payback: simple_payback(b.capital, annual),
        }
    } else {
        Sample {
            npv: -b.capital,
            irr: NO_RETURN_IRR,
            payback: f64::INFINITY,
        }
    }
}

#[derive(Default)]
struct Aggregate {
    n: u32,
    npv_sum: f64,
    irr_sum: f64,
    payback_sum: f64,
    payback_n: u32,
    profitable: u32,
}

impl Aggregate {
    fn push(&mut self, s: &Sample, cost_of_capital: f64) {
        self.n += 1;
        self.npv_sum += s.npv;
        self.irr_sum += s.irr;
        if s.payback.is_finite() {
            self.payback_sum += s.payback;
            self.payback_n += 1;
        }
        if s.irr > cost_of_capital {
            self.profitable += 1;
        }
    }

    fn finish(self, cost_of_capital: f64) -> ViabilityReport {
        let n = f64::from(self.n.max(1));
        let mean_irr = self.irr_sum / n;
        let profitability_pct = f64::from(self.profitable) / n * 100.0;
        ViabilityReport {
            iterations: self.n,
            cost_of_capital,
            mean_npv: self.npv_sum / n,
            mean_irr,
            mean_payback_years: (self.payback_n > 0)
                .then(|| self.payback_sum / f64::from(self.payback_n)),
            profitability_pct,
            verdict: Verdict::decide(profitability_pct, mean_irr, cost_of_capital),
        }
    }
}

/// Run the Monte Carlo viability analysis.
///
/// Fails with [`EconError::InvalidInput`] before sampling when the capital
/// to raise is not positive, the duration is zero, an uncertainty band is
/// negative, or no iterations are requested.
pub fn run_viability(
    scenario: &FinancialScenario,
    cfg: &MonteCarloConfig,
) -> Result<ViabilityReport, EconError> {
    let b = scenario.base()?;
    if cfg.iterations == 0 {
        return Err(EconError::InvalidInput("iterations must be > 0".into()));
    }
    if !cfg.cost_of_capital.is_finite() {
        return Err(EconError::NonFinite);
    }
    debug!(
        iterations = cfg.iterations,
        seed = cfg.seed,
        "starting viability sampling"
    );
    let asset_band = scenario.asset_uncertainty_pct / 100.0;
    let cost_band = scenario.cost_uncertainty_pct / 100.0;
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let mut agg = Aggregate::default();
    for _ in 0..cfg.iterations {
        let ua: f64 = rng.gen_range(-1.0..=1.0);
        let uc: f64 = rng.gen_range(-1.0..=1.0);
        let asset = b.asset * (1.0 + ua * asset_band);
        let costs = b.costs * (1.0 + uc * cost_band);
        let s = evaluate(b, asset, costs, scenario.years, cfg.cost_of_capital);
        agg.push(&s, cfg.cost_of_capital);
    }
    let report = agg.finish(cfg.cost_of_capital);
    info!(
        profitability_pct = report.profitability_pct,
        mean_irr = report.mean_irr,
        verdict = ?report.verdict,
        "viability analysis finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(
        asset: i64,
        costs: i64,
        capital: i64,
        years: u32,
        u_a: f64,
        u_c: f64,
    ) -> FinancialScenario {
        FinancialScenario {
            asset_value: Decimal::new(asset, 0),
            capital_to_raise: Decimal::new(capital, 0),
            production_costs: Decimal::new(costs, 0),
            years,
            asset_uncertainty_pct: u_a,
            cost_uncertainty_pct: u_c,
        }
    }

    #[test]
    fn zero_uncertainty_reference_scenario() {
        let s = scenario(300_000, 160_000, 100_000, 5, 0.0, 0.0);
        assert_eq!(s.annual_cash_flow().unwrap(), 28_000.0);
        let flows = s.cash_flows().unwrap();
        assert_eq!(flows.len(), 6);

        let expected_npv =
            -100_000.0 + 28_000.0 * (1.0 - 1.12f64.powi(-5)) / 0.12;
        let expected_irr = irr(&flows);
        assert!(npv(&flows, expected_irr).abs() < 1e-6);
        assert!(expected_irr > 0.12);

        let r = run_viability(&s, &MonteCarloConfig::default()).unwrap();
        assert_eq!(r.iterations, 1000);
        assert!((r.mean_npv - expected_npv).abs() < 1e-6);
        assert!((r.mean_irr - expected_irr).abs() < 1e-12);
        let payback = r.mean_payback_years.unwrap();
        assert!((payback - 100_000.0 / 28_000.0).abs() < 1e-9);
        assert_eq!(r.profitability_pct, 100.0);
        assert_eq!(r.verdict, Verdict::Viable);
    }

    #[test]
    fn deterministic_matches_zero_band_run() {
        let s = scenario(300_000, 160_000, 100_000, 5, 0.0, 0.0);
        let d = ViabilityReport::deterministic(&s, 0.12).unwrap();
        let r = run_viability(&s, &MonteCarloConfig::default()).unwrap();
        assert!((d.mean_npv - r.mean_npv).abs() < 1e-6);
        assert_eq!(d.verdict, r.verdict);
        assert_eq!(d.iterations, 1);
    }

    #[test]
    fn zero_capital_is_rejected() {
        let s = scenario(300_000, 160_000, 0, 5, 10.0, 10.0);
        let err = run_viability(&s, &MonteCarloConfig::default()).unwrap_err();
        assert!(matches!(err, EconError::InvalidInput(_)));
    }

    #[test]
    fn other_invalid_inputs() {
        let cfg = MonteCarloConfig::default();
        assert!(run_viability(&scenario(1, 0, 1, 0, 0.0, 0.0), &cfg).is_err());
        assert!(run_viability(&scenario(1, 0, 1, 1, -5.0, 0.0), &cfg).is_err());
        let none = MonteCarloConfig {
            iterations: 0,
            ..cfg
        };
        assert!(run_viability(&scenario(1, 0, 1, 1, 0.0, 0.0), &none).is_err());
    }

    #[test]
    fn horizon_is_capped() {
        let cfg = MonteCarloConfig::default();
        let ok = scenario(300_000, 160_000, 100_000, MAX_YEARS, 0.0, 0.0);
        assert_eq!(ok.cash_flows().unwrap().len(), MAX_YEARS as usize + 1);

        let huge = scenario(300_000, 160_000, 100_000, u32::MAX, 0.0, 0.0);
        assert!(matches!(huge.cash_flows(), Err(EconError::InvalidInput(_))));
        assert!(matches!(
            run_viability(&huge, &cfg),
            Err(EconError::InvalidInput(_))
        ));
        let over = scenario(300_000, 160_000, 100_000, MAX_YEARS + 1, 0.0, 0.0);
        assert!(ViabilityReport::deterministic(&over, 0.12).is_err());
    }

    #[test]
    fn losing_project_records_total_loss() {
        let s = scenario(100_000, 200_000, 50_000, 4, 0.0, 0.0);
        let r = run_viability(&s, &MonteCarloConfig::default()).unwrap();
        assert_eq!(r.mean_npv, -50_000.0);
        assert_eq!(r.mean_irr, NO_RETURN_IRR);
        assert_eq!(r.mean_payback_years, None);
        assert_eq!(r.profitability_pct, 0.0);
        assert_eq!(r.verdict, Verdict::NotViable);
        assert!(r.summary().starts_with("Not viable"));
    }

    #[test]
    fn sampling_is_seeded() {
        let s = scenario(300_000, 100_000, 100_000, 5, 25.0, 25.0);
        let cfg = MonteCarloConfig::default();
        let a = run_viability(&s, &cfg).unwrap();
        let b = run_viability(&s, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn profitability_does_not_drop_as_uncertainty_shrinks() {
        let cfg = MonteCarloConfig::default();
        let at = |u: f64| {
            run_viability(&scenario(300_000, 100_000, 100_000, 5, u, u), &cfg)
                .unwrap()
                .profitability_pct
        };
        let p0 = at(0.0);
        let p20 = at(20.0);
        let p60 = at(60.0);
        assert_eq!(p0, 100.0);
        assert!(p0 >= p20);
        // Stochastic bound with a fixed seed.
        assert!(p20 + 5.0 >= p60, "p20 {p20} p60 {p60}");
        assert!(p60 < 100.0);
    }

    #[test]
    fn verdict_rules() {
        assert_eq!(Verdict::decide(51.0, 0.2, 0.12), Verdict::Viable);
        assert_eq!(Verdict::decide(50.0, 0.2, 0.12), Verdict::NotViable);
        assert_eq!(Verdict::decide(90.0, 0.12, 0.12), Verdict::NotViable);
    }
}
