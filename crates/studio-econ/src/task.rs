//! Plain record handed to the downstream task queue.

use crate::viability::{FinancialScenario, ViabilityReport};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A finished viability study, ready to be queued as an editorial task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub title: String,
    pub created: NaiveDate,
    pub scenario: FinancialScenario,
    pub report: ViabilityReport,
    pub verdict_text: String,
}

impl TaskRecord {
    pub fn from_report(
        title: impl Into<String>,
        created: NaiveDate,
        scenario: FinancialScenario,
        report: ViabilityReport,
    ) -> Self {
        let verdict_text = report.summary();
        Self {
            title: title.into(),
            created,
            scenario,
            report,
            verdict_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viability::{run_viability, MonteCarloConfig};
    use rust_decimal::Decimal;

    #[test]
    fn task_record_roundtrip() {
        let scenario = FinancialScenario {
            asset_value: Decimal::new(300_000, 0),
            capital_to_raise: Decimal::new(100_000, 0),
            production_costs: Decimal::new(160_000, 0),
            years: 5,
            asset_uncertainty_pct: 10.0,
            cost_uncertainty_pct: 5.0,
        };
        let report = run_viability(&scenario, &MonteCarloConfig::default()).unwrap();
        let task = TaskRecord::from_report(
            "Planta de pirólisis",
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            scenario,
            report,
        );
        assert_eq!(task.verdict_text, task.report.summary());
        let s = serde_json::to_string(&task).unwrap();
        let back: TaskRecord = serde_json::from_str(&s).unwrap();
        assert_eq!(back.title, task.title);
        assert_eq!(back.created, task.created);
        assert_eq!(back.scenario, task.scenario);
        assert_eq!(back.report.verdict, task.report.verdict);
        assert_eq!(back.report.iterations, 1000);
    }
}
