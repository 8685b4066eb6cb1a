// ⚖️ Annual Reconciler - Make every year's quarters add up to its annual
//
//   Q1 + Q2 + Q3 + Q4 = FY
//
// Missing annuals are summed from the quarters. A reported annual that
// disagrees with its quarters pushes the residual into the quarters that
// were not directly reported.

use crate::period::Frame;
use crate::series::{CanonicalSeries, ValueSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconciliationResult {
    /// Reported annual already matches the quarters
    Balanced { annual: f64 },

    /// No annual was reported; it is the sum of the quarters
    AnnualDerived { annual: f64 },

    /// Reported annual kept; derived quarters absorbed the difference
    Redistributed {
        annual: f64,
        difference: f64,
        derived_quarters: Vec<Frame>,
    },

    /// All four quarters were reported and disagree with the reported
    /// annual; the annual was replaced by their sum
    AnnualRestated { reported: f64, restated: f64 },
}

impl ReconciliationResult {
    pub fn is_balanced(&self) -> bool {
        matches!(self, ReconciliationResult::Balanced { .. })
    }

    /// Whether any value of the year was changed
    pub fn is_adjusted(&self) -> bool {
        matches!(
            self,
            ReconciliationResult::Redistributed { .. } | ReconciliationResult::AnnualRestated { .. }
        )
    }

    pub fn difference(&self) -> f64 {
        match self {
            ReconciliationResult::Balanced { .. } => 0.0,
            ReconciliationResult::AnnualDerived { .. } => 0.0,
            ReconciliationResult::Redistributed { difference, .. } => *difference,
            ReconciliationResult::AnnualRestated { reported, restated } => reported - restated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearReconciliation {
    pub year: i32,
    pub result: ReconciliationResult,
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub symbol: String,
    pub years: Vec<YearReconciliation>,
}

impl ReconciliationReport {
    pub fn adjusted_years(&self) -> Vec<i32> {
        self.years
            .iter()
            .filter(|y| y.result.is_adjusted())
            .map(|y| y.year)
            .collect()
    }

    pub fn summary(&self) -> String {
        let derived = self
            .years
            .iter()
            .filter(|y| matches!(y.result, ReconciliationResult::AnnualDerived { .. }))
            .count();
        let balanced = self.years.iter().filter(|y| y.result.is_balanced()).count();
        format!(
            "Reconciliation for {}: {} years, {} balanced, {} annuals derived, {} adjusted",
            self.symbol,
            self.years.len(),
            balanced,
            derived,
            self.adjusted_years().len()
        )
    }
}

// ============================================================================
// ANNUAL RECONCILER
// ============================================================================

pub struct AnnualReconciler {
    /// Largest |annual - Σ quarters| still treated as balanced
    pub tolerance: f64,
}

impl AnnualReconciler {
    pub fn new(tolerance: f64) -> Self {
        AnnualReconciler { tolerance }
    }

    /// Reconcile every year of the series in place
    pub fn reconcile(&self, series: &mut CanonicalSeries) -> ReconciliationReport {
        let years = (series.start_year..series.end_year)
            .map(|year| YearReconciliation {
                year,
                result: self.reconcile_year(series, year),
            })
            .collect();

        let report = ReconciliationReport {
            symbol: series.symbol.clone(),
            years,
        };
        debug!("{}", report.summary());
        report
    }

    pub fn reconcile_year(&self, series: &mut CanonicalSeries, year: i32) -> ReconciliationResult {
        let annual_frame = Frame::annual(year);
        let quarter_sum = series.quarter_sum(year);

        let annual = match series.amount(&annual_frame) {
            Some(a) => a,
            None => {
                series.set(annual_frame, quarter_sum, ValueSource::SummedQuarters);
                return ReconciliationResult::AnnualDerived {
                    annual: quarter_sum,
                };
            }
        };

        let difference = annual - quarter_sum;
        if difference.abs() <= self.tolerance {
            return ReconciliationResult::Balanced { annual };
        }

        let (reported, derived): (Vec<Frame>, Vec<Frame>) = Frame::quarters_of(year)
            .into_iter()
            .partition(|q| series.is_reported(q));

        let reported_sum: f64 = reported.iter().filter_map(|q| series.amount(q)).sum();

        match derived.len() {
            0 => {
                warn!(
                    symbol = %series.symbol,
                    year,
                    reported = annual,
                    quarters = quarter_sum,
                    "Reported quarters disagree with reported annual, restating annual"
                );
                series.set(annual_frame, quarter_sum, ValueSource::Restated);
                return ReconciliationResult::AnnualRestated {
                    reported: annual,
                    restated: quarter_sum,
                };
            }
            4 => {
                // Nothing reported: keep the estimated shape, shift it evenly
                let shift = difference / 4.0;
                for q in &derived {
                    let current = series.amount(q).unwrap_or(0.0);
                    series.set(*q, current + shift, ValueSource::Redistributed);
                }
            }
            n => {
                let each = (annual - reported_sum) / n as f64;
                for q in &derived {
                    series.set(*q, each, ValueSource::Redistributed);
                }
            }
        }

        debug!(
            symbol = %series.symbol,
            year,
            difference,
            derived = derived.len(),
            "Redistributed annual residual"
        );

        ReconciliationResult::Redistributed {
            annual,
            difference,
            derived_quarters: derived,
        }
    }
}

impl Default for AnnualReconciler {
    fn default() -> Self {
        Self::new(0.01)
    }
}

// ============================================================================
// TESTS
// ============================================================================
