// 🧮 Gap Estimator - Fill missing quarters with ordered fallback strategies
//
// Strategies are tried in order, first hit wins:
//   1. Next-quarter subtraction  (year-to-date filing minus next quarter)
//   2. Annual remainder          (Q4 only: annual minus Q1..Q3)
//   3. Historical proportion     (prior year's quarter share × annual)
//   4. Sibling quarter           (copy another known quarter of the year)
//   5. Neighbor year             (adjacent annual total / 4)
//   6. Equal split               (annual / 4, or 0)

use crate::config::EngineConfig;
use crate::facts::{months_between, RawFact};
use crate::period::{Frame, Period};
use crate::series::{CanonicalSeries, ValueSource};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ============================================================================
// ESTIMATION STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimationStrategy {
    NextQuarterSubtraction,
    AnnualRemainder,
    HistoricalProportion,
    SiblingQuarter,
    NeighborYear,
    EqualSplit,
}

/// Everything a strategy may look at for one missing quarter
pub struct EstimationContext<'a> {
    pub facts: &'a [RawFact],
    pub series: &'a CanonicalSeries,
    pub frame: Frame,
    pub config: &'a EngineConfig,
}

impl EstimationContext<'_> {
    fn year(&self) -> i32 {
        self.frame.year
    }

    fn quarter(&self) -> Period {
        self.frame.period
    }

    fn annual(&self) -> f64 {
        self.series.annual_or_zero(self.year())
    }
}

type StrategyFn = fn(&EstimationContext) -> Option<f64>;

const STRATEGIES: [(EstimationStrategy, StrategyFn); 6] = [
    (EstimationStrategy::NextQuarterSubtraction, next_quarter_subtraction),
    (EstimationStrategy::AnnualRemainder, annual_remainder),
    (EstimationStrategy::HistoricalProportion, historical_proportion),
    (EstimationStrategy::SiblingQuarter, sibling_quarter),
    (EstimationStrategy::NeighborYear, neighbor_year),
    (EstimationStrategy::EqualSplit, equal_split),
];

// ============================================================================
// STRATEGIES
// ============================================================================

/// Year-to-date filing for the next quarter, minus that quarter's value.
/// Never used for Q4. Only a positive result counts.
pub fn next_quarter_subtraction(ctx: &EstimationContext) -> Option<f64> {
    if ctx.quarter() == Period::Q4 {
        return None;
    }
    let next = ctx.quarter().next_quarter()?;

    let cumulative = find_cumulative_record(
        ctx.facts,
        ctx.year(),
        next,
        ctx.config.cumulative_window_months,
    )?;
    let next_value = ctx
        .series
        .amount(&Frame::quarter(ctx.year(), next))
        .filter(|v| *v != 0.0)?;

    let estimate = cumulative.value - next_value;
    if estimate > 0.0 {
        Some(estimate)
    } else {
        None
    }
}

/// Q4 = annual − (Q1 + Q2 + Q3), unknown quarters counted as annual / 4
pub fn annual_remainder(ctx: &EstimationContext) -> Option<f64> {
    let annual = ctx.annual();
    if ctx.quarter() != Period::Q4 || annual == 0.0 {
        return None;
    }

    let placeholder = annual / 4.0;
    let first_three: f64 = [Period::Q1, Period::Q2, Period::Q3]
        .iter()
        .map(|q| {
            ctx.series
                .amount(&Frame::quarter(ctx.year(), *q))
                .unwrap_or(placeholder)
        })
        .sum();

    Some(annual - first_three)
}

/// Annual total scaled by the quarter's share of the prior year
pub fn historical_proportion(ctx: &EstimationContext) -> Option<f64> {
    let share = historical_share(ctx.facts, ctx.year(), ctx.quarter());
    let estimate = ctx.annual() * share;
    if estimate > 0.0 {
        Some(estimate)
    } else {
        None
    }
}

/// First other known quarter of the same year, taken verbatim
pub fn sibling_quarter(ctx: &EstimationContext) -> Option<f64> {
    Period::QUARTERS
        .iter()
        .filter(|q| **q != ctx.quarter())
        .find_map(|q| ctx.series.amount(&Frame::quarter(ctx.year(), *q)))
}

/// Closest non-zero neighbor annual total (prior year first) divided by 4
pub fn neighbor_year(ctx: &EstimationContext) -> Option<f64> {
    (1..=ctx.config.neighbor_year_reach).find_map(|offset| {
        [ctx.year() - offset, ctx.year() + offset]
            .iter()
            .map(|y| ctx.series.annual_or_zero(*y))
            .find(|v| *v != 0.0)
            .map(|v| v / 4.0)
    })
}

/// Last resort: annual / 4 (0 when the annual is unknown)
pub fn equal_split(ctx: &EstimationContext) -> Option<f64> {
    Some(ctx.annual() / 4.0)
}

// ============================================================================
// LOOKUPS
// ============================================================================

/// First non-frame record for `fp` whose window ends in `year` and spans
/// more than `min_months` months. Malformed records are skipped.
pub fn find_cumulative_record<'a>(
    facts: &'a [RawFact],
    year: i32,
    fp: Period,
    min_months: i32,
) -> Option<&'a RawFact> {
    facts.iter().filter(|f| f.frame.is_none()).find(|fact| {
        match fact.fiscal_period() {
            Ok(p) if p == fp => {}
            _ => return false,
        }
        match fact.reporting_window() {
            Ok((start, end)) => end.year() == year && months_between(start, end) > min_months,
            Err(e) => {
                trace!(error = %e, "Skipping record for cumulative lookup");
                false
            }
        }
    })
}

/// Share of `quarter` in the prior year: average value per quarter over all
/// frame-tagged records of `year - 1`, divided by the sum of the averages.
/// A zero total yields a zero share.
pub fn historical_share(facts: &[RawFact], year: i32, quarter: Period) -> f64 {
    let mut sums = [0.0_f64; 4];
    let mut counts = [0_u32; 4];

    for (frame, value) in facts.iter().filter_map(|f| f.parsed_frame().map(|fr| (fr, f.value))) {
        if frame.year != year - 1 {
            continue;
        }
        if let Some(q) = frame.period.quarter_index() {
            let i = (q - 1) as usize;
            sums[i] += value;
            counts[i] += 1;
        }
    }

    let averages: Vec<f64> = sums
        .iter()
        .zip(counts.iter())
        .map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 })
        .collect();
    let total: f64 = averages.iter().sum();

    match quarter.quarter_index() {
        Some(q) if total != 0.0 => averages[(q - 1) as usize] / total,
        _ => 0.0,
    }
}

// ============================================================================
// GAP ESTIMATOR
// ============================================================================

/// One filled quarter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapFill {
    pub frame: Frame,
    pub value: f64,
    pub strategy: EstimationStrategy,
}

pub struct GapEstimator<'a> {
    config: &'a EngineConfig,
}

impl<'a> GapEstimator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        GapEstimator { config }
    }

    /// Estimate a single missing quarter against the current series
    pub fn estimate(&self, series: &CanonicalSeries, facts: &[RawFact], frame: Frame) -> GapFill {
        let ctx = EstimationContext {
            facts,
            series,
            frame,
            config: self.config,
        };

        STRATEGIES
            .iter()
            .find_map(|(strategy, run)| {
                run(&ctx).map(|value| GapFill {
                    frame,
                    value,
                    strategy: *strategy,
                })
            })
            .unwrap_or(GapFill {
                frame,
                value: 0.0,
                strategy: EstimationStrategy::EqualSplit,
            })
    }

    /// Fill every missing quarter in chronological order.
    /// Each estimate is written back before the next one is computed.
    pub fn fill_gaps(&self, series: &mut CanonicalSeries, facts: &[RawFact]) -> Vec<GapFill> {
        let mut fills = Vec::new();

        for frame in series.missing_quarters() {
            let fill = self.estimate(series, facts, frame);
            debug!(
                symbol = %series.symbol,
                frame = %fill.frame,
                value = fill.value,
                strategy = ?fill.strategy,
                "Estimated missing quarter"
            );
            series.set(frame, fill.value, ValueSource::Estimated(fill.strategy));
            fills.push(fill);
        }

        fills
    }
}

// ============================================================================
// TESTS
// ============================================================================
