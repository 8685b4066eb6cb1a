// 🏭 Reconciliation Engine - Facts in, complete revenue table out
//
//   normalize → estimate gaps → reconcile annuals → growth metrics
//
// One run per entity, no I/O, no shared state. Batches fan out over rayon;
// an entity that cannot produce a series is skipped, never fatal.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::estimator::{GapEstimator, GapFill};
use crate::facts::EntityFacts;
use crate::metrics::PeriodMetricsCalculator;
use crate::normalizer::{missing_frames, DuplicateFrame, FactNormalizer};
use crate::period::Frame;
use crate::reconciliation::{AnnualReconciler, ReconciliationReport};
use crate::records::{record_set_fingerprint, FinancialRecord};
use crate::series::CanonicalSeries;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, info, warn};
use uuid::Uuid;

// ============================================================================
// ENTITY RUN
// ============================================================================

/// Everything one entity run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRun {
    pub symbol: String,
    pub sector: String,
    pub series: CanonicalSeries,
    pub records: Vec<FinancialRecord>,
    pub duplicates: Vec<DuplicateFrame>,
    /// Per disclosed year, the frames no filing reported directly
    pub coverage_gaps: BTreeMap<i32, BTreeSet<Frame>>,
    pub estimates: Vec<GapFill>,
    pub reconciliation: ReconciliationReport,
}

impl EntityRun {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} rows, {} duplicate frames, {} quarters estimated, {} years adjusted{}",
            self.symbol,
            self.records.len(),
            self.duplicates.len(),
            self.estimates.len(),
            self.reconciliation.adjusted_years().len(),
            self.coverage_summary()
        )
    }

    /// ", gaps: 2020 [CY2020Q2, CY2020Q4]; ..." or empty when fully covered
    fn coverage_summary(&self) -> String {
        if self.coverage_gaps.is_empty() {
            return String::new();
        }
        let years: Vec<String> = self
            .coverage_gaps
            .iter()
            .map(|(year, frames)| {
                let labels: Vec<String> = frames.iter().map(|f| f.to_string()).collect();
                format!("{} [{}]", year, labels.join(", "))
            })
            .collect();
        format!(", gaps: {}", years.join("; "))
    }
}

// ============================================================================
// BATCH REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub symbol: String,
    pub reason: String,
    /// The entity loaded but disclosed nothing under any alias tag
    pub missing_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Successful runs, in input order
    pub runs: Vec<EntityRun>,
    pub skipped: Vec<SkippedEntity>,
}

impl BatchReport {
    /// Record entities dropped before they reached the engine (e.g. an
    /// unreadable facts file)
    pub fn add_skipped(&mut self, skipped: impl IntoIterator<Item = SkippedEntity>) {
        self.skipped.extend(skipped);
    }

    /// All output rows of the batch, entity by entity
    pub fn records(&self) -> Vec<FinancialRecord> {
        self.runs.iter().flat_map(|r| r.records.iter().cloned()).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch {}: {} entities reconciled, {} skipped, {} rows",
            self.run_id,
            self.runs.len(),
            self.skipped.len(),
            self.runs.iter().map(|r| r.records.len()).sum::<usize>()
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    config: EngineConfig,
}

impl ReconciliationEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(ReconciliationEngine { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full pipeline for one entity.
    ///
    /// Fails with `MissingTagData` when no fact carries a configured alias tag.
    pub fn run(&self, entity: &EntityFacts) -> Result<EntityRun> {
        let config = &self.config;

        let facts = entity.facts_for_tags(&config.tag_aliases);
        if facts.is_empty() {
            return Err(EngineError::MissingTagData {
                symbol: entity.symbol.clone(),
                alias_count: config.tag_aliases.len(),
            });
        }

        // 1. Normalize aliases into one value per frame
        let coverage_gaps = missing_frames(&facts);
        let normalized = FactNormalizer::new(config.start_year, config.end_year).normalize(&facts);

        // 2. Estimate missing quarters
        let mut series = CanonicalSeries::from_normalized(
            &entity.symbol,
            config.start_year,
            config.end_year,
            &normalized,
        );
        let estimates = GapEstimator::new(config).fill_gaps(&mut series, &facts);

        // 3. Reconcile quarters with annual totals
        let reconciliation = AnnualReconciler::new(config.tolerance).reconcile(&mut series);
        if !series.is_complete() {
            warn!(symbol = %entity.symbol, "Series still has frames without a value");
        }
        let residual: f64 = reconciliation
            .years
            .iter()
            .map(|y| y.result.difference().abs())
            .sum();

        // 4. Growth metrics
        let mut records = series.to_records(&entity.sector, &config.report_type);
        PeriodMetricsCalculator::apply(&mut records);

        info!(
            symbol = %entity.symbol,
            facts = facts.len(),
            reported = normalized.values.len(),
            estimated = estimates.len(),
            gap_years = coverage_gaps.len(),
            adjusted = reconciliation.adjusted_years().len(),
            residual,
            "Reconciled entity"
        );

        Ok(EntityRun {
            symbol: entity.symbol.clone(),
            sector: entity.sector.clone(),
            series,
            records,
            duplicates: normalized.duplicates,
            coverage_gaps,
            estimates,
            reconciliation,
        })
    }

    /// Run many entities in parallel. Skipped entities are logged and
    /// reported; they never affect the other entities' results.
    pub fn run_batch(&self, entities: &[EntityFacts]) -> BatchReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let outcomes: Vec<(String, Result<EntityRun>)> = entities
            .par_iter()
            .map(|entity| (entity.symbol.clone(), self.run(entity)))
            .collect();

        let mut runs = Vec::new();
        let mut skipped = Vec::new();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(run) => runs.push(run),
                Err(e) => {
                    if e.is_skip() {
                        warn!(symbol = %symbol, error = %e, "Skipping entity");
                    } else {
                        error!(symbol = %symbol, error = %e, "Entity run failed");
                    }
                    skipped.push(SkippedEntity {
                        symbol,
                        reason: e.to_string(),
                        missing_data: e.is_skip(),
                    });
                }
            }
        }

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            runs,
            skipped,
        };
        info!(fingerprint = %record_set_fingerprint(&report.records()), "{}", report.summary());
        report
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::EstimationStrategy;
    use crate::facts::RawFact;
    use crate::period::{Frame, Period};
    use crate::series::ValueSource;

    fn framed(tag: &str, frame: &str, value: f64) -> RawFact {
        RawFact::new("ACME", tag, value).with_frame(frame)
    }

    fn engine(start: i32, end: i32) -> ReconciliationEngine {
        ReconciliationEngine::new(EngineConfig::new(start, end)).unwrap()
    }

    fn amount(run: &EntityRun, year: i32, period: Period) -> f64 {
        run.records
            .iter()
            .find(|r| r.year == year && r.period == period)
            .map(|r| r.amount)
            .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn assert_quarters_sum_to_annual(run: &EntityRun) {
        let years: Vec<i32> = run.records.iter().map(|r| r.year).collect();
        for year in years {
            let quarters: f64 = Period::QUARTERS.iter().map(|q| amount(run, year, *q)).sum();
            assert_close(quarters, amount(run, year, Period::FY));
        }
    }

    #[test]
    fn test_only_annual_reported_splits_evenly() {
        let entity = EntityFacts::new("ACME", "Tech", vec![framed("Revenues", "CY2021", 1000.0)]);
        let run = engine(2021, 2022).run(&entity).unwrap();

        for q in Period::QUARTERS {
            assert_close(amount(&run, 2021, q), 250.0);
        }
        assert_close(amount(&run, 2021, Period::FY), 1000.0);
        assert_eq!(run.records.len(), 5);
    }

    #[test]
    fn test_missing_q4_takes_annual_residual() {
        let entity = EntityFacts::new(
            "ACME",
            "Tech",
            vec![
                framed("Revenues", "CY2021Q1", 100.0),
                framed("Revenues", "CY2021Q2", 120.0),
                framed("Revenues", "CY2021Q3", 130.0),
                framed("Revenues", "CY2021", 500.0),
            ],
        );
        let run = engine(2021, 2022).run(&entity).unwrap();

        assert_close(amount(&run, 2021, Period::Q4), 150.0);
        assert_close(amount(&run, 2021, Period::FY), 500.0);
        assert_quarters_sum_to_annual(&run);
    }

    #[test]
    fn test_prior_year_shape_scales_to_annual() {
        let entity = EntityFacts::new(
            "ACME",
            "Tech",
            vec![
                framed("Revenues", "CY2020Q1", 100.0),
                framed("Revenues", "CY2020Q2", 110.0),
                framed("Revenues", "CY2020Q3", 90.0),
                framed("Revenues", "CY2020Q4", 120.0),
                framed("Revenues", "CY2021", 420.0),
            ],
        );
        let run = engine(2020, 2022).run(&entity).unwrap();

        assert_close(amount(&run, 2021, Period::Q1), 100.0);
        assert_close(amount(&run, 2021, Period::Q2), 110.0);
        assert_close(amount(&run, 2021, Period::Q3), 90.0);
        assert_close(amount(&run, 2021, Period::Q4), 120.0);
        assert_close(amount(&run, 2020, Period::FY), 420.0);
        assert_quarters_sum_to_annual(&run);

        assert_eq!(
            run.series.get(&Frame::quarter(2021, Period::Q1)).unwrap().source,
            ValueSource::Estimated(EstimationStrategy::HistoricalProportion)
        );
    }

    #[test]
    fn test_alias_collision_keeps_max() {
        let entity = EntityFacts::new(
            "ACME",
            "Tech",
            vec![
                framed("Revenues", "CY2021Q2", 95.0),
                framed("SalesRevenueNet", "CY2021Q2", 100.0),
            ],
        );
        let run = engine(2021, 2022).run(&entity).unwrap();

        assert_close(amount(&run, 2021, Period::Q2), 100.0);
        assert_eq!(run.duplicates.len(), 1);
    }

    #[test]
    fn test_missing_tag_data_is_error() {
        let entity = EntityFacts::new(
            "ACME",
            "Tech",
            vec![framed("NetIncomeLoss", "CY2021", 10.0)],
        );
        let err = engine(2021, 2022).run(&entity).unwrap_err();
        assert!(matches!(err, EngineError::MissingTagData { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ReconciliationEngine::new(EngineConfig::new(2022, 2020)).is_err());
    }

    #[test]
    fn test_one_row_per_year_and_period() {
        let entity = EntityFacts::new(
            "ACME",
            "Tech",
            vec![
                framed("Revenues", "CY2019Q3", 80.0),
                framed("Revenues", "CY2021", 400.0),
                framed("Revenues", "CY2022Q1", 120.0),
            ],
        );
        let run = engine(2019, 2023).run(&entity).unwrap();

        assert_eq!(run.records.len(), 4 * 5);
        for year in 2019..2023 {
            for period in Period::ALL {
                let count = run
                    .records
                    .iter()
                    .filter(|r| r.year == year && r.period == period)
                    .count();
                assert_eq!(count, 1, "{} {}", year, period);
            }
        }
        assert!(run.series.is_complete());
        assert_quarters_sum_to_annual(&run);
    }

    #[test]
    fn test_metric_nulls() {
        let entity = EntityFacts::new(
            "ACME",
            "Tech",
            vec![
                framed("Revenues", "CY2020", 400.0),
                framed("Revenues", "CY2021", 480.0),
            ],
        );
        let run = engine(2020, 2022).run(&entity).unwrap();

        let quarterly: Vec<&FinancialRecord> =
            run.records.iter().filter(|r| r.period.is_quarter()).collect();
        assert_eq!(quarterly[0].qoq, None);
        assert!(quarterly[1..].iter().all(|r| r.qoq.is_some()));
        assert!(run
            .records
            .iter()
            .filter(|r| r.period == Period::FY)
            .all(|r| r.qoq.is_none()));

        assert!(run.records.iter().filter(|r| r.year == 2020).all(|r| r.yoy.is_none()));
        let fy_2021 = run
            .records
            .iter()
            .find(|r| r.year == 2021 && r.period == Period::FY)
            .unwrap();
        assert_close(fy_2021.yoy.unwrap(), 20.0);
    }

    #[test]
    fn test_metrics_defined_after_zero_years() {
        let entity = EntityFacts::new("ACME", "Tech", vec![framed("Revenues", "CY2022", 800.0)]);
        let run = engine(2019, 2023).run(&entity).unwrap();

        assert_close(amount(&run, 2019, Period::FY), 0.0);
        assert_close(amount(&run, 2020, Period::FY), 0.0);
        assert_close(amount(&run, 2021, Period::FY), 800.0);

        let quarterly: Vec<&FinancialRecord> =
            run.records.iter().filter(|r| r.period.is_quarter()).collect();
        assert_eq!(quarterly.iter().filter(|r| r.qoq.is_none()).count(), 1);
        assert_eq!(quarterly[0].qoq, None);

        assert!(run.records.iter().filter(|r| r.year == 2019).all(|r| r.yoy.is_none()));
        assert!(run.records.iter().filter(|r| r.year > 2019).all(|r| r.yoy.is_some()));

        let fy = |year: i32| {
            run.records
                .iter()
                .find(|r| r.year == year && r.period == Period::FY)
                .unwrap()
        };
        assert_eq!(fy(2020).yoy, Some(0.0));
        assert_eq!(fy(2021).yoy, Some(f64::INFINITY));
        assert_close(fy(2022).yoy.unwrap(), 0.0);
    }

    #[test]
    fn test_coverage_gaps_reported() {
        let entity = EntityFacts::new(
            "ACME",
            "Tech",
            vec![
                framed("Revenues", "CY2021Q1", 100.0),
                framed("Revenues", "CY2021Q2", 110.0),
                framed("Revenues", "CY2021", 420.0),
            ],
        );
        let run = engine(2021, 2022).run(&entity).unwrap();

        assert_eq!(run.coverage_gaps.len(), 1);
        let missing: Vec<Frame> = run.coverage_gaps[&2021].iter().copied().collect();
        assert_eq!(
            missing,
            vec![Frame::quarter(2021, Period::Q3), Frame::quarter(2021, Period::Q4)]
        );
        assert!(run.summary().contains("gaps: 2021 [CY2021Q3, CY2021Q4]"));
    }

    #[test]
    fn test_rerun_is_identical() {
        let entity = EntityFacts::new(
            "ACME",
            "Tech",
            vec![
                framed("Revenues", "CY2020Q1", 100.0),
                framed("Revenues", "CY2020Q3", 90.0),
                framed("OperatingRevenues", "CY2020Q3", 91.0),
                framed("Revenues", "CY2021Q3", 120.0),
                framed("Revenues", "CY2021", 700.0),
                RawFact::new("ACME", "Revenues", 300.0)
                    .with_fp("Q3")
                    .with_window("2021-01-01", "2021-09-30"),
            ],
        );
        let engine = engine(2020, 2023);

        let first = engine.run(&entity).unwrap();
        let second = engine.run(&entity).unwrap();

        // Nine-month Q3 filing minus the reported Q3
        assert_eq!(
            first.series.get(&Frame::quarter(2021, Period::Q2)).unwrap().source,
            ValueSource::Estimated(EstimationStrategy::NextQuarterSubtraction)
        );
        assert_close(amount(&first, 2021, Period::Q2), 180.0);
        assert_quarters_sum_to_annual(&first);

        assert_eq!(first.records, second.records);
        assert_eq!(
            record_set_fingerprint(&first.records),
            record_set_fingerprint(&second.records)
        );
    }

    #[test]
    fn test_batch_skips_without_aborting() {
        let entities = vec![
            EntityFacts::new("ACME", "Tech", vec![framed("Revenues", "CY2021", 1000.0)]),
            EntityFacts::new("NONE", "Energy", vec![]),
            EntityFacts::new("INIT", "Retail", vec![framed("TotalRevenue", "CY2021Q1", 50.0)]),
        ];

        let report = engine(2021, 2022).run_batch(&entities);

        assert_eq!(report.runs.len(), 2);
        assert_eq!(report.runs[0].symbol, "ACME");
        assert_eq!(report.runs[1].symbol, "INIT");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].symbol, "NONE");
        assert!(report.skipped[0].reason.contains("Missing tag data"));
        assert!(report.skipped[0].missing_data);
        assert_eq!(report.records().len(), 10);
        assert!(report.summary().contains("2 entities reconciled"));
    }

    #[test]
    fn test_load_failures_count_as_skipped() {
        let entities = vec![EntityFacts::new(
            "ACME",
            "Tech",
            vec![framed("Revenues", "CY2021", 1000.0)],
        )];
        let mut report = engine(2021, 2022).run_batch(&entities);

        report.add_skipped(vec![SkippedEntity {
            symbol: "GONE".to_string(),
            reason: "Failed to read companyfacts file".to_string(),
            missing_data: false,
        }]);

        assert_eq!(report.skipped.len(), 1);
        assert!(!report.skipped[0].missing_data);
        assert!(report.summary().contains("1 entities reconciled, 1 skipped"));
    }
}
