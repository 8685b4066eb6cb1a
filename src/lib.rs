// Fact Reconciliation - Core Library
// Turns raw revenue disclosures into complete quarterly/annual series

pub mod error;
pub mod config;
pub mod period;
pub mod facts;
pub mod companyfacts;
pub mod normalizer;     // Stage 1: alias merge
pub mod series;
pub mod estimator;      // Stage 2: gap filling
pub mod reconciliation; // Stage 3: annual consistency
pub mod metrics;        // Stage 4: YoY / QoQ
pub mod records;
pub mod export;
pub mod engine;

// Re-export commonly used types
pub use error::{EngineError, Result};
pub use config::{EngineConfig, DEFAULT_REVENUE_TAGS};
pub use period::{Frame, Period};
pub use facts::{EntityFacts, RawFact};
pub use companyfacts::{load_entities, load_entity_facts, CompanyFacts, EntityEntry};
pub use normalizer::{missing_frames, DuplicateFrame, FactNormalizer, NormalizedFacts};
pub use series::{CanonicalSeries, FrameValue, ValueSource};
pub use estimator::{EstimationStrategy, GapEstimator, GapFill};
pub use reconciliation::{
    AnnualReconciler, ReconciliationReport, ReconciliationResult, YearReconciliation,
};
pub use metrics::{percent_change, PeriodMetricsCalculator};
pub use records::{record_set_fingerprint, FinancialRecord};
pub use export::{export_csv, load_csv};
pub use engine::{BatchReport, EntityRun, ReconciliationEngine, SkippedEntity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
