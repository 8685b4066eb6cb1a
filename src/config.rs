// ⚙️ Engine Configuration - Defaults as data
// Alias tags, year range and tolerances are passed in explicitly, never global.

use crate::error::{EngineError, Result as EngineResult};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Revenue-like us-gaap tags that report the same conceptual figure
pub const DEFAULT_REVENUE_TAGS: [&str; 16] = [
    "Revenues",
    "SalesRevenueNet",
    "SalesRevenueGoodsNet",
    "SalesRevenueServicesNet",
    "RevenuesNetOfInterestExpense",
    "OperatingRevenues",
    "RevenueNotFromContractWithCustomer",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "TotalRevenue",
    "RevenueMineralSales",
    "OilAndGasRevenue",
    "RegulatedAndUnregulatedOperatingRevenue",
    "FranchiseRevenue",
    "InterestAndDividendRevenueOperating",
    "RealEstateRevenueNet",
    "AdvertisingRevenue",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Alias tags merged into one series (order decides which record wins
    /// when a strategy takes the first match)
    pub tag_aliases: Vec<String>,

    /// Taxonomy namespace inside a companyfacts document
    pub taxonomy: String,

    /// Unit key inside a companyfacts concept
    pub unit: String,

    /// First year of the output (inclusive)
    pub start_year: i32,

    /// End of the output (exclusive)
    pub end_year: i32,

    /// `report_type` written on every output row
    pub report_type: String,

    /// Absolute tolerance when comparing quarter sums to annual totals
    pub tolerance: f64,

    /// A filing window strictly longer than this many months is year-to-date
    pub cumulative_window_months: i32,

    /// How many years away neighbor-year extrapolation may look
    pub neighbor_year_reach: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tag_aliases: DEFAULT_REVENUE_TAGS.iter().map(|t| t.to_string()).collect(),
            taxonomy: "us-gaap".to_string(),
            unit: "USD".to_string(),
            start_year: 2009,
            end_year: 2024,
            report_type: "Revenue".to_string(),
            tolerance: 0.01,
            cumulative_window_months: 5,
            neighbor_year_reach: 1,
        }
    }
}

impl EngineConfig {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        EngineConfig {
            start_year,
            end_year,
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file; missing keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: EngineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tag_aliases = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.start_year >= self.end_year {
            return Err(EngineError::InvalidYearRange {
                start_year: self.start_year,
                end_year: self.end_year,
            });
        }
        Ok(())
    }

    pub fn years(&self) -> std::ops::Range<i32> {
        self.start_year..self.end_year
    }
}

// ============================================================================
// TESTS
// ============================================================================
