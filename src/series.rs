// 📈 Canonical Series - One resolved value per frame, with provenance
// Every value remembers where it came from, so a computed zero is never
// confused with a reported one.

use crate::estimator::EstimationStrategy;
use crate::normalizer::NormalizedFacts;
use crate::period::Frame;
use crate::records::FinancialRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// VALUE SOURCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ValueSource {
    /// Directly disclosed (after alias merge)
    Reported,

    /// Filled by the gap estimator
    Estimated(EstimationStrategy),

    /// Overwritten by the annual reconciler to absorb a residual
    Redistributed,

    /// Annual total computed as the sum of its quarters
    SummedQuarters,

    /// Reported annual replaced by the sum of four reported quarters
    Restated,
}

impl ValueSource {
    pub fn is_reported(&self) -> bool {
        matches!(self, ValueSource::Reported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameValue {
    pub amount: f64,
    pub source: ValueSource,
}

// ============================================================================
// CANONICAL SERIES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSeries {
    pub symbol: String,
    pub start_year: i32,
    pub end_year: i32,
    values: BTreeMap<Frame, FrameValue>,
}

impl CanonicalSeries {
    pub fn new(symbol: &str, start_year: i32, end_year: i32) -> Self {
        CanonicalSeries {
            symbol: symbol.to_string(),
            start_year,
            end_year,
            values: BTreeMap::new(),
        }
    }

    /// Seed the series with the normalized, directly reported values
    pub fn from_normalized(
        symbol: &str,
        start_year: i32,
        end_year: i32,
        normalized: &NormalizedFacts,
    ) -> Self {
        let mut series = CanonicalSeries::new(symbol, start_year, end_year);
        for (frame, amount) in &normalized.values {
            if frame.in_range(start_year, end_year) {
                series.set(*frame, *amount, ValueSource::Reported);
            }
        }
        series
    }

    pub fn get(&self, frame: &Frame) -> Option<&FrameValue> {
        self.values.get(frame)
    }

    pub fn amount(&self, frame: &Frame) -> Option<f64> {
        self.values.get(frame).map(|v| v.amount)
    }

    /// Annual total, 0 when unknown
    pub fn annual_or_zero(&self, year: i32) -> f64 {
        self.amount(&Frame::annual(year)).unwrap_or(0.0)
    }

    pub fn contains(&self, frame: &Frame) -> bool {
        self.values.contains_key(frame)
    }

    pub fn is_reported(&self, frame: &Frame) -> bool {
        self.values
            .get(frame)
            .map(|v| v.source.is_reported())
            .unwrap_or(false)
    }

    pub fn set(&mut self, frame: Frame, amount: f64, source: ValueSource) {
        self.values.insert(frame, FrameValue { amount, source });
    }

    /// Sum of a year's quarters; missing quarters count as 0
    pub fn quarter_sum(&self, year: i32) -> f64 {
        Frame::quarters_of(year)
            .iter()
            .filter_map(|f| self.amount(f))
            .sum()
    }

    /// Quarterly frames in range with no value yet, chronological
    pub fn missing_quarters(&self) -> Vec<Frame> {
        (self.start_year..self.end_year)
            .flat_map(Frame::quarters_of)
            .filter(|f| !self.contains(f))
            .collect()
    }

    /// Every frame of the range has a value
    pub fn is_complete(&self) -> bool {
        Frame::vocabulary(self.start_year, self.end_year)
            .iter()
            .all(|f| self.contains(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Frame, &FrameValue)> {
        self.values.iter()
    }

    /// Output rows in (year, Q1..Q4, FY) order, metrics not yet computed
    pub fn to_records(&self, sector: &str, report_type: &str) -> Vec<FinancialRecord> {
        self.values
            .iter()
            .filter(|(frame, _)| frame.in_range(self.start_year, self.end_year))
            .map(|(frame, value)| FinancialRecord {
                symbol: self.symbol.clone(),
                sector: sector.to_string(),
                year: frame.year,
                report_type: report_type.to_string(),
                period: frame.period,
                amount: value.amount,
                qoq: None,
                yoy: None,
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
