// 📄 Raw Facts - One disclosed figure as it arrives from the disclosures feed
// Field names follow the companyfacts JSON (val, fp, start, end, frame).

use crate::error::{EngineError, Result};
use crate::period::{Frame, Period};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single disclosed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFact {
    /// Stock symbol of the reporting entity
    #[serde(default)]
    pub entity_id: String,

    /// Taxonomy alias the value was reported under (e.g. "Revenues")
    #[serde(default)]
    pub tag: String,

    /// Canonical period label; absent for non-frame-tagged records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,

    /// Reporting window start (absent for instant facts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// Reporting window end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Fiscal period code: Q1..Q4 or FY
    #[serde(rename = "fp", default, skip_serializing_if = "Option::is_none")]
    pub fiscal_period_code: Option<String>,

    #[serde(rename = "val")]
    pub value: f64,

    // ------------------------------------------------------------------------
    // Filing bookkeeping, carried through untouched
    // ------------------------------------------------------------------------
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filed: Option<String>,
}

impl RawFact {
    /// Minimal constructor used by loaders and tests
    pub fn new(entity_id: &str, tag: &str, value: f64) -> Self {
        RawFact {
            entity_id: entity_id.to_string(),
            tag: tag.to_string(),
            frame: None,
            start: None,
            end: None,
            fiscal_period_code: None,
            value,
            accn: None,
            fy: None,
            form: None,
            filed: None,
        }
    }

    pub fn with_frame(mut self, frame: &str) -> Self {
        self.frame = Some(frame.to_string());
        self
    }

    pub fn with_window(mut self, start: &str, end: &str) -> Self {
        self.start = Some(start.to_string());
        self.end = Some(end.to_string());
        self
    }

    pub fn with_fp(mut self, fp: &str) -> Self {
        self.fiscal_period_code = Some(fp.to_string());
        self
    }

    /// Parsed frame, None when absent or outside the CY vocabulary
    pub fn parsed_frame(&self) -> Option<Frame> {
        self.frame.as_deref().and_then(|f| f.parse().ok())
    }

    /// Parsed fiscal period code
    pub fn fiscal_period(&self) -> Result<Period> {
        self.fiscal_period_code
            .as_deref()
            .ok_or_else(|| self.malformed("missing fp"))?
            .parse()
            .map_err(|_| self.malformed("unrecognised fp"))
    }

    /// Reporting window as dates; both ends required
    pub fn reporting_window(&self) -> Result<(NaiveDate, NaiveDate)> {
        let start = self.start.as_deref().ok_or_else(|| self.malformed("missing start"))?;
        let end = self.end.as_deref().ok_or_else(|| self.malformed("missing end"))?;

        let start = NaiveDate::parse_from_str(start, DATE_FORMAT)
            .map_err(|e| self.malformed(&format!("bad start date: {}", e)))?;
        let end = NaiveDate::parse_from_str(end, DATE_FORMAT)
            .map_err(|e| self.malformed(&format!("bad end date: {}", e)))?;

        Ok((start, end))
    }

    fn malformed(&self, reason: &str) -> EngineError {
        EngineError::MalformedRecord {
            tag: self.tag.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Calendar-month distance, ignoring days: 2021-01-01 → 2021-06-30 is 5
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32
}

// ============================================================================
// ENTITY FACTS
// ============================================================================

/// Everything the engine needs for one entity run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityFacts {
    pub symbol: String,
    pub sector: String,
    pub facts: Vec<RawFact>,
}

impl EntityFacts {
    pub fn new(symbol: &str, sector: &str, facts: Vec<RawFact>) -> Self {
        EntityFacts {
            symbol: symbol.to_string(),
            sector: sector.to_string(),
            facts,
        }
    }

    /// Facts reported under one of the given alias tags, in input order
    pub fn facts_for_tags(&self, tags: &[String]) -> Vec<RawFact> {
        self.facts
            .iter()
            .filter(|f| tags.iter().any(|t| t == &f.tag))
            .cloned()
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
