// 📅 Periods & Frames - Canonical calendar-year period labels
// "CY2021Q2" is a calendar quarter, "CY2021" a calendar year.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PERIOD
// ============================================================================

/// Period label of an output row. Ordered Q1 < Q2 < Q3 < Q4 < FY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    Q1,
    Q2,
    Q3,
    Q4,
    FY,
}

impl Period {
    pub const QUARTERS: [Period; 4] = [Period::Q1, Period::Q2, Period::Q3, Period::Q4];
    pub const ALL: [Period; 5] = [Period::Q1, Period::Q2, Period::Q3, Period::Q4, Period::FY];

    /// Quarter number 1-4, None for FY
    pub fn quarter_index(self) -> Option<u8> {
        match self {
            Period::Q1 => Some(1),
            Period::Q2 => Some(2),
            Period::Q3 => Some(3),
            Period::Q4 => Some(4),
            Period::FY => None,
        }
    }

    pub fn from_quarter_index(index: u8) -> Option<Period> {
        match index {
            1 => Some(Period::Q1),
            2 => Some(Period::Q2),
            3 => Some(Period::Q3),
            4 => Some(Period::Q4),
            _ => None,
        }
    }

    pub fn is_quarter(self) -> bool {
        self != Period::FY
    }

    /// Next quarter, wrapping Q4 -> Q1. FY has no successor.
    pub fn next_quarter(self) -> Option<Period> {
        self.quarter_index()
            .and_then(|q| Period::from_quarter_index(q % 4 + 1))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Q1 => "Q1",
            Period::Q2 => "Q2",
            Period::Q3 => "Q3",
            Period::Q4 => "Q4",
            Period::FY => "FY",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = EngineError;

    /// Parses fiscal period codes as they appear in the `fp` field
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "Q1" => Ok(Period::Q1),
            "Q2" => Ok(Period::Q2),
            "Q3" => Ok(Period::Q3),
            "Q4" => Ok(Period::Q4),
            "FY" => Ok(Period::FY),
            other => Err(EngineError::InvalidFrame(other.to_string())),
        }
    }
}

// ============================================================================
// FRAME
// ============================================================================

/// A calendar-year frame: a quarter or a full year.
/// Serialized as its label so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frame {
    pub year: i32,
    pub period: Period,
}

impl Frame {
    pub fn new(year: i32, period: Period) -> Self {
        Frame { year, period }
    }

    pub fn annual(year: i32) -> Self {
        Frame::new(year, Period::FY)
    }

    pub fn quarter(year: i32, quarter: Period) -> Self {
        Frame::new(year, quarter)
    }

    /// The four quarterly frames of a year, Q1 first
    pub fn quarters_of(year: i32) -> [Frame; 4] {
        Period::QUARTERS.map(|q| Frame::quarter(year, q))
    }

    /// Every frame of `[start_year, end_year)`: per year Q1..Q4 then FY
    pub fn vocabulary(start_year: i32, end_year: i32) -> Vec<Frame> {
        (start_year..end_year)
            .flat_map(|year| Period::ALL.map(|p| Frame::new(year, p)))
            .collect()
    }

    pub fn in_range(&self, start_year: i32, end_year: i32) -> bool {
        self.year >= start_year && self.year < end_year
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.period {
            Period::FY => write!(f, "CY{}", self.year),
            q => write!(f, "CY{}{}", self.year, q),
        }
    }
}

impl FromStr for Frame {
    type Err = EngineError;

    /// Accepts exactly `CY{yyyy}` and `CY{yyyy}Q{1-4}`.
    /// Instant frames such as `CY2021Q2I` are rejected.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EngineError::InvalidFrame(s.to_string());

        let rest = s.strip_prefix("CY").ok_or_else(invalid)?;
        if rest.len() < 4 || !rest.is_char_boundary(4) {
            return Err(invalid());
        }
        let (year_part, suffix) = rest.split_at(4);
        if !year_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year_part.parse().map_err(|_| invalid())?;

        let period = match suffix {
            "" => Period::FY,
            "Q1" => Period::Q1,
            "Q2" => Period::Q2,
            "Q3" => Period::Q3,
            "Q4" => Period::Q4,
            _ => return Err(invalid()),
        };

        Ok(Frame::new(year, period))
    }
}

impl From<Frame> for String {
    fn from(frame: Frame) -> String {
        frame.to_string()
    }
}

impl TryFrom<String> for Frame {
    type Error = EngineError;

    fn try_from(label: String) -> Result<Self> {
        label.parse()
    }
}

// ============================================================================
// TESTS
// ============================================================================
