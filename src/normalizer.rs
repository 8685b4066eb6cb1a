// 🔍 Fact Normalizer - Merge alias tags into one value per frame
// Collisions across tags resolve to the maximum reported value.

use crate::facts::RawFact;
use crate::period::{Frame, Period};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

// ============================================================================
// DUPLICATE FRAME
// ============================================================================

/// A frame reported more than once, and which value survived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateFrame {
    pub frame: Frame,

    /// Tags of every colliding record, in input order
    pub tags: Vec<String>,

    /// Values of every colliding record, aligned with `tags`
    pub values: Vec<f64>,

    /// The value kept (the maximum)
    pub kept: f64,
}

impl DuplicateFrame {
    /// Whether the colliding records actually disagree
    pub fn is_conflicting(&self) -> bool {
        self.values.iter().any(|v| *v != self.kept)
    }
}

// ============================================================================
// NORMALIZED FACTS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NormalizedFacts {
    /// One value per in-range frame that was directly reported
    pub values: BTreeMap<Frame, f64>,

    /// Frames that collided across records
    pub duplicates: Vec<DuplicateFrame>,
}

// ============================================================================
// FACT NORMALIZER
// ============================================================================

pub struct FactNormalizer {
    start_year: i32,
    end_year: i32,
}

impl FactNormalizer {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        FactNormalizer { start_year, end_year }
    }

    /// Build the frame → value map for `[start_year, end_year)`.
    ///
    /// Records without a frame, with a frame outside the vocabulary, or with
    /// a zero value are left out of the map (they stay in the raw set).
    pub fn normalize(&self, facts: &[RawFact]) -> NormalizedFacts {
        let mut values: BTreeMap<Frame, f64> = BTreeMap::new();
        let mut seen: BTreeMap<Frame, Vec<(String, f64)>> = BTreeMap::new();

        for fact in facts {
            if fact.value == 0.0 {
                continue;
            }
            let frame = match fact.parsed_frame() {
                Some(f) if f.in_range(self.start_year, self.end_year) => f,
                _ => continue,
            };

            seen.entry(frame)
                .or_default()
                .push((fact.tag.clone(), fact.value));

            values
                .entry(frame)
                .and_modify(|kept| {
                    if fact.value > *kept {
                        *kept = fact.value;
                    }
                })
                .or_insert(fact.value);
        }

        let duplicates: Vec<DuplicateFrame> = seen
            .into_iter()
            .filter(|(_, records)| records.len() > 1)
            .map(|(frame, records)| {
                let (tags, vals): (Vec<String>, Vec<f64>) = records.into_iter().unzip();
                DuplicateFrame {
                    frame,
                    tags,
                    values: vals,
                    kept: values.get(&frame).copied().unwrap_or_default(),
                }
            })
            .collect();

        for dup in duplicates.iter().filter(|d| d.is_conflicting()) {
            debug!(
                frame = %dup.frame,
                tags = ?dup.tags,
                kept = dup.kept,
                "Resolved conflicting duplicate frame"
            );
        }

        NormalizedFacts { values, duplicates }
    }
}

// ============================================================================
// COVERAGE
// ============================================================================

/// Per year with any frame-tagged record, the expected frames nobody reported.
///
/// Looks at every parsable frame regardless of year range; years with
/// complete coverage are omitted.
pub fn missing_frames(facts: &[RawFact]) -> BTreeMap<i32, BTreeSet<Frame>> {
    let mut present: BTreeMap<i32, BTreeSet<Frame>> = BTreeMap::new();
    for frame in facts.iter().filter_map(|f| f.parsed_frame()) {
        present.entry(frame.year).or_default().insert(frame);
    }

    present
        .into_iter()
        .filter_map(|(year, frames)| {
            let missing: BTreeSet<Frame> = Period::ALL
                .iter()
                .map(|p| Frame::new(year, *p))
                .filter(|f| !frames.contains(f))
                .collect();
            if missing.is_empty() {
                None
            } else {
                Some((year, missing))
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
