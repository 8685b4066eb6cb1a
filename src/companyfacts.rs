// 📂 Company Facts Loader - Pull revenue-like facts out of a companyfacts JSON
// The document is already on disk; fetching it is someone else's job.

use crate::config::EngineConfig;
use crate::engine::SkippedEntity;
use crate::facts::{EntityFacts, RawFact};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Top level of a companyfacts document: taxonomy → concept → units
#[derive(Debug, Deserialize)]
pub struct CompanyFacts {
    #[serde(rename = "entityName", default)]
    pub entity_name: Option<String>,

    #[serde(default)]
    pub facts: HashMap<String, HashMap<String, Concept>>,
}

#[derive(Debug, Deserialize)]
pub struct Concept {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub units: HashMap<String, Vec<RawFact>>,
}

impl CompanyFacts {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse companyfacts JSON")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read companyfacts file: {:?}", path.as_ref()))?;
        Self::from_json(&content)
    }

    /// Facts for every configured alias tag present, tagged with the alias
    /// and symbol. Alias order in the config decides record order.
    pub fn revenue_facts(&self, symbol: &str, config: &EngineConfig) -> Vec<RawFact> {
        let taxonomy = match self.facts.get(&config.taxonomy) {
            Some(t) => t,
            None => {
                warn!(symbol, taxonomy = %config.taxonomy, "No taxonomy section in company facts");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for tag in &config.tag_aliases {
            let concept = match taxonomy.get(tag) {
                Some(c) => c,
                None => continue,
            };
            match concept.units.get(&config.unit) {
                Some(facts) => {
                    debug!(symbol, tag = %tag, count = facts.len(), "Blending alias tag");
                    records.extend(facts.iter().cloned().map(|mut f| {
                        f.entity_id = symbol.to_string();
                        f.tag = tag.clone();
                        f
                    }));
                }
                None => warn!(symbol, tag = %tag, unit = %config.unit, "Alias tag has no facts in unit"),
            }
        }
        records
    }
}

/// Load one entity's revenue facts from a companyfacts file
pub fn load_entity_facts(
    path: &Path,
    symbol: &str,
    sector: &str,
    config: &EngineConfig,
) -> Result<EntityFacts> {
    let company = CompanyFacts::from_file(path)?;
    let facts = company.revenue_facts(symbol, config);
    Ok(EntityFacts::new(symbol, sector, facts))
}

/// One line of an entity list: `{"ticker": "...", "sector": "..."}`
#[derive(Debug, Clone, Deserialize)]
pub struct EntityEntry {
    pub ticker: String,
    pub sector: String,
}

/// Load `{facts_dir}/{ticker}.json` for every entry. A missing or broken
/// file skips that entity only.
pub fn load_entities(
    facts_dir: &Path,
    entries: &[EntityEntry],
    config: &EngineConfig,
) -> (Vec<EntityFacts>, Vec<SkippedEntity>) {
    let mut entities = Vec::new();
    let mut skipped = Vec::new();

    for entry in entries {
        let path = facts_dir.join(format!("{}.json", entry.ticker));
        match load_entity_facts(&path, &entry.ticker, &entry.sector, config) {
            Ok(entity) => entities.push(entity),
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(symbol = %entry.ticker, error = %reason, "No company facts, skipping");
                skipped.push(SkippedEntity {
                    symbol: entry.ticker.clone(),
                    reason,
                    missing_data: false,
                });
            }
        }
    }

    (entities, skipped)
}

// ============================================================================
// TESTS
// ============================================================================
