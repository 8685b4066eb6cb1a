use crate::period::Period;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One output row per (entity, year, period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub symbol: String,
    pub sector: String,
    pub year: i32,
    pub report_type: String,
    pub period: Period,
    pub amount: f64,

    /// Quarter-over-quarter change in percent; None for FY rows and the
    /// first quarterly row
    pub qoq: Option<f64>,

    /// Year-over-year change in percent against the same period label
    pub yoy: Option<f64>,
}

impl FinancialRecord {
    /// Hash of the unique storage key (symbol, sector, year, report_type, period).
    /// Writers use it for insert-or-ignore; it does not cover the amount.
    pub fn idempotency_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}",
            self.symbol, self.sector, self.year, self.report_type, self.period
        ));
        format!("{:x}", hasher.finalize())
    }
}

/// Digest over every field of every row, in order.
/// Two runs over the same facts must produce the same fingerprint.
pub fn record_set_fingerprint(records: &[FinancialRecord]) -> String {
    let mut hasher = Sha256::new();
    for r in records {
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{:?}|{:?}|{:?}\n",
            r.symbol,
            r.sector,
            r.year,
            r.report_type,
            r.period,
            r.amount.to_bits(),
            r.qoq.map(f64::to_bits),
            r.yoy.map(f64::to_bits)
        ));
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(period: Period, amount: f64) -> FinancialRecord {
        FinancialRecord {
            symbol: "ACME".to_string(),
            sector: "Tech".to_string(),
            year: 2021,
            report_type: "Revenue".to_string(),
            period,
            amount,
            qoq: None,
            yoy: None,
        }
    }

    #[test]
    fn test_idempotency_key_ignores_amount() {
        let a = record(Period::Q1, 100.0);
        let b = record(Period::Q1, 999.0);
        let c = record(Period::Q2, 100.0);

        assert_eq!(a.idempotency_key(), b.idempotency_key());
        assert_ne!(a.idempotency_key(), c.idempotency_key());
        assert_eq!(a.idempotency_key().len(), 64);
    }

    #[test]
    fn test_fingerprint_sees_metrics() {
        let rows = vec![record(Period::Q1, 100.0), record(Period::Q2, 110.0)];
        let mut changed = rows.clone();
        changed[1].qoq = Some(10.0);

        assert_eq!(record_set_fingerprint(&rows), record_set_fingerprint(&rows.clone()));
        assert_ne!(record_set_fingerprint(&rows), record_set_fingerprint(&changed));
    }
}
