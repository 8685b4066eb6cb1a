// 📊 Period Metrics - YoY and QoQ growth
//
// YoY: same period label, exactly one year earlier (FY vs FY, Q2 vs Q2).
// QoQ: quarterly rows only, chronological, crossing year boundaries
//      (Q1 2022 is compared with Q4 2021).
//
// The two metrics come from two independent orderings of the same rows.
// Null only marks a row with nothing to compare against; a zero base still
// yields a value.

use crate::period::Period;
use crate::records::FinancialRecord;
use std::collections::HashMap;

/// Percent change from `previous` to `current`.
/// From a zero base: 0 when nothing changed, otherwise +/- infinity.
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return if current == 0.0 {
            0.0
        } else {
            f64::INFINITY.copysign(current)
        };
    }
    (current - previous) / previous * 100.0
}

type GroupKey<'a> = (&'a str, &'a str, &'a str);

fn group_key(r: &FinancialRecord) -> GroupKey<'_> {
    (r.symbol.as_str(), r.sector.as_str(), r.report_type.as_str())
}

pub struct PeriodMetricsCalculator;

impl PeriodMetricsCalculator {
    /// Fill `yoy` and `qoq` on every row. Rows may span several entities;
    /// grouping is by (symbol, sector, report_type). Row order is preserved.
    pub fn apply(records: &mut [FinancialRecord]) {
        let yoy = Self::year_over_year(records);
        let qoq = Self::quarter_over_quarter(records);

        for (i, record) in records.iter_mut().enumerate() {
            record.yoy = yoy[i];
            record.qoq = qoq[i];
        }
    }

    /// YoY per row index
    pub fn year_over_year(records: &[FinancialRecord]) -> Vec<Option<f64>> {
        let by_label: HashMap<(GroupKey<'_>, Period, i32), f64> = records
            .iter()
            .map(|r| ((group_key(r), r.period, r.year), r.amount))
            .collect();

        records
            .iter()
            .map(|r| {
                by_label
                    .get(&(group_key(r), r.period, r.year - 1))
                    .map(|prev| percent_change(*prev, r.amount))
            })
            .collect()
    }

    /// QoQ per row index; FY rows and each group's first quarter get None
    pub fn quarter_over_quarter(records: &[FinancialRecord]) -> Vec<Option<f64>> {
        let mut order: Vec<usize> = (0..records.len())
            .filter(|i| records[*i].period.is_quarter())
            .collect();
        order.sort_by(|a, b| {
            let (ra, rb) = (&records[*a], &records[*b]);
            group_key(ra)
                .cmp(&group_key(rb))
                .then(ra.year.cmp(&rb.year))
                .then(ra.period.cmp(&rb.period))
        });

        let mut qoq = vec![None; records.len()];
        for pair in order.windows(2) {
            let (prev, cur) = (&records[pair[0]], &records[pair[1]]);
            if group_key(prev) == group_key(cur) {
                qoq[pair[1]] = Some(percent_change(prev.amount, cur.amount));
            }
        }
        qoq
    }
}

// ============================================================================
// TESTS
// ============================================================================
