// 💾 CSV Export - Dump output rows for inspection
// Empty qoq/yoy cells mean "no value", never zero.

use crate::records::FinancialRecord;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write rows as CSV with a header line
pub fn write_records<W: Write>(writer: W, records: &[FinancialRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)
            .context("Failed to serialize financial record")?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Write rows to a CSV file, replacing it if present
pub fn export_csv(path: &Path, records: &[FinancialRecord]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    write_records(file, records)?;
    Ok(records.len())
}

/// Read rows back from a CSV file written by `export_csv`
pub fn load_csv(path: &Path) -> Result<Vec<FinancialRecord>> {
    let mut rdr = csv::Reader::from_path(path).context("Failed to open CSV file")?;

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: FinancialRecord = result.context("Failed to deserialize financial record")?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;

    fn rows() -> Vec<FinancialRecord> {
        vec![
            FinancialRecord {
                symbol: "ACME".to_string(),
                sector: "Tech".to_string(),
                year: 2021,
                report_type: "Revenue".to_string(),
                period: Period::Q1,
                amount: 250.0,
                qoq: None,
                yoy: Some(12.5),
            },
            FinancialRecord {
                symbol: "ACME".to_string(),
                sector: "Tech".to_string(),
                year: 2021,
                report_type: "Revenue".to_string(),
                period: Period::FY,
                amount: 1000.0,
                qoq: None,
                yoy: None,
            },
        ]
    }

    #[test]
    fn test_csv_header_and_empty_cells() {
        let mut buf = Vec::new();
        write_records(&mut buf, &rows()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("symbol,sector,year,report_type,period,amount,qoq,yoy")
        );
        assert_eq!(lines.next(), Some("ACME,Tech,2021,Revenue,Q1,250.0,,12.5"));
        assert_eq!(lines.next(), Some("ACME,Tech,2021,Revenue,FY,1000.0,,"));
    }

    #[test]
    fn test_export_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ACME.csv");

        let written = export_csv(&path, &rows()).unwrap();
        assert_eq!(written, 2);

        let loaded = load_csv(&path).unwrap();
        assert_eq!(loaded, rows());
    }
}
