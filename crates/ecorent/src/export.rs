//! Record export and the dashboard summary.

use std::io::Write;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::ledger::Ledger;
use crate::model::{Contract, RentalModule};
use crate::pricing;

/// Every record, deleted ones included, newest first.
fn newest_first(ledger: &Ledger) -> impl Iterator<Item = &Contract> {
    ledger.contracts().iter().rev()
}

/// Write every record as a pretty JSON array.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn export_json<W: Write>(ledger: &Ledger, mut writer: W) -> Result<()> {
    let records: Vec<&Contract> = newest_first(ledger).collect();
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writeln!(writer)?;
    writer.flush()?;
    debug!("Exported {} records as JSON", records.len());
    Ok(())
}

/// One CSV line.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    number: &'a str,
    id: String,
    module: RentalModule,
    status: &'static str,
    created: &'a str,
    updated: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone: &'a str,
    country: &'a str,
    dni: &'a str,
    category: &'a str,
    product: &'a str,
    start: String,
    end: String,
    duration: f64,
    quantity: u32,
    price_unit: String,
    total: String,
    synced: bool,
    notes: &'a str,
}

impl<'a> From<&'a Contract> for CsvRow<'a> {
    fn from(c: &'a Contract) -> Self {
        Self {
            number: &c.contract_number,
            id: c.id.to_string(),
            module: c.module,
            status: if c.is_deleted() { "deleted" } else { "active" },
            created: &c.created_full,
            updated: c.updated_at.as_deref().unwrap_or_default(),
            first_name: &c.client.first_name,
            last_name: &c.client.last_name,
            email: &c.client.email,
            phone: &c.client.phone,
            country: c.client.country.as_deref().unwrap_or_default(),
            dni: c.client.dni.as_deref().unwrap_or_default(),
            category: &c.category,
            product: &c.product,
            start: c.pickup().format("%Y-%m-%d %H:%M").to_string(),
            end: c.return_at().format("%Y-%m-%d %H:%M").to_string(),
            duration: c.duration,
            quantity: c.quantity,
            price_unit: pricing::format_amount(c.price_unit),
            total: pricing::format_amount(c.total),
            synced: c.synced,
            notes: &c.notes,
        }
    }
}

/// Write every record as CSV with a header line.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn export_csv<W: Write>(ledger: &Ledger, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut count = 0;
    for contract in newest_first(ledger) {
        csv.serialize(CsvRow::from(contract))?;
        count += 1;
    }
    csv.flush()?;
    debug!("Exported {} records as CSV", count);
    Ok(())
}

/// Active contract count of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleCount {
    /// The module.
    pub module: RentalModule,
    /// Active contracts in it.
    pub active: usize,
}

/// Dashboard figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Sum of active totals.
    pub gross_total: f64,
    /// Active contracts.
    pub active: usize,
    /// Soft-deleted contracts.
    pub deleted: usize,
    /// Active contracts per module.
    pub by_module: Vec<ModuleCount>,
    /// Records not yet pushed.
    pub pending_sync: usize,
    /// Whether an endpoint is set.
    pub endpoint_configured: bool,
    /// Last allocated contract number.
    pub last_id: u64,
}

impl Summary {
    /// Compute the figures from the current state.
    #[must_use]
    pub fn from_ledger(ledger: &Ledger) -> Self {
        let active = ledger.active().count();
        let by_module = RentalModule::ALL
            .iter()
            .map(|&module| ModuleCount {
                module,
                active: ledger.active().filter(|c| c.module == module).count(),
            })
            .collect();

        Self {
            gross_total: ledger.gross_total(),
            active,
            deleted: ledger.contracts().len() - active,
            by_module,
            pending_sync: ledger.pending().len(),
            endpoint_configured: ledger.settings().endpoint().is_some(),
            last_id: ledger.last_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{ContractForm, DurationMode, FormContext};
    use chrono::{Local, NaiveTime};

    fn add(ledger: &mut Ledger, module: RentalModule, category: &str, product: &str) -> uuid::Uuid {
        let form = ContractForm {
            first_name: "Ana".to_string(),
            last_name: "Pons".to_string(),
            email: "ana@example.com".to_string(),
            phone: "600111222".to_string(),
            dni: "X1234567L".to_string(),
            category: category.to_string(),
            product: product.to_string(),
            start_date: "2024-06-01".to_string(),
            start_time: "09:00".to_string(),
            ..ContractForm::default()
        };
        let draft = form
            .parse(&FormContext {
                mode: DurationMode::Manual,
                default_return_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                catalog: ledger.catalog(),
            })
            .unwrap();
        ledger.create(module, draft, Local::now()).id
    }

    fn sample() -> Ledger {
        let mut ledger = Ledger::default();
        add(&mut ledger, RentalModule::Bike, "BIKE_NORMAL", "City Bike");
        let deleted = add(&mut ledger, RentalModule::Bike, "BIKE_NORMAL", "City Bike");
        add(&mut ledger, RentalModule::Vehicle, "AUTOS", "Toyota Aygo BASIC");
        ledger.soft_delete(deleted, Local::now());
        ledger
    }

    #[test]
    fn test_export_json_includes_deleted_newest_first() {
        let mut out = Vec::new();
        export_json(&sample(), &mut out).unwrap();

        let records: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
        let numbers: Vec<_> = records
            .iter()
            .map(|r| r["contract_number"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(numbers, ["000003", "000002", "000001"]);
        assert_eq!(records[1]["status"], "deleted");
        assert_eq!(records[0]["first_name"], "Ana");
    }

    /// Accepts writes but fails on flush, like a full disk behind a buffer.
    struct FlushFails(Vec<u8>);

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_export_json_reports_flush_failure() {
        let err = export_json(&sample(), FlushFails(Vec::new())).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_export_csv() {
        let mut out = Vec::new();
        export_csv(&sample(), &mut out).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "number");
        assert!(headers.iter().any(|h| h == "status"));

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "000003");
        assert_eq!(&rows[1][3], "deleted");
        assert_eq!(&rows[2][3], "active");
    }

    #[test]
    fn test_export_empty_ledger() {
        let mut out = Vec::new();
        export_json(&Ledger::default(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");

        let mut out = Vec::new();
        export_csv(&Ledger::default(), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_summary() {
        let ledger = sample();
        let summary = Summary::from_ledger(&ledger);

        assert_eq!(summary.active, 2);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.pending_sync, 3);
        assert!(summary.endpoint_configured);
        assert_eq!(summary.last_id, 3);
        assert_eq!(
            summary.by_module,
            vec![
                ModuleCount { module: RentalModule::Vehicle, active: 1 },
                ModuleCount { module: RentalModule::Bike, active: 1 },
                ModuleCount { module: RentalModule::Tour, active: 0 },
            ]
        );
        assert_eq!(summary.gross_total, ledger.gross_total());
    }
}
