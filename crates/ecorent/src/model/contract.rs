//! Rental contract records.
//!
//! A [`Contract`] is the only entity with real invariants: its id and number
//! never change, its total is a snapshot of `price_unit × quantity × duration`
//! taken at the last save, and once deleted it stays in the store as an audit
//! entry.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::form::ContractDraft;
use crate::pricing;

/// Width of the zero-padded contract number.
pub const CONTRACT_NUMBER_WIDTH: usize = 6;

/// Date format of the human-readable creation stamp.
const FULL_STAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Separator between entries of the audit trail in `notes`.
const NOTE_SEPARATOR: &str = " | ";

/// The business line a contract belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalModule {
    /// Cars and scooters.
    Vehicle,
    /// Bikes and e-bikes.
    Bike,
    /// Excursions, paddle surf and boats.
    Tour,
}

impl RentalModule {
    /// Every module, in dashboard order.
    pub const ALL: [Self; 3] = [Self::Vehicle, Self::Bike, Self::Tour];

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Vehicle => "Vehicle",
            Self::Bike => "Bike",
            Self::Tour => "Tour",
        }
    }
}

impl std::fmt::Display for RentalModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vehicle => write!(f, "vehicle"),
            Self::Bike => write!(f, "bike"),
            Self::Tour => write!(f, "tour"),
        }
    }
}

/// Whether a record is live or has been soft-deleted.
///
/// Deleted records are kept, excluded from active listings, and still exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Live record.
    #[default]
    Active,
    /// Soft-deleted record kept for audit.
    Deleted,
}

/// Client block of a contract, also remembered to autofill the next form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Given name.
    pub first_name: String,
    /// Surname.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Phone as typed.
    pub phone: String,
    /// Country of residence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Identity document number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dni: Option<String>,
}

impl ClientProfile {
    /// Full name as printed on invoices.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A single rental transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Opaque unique id, never reused.
    pub id: Uuid,
    /// Sequential zero-padded number, unique per store.
    pub contract_number: String,
    /// Business line, fixed at creation.
    pub module: RentalModule,
    /// Creation date.
    pub created_at: NaiveDate,
    /// Creation stamp as printed on invoices.
    pub created_full: String,
    /// Creation instant in Unix milliseconds.
    pub timestamp: i64,
    /// Stamp of the last edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Client details.
    #[serde(flatten)]
    pub client: ClientProfile,
    /// Catalog category id chosen on the form.
    pub category: String,
    /// Product name chosen on the form.
    pub product: String,
    /// Pickup date.
    pub start_date: NaiveDate,
    /// Pickup time.
    pub start_time: NaiveTime,
    /// Return date.
    pub end_date: NaiveDate,
    /// Return time.
    pub end_time: NaiveTime,
    /// Rental length in billing units (days for vehicles).
    pub duration: f64,
    /// Number of units rented.
    pub quantity: u32,
    /// Unit price.
    pub price_unit: f64,
    /// Snapshot of `price_unit × quantity × duration`.
    pub total: f64,
    /// Free notes and the audit trail.
    #[serde(default)]
    pub notes: String,
    /// True only after a confirmed push to the sync endpoint.
    #[serde(default)]
    pub synced: bool,
    /// Live or soft-deleted.
    #[serde(default)]
    pub status: RecordStatus,
}

impl Contract {
    /// Build a new active, unsynced contract from a validated draft.
    #[must_use]
    pub fn new(
        sequence: u64,
        module: RentalModule,
        draft: ContractDraft,
        now: DateTime<Local>,
    ) -> Self {
        let mut contract = Self {
            id: Uuid::new_v4(),
            contract_number: format_contract_number(sequence),
            module,
            created_at: now.date_naive(),
            created_full: now.format(FULL_STAMP_FORMAT).to_string(),
            timestamp: now.timestamp_millis(),
            updated_at: None,
            client: ClientProfile::default(),
            category: String::new(),
            product: String::new(),
            start_date: draft.start_date,
            start_time: draft.start_time,
            end_date: draft.end_date,
            end_time: draft.end_time,
            duration: 0.0,
            quantity: 0,
            price_unit: 0.0,
            total: 0.0,
            notes: String::new(),
            synced: false,
            status: RecordStatus::Active,
        };
        contract.apply_draft(draft);
        contract
    }

    /// Overwrite the editable fields with `draft` and recompute the total.
    ///
    /// Identity, number, module, creation metadata, notes and status are kept.
    pub fn apply_draft(&mut self, draft: ContractDraft) {
        self.client = draft.client;
        self.category = draft.category;
        self.product = draft.product;
        self.start_date = draft.start_date;
        self.start_time = draft.start_time;
        self.end_date = draft.end_date;
        self.end_time = draft.end_time;
        self.duration = draft.duration;
        self.quantity = draft.quantity;
        self.price_unit = draft.price_unit;
        self.recompute_total();
    }

    /// Recompute the total snapshot from its three factors.
    pub fn recompute_total(&mut self) {
        self.total = pricing::compute_total(self.price_unit, self.quantity, self.duration);
    }

    /// Stamp an edit.
    pub fn touch(&mut self, now: DateTime<Local>) {
        self.updated_at = Some(now.format(FULL_STAMP_FORMAT).to_string());
    }

    /// Append an entry to the audit trail.
    pub fn append_note(&mut self, entry: &str) {
        if !self.notes.is_empty() {
            self.notes.push_str(NOTE_SEPARATOR);
        }
        self.notes.push_str(entry);
    }

    /// Soft-delete: flag, record the instant in the notes, and require a re-push.
    pub fn mark_deleted(&mut self, now: DateTime<Local>) {
        self.status = RecordStatus::Deleted;
        self.append_note(&format!("DELETED ON: {}", now.format(FULL_STAMP_FORMAT)));
        self.synced = false;
    }

    /// Whether the record is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// Whether the record has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status == RecordStatus::Deleted
    }

    /// Numeric value of the contract number.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.contract_number.parse().ok()
    }

    /// Pickup instant.
    #[must_use]
    pub fn pickup(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }

    /// Return instant.
    #[must_use]
    pub fn return_at(&self) -> NaiveDateTime {
        self.end_date.and_time(self.end_time)
    }

    /// Whether `key` is this contract's id or number.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        let key = key.trim();
        if let Ok(id) = Uuid::parse_str(key) {
            return self.id == id;
        }
        self.contract_number == key
            || key
                .parse::<u64>()
                .is_ok_and(|n| self.sequence() == Some(n))
    }
}

/// Format a sequence value as a contract number.
#[must_use]
pub fn format_contract_number(sequence: u64) -> String {
    format!("{sequence:0width$}", width = CONTRACT_NUMBER_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).single().unwrap()
    }

    fn draft() -> ContractDraft {
        ContractDraft {
            client: ClientProfile {
                first_name: "Alejandro".to_string(),
                last_name: "García".to_string(),
                email: "ejemplo@ecorent.com".to_string(),
                phone: "+34 600000000".to_string(),
                country: Some("España".to_string()),
                dni: None,
            },
            category: "AUTOS".to_string(),
            product: "Toyota Aygo BASIC".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration: 3.0,
            quantity: 1,
            price_unit: 50.0,
        }
    }

    #[test]
    fn test_new_contract_fields() {
        let now = at(2024, 6, 1, 9, 30);
        let contract = Contract::new(7, RentalModule::Vehicle, draft(), now);

        assert_eq!(contract.contract_number, "000007");
        assert_eq!(contract.module, RentalModule::Vehicle);
        assert_eq!(contract.created_at, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(contract.created_full, "01/06/2024 09:30:00");
        assert_eq!(contract.timestamp, now.timestamp_millis());
        assert!((contract.total - 150.0).abs() < f64::EPSILON);
        assert!(!contract.synced);
        assert!(contract.is_active());
        assert!(contract.updated_at.is_none());
    }

    #[test]
    fn test_apply_draft_keeps_identity() {
        let mut contract = Contract::new(1, RentalModule::Bike, draft(), at(2024, 6, 1, 9, 0));
        let id = contract.id;
        let created = contract.created_full.clone();

        let mut changed = draft();
        changed.price_unit = 20.0;
        changed.quantity = 2;
        contract.apply_draft(changed);

        assert_eq!(contract.id, id);
        assert_eq!(contract.contract_number, "000001");
        assert_eq!(contract.module, RentalModule::Bike);
        assert_eq!(contract.created_full, created);
        assert!((contract.total - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mark_deleted_appends_note() {
        let mut contract = Contract::new(1, RentalModule::Tour, draft(), at(2024, 6, 1, 9, 0));
        contract.notes = "paid cash".to_string();
        contract.synced = true;

        contract.mark_deleted(at(2024, 6, 2, 18, 5));

        assert!(contract.is_deleted());
        assert!(!contract.synced);
        assert_eq!(contract.notes, "paid cash | DELETED ON: 02/06/2024 18:05:00");
    }

    #[test]
    fn test_append_note_on_empty_notes() {
        let mut contract = Contract::new(1, RentalModule::Tour, draft(), at(2024, 6, 1, 9, 0));
        contract.append_note("first");
        assert_eq!(contract.notes, "first");
    }

    #[test]
    fn test_matches_key() {
        let contract = Contract::new(42, RentalModule::Vehicle, draft(), at(2024, 6, 1, 9, 0));

        assert!(contract.matches_key(&contract.id.to_string()));
        assert!(contract.matches_key("000042"));
        assert!(contract.matches_key("42"));
        assert!(!contract.matches_key("43"));
        assert!(!contract.matches_key(&Uuid::new_v4().to_string()));
    }

    #[test]
    fn test_schedule_instants() {
        let contract = Contract::new(1, RentalModule::Vehicle, draft(), at(2024, 6, 1, 9, 0));
        assert!(contract.return_at() > contract.pickup());
    }

    #[test]
    fn test_format_contract_number() {
        assert_eq!(format_contract_number(1), "000001");
        assert_eq!(format_contract_number(1_234_567), "1234567");
    }

    #[test]
    fn test_module_display() {
        assert_eq!(RentalModule::Vehicle.to_string(), "vehicle");
        assert_eq!(RentalModule::Bike.to_string(), "bike");
        assert_eq!(RentalModule::Tour.to_string(), "tour");
    }

    #[test]
    fn test_contract_serde_status() {
        let mut contract = Contract::new(1, RentalModule::Vehicle, draft(), at(2024, 6, 1, 9, 0));
        contract.mark_deleted(at(2024, 6, 1, 10, 0));

        let json = serde_json::to_string(&contract).unwrap();
        assert!(json.contains(r#""status":"deleted""#));
        assert!(json.contains(r#""first_name":"Alejandro""#));

        let back: Contract = serde_json::from_str(&json).unwrap();
        assert_eq!(back, contract);
    }
}
