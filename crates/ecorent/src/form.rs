//! Contract form input and its validated draft.
//!
//! [`ContractForm`] carries what the operator typed, as text. [`ContractForm::parse`]
//! turns it into a [`ContractDraft`] with typed dates, a unit price seeded
//! from the catalog, a resolved duration and therefore a computable total.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::TIME_FORMAT;
use crate::error::ValidationError;
use crate::model::{Catalog, ClientProfile, Contract};
use crate::pricing;

/// Date format of form inputs.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How the rental duration is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationMode {
    /// The operator types the duration; return defaults to the pickup day.
    #[default]
    Manual,
    /// Duration is derived from the pickup and return schedule.
    Schedule,
}

impl std::fmt::Display for DurationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Schedule => write!(f, "schedule"),
        }
    }
}

/// What the form parse needs besides the input itself.
#[derive(Debug, Clone, Copy)]
pub struct FormContext<'a> {
    /// Duration behaviour.
    pub mode: DurationMode,
    /// Return time used when none is given.
    pub default_return_time: NaiveTime,
    /// Catalog used to seed the unit price.
    pub catalog: &'a Catalog,
}

/// Raw contract form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractForm {
    /// Given name.
    pub first_name: String,
    /// Surname.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Phone.
    pub phone: String,
    /// Country, optional.
    pub country: String,
    /// Identity document, optional.
    pub dni: String,
    /// Category id.
    pub category: String,
    /// Product id or name.
    pub product: String,
    /// Pickup date, `YYYY-MM-DD`.
    pub start_date: String,
    /// Pickup time, `HH:MM`.
    pub start_time: String,
    /// Return date, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Return time, `HH:MM`.
    pub end_time: Option<String>,
    /// Typed duration.
    pub duration: Option<String>,
    /// Typed quantity.
    pub quantity: Option<String>,
    /// Typed unit price; when absent the catalog price is used.
    pub price_unit: Option<String>,
    /// The operator is typing the duration right now, so derivation must not
    /// overwrite it.
    pub duration_being_edited: bool,
}

/// A validated contract form.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractDraft {
    /// Client block.
    pub client: ClientProfile,
    /// Category id.
    pub category: String,
    /// Product name.
    pub product: String,
    /// Pickup date.
    pub start_date: NaiveDate,
    /// Pickup time.
    pub start_time: NaiveTime,
    /// Return date.
    pub end_date: NaiveDate,
    /// Return time.
    pub end_time: NaiveTime,
    /// Resolved duration.
    pub duration: f64,
    /// Quantity.
    pub quantity: u32,
    /// Unit price.
    pub price_unit: f64,
}

impl ContractDraft {
    /// Live total preview.
    #[must_use]
    pub fn total(&self) -> f64 {
        pricing::compute_total(self.price_unit, self.quantity, self.duration)
    }
}

impl ContractForm {
    /// Pre-fill a form with a saved contract, for editing.
    #[must_use]
    pub fn from_contract(contract: &Contract) -> Self {
        let mut form = Self {
            category: contract.category.clone(),
            product: contract.product.clone(),
            start_date: contract.start_date.format(DATE_FORMAT).to_string(),
            start_time: contract.start_time.format(TIME_FORMAT).to_string(),
            end_date: Some(contract.end_date.format(DATE_FORMAT).to_string()),
            end_time: Some(contract.end_time.format(TIME_FORMAT).to_string()),
            duration: Some(contract.duration.to_string()),
            quantity: Some(contract.quantity.to_string()),
            price_unit: Some(contract.price_unit.to_string()),
            ..Self::default()
        };
        form.fill_client(&contract.client);
        form
    }

    /// Fill the client block, price, quantity and duration with demo values.
    pub fn fill_sample(&mut self) {
        self.first_name = "Alejandro".to_string();
        self.last_name = "García".to_string();
        self.email = "ejemplo@ecorent.com".to_string();
        self.phone = "+34 600000000".to_string();
        self.country = "España".to_string();
        self.dni = "12345678Z".to_string();
        self.price_unit = Some("50".to_string());
        self.quantity = Some("1".to_string());
        self.duration = Some("2".to_string());
    }

    /// Copy a saved client profile into the client fields.
    pub fn fill_client(&mut self, client: &ClientProfile) {
        self.first_name.clone_from(&client.first_name);
        self.last_name.clone_from(&client.last_name);
        self.email.clone_from(&client.email);
        self.phone.clone_from(&client.phone);
        self.country = client.country.clone().unwrap_or_default();
        self.dni = client.dni.clone().unwrap_or_default();
    }

    /// Validate the form into a draft.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first missing or unparsable
    /// field, or when a derived duration has no valid return schedule.
    pub fn parse(&self, ctx: &FormContext<'_>) -> Result<ContractDraft, ValidationError> {
        let client = ClientProfile {
            first_name: required("first_name", &self.first_name)?,
            last_name: required("last_name", &self.last_name)?,
            email: parse_email(&self.email)?,
            phone: parse_phone(&self.phone)?,
            country: optional(&self.country),
            dni: optional(&self.dni),
        };
        let category = required("category", &self.category)?;
        let product_key = required("product", &self.product)?;
        let start_date = parse_date("start_date", &self.start_date)?;
        let start_time = parse_time("start_time", &self.start_time)?;

        let catalog_product = ctx.catalog.find_product(&product_key);
        let product = catalog_product.map_or(product_key, |p| p.name.clone());

        let price_unit = match self.price_unit.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => pricing::parse_amount(raw),
            _ => catalog_product
                .map(|p| p.price)
                .or_else(|| ctx.catalog.seed_price(&category))
                .unwrap_or(0.0),
        };
        let quantity = self
            .quantity
            .as_deref()
            .map_or(1, pricing::parse_quantity);

        let (end_date, end_time, duration) = match ctx.mode {
            DurationMode::Manual => {
                let end_date = match non_empty(self.end_date.as_deref()) {
                    Some(raw) => parse_date("end_date", raw)?,
                    None => start_date,
                };
                let end_time = match non_empty(self.end_time.as_deref()) {
                    Some(raw) => parse_time("end_time", raw)?,
                    None => ctx.default_return_time,
                };
                let duration = self.duration.as_deref().map_or(1.0, pricing::parse_duration);
                (end_date, end_time, duration)
            }
            DurationMode::Schedule => {
                let raw_end = non_empty(self.end_date.as_deref())
                    .ok_or(ValidationError::Missing("end_date"))?;
                let end_date = parse_date("end_date", raw_end)?;
                let end_time = match non_empty(self.end_time.as_deref()) {
                    Some(raw) => parse_time("end_time", raw)?,
                    None => start_time,
                };
                let duration = self.resolve_scheduled_duration(
                    start_date.and_time(start_time),
                    end_date.and_time(end_time),
                )?;
                (end_date, end_time, duration)
            }
        };

        Ok(ContractDraft {
            client,
            category,
            product,
            start_date,
            start_time,
            end_date,
            end_time,
            duration,
            quantity,
            price_unit,
        })
    }

    fn resolve_scheduled_duration(
        &self,
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    ) -> Result<f64, ValidationError> {
        let typed = non_empty(self.duration.as_deref()).map(pricing::parse_duration);
        if self.duration_being_edited {
            if let Some(duration) = typed {
                return Ok(duration);
            }
        }
        match (pricing::derive_duration_days(start, end), typed) {
            (Some(days), _) => Ok(f64::from(days)),
            // Derivation left unset: keep whatever was there
            (None, Some(duration)) => Ok(duration),
            (None, None) => Err(ValidationError::ReturnBeforePickup {
                start: start.format("%Y-%m-%d %H:%M").to_string(),
                end: end.format("%Y-%m-%d %H:%M").to_string(),
            }),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(value.to_string())
}

fn optional(value: &str) -> Option<String> {
    non_empty(Some(value)).map(str::to_string)
}

fn parse_email(value: &str) -> Result<String, ValidationError> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let email = required("email", value)?;
    let pattern = EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    });
    if !pattern.is_match(&email) {
        return Err(ValidationError::invalid("email", email));
    }
    Ok(email)
}

fn parse_phone(value: &str) -> Result<String, ValidationError> {
    static DIGIT: OnceLock<Regex> = OnceLock::new();
    let phone = required("phone", value)?;
    let pattern = DIGIT.get_or_init(|| Regex::new(r"\d").expect("digit pattern is valid"));
    if !pattern.is_match(&phone) {
        return Err(ValidationError::invalid("phone", phone));
    }
    Ok(phone)
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    let value = required(field, value)?;
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| ValidationError::invalid(field, value))
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ValidationError> {
    let value = required(field, value)?;
    NaiveTime::parse_from_str(&value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
        .map_err(|_| ValidationError::invalid(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> ContractForm {
        ContractForm {
            first_name: "Alejandro".to_string(),
            last_name: "García".to_string(),
            email: "ejemplo@ecorent.com".to_string(),
            phone: "+34 600000000".to_string(),
            country: "España".to_string(),
            dni: String::new(),
            category: "AUTOS".to_string(),
            product: "Toyota Aygo BASIC".to_string(),
            start_date: "2024-06-01".to_string(),
            start_time: "10:00".to_string(),
            ..ContractForm::default()
        }
    }

    fn ctx(catalog: &Catalog, mode: DurationMode) -> FormContext<'_> {
        FormContext {
            mode,
            default_return_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            catalog,
        }
    }

    #[test]
    fn test_manual_defaults() {
        let catalog = Catalog::default();
        let draft = filled_form().parse(&ctx(&catalog, DurationMode::Manual)).unwrap();

        assert_eq!(draft.client.country.as_deref(), Some("España"));
        assert_eq!(draft.client.dni, None);
        assert_eq!(draft.end_date, draft.start_date);
        assert_eq!(draft.end_time, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(draft.duration, 1.0);
        assert_eq!(draft.quantity, 1);
        // Seeded from the catalog
        assert_eq!(draft.price_unit, 45.0);
    }

    #[test]
    fn test_typed_values_override_catalog() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.price_unit = Some("50".to_string());
        form.quantity = Some("1".to_string());
        form.duration = Some("3".to_string());

        let draft = form.parse(&ctx(&catalog, DurationMode::Manual)).unwrap();
        assert_eq!(pricing::format_amount(draft.total()), "150.00");
    }

    #[test]
    fn test_malformed_numbers_fall_back() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.price_unit = Some("abc".to_string());
        form.quantity = Some("-2".to_string());
        form.duration = Some("soon".to_string());

        let draft = form.parse(&ctx(&catalog, DurationMode::Manual)).unwrap();
        assert_eq!(draft.price_unit, 0.0);
        assert_eq!(draft.quantity, 1);
        assert_eq!(draft.duration, 1.0);
    }

    #[test]
    fn test_product_by_id_resolves_name() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.category = "BIKE_NORMAL".to_string();
        form.product = "7".to_string();

        let draft = form.parse(&ctx(&catalog, DurationMode::Manual)).unwrap();
        assert_eq!(draft.product, "City Bike");
        assert_eq!(draft.price_unit, 6.0);
    }

    #[test]
    fn test_free_text_product_seeds_from_category() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.category = "SCOOTER".to_string();
        form.product = "Vespa borrowed from a friend".to_string();

        let draft = form.parse(&ctx(&catalog, DurationMode::Manual)).unwrap();
        assert_eq!(draft.product, "Vespa borrowed from a friend");
        assert_eq!(draft.price_unit, 35.0);
    }

    #[test]
    fn test_missing_required_fields() {
        let catalog = Catalog::default();
        let c = ctx(&catalog, DurationMode::Manual);

        let mut form = filled_form();
        form.last_name = "  ".to_string();
        assert_eq!(form.parse(&c), Err(ValidationError::Missing("last_name")));

        let mut form = filled_form();
        form.product = String::new();
        assert_eq!(form.parse(&c), Err(ValidationError::Missing("product")));
    }

    #[test]
    fn test_invalid_email_and_phone() {
        let catalog = Catalog::default();
        let c = ctx(&catalog, DurationMode::Manual);

        let mut form = filled_form();
        form.email = "not-an-email".to_string();
        assert!(matches!(
            form.parse(&c),
            Err(ValidationError::Invalid { field: "email", .. })
        ));

        let mut form = filled_form();
        form.phone = "call me".to_string();
        assert!(matches!(
            form.parse(&c),
            Err(ValidationError::Invalid { field: "phone", .. })
        ));
    }

    #[test]
    fn test_invalid_date() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.start_date = "01/06/2024".to_string();

        assert!(matches!(
            form.parse(&ctx(&catalog, DurationMode::Manual)),
            Err(ValidationError::Invalid { field: "start_date", .. })
        ));
    }

    #[test]
    fn test_schedule_derives_duration() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.end_date = Some("2024-06-03".to_string());
        form.end_time = Some("10:00".to_string());
        form.duration = Some("7".to_string());

        let draft = form.parse(&ctx(&catalog, DurationMode::Schedule)).unwrap();
        assert_eq!(draft.duration, 2.0);
        assert_eq!(draft.end_date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
    }

    #[test]
    fn test_schedule_respects_duration_being_edited() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.end_date = Some("2024-06-03".to_string());
        form.duration = Some("5".to_string());
        form.duration_being_edited = true;

        let draft = form.parse(&ctx(&catalog, DurationMode::Schedule)).unwrap();
        assert_eq!(draft.duration, 5.0);
    }

    #[test]
    fn test_schedule_return_before_pickup_keeps_typed_duration() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.end_date = Some("2024-05-30".to_string());
        form.duration = Some("4".to_string());

        let draft = form.parse(&ctx(&catalog, DurationMode::Schedule)).unwrap();
        assert_eq!(draft.duration, 4.0);
    }

    #[test]
    fn test_schedule_return_before_pickup_without_duration() {
        let catalog = Catalog::default();
        let mut form = filled_form();
        form.end_date = Some("2024-05-30".to_string());

        assert!(matches!(
            form.parse(&ctx(&catalog, DurationMode::Schedule)),
            Err(ValidationError::ReturnBeforePickup { .. })
        ));
    }

    #[test]
    fn test_schedule_requires_end_date() {
        let catalog = Catalog::default();
        assert_eq!(
            filled_form().parse(&ctx(&catalog, DurationMode::Schedule)),
            Err(ValidationError::Missing("end_date"))
        );
    }

    #[test]
    fn test_fill_client() {
        let mut form = ContractForm::default();
        form.fill_client(&ClientProfile {
            first_name: "Ana".to_string(),
            last_name: "Pons".to_string(),
            email: "ana@example.com".to_string(),
            phone: "600 111 222".to_string(),
            country: None,
            dni: Some("X123".to_string()),
        });
        assert_eq!(form.first_name, "Ana");
        assert_eq!(form.country, "");
        assert_eq!(form.dni, "X123");
    }

    #[test]
    fn test_duration_mode_serde() {
        let mode: DurationMode = serde_json::from_str(r#""schedule""#).unwrap();
        assert_eq!(mode, DurationMode::Schedule);
        assert_eq!(DurationMode::default().to_string(), "manual");
    }
}
