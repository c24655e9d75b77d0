//! Read-only invoice projection of a contract.
//!
//! Besides the printable view this module produces the strings handed to
//! outside collaborators: the QR verification payload, the PDF file name and
//! the messaging share link. None of them touch state.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{CompanyConfig, Config, TIME_FORMAT};
use crate::error::{Error, Result};
use crate::form::{DurationMode, DATE_FORMAT};
use crate::model::{Contract, RentalModule};
use crate::pricing;

/// Brand prefix of QR payloads and PDF names.
const BRAND: &str = "EcoRent";

/// Shown in place of a missing identity document.
const NO_DOCUMENT: &str = "S/N";

/// Verification string encoded in the invoice QR code.
///
/// The total uses its shortest decimal form (`150`, `12.5`). In schedule mode
/// the return instant is appended.
#[must_use]
pub fn qr_payload(contract: &Contract, mode: DurationMode) -> String {
    let mut payload = format!(
        "{BRAND}|ID:{}|Num:{}|Total:{}",
        contract.id, contract.contract_number, contract.total
    );
    if mode == DurationMode::Schedule {
        let _ = write!(
            payload,
            "|Return:{} {}",
            contract.end_date.format(DATE_FORMAT),
            contract.end_time.format(TIME_FORMAT)
        );
    }
    payload
}

/// File name for the exported PDF.
#[must_use]
pub fn pdf_file_name(contract: &Contract) -> String {
    format!(
        "{BRAND}_#{}_{}.pdf",
        contract.contract_number, contract.client.last_name
    )
}

/// Greeting sent to the client with their contract reference.
#[must_use]
pub fn share_message(contract: &Contract, currency_symbol: &str) -> String {
    format!(
        "Hola {}, gracias por elegir {BRAND}. Tu contrato #{} por {currency_symbol}{} ya está registrado. Puedes verlo online con tu ID: {}",
        contract.client.first_name,
        contract.contract_number,
        pricing::format_amount(contract.total),
        contract.id
    )
}

/// Greeting sent to the support line.
const SUPPORT_MESSAGE: &str =
    "Hola, necesito asistencia técnica con el Sistema de Gestión EcoRent.";

/// Messaging link to `phone` (non-digits dropped) carrying `text`.
///
/// Spaces in the text are sent as `%20`.
fn message_link(base_url: &str, phone: &str, text: &str) -> Result<String> {
    static NON_DIGIT: OnceLock<Regex> = OnceLock::new();
    let non_digit = NON_DIGIT.get_or_init(|| Regex::new(r"\D").expect("non-digit pattern is valid"));

    let digits = non_digit.replace_all(phone, "");
    let target = format!("{}/{}", base_url.trim_end_matches('/'), digits);
    let mut url = Url::parse_with_params(&target, &[("text", text)])
        .map_err(|e| Error::internal(format!("invalid share link {target}: {e}")))?;

    // Form encoding writes spaces as `+`; a literal plus is already `%2B`.
    let query = url.query().map(|q| q.replace('+', "%20"));
    url.set_query(query.as_deref());
    Ok(url.into())
}

/// Messaging link addressed to the client's phone digits.
///
/// # Errors
///
/// Returns an error if `base_url` is not a valid URL.
pub fn share_link(contract: &Contract, base_url: &str, currency_symbol: &str) -> Result<String> {
    message_link(
        base_url,
        &contract.client.phone,
        &share_message(contract, currency_symbol),
    )
}

/// Messaging link to the technical support line.
///
/// # Errors
///
/// Returns an error if `base_url` is not a valid URL.
pub fn support_link(base_url: &str, support_phone: &str) -> Result<String> {
    message_link(base_url, support_phone, SUPPORT_MESSAGE)
}

/// Printable view of one contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    /// Issuing company.
    pub company: CompanyConfig,
    /// Contract id.
    pub id: Uuid,
    /// Contract number.
    pub contract_number: String,
    /// Rental module.
    pub module: RentalModule,
    /// Registration timestamp.
    pub issued: String,
    /// Client full name.
    pub client_name: String,
    /// Identity document, or `S/N`.
    pub document: String,
    /// Client email.
    pub email: String,
    /// Client phone.
    pub phone: String,
    /// Rented product.
    pub product: String,
    /// Pickup schedule.
    pub start: String,
    /// Return schedule.
    pub end: String,
    /// Total.
    pub total: f64,
    /// Total with currency symbol.
    pub total_display: String,
    /// Whether the record was soft-deleted.
    pub deleted: bool,
    /// QR verification payload.
    pub qr_payload: String,
    /// Suggested PDF file name.
    pub pdf_file_name: String,
}

impl Invoice {
    /// Project `contract` using the company and currency from `config`.
    #[must_use]
    pub fn new(contract: &Contract, config: &Config) -> Self {
        Self {
            company: config.company.clone(),
            id: contract.id,
            contract_number: contract.contract_number.clone(),
            module: contract.module,
            issued: contract.created_full.clone(),
            client_name: contract.client.full_name(),
            document: contract
                .client
                .dni
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| NO_DOCUMENT.to_string()),
            email: contract.client.email.clone(),
            phone: contract.client.phone.clone(),
            product: contract.product.clone(),
            start: schedule(contract.start_date, contract.start_time),
            end: schedule(contract.end_date, contract.end_time),
            total: contract.total,
            total_display: format!(
                "{}{}",
                config.invoice.currency_symbol,
                pricing::format_amount(contract.total)
            ),
            deleted: contract.is_deleted(),
            qr_payload: qr_payload(contract, config.contracts.duration_mode),
            pdf_file_name: pdf_file_name(contract),
        }
    }

    /// Plain-text rendering for the terminal.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.deleted {
            out.push_str("*** DELETED RECORD ***\n\n");
        }
        let _ = writeln!(out, "{}", self.company.name);
        let _ = writeln!(out, "{}", self.company.address);
        let _ = writeln!(out, "{} | {}", self.company.email, self.company.web);
        out.push('\n');
        let _ = writeln!(out, "Contract #{} ({})", self.contract_number, self.module.label());
        let _ = writeln!(out, "Registered: {}", self.issued);
        out.push('\n');
        let _ = writeln!(out, "Client:   {}", self.client_name);
        let _ = writeln!(out, "Document: {}", self.document);
        let _ = writeln!(out, "Contact:  {} / {}", self.email, self.phone);
        out.push('\n');
        let _ = writeln!(out, "Service:  {}", self.product);
        let _ = writeln!(out, "Pickup:   {}", self.start);
        let _ = writeln!(out, "Return:   {}", self.end);
        let _ = writeln!(out, "Total:    {} (VAT 21% and local fees included)", self.total_display);
        out.push('\n');
        let _ = writeln!(out, "Verification: {}", self.qr_payload);
        let _ = writeln!(out, "Transaction ID: {}", self.id);
        out
    }
}

fn schedule(date: chrono::NaiveDate, time: chrono::NaiveTime) -> String {
    format!("{} @ {}", date.format(DATE_FORMAT), time.format(TIME_FORMAT))
}
