//! One-way push of contracts to the spreadsheet endpoint.
//!
//! A push is a single opaque POST of a flat field mapping. Getting any
//! response back is the only success signal: the body is never read and
//! there is no retry. Failed records simply stay unsynced until the next
//! manual sync.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::Contract;

/// Suffix added to the product column of deleted records.
const DELETED_MARKER: &str = " [DELETED]";

/// Flat field mapping expected by the spreadsheet script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncPayload {
    /// Contract number.
    #[serde(rename = "numeroContrato")]
    pub contract_number: String,
    /// Creation date.
    #[serde(rename = "fecha")]
    pub created_at: String,
    /// Given name.
    #[serde(rename = "nombre")]
    pub first_name: String,
    /// Surname.
    #[serde(rename = "apellido")]
    pub last_name: String,
    /// Email.
    pub email: String,
    /// Phone without whitespace.
    #[serde(rename = "telefono")]
    pub phone: String,
    /// Country or empty.
    #[serde(rename = "pais")]
    pub country: String,
    /// Identity document or empty.
    pub dni: String,
    /// Product, tagged when the record is deleted.
    #[serde(rename = "modelo")]
    pub product: String,
    /// Plate column, not tracked.
    #[serde(rename = "matricula")]
    pub plate: String,
    /// Category id.
    #[serde(rename = "tipoVehiculo")]
    pub category: String,
    /// Pickup date.
    #[serde(rename = "fechaEntrega")]
    pub start_date: String,
    /// Pickup time.
    #[serde(rename = "horaEntrega")]
    pub start_time: String,
    /// Return date.
    #[serde(rename = "fechaDevolucion")]
    pub end_date: String,
    /// Return time.
    #[serde(rename = "horaDevolucion")]
    pub end_time: String,
    /// Duration.
    #[serde(rename = "numDias")]
    pub duration: f64,
    /// Unit price (the sheet's column name predates the total column).
    #[serde(rename = "precioTotal")]
    pub price_unit: f64,
    /// Total.
    pub total: f64,
    /// Insurance column, not tracked.
    #[serde(rename = "seguro")]
    pub insurance: String,
    /// Notes and audit trail.
    #[serde(rename = "comentarios")]
    pub notes: String,
}

impl From<&Contract> for SyncPayload {
    fn from(contract: &Contract) -> Self {
        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        let whitespace =
            WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

        let mut product = contract.product.clone();
        if contract.is_deleted() {
            product.push_str(DELETED_MARKER);
        }

        Self {
            contract_number: contract.contract_number.clone(),
            created_at: contract.created_at.format("%Y-%m-%d").to_string(),
            first_name: contract.client.first_name.clone(),
            last_name: contract.client.last_name.clone(),
            email: contract.client.email.clone(),
            phone: whitespace.replace_all(&contract.client.phone, "").into_owned(),
            country: contract.client.country.clone().unwrap_or_default(),
            dni: contract.client.dni.clone().unwrap_or_default(),
            product,
            plate: String::new(),
            category: contract.category.clone(),
            start_date: contract.start_date.format("%Y-%m-%d").to_string(),
            start_time: contract.start_time.format("%H:%M").to_string(),
            end_date: contract.end_date.format("%Y-%m-%d").to_string(),
            end_time: contract.end_time.format("%H:%M").to_string(),
            duration: contract.duration,
            price_unit: contract.price_unit,
            total: contract.total,
            insurance: String::new(),
            notes: contract.notes.clone(),
        }
    }
}

/// Delivers a payload to an endpoint.
///
/// `Ok` means the request reached the endpoint; nothing else is known.
#[async_trait]
pub trait SyncTransport: Send + Sync + std::fmt::Debug {
    /// Send one payload.
    async fn push(&self, endpoint: &str, payload: &SyncPayload) -> Result<()>;
}

/// HTTP transport: one JSON POST per push.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose pushes give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn push(&self, endpoint: &str, payload: &SyncPayload) -> Result<()> {
        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        // The script answers with redirects and opaque pages; status is informational only
        debug!("Endpoint answered {}", response.status());
        Ok(())
    }
}

/// Result of one push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The endpoint was reached.
    Synced,
    /// No endpoint, or the transport failed.
    Failed,
}

impl SyncOutcome {
    /// Whether the push went through.
    #[must_use]
    pub fn is_synced(self) -> bool {
        self == Self::Synced
    }
}

/// Aggregate of a bulk sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records a push was attempted for.
    pub attempted: usize,
    /// Records that went through.
    pub synced: usize,
}

impl SyncReport {
    /// Records that stayed unsynced.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted - self.synced
    }

    /// Count one attempt.
    pub fn record(&mut self, outcome: SyncOutcome) {
        self.attempted += 1;
        if outcome.is_synced() {
            self.synced += 1;
        }
    }
}

/// Pushes contracts through a transport.
#[derive(Debug)]
pub struct SyncClient {
    transport: Box<dyn SyncTransport>,
}

impl SyncClient {
    /// Wrap a transport.
    #[must_use]
    pub fn new(transport: Box<dyn SyncTransport>) -> Self {
        Self { transport }
    }

    /// Push one contract. Never errors: failures are logged and reported as
    /// [`SyncOutcome::Failed`].
    pub async fn push(&self, endpoint: Option<&str>, contract: &Contract) -> SyncOutcome {
        let Some(endpoint) = endpoint else {
            debug!(
                "No sync endpoint, contract #{} stays pending",
                contract.contract_number
            );
            return SyncOutcome::Failed;
        };

        let payload = SyncPayload::from(contract);
        match self.transport.push(endpoint, &payload).await {
            Ok(()) => {
                info!("Synced contract #{}", contract.contract_number);
                SyncOutcome::Synced
            }
            Err(e) => {
                warn!("Sync of contract #{} failed: {}", contract.contract_number, e);
                SyncOutcome::Failed
            }
        }
    }
}
