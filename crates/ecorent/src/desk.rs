//! The rental desk: ledger, storage and sync wired together.
//!
//! Every mutating operation persists the full state before attempting a
//! push, so a failed or absent endpoint never loses data. A contract is
//! marked synced (and persisted again) only after the transport reports
//! delivery.

use chrono::{Local, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::form::{ContractForm, DurationMode, FormContext};
use crate::ledger::Ledger;
use crate::model::{Contract, RentalModule};
use crate::storage::Storage;
use crate::sync::{HttpTransport, SyncClient, SyncOutcome, SyncReport, SyncTransport};

/// A contract after a save, with the result of the push that followed.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved {
    /// The stored contract.
    pub contract: Contract,
    /// Whether the push went through.
    pub sync: SyncOutcome,
}

/// Owns the application state and its side effects.
#[derive(Debug)]
pub struct RentalDesk {
    ledger: Ledger,
    storage: Storage,
    sync: SyncClient,
    mode: DurationMode,
    default_return_time: NaiveTime,
    fallback_endpoint: String,
}

impl RentalDesk {
    /// Open the configured database and build an HTTP-backed desk.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or its documents are
    /// malformed.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        let transport = HttpTransport::new(config.sync_timeout())?;
        Self::new(storage, Box::new(transport), config)
    }

    /// Build a desk over an existing store and transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored documents are malformed.
    pub fn new(storage: Storage, transport: Box<dyn SyncTransport>, config: &Config) -> Result<Self> {
        let ledger = storage.load_ledger(&config.sync.default_endpoint)?;
        debug!(
            "Desk ready with {} contracts in {} mode",
            ledger.contracts().len(),
            config.contracts.duration_mode
        );
        Ok(Self {
            ledger,
            storage,
            sync: SyncClient::new(transport),
            mode: config.contracts.duration_mode,
            default_return_time: config.default_return_time(),
            fallback_endpoint: config.sync.default_endpoint.clone(),
        })
    }

    /// Current state.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The backing store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Active duration mode.
    #[must_use]
    pub fn mode(&self) -> DurationMode {
        self.mode
    }

    /// Parsing context for forms submitted to this desk.
    #[must_use]
    pub fn form_context(&self) -> FormContext<'_> {
        FormContext {
            mode: self.mode,
            default_return_time: self.default_return_time,
            catalog: self.ledger.catalog(),
        }
    }

    fn persist(&mut self) -> Result<()> {
        self.storage.save_ledger(&self.ledger)
    }

    fn saved(&self, id: Uuid, sync: SyncOutcome) -> Result<Saved> {
        let contract = self
            .ledger
            .get(id)
            .cloned()
            .ok_or_else(|| Error::internal(format!("contract {id} vanished after save")))?;
        Ok(Saved { contract, sync })
    }

    /// Validate `form`, store it as a new contract and push it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an incomplete form, or a storage error.
    /// A failed push is not an error.
    pub async fn create(&mut self, module: RentalModule, form: &ContractForm) -> Result<Saved> {
        let draft = form.parse(&self.form_context())?;
        let id = self.ledger.create(module, draft, Local::now()).id;
        self.persist()?;

        let sync = self.sync_one(id).await?;
        self.saved(id, sync)
    }

    /// Merge `form` into the active contract matching `key` and push it.
    ///
    /// Returns `None` when no active contract matches.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an incomplete form, or a storage error.
    pub async fn edit(&mut self, key: &str, form: &ContractForm) -> Result<Option<Saved>> {
        let Some(id) = self.active_id(key) else {
            return Ok(None);
        };
        let draft = form.parse(&self.form_context())?;
        if self.ledger.edit(id, draft, Local::now()).is_none() {
            return Ok(None);
        }
        self.persist()?;

        let sync = self.sync_one(id).await?;
        self.saved(id, sync).map(Some)
    }

    /// Soft-delete the active contract matching `key` and push the tombstone.
    ///
    /// Returns `None` when no active contract matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub async fn delete(&mut self, key: &str) -> Result<Option<Saved>> {
        let Some(id) = self.active_id(key) else {
            return Ok(None);
        };
        if self.ledger.soft_delete(id, Local::now()).is_none() {
            return Ok(None);
        }
        self.persist()?;

        let sync = self.sync_one(id).await?;
        self.saved(id, sync).map(Some)
    }

    fn active_id(&self, key: &str) -> Option<Uuid> {
        self.ledger
            .find(key)
            .filter(|c| c.is_active())
            .map(|c| c.id)
    }

    /// Push one contract; on delivery mark it synced and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the synced flag cannot be persisted.
    pub async fn sync_one(&mut self, id: Uuid) -> Result<SyncOutcome> {
        let Some(contract) = self.ledger.get(id) else {
            debug!("Sync of unknown contract {} skipped", id);
            return Ok(SyncOutcome::Failed);
        };
        let outcome = self
            .sync
            .push(self.ledger.settings().endpoint(), contract)
            .await;

        if outcome.is_synced() {
            self.ledger.mark_synced(id);
            self.persist()?;
        }
        Ok(outcome)
    }

    /// Push the contract matching `key`, deleted ones included.
    ///
    /// Returns `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the synced flag cannot be persisted.
    pub async fn sync_key(&mut self, key: &str) -> Result<Option<SyncOutcome>> {
        let Some(id) = self.ledger.find(key).map(|c| c.id) else {
            return Ok(None);
        };
        self.sync_one(id).await.map(Some)
    }

    /// Push every unsynced contract, one after another.
    ///
    /// Each delivered contract is persisted as synced before the next push
    /// starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SyncNotConfigured`] when no endpoint is set, or a
    /// storage error.
    pub async fn sync_pending(&mut self) -> Result<SyncReport> {
        if self.ledger.settings().endpoint().is_none() {
            return Err(Error::SyncNotConfigured);
        }

        let mut report = SyncReport::default();
        for id in self.ledger.pending() {
            let outcome = self.sync_one(id).await?;
            report.record(outcome);
        }

        info!(
            "Bulk sync pushed {} of {} pending contracts",
            report.synced, report.attempted
        );
        Ok(report)
    }

    /// Change a catalog price and persist.
    ///
    /// Returns `false` if the product is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn set_product_price(&mut self, product_id: &str, raw_price: &str) -> Result<bool> {
        if !self.ledger.set_product_price(product_id, raw_price) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Save a new endpoint; blank input restores the configured default.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn set_endpoint(&mut self, raw: &str) -> Result<()> {
        let fallback = self.fallback_endpoint.clone();
        self.ledger.settings_mut().set_endpoint(raw, &fallback);
        info!(
            "Sync endpoint set to {}",
            self.ledger.settings().endpoint().unwrap_or_default()
        );
        self.persist()
    }

    /// Disable sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn clear_endpoint(&mut self) -> Result<()> {
        self.ledger.settings_mut().clear_endpoint();
        info!("Sync endpoint cleared");
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SYNC_ENDPOINT;
    use crate::pricing;
    use crate::sync::testing::RecordingTransport;
    use crate::sync::SyncPayload;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn desk_with(transport: &RecordingTransport, config: &Config) -> RentalDesk {
        crate::logging::init_test_logging();
        RentalDesk::new(
            Storage::open_in_memory().unwrap(),
            Box::new(transport.clone()),
            config,
        )
        .unwrap()
    }

    fn vehicle_form() -> ContractForm {
        ContractForm {
            first_name: "Alejandro".to_string(),
            last_name: "García".to_string(),
            email: "ejemplo@ecorent.com".to_string(),
            phone: "+34 600 000 000".to_string(),
            category: "AUTOS".to_string(),
            product: "Citroen C3 / Peugeot 208".to_string(),
            start_date: "2024-06-01".to_string(),
            start_time: "10:00".to_string(),
            duration: Some("3".to_string()),
            price_unit: Some("50".to_string()),
            ..ContractForm::default()
        }
    }

    #[tokio::test]
    async fn test_create_persists_and_syncs() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());

        let saved = desk
            .create(RentalModule::Vehicle, &vehicle_form())
            .await
            .unwrap();

        assert_eq!(saved.sync, SyncOutcome::Synced);
        assert!(saved.contract.synced);
        assert_eq!(pricing::format_amount(saved.contract.total), "150.00");
        assert_eq!(transport.pushed_numbers(), ["000001"]);
        assert_eq!(transport.pushes.lock().unwrap()[0].0, DEFAULT_SYNC_ENDPOINT);

        let stored = desk.storage().load_ledger(DEFAULT_SYNC_ENDPOINT).unwrap();
        assert!(stored.contracts()[0].synced);
    }

    #[tokio::test]
    async fn test_create_without_endpoint_stays_pending() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());
        desk.clear_endpoint().unwrap();

        let saved = desk
            .create(RentalModule::Vehicle, &vehicle_form())
            .await
            .unwrap();

        assert_eq!(saved.sync, SyncOutcome::Failed);
        assert!(!saved.contract.synced);
        assert!(transport.pushed_numbers().is_empty());

        let stored = desk.storage().load_ledger(DEFAULT_SYNC_ENDPOINT).unwrap();
        assert_eq!(stored.contracts().len(), 1);
        assert!(!stored.contracts()[0].synced);
        assert_eq!(stored.settings().endpoint(), None);
    }

    #[tokio::test]
    async fn test_create_transport_failure_keeps_record() {
        let transport = RecordingTransport::failing_for(&["000001"]);
        let mut desk = desk_with(&transport, &Config::default());

        let saved = desk
            .create(RentalModule::Vehicle, &vehicle_form())
            .await
            .unwrap();

        assert_eq!(saved.sync, SyncOutcome::Failed);
        assert_eq!(desk.ledger().pending(), vec![saved.contract.id]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_form() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());
        let mut form = vehicle_form();
        form.email = "not-an-email".to_string();

        let err = desk
            .create(RentalModule::Vehicle, &form)
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(desk.ledger().contracts().is_empty());
        assert!(transport.pushed_numbers().is_empty());
    }

    #[tokio::test]
    async fn test_edit_resyncs_and_keeps_number() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());
        desk.create(RentalModule::Vehicle, &vehicle_form())
            .await
            .unwrap();

        let mut form = vehicle_form();
        form.duration = Some("4".to_string());
        let saved = desk.edit("000001", &form).await.unwrap().unwrap();

        assert_eq!(saved.contract.contract_number, "000001");
        assert_eq!(pricing::format_amount(saved.contract.total), "200.00");
        assert!(saved.contract.updated_at.is_some());
        assert_eq!(transport.pushed_numbers(), ["000001", "000001"]);
    }

    #[tokio::test]
    async fn test_edit_unknown_key() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());

        assert!(desk.edit("000042", &vehicle_form()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_pushes_tombstone() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());
        desk.create(RentalModule::Vehicle, &vehicle_form())
            .await
            .unwrap();

        let saved = desk.delete("000001").await.unwrap().unwrap();
        assert!(saved.contract.is_deleted());

        let pushes = transport.pushes.lock().unwrap();
        assert!(pushes[1].1.product.ends_with("[DELETED]"));
        drop(pushes);

        assert!(desk.delete("000001").await.unwrap().is_none());
        assert_eq!(desk.ledger().history().count(), 0);
        assert_eq!(desk.ledger().contracts().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_pending_counts_successes() {
        let transport = RecordingTransport::failing_for(&["000002"]);
        let mut desk = desk_with(&transport, &Config::default());
        desk.clear_endpoint().unwrap();
        for _ in 0..3 {
            desk.create(RentalModule::Vehicle, &vehicle_form())
                .await
                .unwrap();
        }
        desk.set_endpoint("https://hook.test/exec").unwrap();

        let report = desk.sync_pending().await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.synced, 2);
        assert_eq!(transport.pushed_numbers(), ["000001", "000002", "000003"]);
        assert_eq!(desk.ledger().pending().len(), 1);

        let stored = desk.storage().load_ledger(DEFAULT_SYNC_ENDPOINT).unwrap();
        assert_eq!(stored.pending().len(), 1);
    }

    /// Records how many contracts were synced on disk when each push began.
    #[derive(Debug)]
    struct DiskCheckingTransport {
        path: PathBuf,
        seen: Arc<Mutex<Vec<(String, usize)>>>,
    }

    #[async_trait::async_trait]
    impl SyncTransport for DiskCheckingTransport {
        async fn push(&self, _endpoint: &str, payload: &SyncPayload) -> Result<()> {
            let stored = Storage::open(&self.path)?.load_ledger(DEFAULT_SYNC_ENDPOINT)?;
            let synced = stored.contracts().iter().filter(|c| c.synced).count();
            self.seen
                .lock()
                .unwrap()
                .push((payload.contract_number.clone(), synced));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sync_pending_persists_each_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecorent.db");
        let seen: Arc<Mutex<Vec<(String, usize)>>> = Arc::default();
        let transport = DiskCheckingTransport {
            path: path.clone(),
            seen: Arc::clone(&seen),
        };
        let mut desk = RentalDesk::new(
            Storage::open(&path).unwrap(),
            Box::new(transport),
            &Config::default(),
        )
        .unwrap();
        desk.clear_endpoint().unwrap();
        for _ in 0..3 {
            desk.create(RentalModule::Vehicle, &vehicle_form())
                .await
                .unwrap();
        }
        desk.set_endpoint("https://hook.test/exec").unwrap();

        let report = desk.sync_pending().await.unwrap();
        assert_eq!(report.synced, 3);
        assert_eq!(
            *seen.lock().unwrap(),
            [
                ("000001".to_string(), 0),
                ("000002".to_string(), 1),
                ("000003".to_string(), 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_sync_pending_without_endpoint() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());
        desk.clear_endpoint().unwrap();

        let err = desk.sync_pending().await.unwrap_err();
        assert!(err.is_sync_not_configured());
    }

    #[tokio::test]
    async fn test_sync_key() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());
        desk.clear_endpoint().unwrap();
        desk.create(RentalModule::Vehicle, &vehicle_form())
            .await
            .unwrap();
        desk.set_endpoint("").unwrap();

        assert_eq!(
            desk.sync_key("000001").await.unwrap(),
            Some(SyncOutcome::Synced)
        );
        assert!(desk.ledger().pending().is_empty());
        assert_eq!(desk.sync_key("999999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_schedule_mode_derives_duration() {
        let transport = RecordingTransport::default();
        let mut config = Config::default();
        config.contracts.duration_mode = DurationMode::Schedule;
        let mut desk = desk_with(&transport, &config);

        let mut form = vehicle_form();
        form.duration = None;
        form.end_date = Some("2024-06-03".to_string());
        form.end_time = Some("10:00".to_string());

        let saved = desk.create(RentalModule::Vehicle, &form).await.unwrap();
        assert_eq!(saved.contract.duration, 2.0);
        assert_eq!(pricing::format_amount(saved.contract.total), "100.00");
    }

    #[test]
    fn test_set_product_price_persists() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());

        assert!(desk.set_product_price("7", "8").unwrap());
        assert!(!desk.set_product_price("nope", "8").unwrap());

        let stored = desk.storage().load_ledger(DEFAULT_SYNC_ENDPOINT).unwrap();
        assert_eq!(stored.catalog().product("7").unwrap().price, 8.0);
    }

    #[test]
    fn test_blank_endpoint_restores_default() {
        let transport = RecordingTransport::default();
        let mut desk = desk_with(&transport, &Config::default());
        desk.set_endpoint("https://hook.test").unwrap();
        assert_eq!(desk.ledger().settings().endpoint(), Some("https://hook.test"));

        desk.set_endpoint("   ").unwrap();
        assert_eq!(
            desk.ledger().settings().endpoint(),
            Some(DEFAULT_SYNC_ENDPOINT)
        );
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecorent.db");
        let transport = RecordingTransport::default();
        let config = Config::default();

        {
            let mut desk = RentalDesk::new(
                Storage::open(&path).unwrap(),
                Box::new(transport.clone()),
                &config,
            )
            .unwrap();
            desk.create(RentalModule::Vehicle, &vehicle_form())
                .await
                .unwrap();
        }

        let mut desk =
            RentalDesk::new(Storage::open(&path).unwrap(), Box::new(transport), &config).unwrap();
        assert_eq!(desk.ledger().contracts().len(), 1);
        assert_eq!(desk.ledger().last_client().unwrap().first_name, "Alejandro");

        let saved = desk
            .create(RentalModule::Vehicle, &vehicle_form())
            .await
            .unwrap();
        assert_eq!(saved.contract.contract_number, "000002");
    }
}
