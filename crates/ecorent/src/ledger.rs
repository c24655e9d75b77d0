//! In-memory application state and the contract lifecycle.
//!
//! [`Ledger`] owns everything the desk persists: the ordered contract list,
//! the catalog, settings, the number counter and the last client profile.
//! Its methods are pure state transitions; persisting and syncing after each
//! one is the job of [`crate::desk::RentalDesk`].

use chrono::{DateTime, Local};
use tracing::{debug, info};
use uuid::Uuid;

use crate::form::ContractDraft;
use crate::model::{Catalog, ClientProfile, Contract, RentalModule, Settings};
use crate::pricing;

/// Application state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    contracts: Vec<Contract>,
    catalog: Catalog,
    settings: Settings,
    last_id: u64,
    last_client: Option<ClientProfile>,
}

impl Ledger {
    /// Rebuild state from persisted parts.
    #[must_use]
    pub fn restore(
        contracts: Vec<Contract>,
        catalog: Catalog,
        settings: Settings,
        last_id: u64,
        last_client: Option<ClientProfile>,
    ) -> Self {
        Self {
            contracts,
            catalog,
            settings,
            last_id,
            last_client,
        }
    }

    /// All contracts in creation order, deleted ones included.
    #[must_use]
    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    /// Active contracts in creation order.
    pub fn active(&self) -> impl DoubleEndedIterator<Item = &Contract> {
        self.contracts.iter().filter(|c| c.is_active())
    }

    /// Active contracts, newest first.
    pub fn history(&self) -> impl Iterator<Item = &Contract> {
        self.active().rev()
    }

    /// Ids of contracts not yet pushed, in creation order.
    #[must_use]
    pub fn pending(&self) -> Vec<Uuid> {
        self.contracts
            .iter()
            .filter(|c| !c.synced)
            .map(|c| c.id)
            .collect()
    }

    /// Sum of active totals.
    #[must_use]
    pub fn gross_total(&self) -> f64 {
        pricing::round_cents(self.active().map(|c| c.total).sum())
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable settings.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Last allocated contract sequence.
    #[must_use]
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    /// Client block of the last submitted form.
    #[must_use]
    pub fn last_client(&self) -> Option<&ClientProfile> {
        self.last_client.as_ref()
    }

    /// Look up a contract by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.id == id)
    }

    /// Look up a contract by id or contract number.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.matches_key(key))
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut Contract> {
        self.contracts.iter_mut().find(|c| c.id == id)
    }

    /// Sequence the next contract will receive.
    ///
    /// Never at or below a number already in the store, even if the counter
    /// document was lost.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        let highest = self
            .contracts
            .iter()
            .filter_map(Contract::sequence)
            .max()
            .unwrap_or(0);
        self.last_id.max(highest) + 1
    }

    /// Append a new contract built from `draft`.
    pub fn create(
        &mut self,
        module: RentalModule,
        draft: ContractDraft,
        now: DateTime<Local>,
    ) -> &Contract {
        let sequence = self.next_sequence();
        self.last_client = Some(draft.client.clone());
        let contract = Contract::new(sequence, module, draft, now);
        info!(
            "Created {} contract #{} total {}",
            module,
            contract.contract_number,
            pricing::format_amount(contract.total)
        );
        self.last_id = sequence;
        self.contracts.push(contract);
        &self.contracts[self.contracts.len() - 1]
    }

    /// Merge `draft` into an active contract and mark it for re-sync.
    ///
    /// Returns `None` (and changes nothing) when the id is unknown or the
    /// contract has been deleted.
    pub fn edit(
        &mut self,
        id: Uuid,
        draft: ContractDraft,
        now: DateTime<Local>,
    ) -> Option<&Contract> {
        let client = draft.client.clone();
        let Some(contract) = self.get_mut(id).filter(|c| c.is_active()) else {
            debug!("Edit of unknown or deleted contract {} ignored", id);
            return None;
        };
        contract.apply_draft(draft);
        contract.touch(now);
        contract.synced = false;
        info!(
            "Edited contract #{} total {}",
            contract.contract_number,
            pricing::format_amount(contract.total)
        );
        self.last_client = Some(client);
        self.get(id)
    }

    /// Soft-delete a contract.
    ///
    /// Returns `None` when the id is unknown or the contract is already deleted.
    pub fn soft_delete(&mut self, id: Uuid, now: DateTime<Local>) -> Option<&Contract> {
        let Some(contract) = self.get_mut(id).filter(|c| c.is_active()) else {
            debug!("Delete of unknown or deleted contract {} ignored", id);
            return None;
        };
        contract.mark_deleted(now);
        info!("Deleted contract #{}", contract.contract_number);
        Some(&*contract)
    }

    /// Record a confirmed push.
    ///
    /// Returns `false` if the id is unknown.
    pub fn mark_synced(&mut self, id: Uuid) -> bool {
        match self.get_mut(id) {
            Some(contract) => {
                contract.synced = true;
                true
            }
            None => false,
        }
    }

    /// Overwrite a catalog price from raw input (invalid input stores 0).
    ///
    /// Saved contracts keep their own unit price.
    pub fn set_product_price(&mut self, product_id: &str, raw_price: &str) -> bool {
        self.catalog.set_price(product_id, raw_price)
    }
}
