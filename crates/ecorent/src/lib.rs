//! `ecorent` - Rental contract desk for a mobility rental business
//!
//! This library provides contract registration across the vehicle, bike and
//! tour lines, local document persistence, one-way sync to a spreadsheet
//! endpoint, and the invoice projection used for printing and sharing.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod desk;
pub mod error;
pub mod export;
pub mod form;
pub mod invoice;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod pricing;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use desk::{RentalDesk, Saved};
pub use error::{Error, Result, ValidationError};
pub use form::{ContractDraft, ContractForm, DurationMode};
pub use invoice::Invoice;
pub use ledger::Ledger;
pub use logging::init_logging;
pub use model::{Catalog, ClientProfile, Contract, RecordStatus, RentalModule, Settings};
pub use storage::{Storage, StorageStats};
pub use sync::{HttpTransport, SyncOutcome, SyncReport, SyncTransport};
