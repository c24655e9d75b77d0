//! Core record types: contracts, the product catalog and settings.

pub mod catalog;
pub mod contract;
pub mod settings;

pub use catalog::{Catalog, Category, Product};
pub use contract::{ClientProfile, Contract, RecordStatus, RentalModule};
pub use settings::Settings;
