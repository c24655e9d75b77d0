//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::form::ContractForm;
use crate::model::{Catalog, ClientProfile, RentalModule};

/// Contract form fields shared by `new` and `edit`.
///
/// Every field is optional on the command line; `new` fills the rest from
/// defaults, `edit` from the stored contract.
#[derive(Debug, Clone, Default, Args)]
pub struct ContractArgs {
    /// Client given name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Client surname
    #[arg(long)]
    pub last_name: Option<String>,

    /// Client email
    #[arg(long)]
    pub email: Option<String>,

    /// Client phone
    #[arg(long)]
    pub phone: Option<String>,

    /// Client country
    #[arg(long)]
    pub country: Option<String>,

    /// Client identity document
    #[arg(long)]
    pub dni: Option<String>,

    /// Catalog category id (e.g. AUTOS, BIKE_EB_CITY)
    #[arg(long)]
    pub category: Option<String>,

    /// Product name or catalog id
    #[arg(short, long)]
    pub product: Option<String>,

    /// Pickup date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Pickup time (HH:MM)
    #[arg(long)]
    pub start_time: Option<String>,

    /// Return date (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Return time (HH:MM)
    #[arg(long)]
    pub end_time: Option<String>,

    /// Rental duration; overrides the value derived from the schedule
    #[arg(short, long)]
    pub duration: Option<String>,

    /// Number of units
    #[arg(long)]
    pub quantity: Option<String>,

    /// Unit price; defaults to the catalog price
    #[arg(long)]
    pub price: Option<String>,

    /// Prefill client fields from the last submitted contract
    #[arg(long)]
    pub reuse_client: bool,

    /// Prefill client, price, quantity and duration with demo values
    #[arg(long)]
    pub sample: bool,
}

impl ContractArgs {
    /// Overlay the given fields onto `form`.
    ///
    /// Demo values and the last client are filled first; explicit fields win.
    ///
    /// A product given by catalog id is replaced by its name, and its category
    /// is used when none was given. Switching to another product or category
    /// without `--price` drops the old unit price so the catalog price is
    /// seeded again. A typed duration marks the duration as edited so the
    /// schedule does not override it.
    pub fn apply(self, form: &mut ContractForm, catalog: &Catalog, last_client: Option<&ClientProfile>) {
        if self.sample {
            form.fill_sample();
        }
        if self.reuse_client {
            if let Some(client) = last_client {
                form.fill_client(client);
            }
        }

        let overlay = |slot: &mut String, value: Option<String>| {
            if let Some(value) = value {
                *slot = value;
            }
        };
        overlay(&mut form.first_name, self.first_name);
        overlay(&mut form.last_name, self.last_name);
        overlay(&mut form.email, self.email);
        overlay(&mut form.phone, self.phone);
        overlay(&mut form.country, self.country);
        overlay(&mut form.dni, self.dni);
        overlay(&mut form.start_date, self.start_date);
        overlay(&mut form.start_time, self.start_time);

        let previous = (form.product.clone(), form.category.clone());
        if let Some(product) = self.product {
            match catalog.find_product(&product) {
                Some(found) => {
                    form.product.clone_from(&found.name);
                    if self.category.is_none() {
                        form.category.clone_from(&found.category);
                    }
                }
                None => form.product = product,
            }
        }
        overlay(&mut form.category, self.category);

        if self.end_date.is_some() {
            form.end_date = self.end_date;
        }
        if self.end_time.is_some() {
            form.end_time = self.end_time;
        }
        if self.duration.is_some() {
            form.duration = self.duration;
            form.duration_being_edited = true;
        }
        if self.quantity.is_some() {
            form.quantity = self.quantity;
        }
        if self.price.is_some() {
            form.price_unit = self.price;
        } else if previous != (form.product.clone(), form.category.clone()) {
            form.price_unit = None;
        }
    }
}

/// Arguments of `new`.
#[derive(Debug, Args)]
pub struct NewCommand {
    /// Business line of the contract
    #[arg(value_enum)]
    pub module: ModuleArg,

    /// Contract fields
    #[command(flatten)]
    pub contract: ContractArgs,
}

/// Arguments of `edit`.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Contract number or id
    pub key: String,

    /// Fields to change
    #[command(flatten)]
    pub contract: ContractArgs,
}

/// Arguments of `delete`.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Contract number or id
    pub key: String,

    /// Confirm the deletion
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments of commands that address a single contract.
#[derive(Debug, Args)]
pub struct ContractRef {
    /// Contract number or id
    pub key: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments of `history`.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Only show one business line
    #[arg(short, long, value_enum)]
    pub module: Option<ModuleArg>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments of `sync`.
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Contract number or id; all pending contracts when omitted
    pub key: Option<String>,
}

/// Catalog commands.
#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// List categories and products with their prices
    Show {
        /// Only show one business line
        #[arg(short, long, value_enum)]
        module: Option<ModuleArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change a product's unit price
    SetPrice {
        /// Product id or name
        product: String,

        /// New price; invalid input stores 0
        price: String,
    },
}

/// Settings commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the sync endpoint
    Show,

    /// Set the sync endpoint; an empty value restores the default
    SetEndpoint {
        /// Endpoint URL
        url: String,
    },

    /// Disable sync
    ClearEndpoint,
}

/// Client profile commands.
#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    /// Show the client of the last submitted contract
    Last {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Arguments of `export`.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Export format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ExportFormat,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Business line argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModuleArg {
    /// Cars and scooters
    Vehicle,
    /// Bikes and e-bikes
    Bike,
    /// Excursions and boats
    Tour,
}

impl From<ModuleArg> for RentalModule {
    fn from(arg: ModuleArg) -> Self {
        match arg {
            ModuleArg::Vehicle => Self::Vehicle,
            ModuleArg::Bike => Self::Bike,
            ModuleArg::Tour => Self::Tour,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    /// JSON array
    #[default]
    Json,
    /// CSV with header
    Csv,
}
