//! `ecorent` - CLI for the rental contract desk
//!
//! This binary registers, edits and deletes contracts, prints invoices and
//! share links, and pushes records to the sync endpoint.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use clap::Parser;

use ecorent::cli::{
    CatalogCommand, Cli, ClientCommand, Command, ConfigCommand, ContractRef, DeleteCommand,
    DeskCommand, EditCommand, ExportCommand, ExportFormat, HistoryCommand, NewCommand,
    OutputFormat, SettingsCommand, SyncCommand,
};
use ecorent::config::TIME_FORMAT;
use ecorent::export::{self, Summary};
use ecorent::form::DATE_FORMAT;
use ecorent::invoice::{self, Invoice};
use ecorent::pricing::format_amount;
use ecorent::{init_logging, Config, Contract, ContractForm, RentalDesk, RentalModule, Saved};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Only desk commands open the database
    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        Command::Support => {
            println!(
                "{}",
                invoice::support_link(
                    &config.invoice.share_base_url,
                    &config.invoice.support_phone
                )?
            );
            Ok(())
        }
        Command::Desk(command) => {
            let mut desk = RentalDesk::open(&config)?;
            run(&mut desk, &config, command).await
        }
    }
}

async fn run(desk: &mut RentalDesk, config: &Config, command: DeskCommand) -> anyhow::Result<()> {
    match command {
        DeskCommand::New(cmd) => handle_new(desk, config, cmd).await,
        DeskCommand::Edit(cmd) => handle_edit(desk, config, cmd).await,
        DeskCommand::Delete(cmd) => handle_delete(desk, cmd).await,
        DeskCommand::Show(cmd) => handle_show(desk, &cmd),
        DeskCommand::History(cmd) => handle_history(desk, &cmd),
        DeskCommand::Invoice(cmd) => handle_invoice(desk, config, &cmd),
        DeskCommand::Qr(cmd) => {
            let contract = find(desk, &cmd.key)?;
            println!(
                "{}",
                invoice::qr_payload(contract, config.contracts.duration_mode)
            );
            Ok(())
        }
        DeskCommand::Share(cmd) => {
            let contract = find(desk, &cmd.key)?;
            println!(
                "{}",
                invoice::share_link(
                    contract,
                    &config.invoice.share_base_url,
                    &config.invoice.currency_symbol
                )?
            );
            Ok(())
        }
        DeskCommand::Sync(cmd) => handle_sync(desk, cmd).await,
        DeskCommand::Catalog(cmd) => handle_catalog(desk, config, cmd),
        DeskCommand::Settings(cmd) => handle_settings(desk, cmd),
        DeskCommand::Client(ClientCommand::Last { json }) => handle_last_client(desk, json),
        DeskCommand::Export(cmd) => handle_export(desk, cmd),
        DeskCommand::Status(cmd) => handle_status(desk, config, cmd.json),
    }
}

fn find<'a>(desk: &'a RentalDesk, key: &str) -> anyhow::Result<&'a Contract> {
    desk.ledger()
        .find(key)
        .ok_or_else(|| anyhow!("no contract matches '{key}'"))
}

fn report_saved(saved: &Saved, config: &Config, verb: &str) {
    let c = &saved.contract;
    println!(
        "{verb} contract #{} for {} ({}{})",
        c.contract_number,
        c.client.full_name(),
        config.invoice.currency_symbol,
        format_amount(c.total)
    );
    if saved.sync.is_synced() {
        println!("Synced to endpoint.");
    } else {
        println!("Not synced; run `ecorent sync` to retry.");
    }
}

async fn handle_new(desk: &mut RentalDesk, config: &Config, cmd: NewCommand) -> anyhow::Result<()> {
    let now = Local::now();
    let mut form = ContractForm {
        start_date: now.format(DATE_FORMAT).to_string(),
        start_time: now.format(TIME_FORMAT).to_string(),
        ..ContractForm::default()
    };
    cmd.contract
        .apply(&mut form, desk.ledger().catalog(), desk.ledger().last_client());

    let saved = desk.create(RentalModule::from(cmd.module), &form).await?;
    report_saved(&saved, config, "Registered");
    println!();
    print!("{}", Invoice::new(&saved.contract, config).render_text());
    Ok(())
}

async fn handle_edit(desk: &mut RentalDesk, config: &Config, cmd: EditCommand) -> anyhow::Result<()> {
    let existing = find(desk, &cmd.key)?;
    if existing.is_deleted() {
        bail!("contract #{} is deleted and cannot be edited", existing.contract_number);
    }
    let mut form = ContractForm::from_contract(existing);
    cmd.contract
        .apply(&mut form, desk.ledger().catalog(), desk.ledger().last_client());

    let saved = desk
        .edit(&cmd.key, &form)
        .await?
        .ok_or_else(|| anyhow!("no active contract matches '{}'", cmd.key))?;
    report_saved(&saved, config, "Updated");
    Ok(())
}

async fn handle_delete(desk: &mut RentalDesk, cmd: DeleteCommand) -> anyhow::Result<()> {
    let contract = find(desk, &cmd.key)?;
    if !cmd.yes {
        println!(
            "This will mark contract #{} ({}) as deleted.",
            contract.contract_number,
            contract.client.full_name()
        );
        println!("Use --yes to confirm.");
        return Ok(());
    }

    match desk.delete(&cmd.key).await? {
        Some(saved) => println!("Contract #{} deleted.", saved.contract.contract_number),
        None => println!("Contract is already deleted."),
    }
    Ok(())
}

fn handle_show(desk: &RentalDesk, cmd: &ContractRef) -> anyhow::Result<()> {
    let c = find(desk, &cmd.key)?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(c)?);
        return Ok(());
    }

    println!("Contract #{} [{}]", c.contract_number, c.module.label());
    if c.is_deleted() {
        println!("  Status:    DELETED");
    }
    println!("  Id:        {}", c.id);
    println!("  Created:   {}", c.created_full);
    if let Some(updated) = &c.updated_at {
        println!("  Updated:   {updated}");
    }
    println!("  Client:    {} <{}> {}", c.client.full_name(), c.client.email, c.client.phone);
    let category = desk
        .ledger()
        .catalog()
        .category(&c.category)
        .map_or(c.category.as_str(), |cat| cat.name.as_str());
    println!("  Product:   {} ({})", c.product, category);
    println!("  Pickup:    {}", c.pickup().format("%Y-%m-%d %H:%M"));
    println!("  Return:    {}", c.return_at().format("%Y-%m-%d %H:%M"));
    println!(
        "  Price:     {} x {} x {} = {}",
        format_amount(c.price_unit),
        c.quantity,
        c.duration,
        format_amount(c.total)
    );
    println!("  Synced:    {}", if c.synced { "yes" } else { "no" });
    if !c.notes.is_empty() {
        println!("  Notes:     {}", c.notes);
    }
    Ok(())
}

fn handle_history(desk: &RentalDesk, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let module = cmd.module.map(RentalModule::from);
    let contracts: Vec<&Contract> = desk
        .ledger()
        .history()
        .filter(|c| module.map_or(true, |m| c.module == m))
        .take(cmd.limit.unwrap_or(usize::MAX))
        .collect();

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&contracts)?),
        OutputFormat::Plain => {
            for c in &contracts {
                println!(
                    "#{} {} {} {}",
                    c.contract_number,
                    c.client.full_name(),
                    c.product,
                    format_amount(c.total)
                );
            }
        }
        OutputFormat::Table => {
            if contracts.is_empty() {
                println!("No active contracts.");
                return Ok(());
            }
            println!(
                "{:<8} {:<8} {:<24} {:<28} {:>10} {:<6}",
                "NUMBER", "MODULE", "CLIENT", "PRODUCT", "TOTAL", "SYNCED"
            );
            for c in &contracts {
                println!(
                    "{:<8} {:<8} {:<24} {:<28} {:>10} {:<6}",
                    c.contract_number,
                    c.module.to_string(),
                    truncate(&c.client.full_name(), 24),
                    truncate(&c.product, 28),
                    format_amount(c.total),
                    if c.synced { "yes" } else { "no" }
                );
            }
        }
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

fn handle_invoice(desk: &RentalDesk, config: &Config, cmd: &ContractRef) -> anyhow::Result<()> {
    let invoice = Invoice::new(find(desk, &cmd.key)?, config);
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&invoice)?);
    } else {
        print!("{}", invoice.render_text());
    }
    Ok(())
}

async fn handle_sync(desk: &mut RentalDesk, cmd: SyncCommand) -> anyhow::Result<()> {
    if let Some(key) = cmd.key {
        let outcome = desk
            .sync_key(&key)
            .await?
            .ok_or_else(|| anyhow!("no contract matches '{key}'"))?;
        if outcome.is_synced() {
            println!("Contract synced.");
        } else {
            println!("Sync failed; the contract stays pending.");
        }
        return Ok(());
    }

    match desk.sync_pending().await {
        Ok(report) if report.attempted == 0 => println!("Nothing to sync."),
        Ok(report) => println!(
            "Synced {} of {} pending contracts ({} failed).",
            report.synced,
            report.attempted,
            report.failed()
        ),
        Err(e) if e.is_sync_not_configured() => {
            println!("No sync endpoint configured. Use `ecorent settings set-endpoint <url>`.");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn handle_catalog(desk: &mut RentalDesk, config: &Config, cmd: CatalogCommand) -> anyhow::Result<()> {
    match cmd {
        CatalogCommand::Show { module, json } => {
            let catalog = desk.ledger().catalog();
            if json {
                println!("{}", serde_json::to_string_pretty(catalog)?);
                return Ok(());
            }
            let modules: Vec<RentalModule> = match module {
                Some(m) => vec![m.into()],
                None => RentalModule::ALL.to_vec(),
            };
            for module in modules {
                println!("[{}]", module.label());
                for category in catalog.categories_for(module) {
                    println!("  {} ({})", category.name, category.id);
                    for product in catalog.products_in(&category.id) {
                        println!(
                            "    {:>3}  {:<32} {}{}",
                            product.id,
                            product.name,
                            config.invoice.currency_symbol,
                            format_amount(product.price)
                        );
                    }
                }
            }
        }
        CatalogCommand::SetPrice { product, price } => {
            let id = desk
                .ledger()
                .catalog()
                .find_product(&product)
                .map(|p| p.id.clone())
                .ok_or_else(|| anyhow!("no product matches '{product}'"))?;
            desk.set_product_price(&id, &price)?;
            if let Some(p) = desk.ledger().catalog().product(&id) {
                println!(
                    "{} now costs {}{}",
                    p.name,
                    config.invoice.currency_symbol,
                    format_amount(p.price)
                );
            }
        }
    }
    Ok(())
}

fn handle_settings(desk: &mut RentalDesk, cmd: SettingsCommand) -> anyhow::Result<()> {
    match cmd {
        SettingsCommand::Show => {}
        SettingsCommand::SetEndpoint { url } => desk.set_endpoint(&url)?,
        SettingsCommand::ClearEndpoint => desk.clear_endpoint()?,
    }
    match desk.ledger().settings().endpoint() {
        Some(url) => println!("Sync endpoint: {url}"),
        None => println!("Sync endpoint: (not configured)"),
    }
    Ok(())
}

fn handle_last_client(desk: &RentalDesk, json: bool) -> anyhow::Result<()> {
    let Some(client) = desk.ledger().last_client() else {
        println!("No client data saved yet.");
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(client)?);
    } else {
        println!("Name:     {}", client.full_name());
        println!("Email:    {}", client.email);
        println!("Phone:    {}", client.phone);
        println!("Country:  {}", client.country.as_deref().unwrap_or("-"));
        println!("Document: {}", client.dni.as_deref().unwrap_or("-"));
    }
    Ok(())
}

fn handle_export(desk: &RentalDesk, cmd: ExportCommand) -> anyhow::Result<()> {
    let writer: Box<dyn Write> = match &cmd.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    match cmd.format {
        ExportFormat::Json => export::export_json(desk.ledger(), writer)?,
        ExportFormat::Csv => export::export_csv(desk.ledger(), writer)?,
    }
    if let Some(path) = cmd.output {
        eprintln!(
            "Exported {} records to {}",
            desk.ledger().contracts().len(),
            path.display()
        );
    }
    Ok(())
}

fn handle_status(desk: &RentalDesk, config: &Config, json: bool) -> anyhow::Result<()> {
    let summary = Summary::from_ledger(desk.ledger());
    let stats = desk.storage().stats()?;

    if json {
        let status = serde_json::json!({
            "summary": summary,
            "mode": desk.mode(),
            "database_path": desk.storage().path(),
            "documents": stats.documents,
            "db_size_bytes": stats.db_size_bytes,
            "last_saved": stats.last_saved,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("ecorent status");
    println!("--------------");
    println!(
        "Gross total:   {}{}",
        config.invoice.currency_symbol,
        format_amount(summary.gross_total)
    );
    println!("Active:        {}", summary.active);
    for count in &summary.by_module {
        println!("  {:<12} {}", count.module.label(), count.active);
    }
    println!("Deleted:       {}", summary.deleted);
    println!("Pending sync:  {}", summary.pending_sync);
    println!(
        "Endpoint:      {}",
        if summary.endpoint_configured { "configured" } else { "not configured" }
    );
    println!("Duration mode: {}", desk.mode());
    println!("Database:      {}", desk.storage().path().display());
    if let Some(saved) = stats.last_saved {
        println!("Last saved:    {}", saved.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Sync]");
                println!("  Default endpoint:   {}", config.sync.default_endpoint);
                println!("  Timeout (secs):     {}", config.sync.timeout_secs);
                println!();
                println!("[Contracts]");
                println!("  Duration mode:      {}", config.contracts.duration_mode);
                println!(
                    "  Default return:     {}",
                    config.contracts.default_return_time
                );
                println!();
                println!("[Company]");
                println!("  Name:               {}", config.company.name);
                println!("  Address:            {}", config.company.address);
                println!();
                println!("[Invoice]");
                println!("  Currency:           {}", config.invoice.currency_symbol);
                println!("  Share URL:          {}", config.invoice.share_base_url);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
