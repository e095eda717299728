mod cli;

use crate::cli::{Command, CLI};
use anyhow::Context;
use clap::Parser;
use detour_core::{RuleId, StatusTable};
use detour_registry::{Registry, RegistryService, SaveMode};
use detour_resolver::ResolverService;
use detour_storage::MySqlRuleStore;
use std::path::Path;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    detour_telemetry::init(config.log_format.into())?;

    let mysql_dsn = config
        .mysql_dsn
        .as_deref()
        .context("mysql dsn is required, pass --mysql-dsn or set DETOUR_MYSQL_DSN")?;
    let store = MySqlRuleStore::connect(mysql_dsn)
        .await
        .context("failed to connect to mysql")?;

    match config.command {
        Command::Migrate => {
            store.migrate().await?;
            info!("migrations applied");
        }
        Command::Save(args) => {
            let mode = args
                .id
                .map(RuleId::new)
                .map_or(SaveMode::Create, SaveMode::Update);
            let registry = RegistryService::new(store);
            let saved = registry.save(args.draft(), mode).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        Command::Get { id } => {
            let registry = RegistryService::new(store);
            match registry.get(RuleId::new(id)).await? {
                Some(rule) => println!("{}", serde_json::to_string_pretty(&rule)?),
                None => anyhow::bail!("redirect rule {id} not found"),
            }
        }
        Command::Delete { id } => {
            let registry = RegistryService::new(store);
            if !registry.delete(RuleId::new(id)).await? {
                anyhow::bail!("redirect rule {id} not found");
            }
        }
        Command::Resolve { path } => {
            let statuses = load_statuses(config.statuses.as_deref())?;
            let resolver = ResolverService::new(store, statuses);
            match resolver.resolve(&path).await? {
                Some(rule) => println!("{}", serde_json::to_string_pretty(&rule)?),
                None => println!("no redirect"),
            }
        }
    }

    Ok(())
}

fn load_statuses(path: Option<&Path>) -> anyhow::Result<StatusTable> {
    let Some(path) = path else {
        return Ok(StatusTable::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read status table {}", path.display()))?;
    let table: StatusTable = serde_json::from_str(&raw)
        .with_context(|| format!("invalid status table {}", path.display()))?;

    if table.is_empty() {
        warn!(path = %path.display(), "status table is empty, no redirect will be served");
    }
    Ok(table)
}
