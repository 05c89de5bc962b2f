//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `lorekeep_core` linkage, configuration and schema bootstrap.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Reads `LOREKEEP_DB_PATH`, `LOREKEEP_LOG_LEVEL` and `LOREKEEP_LOG_DIR`.

use log::info;
use lorekeep_core::{CoreConfig, ProjectService, SqliteStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("lorekeep: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env();
    config.init_logging()?;

    let conn = config
        .open_connection()
        .map_err(|err| format!("failed to open database: {err}"))?;
    let store = SqliteStore::try_new(&conn).map_err(|err| format!("store not ready: {err}"))?;
    let schema_version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .map_err(|err| format!("failed to read schema version: {err}"))?;
    // Owner 0 is never a real user; the listing only proves the store answers.
    let projects = ProjectService::new(&store)
        .list_by_owner(0)
        .map_err(|err| format!("store query failed: {err}"))?;
    info!(
        "event=cli_smoke module=cli status=ok in_memory={} schema_version={}",
        config.is_in_memory(),
        schema_version
    );

    println!("lorekeep_core ping={}", lorekeep_core::ping());
    println!("lorekeep_core version={}", lorekeep_core::core_version());
    println!("lorekeep_core schema_version={schema_version}");
    println!(
        "lorekeep_core storage={}",
        if config.is_in_memory() { "memory" } else { "file" }
    );
    println!("lorekeep_core owner_projects={}", projects.len());
    Ok(())
}
