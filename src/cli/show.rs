//! `config` command: resolved backend settings and the stored configuration

use std::io::Write;

use crate::config::SystemConfig;
use crate::error::{ExpenseError, ExpenseResult};
use crate::models::Config;
use crate::storage::Storage;

/// Print backend settings and stored config to stdout
pub fn handle_config_command<S: Storage + ?Sized>(
    system: &SystemConfig,
    storage: &S,
) -> ExpenseResult<()> {
    let stdout = std::io::stdout();
    write_config(system, storage, &mut stdout.lock())
}

fn write_config<S, W>(system: &SystemConfig, storage: &S, out: &mut W) -> ExpenseResult<()>
where
    S: Storage + ?Sized,
    W: Write,
{
    let config = storage.get_config()?;
    let user = if system.storage_user.is_empty() {
        "(none)"
    } else {
        system.storage_user.as_str()
    };

    render(out, system, &config, user).map_err(|e| ExpenseError::Io(e.to_string()))
}

fn render<W: Write>(
    out: &mut W,
    system: &SystemConfig,
    config: &Config,
    user: &str,
) -> std::io::Result<()> {
    writeln!(out, "Expense Store Configuration")?;
    writeln!(out, "===========================")?;
    writeln!(out, "Storage backend: {}", system.storage_type)?;
    writeln!(out, "Storage URL:     {}", system.storage_url)?;
    writeln!(out, "SSL mode:        {}", system.storage_ssl)?;
    writeln!(out, "Storage user:    {}", user)?;
    writeln!(out)?;
    writeln!(out, "Currency:        {}", config.currency)?;
    writeln!(out, "Start date:      {}", config.start_date)?;
    writeln!(out, "Categories:      {}", config.categories.join(", "))?;
    writeln!(out, "Recurring:       {}", config.recurring_expenses.len())?;
    Ok(())
}
