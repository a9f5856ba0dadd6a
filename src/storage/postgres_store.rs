//! PostgreSQL store
//!
//! Three tables: a single-row `config`, `recurring_expenses` and `expenses`.
//! One client behind a mutex serializes access; multi-statement operations
//! run inside a transaction.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use postgres::config::SslMode as PgSslMode;
use postgres::{Client, GenericClient, NoTls, Row};
use tracing::{debug, info};

use crate::config::{resolve_base_config, SslMode, SystemConfig};
use crate::error::{ExpenseError, ExpenseResult};
use crate::models::{Config, Expense, RecurringExpense};
use crate::validation;

use super::{prepare_expense, prepare_recurring, Storage};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS config (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        categories TEXT[] NOT NULL DEFAULT '{}',
        currency TEXT NOT NULL,
        start_date INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS recurring_expenses (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        amount DOUBLE PRECISION NOT NULL,
        currency TEXT NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        category TEXT NOT NULL,
        start_date TIMESTAMPTZ NOT NULL,
        recurrence_interval TEXT NOT NULL,
        occurrences BIGINT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS expenses (
        id TEXT PRIMARY KEY,
        recurring_id TEXT NOT NULL DEFAULT '',
        name TEXT NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        category TEXT NOT NULL,
        amount DOUBLE PRECISION NOT NULL,
        currency TEXT NOT NULL,
        date TIMESTAMPTZ NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_expenses_recurring_id
        ON expenses(recurring_id);
";

const SELECT_EXPENSES: &str = "SELECT id, recurring_id, name, tags, category, amount, currency, date
     FROM expenses";

const SELECT_RECURRING: &str =
    "SELECT id, name, amount, currency, tags, category, start_date, recurrence_interval, occurrences
     FROM recurring_expenses";

const INSERT_EXPENSE: &str = "INSERT INTO expenses
     (id, recurring_id, name, tags, category, amount, currency, date)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

/// Store backed by a PostgreSQL database
pub struct PostgresStore {
    client: Mutex<Option<Client>>,
}

impl PostgresStore {
    /// Connect and prepare the schema, seeding the config row when absent
    pub fn connect(system: &SystemConfig) -> ExpenseResult<Self> {
        Self::connect_with(system, resolve_base_config)
    }

    /// Connect, seeding a missing config row from `seed`
    pub fn connect_with<F>(system: &SystemConfig, seed: F) -> ExpenseResult<Self>
    where
        F: FnOnce() -> ExpenseResult<Config>,
    {
        let config = connection_config(system)?;
        let client = config
            .connect(NoTls)
            .map_err(|e| ExpenseError::Storage(format!("PostgreSQL connection failed: {}", e)))?;

        let store = Self {
            client: Mutex::new(Some(client)),
        };
        store.init_schema(seed)?;

        info!(url = %system.storage_url, "Opened PostgreSQL store");
        Ok(store)
    }

    fn init_schema<F>(&self, seed: F) -> ExpenseResult<()>
    where
        F: FnOnce() -> ExpenseResult<Config>,
    {
        self.with_client(|client| {
            client.batch_execute(SCHEMA)?;

            let mut tx = client.transaction()?;
            let seeded = tx
                .query_opt("SELECT 1 FROM config WHERE id = 1", &[])?
                .is_some();
            if !seeded {
                let base = seed()?;
                tx.execute(
                    "INSERT INTO config (id, categories, currency, start_date) VALUES (1, $1, $2, $3)",
                    &[&base.categories, &base.currency, &to_db_day(base.start_date)?],
                )?;
                for template in &base.recurring_expenses {
                    insert_recurring(&mut tx, template)?;
                }
                info!("Seeded config row");
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn with_client<T, F>(&self, f: F) -> ExpenseResult<T>
    where
        F: FnOnce(&mut Client) -> ExpenseResult<T>,
    {
        let mut guard = self.client.lock().map_err(|e| {
            ExpenseError::Storage(format!("Failed to acquire client lock: {}", e))
        })?;
        let client = guard
            .as_mut()
            .ok_or_else(|| ExpenseError::Storage("store is closed".into()))?;
        f(client)
    }
}

/// Build the connection settings from the bootstrap config
///
/// `storage_url` may be `host[:port]/db` or a full `postgres://` URL.
fn connection_config(system: &SystemConfig) -> ExpenseResult<postgres::Config> {
    if system.storage_ssl != SslMode::Disable {
        return Err(ExpenseError::Config(format!(
            "STORAGE_SSL={} needs a TLS connector, which is not available; use 'disable'",
            system.storage_ssl
        )));
    }

    let url = system.storage_url.trim();
    let target = if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        url.to_string()
    } else {
        format!("postgresql://{}", url)
    };

    let mut config: postgres::Config = target
        .parse()
        .map_err(|e: postgres::Error| ExpenseError::Config(format!("Invalid STORAGE_URL: {}", e)))?;
    if !system.storage_user.is_empty() {
        config.user(&system.storage_user);
    }
    if !system.storage_pass.is_empty() {
        config.password(&system.storage_pass);
    }
    config.ssl_mode(PgSslMode::Disable);
    Ok(config)
}

fn to_db_day(day: u32) -> ExpenseResult<i32> {
    i32::try_from(day).map_err(|_| ExpenseError::InvalidStartDate(i64::from(day)))
}

fn expense_from_row(row: &Row) -> ExpenseResult<Expense> {
    Ok(Expense {
        id: row.try_get("id")?,
        recurring_id: row.try_get("recurring_id")?,
        name: row.try_get("name")?,
        tags: row.try_get("tags")?,
        category: row.try_get("category")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        date: Some(row.try_get::<_, DateTime<Utc>>("date")?),
    })
}

fn recurring_from_row(row: &Row) -> ExpenseResult<RecurringExpense> {
    let occurrences: i64 = row.try_get("occurrences")?;
    Ok(RecurringExpense {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        tags: row.try_get("tags")?,
        category: row.try_get("category")?,
        start_date: Some(row.try_get::<_, DateTime<Utc>>("start_date")?),
        interval: row.try_get("recurrence_interval")?,
        occurrences: u32::try_from(occurrences).map_err(|_| {
            ExpenseError::Storage(format!("occurrence count out of range: {}", occurrences))
        })?,
    })
}

fn load_recurring(client: &mut impl GenericClient) -> ExpenseResult<Vec<RecurringExpense>> {
    let query = format!("{} ORDER BY start_date ASC, id COLLATE \"C\" ASC", SELECT_RECURRING);
    client
        .query(query.as_str(), &[])?
        .iter()
        .map(recurring_from_row)
        .collect()
}

fn configured_currency(client: &mut impl GenericClient) -> ExpenseResult<String> {
    let row = client.query_one("SELECT currency FROM config WHERE id = 1", &[])?;
    Ok(row.try_get("currency")?)
}

fn expense_exists(client: &mut impl GenericClient, id: &str) -> ExpenseResult<bool> {
    Ok(client
        .query_opt("SELECT 1 FROM expenses WHERE id = $1", &[&id])?
        .is_some())
}

fn recurring_exists(client: &mut impl GenericClient, id: &str) -> ExpenseResult<bool> {
    Ok(client
        .query_opt("SELECT 1 FROM recurring_expenses WHERE id = $1", &[&id])?
        .is_some())
}

fn insert_expense(client: &mut impl GenericClient, expense: &Expense) -> ExpenseResult<()> {
    if expense_exists(client, &expense.id)? {
        return Err(ExpenseError::duplicate_expense(expense.id.clone()));
    }
    client.execute(
        INSERT_EXPENSE,
        &[
            &expense.id,
            &expense.recurring_id,
            &expense.name,
            &expense.tags,
            &expense.category,
            &expense.amount,
            &expense.currency,
            &expense.date,
        ],
    )?;
    Ok(())
}

fn insert_recurring(client: &mut impl GenericClient, template: &RecurringExpense) -> ExpenseResult<()> {
    if recurring_exists(client, &template.id)? {
        return Err(ExpenseError::duplicate_recurring_expense(template.id.clone()));
    }
    client.execute(
        "INSERT INTO recurring_expenses
         (id, name, amount, currency, tags, category, start_date, recurrence_interval, occurrences)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        &[
            &template.id,
            &template.name,
            &template.amount,
            &template.currency,
            &template.tags,
            &template.category,
            &template.start_date,
            &template.interval,
            &i64::from(template.occurrences),
        ],
    )?;
    Ok(())
}

impl Storage for PostgresStore {
    fn close(&self) -> ExpenseResult<()> {
        let mut guard = self.client.lock().map_err(|e| {
            ExpenseError::Storage(format!("Failed to acquire client lock: {}", e))
        })?;
        if let Some(client) = guard.take() {
            client.close()?;
            info!("Closed PostgreSQL store");
        }
        Ok(())
    }

    fn get_config(&self) -> ExpenseResult<Config> {
        self.with_client(|client| {
            let row = client.query_one(
                "SELECT categories, currency, start_date FROM config WHERE id = 1",
                &[],
            )?;
            let start_date: i32 = row.try_get("start_date")?;
            Ok(Config {
                categories: row.try_get("categories")?,
                currency: row.try_get("currency")?,
                start_date: u32::try_from(start_date)
                    .map_err(|_| ExpenseError::InvalidStartDate(i64::from(start_date)))?,
                recurring_expenses: load_recurring(client)?,
            })
        })
    }

    fn update_categories(&self, categories: &[String]) -> ExpenseResult<()> {
        let categories = validation::validate_categories(categories)?;
        self.with_client(|client| {
            client.execute("UPDATE config SET categories = $1 WHERE id = 1", &[&categories])?;
            Ok(())
        })?;
        debug!("Updated categories");
        Ok(())
    }

    fn update_currency(&self, currency: &str) -> ExpenseResult<()> {
        let currency = validation::validate_currency(currency)?;
        self.with_client(|client| {
            client.execute("UPDATE config SET currency = $1 WHERE id = 1", &[&currency])?;
            Ok(())
        })?;
        debug!("Updated currency");
        Ok(())
    }

    fn update_start_date(&self, day: u32) -> ExpenseResult<()> {
        let day = to_db_day(validation::validate_start_date(i64::from(day))?)?;
        self.with_client(|client| {
            client.execute("UPDATE config SET start_date = $1 WHERE id = 1", &[&day])?;
            Ok(())
        })?;
        debug!(day, "Updated start date");
        Ok(())
    }

    fn get_recurring_expenses(&self) -> ExpenseResult<Vec<RecurringExpense>> {
        self.with_client(|client| load_recurring(client))
    }

    fn get_recurring_expense(&self, id: &str) -> ExpenseResult<RecurringExpense> {
        self.with_client(|client| {
            let query = format!("{} WHERE id = $1", SELECT_RECURRING);
            match client.query_opt(query.as_str(), &[&id])? {
                Some(row) => recurring_from_row(&row),
                None => Err(ExpenseError::recurring_expense_not_found(id)),
            }
        })
    }

    fn add_recurring_expense(&self, template: RecurringExpense) -> ExpenseResult<RecurringExpense> {
        let stored = self.with_client(|client| {
            let mut tx = client.transaction()?;
            let prepared = prepare_recurring(&template, &configured_currency(&mut tx)?)?;
            insert_recurring(&mut tx, &prepared)?;
            tx.commit()?;
            Ok(prepared)
        })?;
        debug!(id = %stored.id, "Added recurring expense");
        Ok(stored)
    }

    fn remove_recurring_expense(&self, id: &str, remove_all: bool) -> ExpenseResult<()> {
        let removed = self.with_client(|client| {
            let mut tx = client.transaction()?;
            if tx.execute("DELETE FROM recurring_expenses WHERE id = $1", &[&id])? == 0 {
                return Err(ExpenseError::recurring_expense_not_found(id));
            }
            let removed = if remove_all {
                tx.execute("DELETE FROM expenses WHERE recurring_id = $1", &[&id])?
            } else {
                tx.execute(
                    "DELETE FROM expenses WHERE recurring_id = $1 AND date > $2",
                    &[&id, &Utc::now()],
                )?
            };
            tx.commit()?;
            Ok(removed)
        })?;
        debug!(id, removed, "Removed recurring expense");
        Ok(())
    }

    fn update_recurring_expense(
        &self,
        id: &str,
        template: RecurringExpense,
        update_all: bool,
    ) -> ExpenseResult<()> {
        let updated = self.with_client(|client| {
            let mut tx = client.transaction()?;
            let mut prepared = prepare_recurring(&template, &configured_currency(&mut tx)?)?;
            prepared.id = id.to_string();

            let changed = tx.execute(
                "UPDATE recurring_expenses
                 SET name = $2, amount = $3, currency = $4, tags = $5, category = $6,
                     start_date = $7, recurrence_interval = $8, occurrences = $9
                 WHERE id = $1",
                &[
                    &prepared.id,
                    &prepared.name,
                    &prepared.amount,
                    &prepared.currency,
                    &prepared.tags,
                    &prepared.category,
                    &prepared.start_date,
                    &prepared.interval,
                    &i64::from(prepared.occurrences),
                ],
            )?;
            if changed == 0 {
                return Err(ExpenseError::recurring_expense_not_found(id));
            }

            let children = "UPDATE expenses
                 SET name = $2, amount = $3, currency = $4, tags = $5, category = $6
                 WHERE recurring_id = $1";
            let updated = if update_all {
                tx.execute(
                    children,
                    &[
                        &prepared.id,
                        &prepared.name,
                        &prepared.amount,
                        &prepared.currency,
                        &prepared.tags,
                        &prepared.category,
                    ],
                )?
            } else {
                let query = format!("{} AND date > $7", children);
                tx.execute(
                    query.as_str(),
                    &[
                        &prepared.id,
                        &prepared.name,
                        &prepared.amount,
                        &prepared.currency,
                        &prepared.tags,
                        &prepared.category,
                        &Utc::now(),
                    ],
                )?
            };
            tx.commit()?;
            Ok(updated)
        })?;
        debug!(id, updated, "Updated recurring expense");
        Ok(())
    }

    fn get_all_expenses(&self) -> ExpenseResult<Vec<Expense>> {
        self.with_client(|client| {
            let query = format!("{} ORDER BY date DESC, id COLLATE \"C\" ASC", SELECT_EXPENSES);
            client
                .query(query.as_str(), &[])?
                .iter()
                .map(expense_from_row)
                .collect()
        })
    }

    fn get_expense(&self, id: &str) -> ExpenseResult<Expense> {
        self.with_client(|client| {
            let query = format!("{} WHERE id = $1", SELECT_EXPENSES);
            match client.query_opt(query.as_str(), &[&id])? {
                Some(row) => expense_from_row(&row),
                None => Err(ExpenseError::expense_not_found(id)),
            }
        })
    }

    fn add_expense(&self, expense: Expense) -> ExpenseResult<Expense> {
        let stored = self.with_client(|client| {
            let mut tx = client.transaction()?;
            let prepared = prepare_expense(&expense, &configured_currency(&mut tx)?)?;
            insert_expense(&mut tx, &prepared)?;
            tx.commit()?;
            Ok(prepared)
        })?;
        debug!(id = %stored.id, "Added expense");
        Ok(stored)
    }

    fn add_multiple_expenses(&self, expenses: Vec<Expense>) -> ExpenseResult<Vec<Expense>> {
        let stored = self.with_client(|client| {
            let mut tx = client.transaction()?;
            let currency = configured_currency(&mut tx)?;
            let prepared = expenses
                .iter()
                .map(|expense| prepare_expense(expense, &currency))
                .collect::<ExpenseResult<Vec<_>>>()?;
            for expense in &prepared {
                insert_expense(&mut tx, expense)?;
            }
            tx.commit()?;
            Ok(prepared)
        })?;
        debug!(count = stored.len(), "Added expenses");
        Ok(stored)
    }

    fn remove_expense(&self, id: &str) -> ExpenseResult<()> {
        self.with_client(|client| {
            if client.execute("DELETE FROM expenses WHERE id = $1", &[&id])? == 0 {
                return Err(ExpenseError::expense_not_found(id));
            }
            Ok(())
        })?;
        debug!(id, "Removed expense");
        Ok(())
    }

    fn remove_multiple_expenses(&self, ids: &[String]) -> ExpenseResult<()> {
        let removed = self.with_client(|client| {
            Ok(client.execute("DELETE FROM expenses WHERE id = ANY($1)", &[&ids])?)
        })?;
        debug!(requested = ids.len(), removed, "Removed expenses");
        Ok(())
    }

    fn update_expense(&self, id: &str, expense: Expense) -> ExpenseResult<Expense> {
        let stored = self.with_client(|client| {
            let mut tx = client.transaction()?;
            let mut prepared = prepare_expense(&expense, &configured_currency(&mut tx)?)?;
            let row = tx
                .query_opt("SELECT recurring_id FROM expenses WHERE id = $1", &[&id])?
                .ok_or_else(|| ExpenseError::expense_not_found(id))?;

            prepared.id = id.to_string();
            prepared.recurring_id = row.try_get("recurring_id")?;
            tx.execute(
                "UPDATE expenses
                 SET name = $2, tags = $3, category = $4, amount = $5, currency = $6, date = $7
                 WHERE id = $1",
                &[
                    &prepared.id,
                    &prepared.name,
                    &prepared.tags,
                    &prepared.category,
                    &prepared.amount,
                    &prepared.currency,
                    &prepared.date,
                ],
            )?;
            tx.commit()?;
            Ok(prepared)
        })?;
        debug!(id, "Updated expense");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendType;
    use crate::models::Interval;
    use chrono::{Duration, TimeZone};

    fn system(url: &str) -> SystemConfig {
        SystemConfig {
            storage_type: BackendType::Postgres,
            storage_url: url.to_string(),
            ..SystemConfig::default()
        }
    }

    #[test]
    fn test_connection_config_from_host_and_db() {
        let mut settings = system("db.local:5433/expenses");
        settings.storage_user = "owl".into();
        settings.storage_pass = "s3cret".into();

        let config = connection_config(&settings).unwrap();
        assert_eq!(config.get_dbname(), Some("expenses"));
        assert_eq!(config.get_user(), Some("owl"));
        assert_eq!(config.get_ports(), &[5433]);
        assert_eq!(config.get_password(), Some(&b"s3cret"[..]));
    }

    #[test]
    fn test_connection_config_accepts_full_url() {
        let config = connection_config(&system("postgres://app@localhost/ledger")).unwrap();
        assert_eq!(config.get_dbname(), Some("ledger"));
        assert_eq!(config.get_user(), Some("app"));
    }

    #[test]
    fn test_tls_modes_rejected() {
        for mode in [SslMode::Require, SslMode::VerifyFull, SslMode::VerifyCa] {
            let mut settings = system("localhost/expenses");
            settings.storage_ssl = mode;
            assert!(matches!(
                connection_config(&settings),
                Err(ExpenseError::Config(_))
            ));
        }
    }

    /// Runs against a live database when `EXPENSE_TEST_POSTGRES_URL` is set
    #[test]
    fn test_live_round_trip() {
        let Ok(url) = std::env::var("EXPENSE_TEST_POSTGRES_URL") else {
            return;
        };
        let store = PostgresStore::connect_with(&system(&url), || Ok(Config::default())).unwrap();

        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let template = store
            .add_recurring_expense(RecurringExpense::new(
                "Rent",
                "Housing",
                1200.0,
                start,
                Interval::Monthly,
                12,
            ))
            .unwrap();

        let child = Expense {
            recurring_id: template.id.clone(),
            ..Expense::new("Rent", "Housing", 1200.0, Utc::now() + Duration::days(30))
        };
        let past = Expense {
            recurring_id: template.id.clone(),
            ..Expense::new("Rent", "Housing", 1200.0, start)
        };
        let stored = store.add_multiple_expenses(vec![child, past]).unwrap();
        assert_eq!(store.get_expense(&stored[0].id).unwrap(), stored[0]);

        let mut edit = template.clone();
        edit.amount = 1300.0;
        store.update_recurring_expense(&template.id, edit, false).unwrap();
        assert_eq!(store.get_expense(&stored[0].id).unwrap().amount, 1300.0);
        assert_eq!(store.get_expense(&stored[1].id).unwrap().amount, 1200.0);

        store.remove_recurring_expense(&template.id, true).unwrap();
        assert!(store.get_expense(&stored[0].id).unwrap_err().is_not_found());
        assert!(store.get_expense(&stored[1].id).unwrap_err().is_not_found());

        store.close().unwrap();
        store.close().unwrap();
        assert!(matches!(store.get_config(), Err(ExpenseError::Storage(_))));
    }
}
