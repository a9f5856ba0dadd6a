//! CSV exchange for expenses
//!
//! Export writes every stored expense; import reads a spreadsheet-style file,
//! skips rows it cannot use and adds the rest in one batch.

use std::collections::HashSet;
use std::io::{Read, Write};

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ExpenseError, ExpenseResult};
use crate::models::Expense;
use crate::storage::Storage;
use crate::validation;

/// Column headers written by [`export_expenses_csv`]
pub const CSV_HEADER: [&str; 6] = ["ID", "Name", "Category", "Amount", "Date", "Tags"];

/// Outcome of a CSV import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Data rows read
    pub processed: usize,
    /// Rows stored as expenses
    pub imported: usize,
    /// Rows rejected
    pub skipped: usize,
    /// Categories appended to the configured list
    pub new_categories: Vec<String>,
}

/// Export all expenses to CSV
///
/// Returns the number of data rows written.
pub fn export_expenses_csv<S, W>(storage: &S, writer: W) -> ExpenseResult<usize>
where
    S: Storage + ?Sized,
    W: Write,
{
    let expenses = storage.get_all_expenses()?;
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(CSV_HEADER)
        .map_err(|e| ExpenseError::Export(e.to_string()))?;

    for expense in &expenses {
        let amount = format!("{:.2}", expense.amount);
        let date = expense
            .date
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        let tags = expense.tags.join(",");

        csv.write_record([
            expense.id.as_str(),
            expense.name.as_str(),
            expense.category.as_str(),
            amount.as_str(),
            date.as_str(),
            tags.as_str(),
        ])
        .map_err(|e| ExpenseError::Export(e.to_string()))?;
    }

    csv.flush()
        .map_err(|e| ExpenseError::Export(e.to_string()))?;

    debug!(rows = expenses.len(), "Exported expenses to CSV");
    Ok(expenses.len())
}

/// Positions of the recognised columns in a header row
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    id: Option<usize>,
    name: usize,
    category: usize,
    amount: usize,
    date: usize,
    tags: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> ExpenseResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                ExpenseError::Import(format!("missing required column '{}'", name))
            })
        };

        Ok(Self {
            id: find("id"),
            name: require("name")?,
            category: require("category")?,
            amount: require("amount")?,
            date: require("date")?,
            tags: find("tags"),
        })
    }

    /// Turn a data row into an unvalidated expense
    fn parse(&self, record: &StringRecord) -> Result<Expense, String> {
        let field = |index: usize| record.get(index).unwrap_or("");

        let amount: f64 = field(self.amount)
            .parse()
            .ok()
            .filter(|a: &f64| a.is_finite())
            .ok_or_else(|| format!("invalid amount '{}'", field(self.amount)))?;
        let date = parse_date(field(self.date))
            .ok_or_else(|| format!("invalid date '{}'", field(self.date)))?;
        let tags: Vec<String> = self
            .tags
            .map(|index| {
                field(index)
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Expense {
            id: self.id.map(|index| field(index).to_string()).unwrap_or_default(),
            name: field(self.name).to_string(),
            category: field(self.category).to_string(),
            amount,
            date: Some(date),
            tags,
            ..Expense::default()
        })
    }
}

/// Accept RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC)
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?))
}

/// Import expenses from CSV
///
/// Header names are matched case-insensitively; `name`, `category`, `amount`
/// and `date` are required, `id` and `tags` optional. Unknown categories are
/// appended to the configured list and new expenses take the configured
/// currency.
pub fn import_expenses_csv<S, R>(storage: &S, reader: R) -> ExpenseResult<ImportSummary>
where
    S: Storage + ?Sized,
    R: Read,
{
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut seen: HashSet<String> = storage
        .get_all_expenses()?
        .into_iter()
        .map(|e| e.id)
        .collect();
    let mut categories = storage.get_categories()?;

    let mut summary = ImportSummary::default();
    let mut batch = Vec::new();

    for (row, record) in csv.records().enumerate() {
        let record = record?;
        summary.processed += 1;

        match accept_row(&columns, &headers, &record, &seen) {
            Ok(expense) => {
                if !expense.id.is_empty() {
                    seen.insert(expense.id.clone());
                }
                if !categories.contains(&expense.category) {
                    categories.push(expense.category.clone());
                    summary.new_categories.push(expense.category.clone());
                }
                batch.push(expense);
            }
            Err(reason) => {
                debug!(row = row + 1, %reason, "Skipping CSV row");
                summary.skipped += 1;
            }
        }
    }

    // Categories are only recorded once their expenses are stored
    if !batch.is_empty() {
        summary.imported = storage.add_multiple_expenses(batch)?.len();
    }
    if !summary.new_categories.is_empty() {
        storage.update_categories(&categories)?;
    }

    info!(
        processed = summary.processed,
        imported = summary.imported,
        skipped = summary.skipped,
        "Imported expenses from CSV"
    );
    Ok(summary)
}

fn accept_row(
    columns: &ColumnMap,
    headers: &StringRecord,
    record: &StringRecord,
    seen: &HashSet<String>,
) -> Result<Expense, String> {
    if record.len() != headers.len() {
        return Err(format!(
            "expected {} columns, found {}",
            headers.len(),
            record.len()
        ));
    }

    let expense = columns.parse(record)?;
    if !expense.id.is_empty() && seen.contains(&expense.id) {
        return Err(format!("expense '{}' already exists", expense.id));
    }

    let mut expense = validation::validate_expense(&expense).map_err(|e| e.to_string())?;
    expense.category = validation::validate_category(&expense.category).map_err(|e| e.to_string())?;
    Ok(expense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataPaths;
    use crate::models::Config;
    use crate::storage::JsonStore;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, JsonStore) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            JsonStore::open_with(DataPaths::new(temp_dir.path()), || Ok(Config::default())).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_export_expenses_csv() {
        let (_temp_dir, storage) = create_test_storage();
        let date = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap();
        let stored = storage
            .add_expense(Expense::new("Groceries, weekly", "Food", 52.5, date).with_tags(["home", "big"]))
            .unwrap();

        let mut output = Vec::new();
        let rows = export_expenses_csv(&storage, &mut output).unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(output).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("ID,Name,Category,Amount,Date,Tags"));
        assert_eq!(
            lines.next().unwrap(),
            format!(
                "{},\"Groceries, weekly\",Food,52.50,2025-01-15T09:30:00Z,\"home,big\"",
                stored.id
            )
        );
    }

    #[test]
    fn test_import_expenses_csv() {
        let (_temp_dir, storage) = create_test_storage();
        let data = "\
Name,Category,Amount,Date,Tags
Coffee,Food,4.50,2025-01-10,\"morning, cafe\"
Train,Commute,12,2025-01-11T08:00:00Z,
Broken,Food,lots,2025-01-12,
Zero,Food,0,2025-01-12,
";

        let summary = import_expenses_csv(&storage, data.as_bytes()).unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.new_categories, vec!["Commute".to_string()]);

        let expenses = storage.get_all_expenses().unwrap();
        assert_eq!(expenses.len(), 2);
        let coffee = expenses.iter().find(|e| e.name == "Coffee").unwrap();
        assert_eq!(coffee.tags, vec!["morning", "cafe"]);
        assert_eq!(coffee.currency, "usd");
        assert_eq!(
            coffee.date,
            Some(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap())
        );
        assert!(storage.get_categories().unwrap().contains(&"Commute".to_string()));
    }

    #[test]
    fn test_failed_import_keeps_categories() {
        let (temp_dir, storage) = create_test_storage();
        std::fs::create_dir(temp_dir.path().join("expenses.json.tmp")).unwrap();

        let data = "Name,Category,Amount,Date\nTrain,Commute,12,2025-01-11\n";
        assert!(import_expenses_csv(&storage, data.as_bytes()).is_err());

        assert!(!storage
            .get_categories()
            .unwrap()
            .contains(&"Commute".to_string()));
        assert!(storage.get_all_expenses().unwrap().is_empty());
    }

    #[test]
    fn test_import_headers_case_insensitive() {
        let (_temp_dir, storage) = create_test_storage();
        let data = "DATE,amount,NAME,Category\n2025-02-01,9.99,Book,Shopping\n";

        let summary = import_expenses_csv(&storage, data.as_bytes()).unwrap();
        assert_eq!(summary.imported, 1);
        assert!(summary.new_categories.is_empty());
    }

    #[test]
    fn test_import_missing_column_fails() {
        let (_temp_dir, storage) = create_test_storage();
        let data = "Name,Category,Amount\nCoffee,Food,4.50\n";

        let err = import_expenses_csv(&storage, data.as_bytes()).unwrap_err();
        assert!(matches!(err, ExpenseError::Import(_)));
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn test_import_skips_existing_and_short_rows() {
        let (_temp_dir, storage) = create_test_storage();
        let date = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let existing = storage
            .add_expense(Expense::new("Lunch", "Food", 10.0, date))
            .unwrap();

        let data = format!(
            "ID,Name,Category,Amount,Date,Tags\n\
             {},Lunch,Food,10.00,2025-01-01,\n\
             fresh,Dinner,Food,20.00,2025-01-02,\n\
             fresh,Dinner again,Food,20.00,2025-01-02,\n\
             short,Snack,Food\n",
            existing.id
        );

        let summary = import_expenses_csv(&storage, data.as_bytes()).unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(storage.get_expense("fresh").unwrap().name, "Dinner");
    }

    #[test]
    fn test_export_then_import_into_fresh_store() {
        let (_temp_dir, source) = create_test_storage();
        let date = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();
        source
            .add_expense(Expense::new("Cinema", "Entertainment", 15.0, date).with_tags(["friday"]))
            .unwrap();

        let mut output = Vec::new();
        export_expenses_csv(&source, &mut output).unwrap();

        let (_other_dir, target) = create_test_storage();
        let summary = import_expenses_csv(&target, output.as_slice()).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(target.get_all_expenses().unwrap(), source.get_all_expenses().unwrap());
    }
}
