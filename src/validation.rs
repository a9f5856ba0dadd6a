//! Text sanitization and record validation
//!
//! Every write path runs its record through this module before anything is
//! persisted. Validators never touch the caller's value: they return a
//! normalized copy, and that copy is what gets stored.

use unicode_general_category::{get_general_category, GeneralCategory};

use crate::error::{ExpenseError, ExpenseResult};
use crate::models::{is_supported_currency, Expense, Interval, RecurringExpense};

/// Punctuation that survives sanitization
const ALLOWED_PUNCTUATION: [char; 7] = ['.', ',', '-', '\'', '_', '!', '"'];

/// Letters (general category L), numbers (N) and the allowed punctuation
fn is_allowed(c: char) -> bool {
    use GeneralCategory::*;

    matches!(
        get_general_category(c),
        UppercaseLetter
            | LowercaseLetter
            | TitlecaseLetter
            | ModifierLetter
            | OtherLetter
            | DecimalNumber
            | LetterNumber
            | OtherNumber
    ) || ALLOWED_PUNCTUATION.contains(&c)
}

/// Normalize free text to a readable character set
///
/// Disallowed characters become spaces, whitespace runs collapse to a single
/// ASCII space, and the result is trimmed. Idempotent.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if !is_allowed(c) {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    out
}

/// Sanitize tags, dropping the ones that end up empty
///
/// Order is kept and duplicates are not removed.
pub fn sanitize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| sanitize(tag))
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Sanitize a category name, rejecting names that end up empty
pub fn validate_category(name: &str) -> ExpenseResult<String> {
    let clean = sanitize(name);
    if clean.is_empty() {
        return Err(ExpenseError::EmptyField("category"));
    }
    Ok(clean)
}

/// Validate every entry of a category list
pub fn validate_categories(categories: &[String]) -> ExpenseResult<Vec<String>> {
    categories.iter().map(|c| validate_category(c)).collect()
}

/// Check a start-of-cycle day
pub fn validate_start_date(day: i64) -> ExpenseResult<u32> {
    match u32::try_from(day) {
        Ok(day @ 1..=31) => Ok(day),
        _ => Err(ExpenseError::InvalidStartDate(day)),
    }
}

/// Check a currency code
///
/// Only emptiness is rejected. Codes outside the supported set are accepted
/// and logged.
pub fn validate_currency(code: &str) -> ExpenseResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ExpenseError::EmptyField("currency"));
    }
    if !is_supported_currency(code) {
        tracing::warn!(currency = code, "currency is not in the supported set");
    }
    Ok(code.to_string())
}

/// Validate an expense, returning its normalized form
pub fn validate_expense(expense: &Expense) -> ExpenseResult<Expense> {
    let mut clean = expense.clone();

    clean.name = sanitize(&expense.name);
    if clean.name.is_empty() {
        return Err(ExpenseError::EmptyField("name"));
    }
    if clean.category.is_empty() {
        return Err(ExpenseError::EmptyField("category"));
    }
    if clean.amount == 0.0 || !clean.amount.is_finite() {
        return Err(ExpenseError::InvalidAmount);
    }
    clean.tags = sanitize_tags(&expense.tags);
    if clean.date.is_none() {
        return Err(ExpenseError::MissingDate);
    }

    Ok(clean)
}

/// Validate a recurring expense template, returning its normalized form
pub fn validate_recurring_expense(template: &RecurringExpense) -> ExpenseResult<RecurringExpense> {
    let mut clean = template.clone();

    clean.name = sanitize(&template.name);
    if clean.name.is_empty() {
        return Err(ExpenseError::EmptyField("name"));
    }
    if clean.category.is_empty() {
        return Err(ExpenseError::EmptyField("category"));
    }
    if !clean.amount.is_finite() {
        return Err(ExpenseError::InvalidAmount);
    }
    clean.tags = sanitize_tags(&template.tags);
    // 0 is the unbounded sentinel
    if !clean.is_unbounded() && clean.occurrences < 2 {
        return Err(ExpenseError::TooFewOccurrences);
    }
    if clean.start_date.is_none() {
        return Err(ExpenseError::MissingStartDate);
    }
    clean.interval.parse::<Interval>()?;

    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn expense() -> Expense {
        Expense::new(
            "Lunch",
            "Food",
            12.5,
            Utc.with_ymd_and_hms(2025, 2, 3, 12, 0, 0).unwrap(),
        )
    }

    fn template() -> RecurringExpense {
        RecurringExpense::new(
            "Netflix",
            "Entertainment",
            15.99,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Interval::Monthly,
            12,
        )
    }

    #[test]
    fn test_sanitize_collapses_and_trims() {
        assert_eq!(sanitize("  Food   & Drink!!  "), "Food Drink!!");
        assert_eq!(sanitize("a\t\n b"), "a b");
        assert_eq!(sanitize("Rock'n'Roll, \"live\" - 2024_tour."), "Rock'n'Roll, \"live\" - 2024_tour.");
    }

    #[test]
    fn test_sanitize_keeps_unicode_letters_and_numbers() {
        assert_eq!(sanitize("Café ☕ 東京 ٣"), "Café 東京 ٣");
    }

    #[test]
    fn test_sanitize_drops_symbols_and_marks() {
        // Ⓐ is a symbol (So) even though it is Alphabetic
        assert_eq!(sanitize("\u{24B6}"), "");
        // vowel sign (Mc) is not a letter
        assert_eq!(sanitize("\u{0915}\u{093F}"), "\u{0915}");
        assert_eq!(sanitize("e\u{0301}x"), "e x");
        assert_eq!(sanitize("\u{01C5}\u{02B0}\u{2168}\u{00BD}"), "\u{01C5}\u{02B0}\u{2168}\u{00BD}");
    }

    #[test]
    fn test_sanitize_all_invalid_is_empty() {
        assert_eq!(sanitize("@#$%^&*()<>"), "");
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   "), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "  Food   & Drink!!  ",
            "***a**b**",
            "\u{00A0}x\u{2003}y ",
            "tab\there",
            "émoji 🎉 party",
            "",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_validate_category() {
        assert_eq!(validate_category("  Eating*Out ").unwrap(), "Eating Out");
        assert!(matches!(
            validate_category("***"),
            Err(ExpenseError::EmptyField("category"))
        ));
    }

    #[test]
    fn test_validate_categories_rejects_any_empty() {
        let ok = validate_categories(&["Food".into(), "Pets!".into()]).unwrap();
        assert_eq!(ok, vec!["Food", "Pets!"]);
        assert!(validate_categories(&["Food".into(), "%%".into()]).is_err());
    }

    #[test]
    fn test_validate_start_date() {
        assert_eq!(validate_start_date(1).unwrap(), 1);
        assert_eq!(validate_start_date(31).unwrap(), 31);
        assert!(matches!(
            validate_start_date(0),
            Err(ExpenseError::InvalidStartDate(0))
        ));
        assert!(validate_start_date(32).is_err());
        assert!(validate_start_date(-4).is_err());
    }

    #[test]
    fn test_validate_currency_is_permissive() {
        assert_eq!(validate_currency(" eur ").unwrap(), "eur");
        assert_eq!(validate_currency("doge").unwrap(), "doge");
        assert!(matches!(
            validate_currency("  "),
            Err(ExpenseError::EmptyField("currency"))
        ));
    }

    #[test]
    fn test_expense_name_sanitized() {
        let mut input = expense();
        input.name = "  Lunch @ work ".into();
        let clean = validate_expense(&input).unwrap();
        assert_eq!(clean.name, "Lunch work");
        // caller's value untouched
        assert_eq!(input.name, "  Lunch @ work ");
    }

    #[test]
    fn test_expense_empty_name() {
        let mut input = expense();
        input.name = "###".into();
        assert!(matches!(
            validate_expense(&input),
            Err(ExpenseError::EmptyField("name"))
        ));
    }

    #[test]
    fn test_expense_category_not_sanitized() {
        let mut input = expense();
        input.category = "Food & Drink".into();
        assert_eq!(validate_expense(&input).unwrap().category, "Food & Drink");

        input.category = String::new();
        assert!(matches!(
            validate_expense(&input),
            Err(ExpenseError::EmptyField("category"))
        ));
    }

    #[test]
    fn test_expense_zero_amount() {
        let mut input = expense();
        input.amount = 0.0;
        assert!(matches!(
            validate_expense(&input),
            Err(ExpenseError::InvalidAmount)
        ));

        input.amount = -50.0;
        assert!(validate_expense(&input).is_ok());
    }

    #[test]
    fn test_expense_non_finite_amount() {
        for amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut input = expense();
            input.amount = amount;
            assert!(matches!(
                validate_expense(&input),
                Err(ExpenseError::InvalidAmount)
            ));
        }
    }

    #[test]
    fn test_recurring_non_finite_amount() {
        let mut input = template();
        input.amount = f64::NAN;
        assert!(matches!(
            validate_recurring_expense(&input),
            Err(ExpenseError::InvalidAmount)
        ));

        input.amount = f64::INFINITY;
        assert!(validate_recurring_expense(&input).is_err());
    }

    #[test]
    fn test_zero_amount_wins_over_missing_date() {
        let mut input = expense();
        input.amount = 0.0;
        input.date = None;
        assert!(matches!(
            validate_expense(&input),
            Err(ExpenseError::InvalidAmount)
        ));
    }

    #[test]
    fn test_expense_tags_cleaned() {
        let input = expense().with_tags(["  ", "Food*", ""]);
        let clean = validate_expense(&input).unwrap();
        assert_eq!(clean.tags, vec!["Food"]);
    }

    #[test]
    fn test_expense_tags_keep_order_and_duplicates() {
        let input = expense().with_tags(["b", "a", "b"]);
        assert_eq!(validate_expense(&input).unwrap().tags, vec!["b", "a", "b"]);
    }

    #[test]
    fn test_expense_missing_date() {
        let mut input = expense();
        input.date = None;
        assert!(matches!(
            validate_expense(&input),
            Err(ExpenseError::MissingDate)
        ));
    }

    #[test]
    fn test_recurring_occurrences() {
        let mut input = template();

        input.occurrences = 0;
        assert!(validate_recurring_expense(&input).is_ok());

        input.occurrences = 1;
        assert!(matches!(
            validate_recurring_expense(&input),
            Err(ExpenseError::TooFewOccurrences)
        ));

        input.occurrences = 2;
        assert!(validate_recurring_expense(&input).is_ok());
    }

    #[test]
    fn test_recurring_interval_case() {
        let mut input = template();

        input.interval = "Daily".into();
        assert!(matches!(
            validate_recurring_expense(&input),
            Err(ExpenseError::InvalidInterval(ref v)) if v == "Daily"
        ));

        input.interval = "daily".into();
        assert!(validate_recurring_expense(&input).is_ok());

        input.interval = "fortnightly".into();
        assert!(validate_recurring_expense(&input).is_err());
    }

    #[test]
    fn test_recurring_missing_start_date() {
        let mut input = template();
        input.start_date = None;
        assert!(matches!(
            validate_recurring_expense(&input),
            Err(ExpenseError::MissingStartDate)
        ));
    }

    #[test]
    fn test_recurring_required_fields_and_tags() {
        let mut input = template().with_tags(["tv!", "$$"]);
        input.name = " Netflix   HD ".into();
        let clean = validate_recurring_expense(&input).unwrap();
        assert_eq!(clean.name, "Netflix HD");
        assert_eq!(clean.tags, vec!["tv!"]);

        input.category = String::new();
        assert!(matches!(
            validate_recurring_expense(&input),
            Err(ExpenseError::EmptyField("category"))
        ));
    }
}
