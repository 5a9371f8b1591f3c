//! Fuzz Tests for Placeholder Scanning and Normalization
//!
//! Uses property-based testing (proptest) to find edge cases in the scanner,
//! the interval normalizer, value formatting and legacy migration.

use proptest::prelude::*;
use serde_json::json;
use target_templating::{
    target::{normalize_interval, RawTarget},
    templating::{escape_regex, format_values, scan_variables, Syntax},
    types::{Interval, IntervalSpec},
};

// =============================================================================
// Test Data Strategies
// =============================================================================

/// Strategy for generating variable names
fn variable_name() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,11}"
}

/// Render `name` in one of the placeholder syntaxes
fn placeholder(name: &str, kind: usize) -> String {
    match kind % 5 {
        0 => format!("${}", name),
        1 => format!("[[{}]]", name),
        2 => format!("${{{}}}", name),
        3 => format!("${{{}:regex}}", name),
        _ => format!("[[{}:csv]]", name),
    }
}

/// Strategy for filler text that cannot form a placeholder
fn filler() -> impl Strategy<Value = String> {
    "[ a-z0-9=~,(){}\"\\-]{0,8}"
}

/// Strategy for generating plain values, regex-special characters included
fn plain_value() -> impl Strategy<Value = String> {
    "[a-z0-9.*+?|()\\[\\]-]{1,10}"
}

// =============================================================================
// Scanner
// =============================================================================

proptest! {
    /// Every syntax of one name scans to exactly that name
    #[test]
    fn fuzz_scan_single_name(
        name in variable_name(),
        parts in prop::collection::vec((filler(), 0usize..5), 1..5),
    ) {
        let mut text = String::new();
        for (fill, kind) in &parts {
            text.push_str(fill);
            text.push(' ');
            text.push_str(&placeholder(&name, *kind));
            text.push(' ');
        }
        prop_assert_eq!(scan_variables(&text), vec![name]);
    }

    /// Scanning never panics and never reports empty names
    #[test]
    fn fuzz_scan_arbitrary_text(text in "\\PC{0,64}") {
        for name in scan_variables(&text) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }
}

// =============================================================================
// Interval normalization
// =============================================================================

proptest! {
    /// Output is always positive seconds
    #[test]
    fn fuzz_interval_text_is_positive(text in "\\PC{0,12}", minutes in any::<bool>()) {
        let unit = if minutes { "m" } else { "s" };
        match normalize_interval(Some(&IntervalSpec::Text(text.clone())), unit, None) {
            Interval::Seconds(secs) => prop_assert!(secs > 0),
            Interval::Auto => prop_assert_eq!(text.trim(), "auto"),
        }
    }

    /// Explicit suffixes scale the count
    #[test]
    fn fuzz_interval_suffix(count in 1u64..10_000, suffix in "(s|m|h|d|w)") {
        let factor = match suffix.as_str() {
            "s" => 1,
            "m" => 60,
            "h" => 3_600,
            "d" => 86_400,
            _ => 604_800,
        };
        let text = format!("{}{}", count, suffix);
        prop_assert_eq!(
            normalize_interval(Some(&IntervalSpec::Text(text)), "s", None),
            Interval::Seconds(count * factor)
        );
    }

    /// Numeric intervals in minutes become seconds
    #[test]
    fn fuzz_interval_numeric_minutes(count in 1u64..100_000) {
        prop_assert_eq!(
            normalize_interval(Some(&IntervalSpec::Number(count.into())), "m", None),
            Interval::Seconds(count * 60)
        );
    }
}

// =============================================================================
// Value formatting
// =============================================================================

proptest! {
    /// Glob and csv join values verbatim; regex wraps escaped values in a group
    #[test]
    fn fuzz_format_values(values in prop::collection::vec(plain_value(), 2..6)) {
        prop_assert_eq!(format_values(&values, Syntax::Glob), values.join("|"));
        prop_assert_eq!(format_values(&values, Syntax::Csv), values.join(","));

        let regex = format_values(&values, Syntax::Regex);
        prop_assert!(regex.starts_with('(') && regex.ends_with(')'));
        for value in &values {
            let escaped = escape_regex(value).replace('\\', "\\\\");
            prop_assert!(regex.contains(&escaped));
        }
    }

    /// A single value is never escaped
    #[test]
    fn fuzz_single_value_verbatim(value in plain_value()) {
        let values = vec![value.clone()];
        prop_assert_eq!(format_values(&values, Syntax::Regex), value);
    }
}

// =============================================================================
// Legacy migration
// =============================================================================

proptest! {
    /// Migrating an already migrated target changes nothing
    #[test]
    fn fuzz_legacy_migration_idempotent(
        source in "(bk_monitor|custom|bk_data)",
        kind in "(time_series|event|log)",
        table in "[a-z_]{1,8}\\.[a-z_]{1,8}",
        field in "[a-z_]{1,10}",
        period in 1u64..600,
    ) {
        let raw = json!({
            "refId": "A",
            "data": {
                "metric": {"id": [format!("{}_{}", source, kind), "", table, field]},
                "period": period,
                "method": "SUM"
            }
        });
        let once = RawTarget::classify(raw).into_canonical().unwrap();
        let again = RawTarget::classify(serde_json::to_value(&once).unwrap());
        prop_assert!(!again.is_legacy());
        prop_assert_eq!(again.into_canonical().unwrap(), once);
    }
}
