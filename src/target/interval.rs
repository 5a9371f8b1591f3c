//! Aggregation interval normalization
//!
//! Every interval leaves normalization as a positive count of seconds or the
//! literal `auto`; `interval_unit` is always rewritten to `s`.
//!
//! ```text
//! ("5m", "s")   ->  300
//! ("2h", "s")   ->  7200
//! ("5",  "m")   ->  300     no suffix: caller's unit applies
//! ("30s", "m")  ->  1800    `s` is not a suffix, the unit applies
//! (10,   "m")   ->  600
//! ("auto", _)   ->  auto
//! ("", "m")     ->  60      default
//! ("", "s")     ->  10      default
//! ("$interval") ->  value of the variable, then parsed as above
//! ```

use nom::{
    character::complete::{digit1, multispace0},
    combinator::rest,
    IResult,
};
use tracing::debug;

use crate::templating::{Syntax, VariableResolver};
use crate::types::{Interval, IntervalSpec};

/// Canonical unit of normalized intervals
pub const CANONICAL_UNIT: &str = "s";

/// Interval used when nothing usable was configured
pub fn default_interval(unit: &str) -> u64 {
    if unit == "m" {
        60
    } else {
        10
    }
}

/// Normalize a raw interval into seconds or `auto`
///
/// Variable placeholders in textual intervals are substituted through
/// `resolver` before parsing.
pub fn normalize_interval(
    interval: Option<&IntervalSpec>,
    unit: &str,
    resolver: Option<&VariableResolver<'_>>,
) -> Interval {
    let seconds = match interval {
        Some(IntervalSpec::Text(text)) if text == "auto" => return Interval::Auto,
        Some(IntervalSpec::Text(text)) => {
            let resolved = match resolver {
                Some(resolver) => resolver.interpolate(text, Syntax::Glob),
                None => text.clone(),
            };
            if resolved.trim() == "auto" {
                return Interval::Auto;
            }
            parse_interval_text(&resolved, unit)
        }
        Some(IntervalSpec::Number(number)) => number.as_f64().and_then(|n| {
            let n = if unit == "m" { n * 60.0 } else { n };
            (n.is_finite() && n >= 0.5).then(|| n.round() as u64)
        }),
        None => None,
    };

    match seconds {
        Some(secs) if secs > 0 => Interval::Seconds(secs),
        _ => {
            debug!(?interval, unit, "interval falls back to default");
            Interval::Seconds(default_interval(unit))
        }
    }
}

/// Parse `<count><suffix>` into seconds
///
/// Suffixes `m`, `h`, `d`, `w` are explicit. A missing or unrecognized
/// suffix, `s` included, counts in the caller's `unit`. Returns `None` when
/// the text does not start with a count.
pub fn parse_interval_text(text: &str, unit: &str) -> Option<u64> {
    let (count, suffix) = match parse_count_and_suffix(text) {
        Ok((_, parsed)) => parsed,
        Err(_) => return None,
    };
    let count: u64 = count.parse().ok()?;
    let factor = match suffix.trim() {
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "w" => 604_800,
        _ if unit == "m" => 60,
        _ => 1,
    };
    count.checked_mul(factor)
}

fn parse_count_and_suffix(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = multispace0(input)?;
    let (input, count) = digit1(input)?;
    let (input, suffix) = rest(input)?;
    Ok((input, (count, suffix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CurrentValue, TemplateVariable};

    fn text(s: &str) -> IntervalSpec {
        IntervalSpec::Text(s.to_string())
    }

    fn number(n: u64) -> IntervalSpec {
        IntervalSpec::Number(n.into())
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(normalize_interval(Some(&text("5m")), "s", None), Interval::Seconds(300));
        assert_eq!(normalize_interval(Some(&text("2h")), "s", None), Interval::Seconds(7200));
        assert_eq!(normalize_interval(Some(&text("1d")), "s", None), Interval::Seconds(86_400));
        assert_eq!(normalize_interval(Some(&text("1w")), "s", None), Interval::Seconds(604_800));
    }

    #[test]
    fn test_seconds_suffix_follows_unit() {
        assert_eq!(normalize_interval(Some(&text("30s")), "s", None), Interval::Seconds(30));
        assert_eq!(normalize_interval(Some(&text("30s")), "m", None), Interval::Seconds(1800));
    }

    #[test]
    fn test_no_suffix_uses_caller_unit() {
        assert_eq!(normalize_interval(Some(&text("5")), "m", None), Interval::Seconds(300));
        assert_eq!(normalize_interval(Some(&text("5")), "s", None), Interval::Seconds(5));
    }

    #[test]
    fn test_numeric_interval() {
        assert_eq!(normalize_interval(Some(&number(10)), "m", None), Interval::Seconds(600));
        assert_eq!(normalize_interval(Some(&number(60)), "s", None), Interval::Seconds(60));
    }

    #[test]
    fn test_auto_is_kept() {
        assert_eq!(normalize_interval(Some(&text("auto")), "s", None), Interval::Auto);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(normalize_interval(Some(&text("")), "m", None), Interval::Seconds(60));
        assert_eq!(normalize_interval(Some(&text("")), "s", None), Interval::Seconds(10));
        assert_eq!(normalize_interval(None, "s", None), Interval::Seconds(10));
        assert_eq!(normalize_interval(Some(&number(0)), "m", None), Interval::Seconds(60));
        assert_eq!(normalize_interval(Some(&text("abc5m")), "s", None), Interval::Seconds(10));
    }

    #[test]
    fn test_variable_interval() {
        let vars = vec![TemplateVariable {
            id: "interval".to_string(),
            current: CurrentValue::Single("2m".to_string()),
            ..Default::default()
        }];
        let resolver = VariableResolver::new(&vars);
        assert_eq!(
            normalize_interval(Some(&text("$interval")), "s", Some(&resolver)),
            Interval::Seconds(120)
        );
        // Unknown variable stays literal and cannot be parsed
        assert_eq!(
            normalize_interval(Some(&text("$missing")), "m", Some(&resolver)),
            Interval::Seconds(60)
        );
    }

    #[test]
    fn test_overflow_falls_back() {
        assert_eq!(parse_interval_text("99999999999999999999w", "s"), None);
        assert_eq!(parse_interval_text("18446744073709551615w", "s"), None);
    }
}
