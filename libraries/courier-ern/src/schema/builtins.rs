//! Lexical checks for built-in XML Schema datatypes

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// Outcome of checking a value against a built-in type
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Builtin {
    /// Value is lexically valid
    Valid,
    /// Value is not a valid lexical form of the type
    Invalid,
    /// Type is not checked
    Unchecked,
}

fn regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn check_pattern(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> Builtin {
    match regex(cell, pattern) {
        Some(re) if re.is_match(value) => Builtin::Valid,
        Some(_) => Builtin::Invalid,
        None => Builtin::Unchecked,
    }
}

fn verdict(ok: bool) -> Builtin {
    if ok {
        Builtin::Valid
    } else {
        Builtin::Invalid
    }
}

/// Strip an optional `Z` or `±hh:mm` timezone suffix
fn strip_timezone(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    let split = value.len().saturating_sub(6);
    match (value.get(..split), value.get(split..)) {
        (Some(head), Some(tz))
            if !head.is_empty()
                && (tz.starts_with('+') || tz.starts_with('-'))
                && tz.as_bytes()[3] == b':' =>
        {
            head
        }
        _ => value,
    }
}

fn is_unsigned(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Check `value` (already whitespace-normalized) against built-in `local`
pub(crate) fn check(local: &str, value: &str) -> Builtin {
    static INTEGER: OnceLock<Option<Regex>> = OnceLock::new();
    static DECIMAL: OnceLock<Option<Regex>> = OnceLock::new();
    static DURATION: OnceLock<Option<Regex>> = OnceLock::new();
    static GYEAR: OnceLock<Option<Regex>> = OnceLock::new();

    match local {
        "boolean" => verdict(matches!(value, "true" | "false" | "1" | "0")),
        "integer" | "int" | "long" | "short" | "byte" => {
            check_pattern(&INTEGER, r"^[+-]?\d+$", value)
        }
        "nonNegativeInteger" | "unsignedInt" | "unsignedLong" | "unsignedShort"
        | "unsignedByte" => verdict(is_unsigned(value)),
        "positiveInteger" => verdict(is_unsigned(value) && value.chars().any(|c| ('1'..='9').contains(&c))),
        "decimal" | "float" | "double" => check_pattern(
            &DECIMAL,
            r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$|^(INF|-INF|NaN)$",
            value,
        ),
        "date" => verdict(NaiveDate::parse_from_str(strip_timezone(value), "%Y-%m-%d").is_ok()),
        "dateTime" => verdict(
            NaiveDateTime::parse_from_str(strip_timezone(value), "%Y-%m-%dT%H:%M:%S%.f").is_ok(),
        ),
        "gYear" => check_pattern(&GYEAR, r"^-?\d{4,}(Z|[+-]\d{2}:\d{2})?$", value),
        "duration" => {
            if value.ends_with('P') || value.ends_with('T') {
                return Builtin::Invalid;
            }
            check_pattern(
                &DURATION,
                r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$",
                value,
            )
        }
        _ => Builtin::Unchecked,
    }
}

/// Whether a built-in type keeps whitespace as-is
pub(crate) fn preserves_whitespace(local: &str) -> bool {
    matches!(local, "string" | "anySimpleType" | "anyType")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_and_integers() {
        assert_eq!(check("boolean", "true"), Builtin::Valid);
        assert_eq!(check("boolean", "yes"), Builtin::Invalid);
        assert_eq!(check("integer", "-42"), Builtin::Valid);
        assert_eq!(check("integer", "4.2"), Builtin::Invalid);
        assert_eq!(check("positiveInteger", "0"), Builtin::Invalid);
        assert_eq!(check("nonNegativeInteger", "0"), Builtin::Valid);
    }

    #[test]
    fn test_dates() {
        assert_eq!(check("date", "2025-03-01"), Builtin::Valid);
        assert_eq!(check("date", "2025-02-30"), Builtin::Invalid);
        assert_eq!(check("dateTime", "2025-03-01T09:30:00Z"), Builtin::Valid);
        assert_eq!(check("dateTime", "2025-03-01T09:30:00+03:00"), Builtin::Valid);
        assert_eq!(check("dateTime", "2025-03-01 09:30"), Builtin::Invalid);
        assert_eq!(check("gYear", "2024"), Builtin::Valid);
        assert_eq!(check("gYear", "24"), Builtin::Invalid);
    }

    #[test]
    fn test_duration() {
        assert_eq!(check("duration", "PT3M45S"), Builtin::Valid);
        assert_eq!(check("duration", "PT0M0S"), Builtin::Valid);
        assert_eq!(check("duration", "P1DT2H"), Builtin::Valid);
        assert_eq!(check("duration", "PT"), Builtin::Invalid);
        assert_eq!(check("duration", "3:45"), Builtin::Invalid);
    }

    #[test]
    fn test_unchecked() {
        assert_eq!(check("string", "anything"), Builtin::Unchecked);
        assert_eq!(check("anyURI", "http://x"), Builtin::Unchecked);
    }
}
