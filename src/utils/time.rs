//! strftime formatting helpers

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;

use crate::error::{ConcatError, ConcatResult};

/// Layout accepted for `reference_date` values in task files
pub const REFERENCE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Check that a strftime pattern only contains specifiers chrono understands.
pub fn validate_strftime(pattern: &str) -> ConcatResult<()> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(ConcatError::invalid_input(format!(
            "Invalid strftime pattern: '{}'",
            pattern
        )));
    }
    Ok(())
}

/// Format a timestamp without panicking on a bad pattern.
///
/// `DelayedFormat::to_string` panics when the pattern contains an unknown
/// specifier, so the pattern is written through `fmt::Write` instead.
pub fn format_timestamp(instant: &NaiveDateTime, pattern: &str) -> ConcatResult<String> {
    validate_strftime(pattern)?;
    let mut formatted = String::new();
    write!(formatted, "{}", instant.format(pattern)).map_err(|_| {
        ConcatError::invalid_input(format!(
            "Timestamp {} cannot be formatted with '{}'",
            instant, pattern
        ))
    })?;
    Ok(formatted)
}

/// Parse a `YYYY-MM-DD HH:MM` reference date.
pub fn parse_reference_date(value: &str) -> ConcatResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), REFERENCE_DATE_FORMAT).map_err(|e| {
        ConcatError::invalid_input(format!(
            "Invalid reference date '{}' (expected YYYY-MM-DD HH:MM): {}",
            value, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 8, 12)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_format_hour_pattern() {
        assert_eq!(format_timestamp(&instant(), "%Y%m%d%H").unwrap(), "2022081214");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(validate_strftime("%Y%J").is_err());
        assert!(format_timestamp(&instant(), "%").is_err());
    }

    #[test]
    fn test_parse_reference_date() {
        assert_eq!(parse_reference_date("2022-08-12 14:05").unwrap(), instant());
        assert!(parse_reference_date("12.08.2022").is_err());
    }
}
