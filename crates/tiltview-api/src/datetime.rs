// ── Timestamp normalization for outbound requests ──
//
// The Tilt API server parses `lastClickedAt` with microsecond precision,
// while everything we format ourselves carries milliseconds.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Failure to normalize a datetime. Always a caller bug in request
/// construction, so it is returned rather than logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid ISO-8601 datetime: {input}")]
    InvalidDatetime { input: String },

    #[error("Expected milliseconds of datetime to match \"[0-9]{{3}}Z\" but instead received {received}")]
    Fraction { received: String },

    #[error("datetime has no fractional seconds: {input}")]
    MissingFraction { input: String },
}

/// Either a native timestamp or one that is already formatted.
#[derive(Debug, Clone, Copy)]
pub enum DatetimeInput<'a> {
    Native(DateTime<Utc>),
    Text(&'a str),
}

impl From<DateTime<Utc>> for DatetimeInput<'_> {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Native(value)
    }
}

impl<'a> From<&'a str> for DatetimeInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for DatetimeInput<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value.as_str())
    }
}

/// Pad a millisecond-precision UTC datetime to microseconds.
///
/// `2020-02-01T01:02:03.123Z` becomes `2020-02-01T01:02:03.123000Z`.
/// Strings must be ISO-8601 in UTC (`Z` suffix) with exactly three
/// fractional digits; native values are formatted with milliseconds first.
pub fn with_microseconds<'a>(input: impl Into<DatetimeInput<'a>>) -> Result<String, FormatError> {
    let formatted = match input.into() {
        DatetimeInput::Native(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        DatetimeInput::Text(text) => {
            if !text.ends_with('Z') || DateTime::parse_from_rfc3339(text).is_err() {
                return Err(FormatError::InvalidDatetime {
                    input: text.to_owned(),
                });
            }
            text.to_owned()
        }
    };

    let Some((whole, fraction)) = formatted.split_once('.') else {
        return Err(FormatError::MissingFraction { input: formatted });
    };

    let millis = fraction
        .strip_suffix('Z')
        .filter(|digits| digits.len() == 3 && digits.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| FormatError::Fraction {
            received: fraction.to_owned(),
        })?;

    Ok(format!("{whole}.{millis}000Z"))
}
