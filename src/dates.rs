//! Date normalization against per-platform format lists

use crate::extract::RawFieldSet;
use crate::types::{Field, Timestamp};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static OFFSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])(\d{1,2})(?::?(\d{2}))?$").unwrap());

/// Failure to turn a raw string into a timestamp
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("empty date string")]
    Empty,

    #[error("no configured format matches {0:?}")]
    NoMatchingFormat(String),
}

/// Parses raw date strings with an ordered list of strftime formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateNormalizer {
    formats: Vec<String>,
    default_offset: FixedOffset,
}

impl DateNormalizer {
    #[must_use]
    pub const fn new(formats: Vec<String>, default_offset: FixedOffset) -> Self {
        Self {
            formats,
            default_offset,
        }
    }

    #[must_use]
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    #[must_use]
    pub const fn default_offset(&self) -> FixedOffset {
        self.default_offset
    }

    /// Parse `raw` with the first format that consumes the whole string
    ///
    /// Each format is tried as a zoned date-time, then a naive date-time, then
    /// a plain date. Naive values are placed in the default offset; plain dates
    /// become midnight. Out-of-range calendar dates never parse.
    pub fn normalize(&self, raw: &str) -> Result<Timestamp, DateError> {
        let input = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if input.is_empty() {
            return Err(DateError::Empty);
        }

        self.formats
            .iter()
            .find_map(|format| self.parse_with(&input, format))
            .ok_or(DateError::NoMatchingFormat(input))
    }

    fn parse_with(&self, input: &str, format: &str) -> Option<Timestamp> {
        if let Ok(zoned) = DateTime::parse_from_str(input, format) {
            return Some(zoned);
        }

        let naive = NaiveDateTime::parse_from_str(input, format)
            .or_else(|_| {
                NaiveDate::parse_from_str(input, format).map(|d| d.and_time(NaiveTime::MIN))
            })
            .ok()?;

        naive.and_local_timezone(self.default_offset).single()
    }
}

/// Parse a fixed UTC offset such as `UTC`, `Z`, `+02:00` or `-0500`
#[must_use]
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if ["utc", "gmt", "z"].iter().any(|z| s.eq_ignore_ascii_case(z)) {
        return FixedOffset::east_opt(0);
    }

    let caps = OFFSET_REGEX.captures(s)?;
    let hours: i32 = caps.get(2)?.as_str().parse().ok()?;
    let minutes: i32 = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    let seconds = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        FixedOffset::west_opt(seconds)
    } else {
        FixedOffset::east_opt(seconds)
    }
}

/// Date fields of one email after normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDates {
    pub check_in: Option<Timestamp>,
    pub check_out: Option<Timestamp>,
    pub booking: Option<Timestamp>,
    /// Date fields that were extracted but matched no format
    pub unparseable: Vec<Field>,
}

impl ResolvedDates {
    /// Normalize every date field present in `fields`
    #[must_use]
    pub fn resolve(fields: &RawFieldSet, normalizer: &DateNormalizer) -> Self {
        let mut resolved = Self::default();

        for (field, found) in fields.iter().filter(|(field, _)| field.is_date()) {
            let slot = match field {
                Field::CheckInDate => &mut resolved.check_in,
                Field::CheckOutDate => &mut resolved.check_out,
                _ => &mut resolved.booking,
            };

            match normalizer.normalize(&found.value) {
                Ok(timestamp) => *slot = Some(timestamp),
                Err(err) => {
                    tracing::debug!("Date field {} not normalized: {}", field, err);
                    resolved.unparseable.push(field);
                }
            }
        }

        resolved
    }
}
