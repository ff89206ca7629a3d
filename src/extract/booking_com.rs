//! Booking.com reservation emails

use super::{NAME_VALUE, common_rules, dated, labeled};
use crate::config::{PlatformConfig, PostProcessor, RuleConfig};
use crate::types::Field::{CheckInDate, CheckOutDate, GuestName, PropertyName, ReservationId, TotalAmount};

/// Booking numbers are digits, sometimes grouped with dots (`4021.331.554`)
const BOOKING_NUMBER: &str = r"(\d[\d.]{4,}\d)";

/// Alphanumeric ids must start with a letter so they never shadow booking numbers
const LETTERED_ID: &str = r"([A-Z][A-Z0-9\-]{3,})";

pub(crate) fn table() -> PlatformConfig {
    let mut rules = vec![
        RuleConfig::subject(
            ReservationId,
            format!(r"(?i:booking[ \t]+number|confirmation[ \t]+number)[ \t]*:?[ \t]*{BOOKING_NUMBER}"),
            PostProcessor::Digits,
        ),
        RuleConfig::pattern(
            ReservationId,
            labeled(
                r"booking[ \t]+number|confirmation[ \t]+number|reservation(?:[ \t]+(?:id|number))?",
                BOOKING_NUMBER,
            ),
            PostProcessor::Digits,
        ),
        RuleConfig::pattern(
            ReservationId,
            labeled(
                r"booking[ \t]+number|confirmation[ \t]+number|reservation(?:[ \t]+(?:id|number))?",
                LETTERED_ID,
            ),
            PostProcessor::Identifier,
        ),
        RuleConfig::cell(
            ReservationId,
            &["booking number", "confirmation number", "reservation id"],
            PostProcessor::Identifier,
        ),
        RuleConfig::subject(
            GuestName,
            r"(?i:\bguest)[ \t]*:[ \t]*([^,|\n]+)",
            PostProcessor::Trim,
        ),
        RuleConfig::pattern(
            GuestName,
            labeled(
                r"guest(?:[ \t]+name)?|booker(?:[ \t]+name)?|booked[ \t]+by",
                NAME_VALUE,
            ),
            PostProcessor::Trim,
        ),
        RuleConfig::label(GuestName, &["guest name", "guest", "booker"], PostProcessor::Trim),
        RuleConfig::cell(GuestName, &["guest name", "guest", "booker"], PostProcessor::Trim),
        RuleConfig::pattern(
            CheckInDate,
            dated(r"check[- ]?in|arrival"),
            PostProcessor::Trim,
        ),
        RuleConfig::cell(CheckInDate, &["check-in", "arrival"], PostProcessor::Trim),
        RuleConfig::pattern(
            CheckOutDate,
            dated(r"check[- ]?out|departure"),
            PostProcessor::Trim,
        ),
        RuleConfig::cell(CheckOutDate, &["check-out", "departure"], PostProcessor::Trim),
        RuleConfig::label(
            PropertyName,
            &["property name", "property", "accommodation", "hotel"],
            PostProcessor::Trim,
        ),
        RuleConfig::cell(PropertyName, &["property", "accommodation"], PostProcessor::Trim),
    ];
    rules.extend(common_rules());

    PlatformConfig {
        sender_domains: vec!["booking.com".into(), "booking.co.uk".into()],
        subject_patterns: vec![r"(?i)\bbooking\.com\b".into()],
        date_formats: vec![
            "%Y-%m-%d".into(),
            "%A, %d %B %Y".into(),
            "%a, %d %b %Y".into(),
            "%d %B %Y".into(),
            "%d/%m/%Y".into(),
            "%B %d, %Y".into(),
        ],
        collect_all: vec![TotalAmount],
        rules,
    }
}
