//! Vrbo (and legacy HomeAway) confirmation emails

use super::{MONTH_DAY, NAME_VALUE, RESERVATION_VALUE, common_rules, dated, labeled};
use crate::config::{PlatformConfig, PostProcessor, RuleConfig};
use crate::types::Field::{CheckInDate, CheckOutDate, GuestName, PropertyName, ReservationId, TotalAmount};

pub(crate) fn table() -> PlatformConfig {
    let mut rules = vec![
        // "Instant Booking from Jane Doe: Jul 1 - Jul 5, 2024 - Vrbo #4567890"
        RuleConfig::subject(
            ReservationId,
            r"(?i:vrbo|homeaway)[ \t]*#[ \t]*(\d{5,})",
            PostProcessor::Digits,
        ),
        RuleConfig::pattern(
            ReservationId,
            labeled(
                r"reservation(?:[ \t]+(?:id|number))?|confirmation(?:[ \t]+(?:number|code))?|booking[ \t]+id",
                RESERVATION_VALUE,
            ),
            PostProcessor::Identifier,
        ),
        RuleConfig::cell(
            ReservationId,
            &["reservation id", "reservation", "reservation number", "confirmation"],
            PostProcessor::Identifier,
        ),
        RuleConfig::subject(
            GuestName,
            r"(?i:booking|reservation|inquiry)[ \t]+from[ \t]+([^:]+?)[ \t]*:",
            PostProcessor::Trim,
        ),
        RuleConfig::pattern(
            GuestName,
            labeled(r"guest(?:[ \t]+name)?|traveler(?:[ \t]+name)?", NAME_VALUE),
            PostProcessor::Trim,
        ),
        RuleConfig::label(GuestName, &["guest name", "guest", "traveler"], PostProcessor::Trim),
        RuleConfig::cell(GuestName, &["guest name", "guest", "traveler"], PostProcessor::Trim),
        RuleConfig::pattern(
            CheckInDate,
            dated(r"check[- ]?in(?:[ \t]+date)?|arrival(?:[ \t]+date)?"),
            PostProcessor::Trim,
        ),
        RuleConfig::cell(CheckInDate, &["check-in", "check in", "arrival"], PostProcessor::Trim),
        RuleConfig::pattern(
            CheckOutDate,
            dated(r"check[- ]?out(?:[ \t]+date)?|departure(?:[ \t]+date)?"),
            PostProcessor::Trim,
        ),
        RuleConfig::cell(CheckOutDate, &["check-out", "check out", "departure"], PostProcessor::Trim),
        // "Jul 1 - Jul 5, 2024", "Dec 30, 2024 - Jan 2, 2025"
        RuleConfig::subject_range(
            CheckInDate,
            CheckOutDate,
            format!(
                r"\b({MONTH_DAY}(?:,[ \t]*\d{{4}})?)[ \t]*[-–][ \t]*({MONTH_DAY}),?[ \t]*(\d{{4}})\b"
            ),
            PostProcessor::Trim,
        ),
        RuleConfig::label(
            PropertyName,
            &["property name", "property", "rental"],
            PostProcessor::Trim,
        ),
        RuleConfig::cell(PropertyName, &["property", "property name"], PostProcessor::Trim),
    ];
    rules.extend(common_rules());

    PlatformConfig {
        sender_domains: vec!["vrbo.com".into(), "homeaway.com".into()],
        subject_patterns: vec![r"(?i)\b(?:vrbo|homeaway)\b".into()],
        date_formats: vec![
            "%m/%d/%Y".into(),
            "%Y-%m-%d".into(),
            "%B %d, %Y".into(),
            "%b %d, %Y".into(),
        ],
        collect_all: vec![TotalAmount],
        rules,
    }
}
