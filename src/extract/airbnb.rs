//! Airbnb confirmation emails

use super::{NAME_VALUE, RESERVATION_VALUE, common_rules, dated, labeled};
use crate::config::{PlatformConfig, PostProcessor, RuleConfig};
use crate::types::Field::{CheckInDate, CheckOutDate, GuestName, PropertyName, ReservationId, TotalAmount};

pub(crate) fn table() -> PlatformConfig {
    let mut rules = vec![
        RuleConfig::subject(
            ReservationId,
            r"(?i:reservation)[ \t]+(?i:code[ \t]+)?([A-Z0-9]{8,12})\b",
            PostProcessor::Identifier,
        ),
        RuleConfig::pattern(
            ReservationId,
            labeled(
                r"confirmation[ \t]+code|reservation[ \t]+code|reservation(?:[ \t]+(?:id|number))?",
                RESERVATION_VALUE,
            ),
            PostProcessor::Identifier,
        ),
        RuleConfig::cell(
            ReservationId,
            &["confirmation code", "reservation code", "reservation id"],
            PostProcessor::Identifier,
        ),
        // "Reservation confirmed - Jane Doe arrives Jul 5"
        RuleConfig::subject(
            GuestName,
            r"(?i:reservation[ \t]+confirmed)[ \t]*[-–:][ \t]*(.+?)[ \t]+(?i:arrives)\b",
            PostProcessor::Trim,
        ),
        RuleConfig::pattern(
            GuestName,
            labeled(r"guest(?:[ \t]+name)?|booked[ \t]+by", NAME_VALUE),
            PostProcessor::Trim,
        ),
        RuleConfig::label(GuestName, &["guest name", "guest"], PostProcessor::Trim),
        RuleConfig::cell(GuestName, &["guest name", "guest"], PostProcessor::Trim),
        RuleConfig::pattern(
            CheckInDate,
            dated(r"check[- ]?in|arrives?|arrival"),
            PostProcessor::Trim,
        ),
        RuleConfig::cell(CheckInDate, &["check-in", "checkin", "arrival"], PostProcessor::Trim),
        RuleConfig::pattern(
            CheckOutDate,
            dated(r"check[- ]?out|departs?|departure"),
            PostProcessor::Trim,
        ),
        RuleConfig::cell(CheckOutDate, &["checkout", "check-out", "departure"], PostProcessor::Trim),
        RuleConfig::label(
            PropertyName,
            &["listing name", "listing", "property"],
            PostProcessor::Trim,
        ),
        RuleConfig::cell(PropertyName, &["listing", "property"], PostProcessor::Trim),
    ];
    rules.extend(common_rules());

    PlatformConfig {
        sender_domains: vec!["airbnb.com".into(), "airbnb.co.uk".into()],
        subject_patterns: vec![r"(?i)\bairbnb\b".into()],
        date_formats: vec![
            "%B %d, %Y".into(),
            "%b %d, %Y".into(),
            "%a, %b %d, %Y".into(),
            "%A, %B %d, %Y".into(),
            "%Y-%m-%d".into(),
            "%d/%m/%Y".into(),
        ],
        collect_all: vec![TotalAmount],
        rules,
    }
}
