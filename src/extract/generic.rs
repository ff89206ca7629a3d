//! Minimal table for emails no platform claims
//!
//! Only reservation-id-shaped and date-shaped text is attempted, so the
//! result is usually incomplete and fails validation on the guest name.

use super::{RESERVATION_VALUE, dated, labeled};
use crate::config::{PlatformConfig, PostProcessor, RuleConfig};
use crate::types::Field::{CheckInDate, CheckOutDate, ReservationId, TotalAmount};

pub(crate) fn table() -> PlatformConfig {
    PlatformConfig {
        sender_domains: Vec::new(),
        subject_patterns: Vec::new(),
        date_formats: vec!["%Y-%m-%d".into(), "%B %d, %Y".into(), "%b %d, %Y".into()],
        collect_all: vec![TotalAmount],
        rules: vec![
            RuleConfig::pattern(
                ReservationId,
                labeled(
                    r"(?:reservation|confirmation|booking)(?:[ \t]+(?:id|number|code|no\.?))?",
                    RESERVATION_VALUE,
                ),
                PostProcessor::Identifier,
            ),
            RuleConfig::pattern(
                CheckInDate,
                dated(r"check[- ]?in|arrival"),
                PostProcessor::Trim,
            ),
            RuleConfig::pattern(
                CheckOutDate,
                dated(r"check[- ]?out|departure"),
                PostProcessor::Trim,
            ),
        ],
    }
}
