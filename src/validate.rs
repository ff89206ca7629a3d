//! Completeness and consistency checks that turn a field set into a booking

use crate::dates::ResolvedDates;
use crate::extract::RawFieldSet;
use crate::types::{BookingData, Defect, DefectReason, EmailData, Field, Outcome, ParseError, Platform};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Plain decimal as written by the amount post-processor
static AMOUNT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d{1,2})?$").unwrap());

/// Validate the extracted fields of one email
///
/// Every rule runs, so one email reports all of its problems at once. Any
/// fatal defect yields [`Outcome::Failed`]; otherwise the fields with
/// non-fatal defects are dropped and a booking is produced. The raw field set
/// is attached to either outcome.
#[must_use]
pub fn validate(
    platform: Platform,
    fields: &RawFieldSet,
    dates: &ResolvedDates,
    email: &EmailData,
) -> Outcome {
    let mut defects = Vec::new();

    let reservation_id = fields.value(Field::ReservationId).map(str::to_string);
    if reservation_id.is_none() {
        defects.push(Defect::new(Field::ReservationId, DefectReason::MissingReservationId));
    }

    let guest_name = fields.value(Field::GuestName).map(str::to_string);
    if guest_name.is_none() {
        defects.push(Defect::new(Field::GuestName, DefectReason::MissingGuestName));
    }

    if let (Some(check_in), Some(check_out)) = (dates.check_in, dates.check_out)
        && check_in >= check_out
    {
        defects.push(Defect::new(Field::CheckInDate, DefectReason::InvalidDateRange));
    }

    let number_of_guests = fields.value(Field::NumberOfGuests).and_then(|raw| {
        let count = parse_guest_count(raw);
        if count.is_none() {
            defects.push(Defect::new(Field::NumberOfGuests, DefectReason::InvalidGuestCount));
        }
        count
    });

    let total_amount = fields.value(Field::TotalAmount).and_then(|raw| {
        let amount = parse_amount(raw);
        if amount.is_none() {
            defects.push(Defect::new(Field::TotalAmount, DefectReason::InvalidAmount));
        }
        amount
    });

    let currency = fields.value(Field::Currency).and_then(|raw| {
        if is_currency_code(raw) {
            Some(raw.to_string())
        } else {
            defects.push(Defect::new(Field::Currency, DefectReason::InvalidCurrencyCode));
            None
        }
    });

    for field in &dates.unparseable {
        defects.push(Defect::new(*field, DefectReason::UnparseableDate));
    }

    if platform == Platform::Unknown {
        defects.push(Defect::new(Field::Platform, DefectReason::UnknownPlatform));
    }

    let raw_data = fields.to_raw_data();

    let (Some(reservation_id), Some(guest_name)) = (reservation_id, guest_name) else {
        return fail(platform, email, defects, raw_data);
    };
    if defects.iter().any(Defect::is_fatal) {
        return fail(platform, email, defects, raw_data);
    }

    // no extracted booking date: fall back to when the email arrived
    let booking_date = if fields.get(Field::BookingDate).is_some() {
        dates.booking
    } else {
        Some(email.received.fixed_offset())
    };

    let booking = BookingData {
        reservation_id,
        platform,
        guest_name,
        guest_phone: fields.value(Field::GuestPhone).map(str::to_string),
        guest_email: fields.value(Field::GuestEmail).map(str::to_string),
        check_in_date: dates.check_in,
        check_out_date: dates.check_out,
        property_id: fields.value(Field::PropertyId).map(str::to_string),
        property_name: fields.value(Field::PropertyName).map(str::to_string),
        number_of_guests,
        total_amount,
        currency,
        booking_date,
        source_email_id: email.id.clone(),
        raw_data,
    };

    Outcome::Parsed { booking, defects }
}

fn fail(
    platform: Platform,
    email: &EmailData,
    defects: Vec<Defect>,
    raw_data: crate::types::RawData,
) -> Outcome {
    let error = ParseError {
        source_email_id: email.id.clone(),
        platform,
        defects,
        raw_data,
    };
    warn!("{}", error);
    Outcome::Failed(error)
}

/// Positive whole number, written either as an integer or as `4.0`
fn parse_guest_count(raw: &str) -> Option<u32> {
    let raw = raw.trim().replace(',', ".");
    if let Ok(count) = raw.parse::<i64>() {
        return u32::try_from(count).ok().filter(|c| *c > 0);
    }

    let value: f64 = raw.parse().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value >= 1.0 && value <= f64::from(u32::MAX) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(value as u32)
    } else {
        None
    }
}

/// Non-negative finite amount
fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if !AMOUNT_REGEX.is_match(raw) {
        return None;
    }

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn is_currency_code(raw: &str) -> bool {
    raw.len() == 3 && raw.bytes().all(|b| b.is_ascii_uppercase())
}
