//! Core types for booking emails and the records parsed from them

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical, timezone-resolved instant used for every date in a booking
pub type Timestamp = DateTime<FixedOffset>;

/// Audit map of every raw string matched for an email
pub type RawData = BTreeMap<String, Value>;

/// Vacation-rental platform that authored an email
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Vrbo,
    Airbnb,
    BookingCom,
    Unknown,
}

impl Platform {
    /// Platforms with a real authoring identity, in classification order
    pub const KNOWN: [Self; 3] = [Self::Vrbo, Self::Airbnb, Self::BookingCom];

    /// Every platform, including the fallback
    pub const ALL: [Self; 4] = [Self::Vrbo, Self::Airbnb, Self::BookingCom, Self::Unknown];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vrbo => "vrbo",
            Self::Airbnb => "airbnb",
            Self::BookingCom => "booking_com",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An email as handed over by the email source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailData {
    /// Opaque identifier assigned by the source
    pub id: String,

    pub subject: String,

    /// Raw `From` value, e.g. `"Vrbo" <noreply@vrbo.com>`
    pub sender: String,

    pub received: DateTime<Utc>,

    /// Plain text body (may be empty)
    pub body_text: String,

    /// HTML body (may be empty)
    pub body_html: String,

    /// Platform already known to the source, trusted when present
    pub platform_hint: Option<Platform>,
}

impl EmailData {
    /// Build an email with both bodies empty and no platform hint
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        sender: impl Into<String>,
        received: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            sender: sender.into(),
            received,
            body_text: String::new(),
            body_html: String::new(),
            platform_hint: None,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.body_text = text.into();
        self
    }

    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.body_html = html.into();
        self
    }

    #[must_use]
    pub const fn with_platform_hint(mut self, platform: Platform) -> Self {
        self.platform_hint = Some(platform);
        self
    }

    /// Check whether at least one body carries content
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body_text.trim().is_empty() || !self.body_html.trim().is_empty()
    }

    /// Parsed sender address, if the `From` value holds one
    #[must_use]
    pub fn sender_address(&self) -> Option<EmailAddress> {
        EmailAddress::parse(&self.sender)
    }
}

/// Email address split into its parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Display name (e.g., "Vrbo")
    pub name: Option<String>,

    /// Email address (e.g., "noreply@vrbo.com")
    pub address: String,

    /// Domain extracted from address, lowercased
    pub domain: String,

    /// Local part (before @)
    pub local_part: String,
}

impl EmailAddress {
    /// Parse an email address from a string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        // "Name <email@domain.com>"
        let (name, address) = match (s.find('<'), s.rfind('>')) {
            (Some(start), Some(end)) if start < end => {
                let name = s[..start].trim().trim_matches('"').trim();
                (
                    (!name.is_empty()).then(|| name.to_string()),
                    s[start + 1..end].trim(),
                )
            }
            _ => (None, s),
        };

        let (local, domain) = address.rsplit_once('@')?;
        if local.is_empty() || domain.is_empty() {
            return None;
        }

        Some(Self {
            name,
            address: address.to_string(),
            domain: domain.trim_end_matches('.').to_lowercase(),
            local_part: local.to_string(),
        })
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Named field of a booking record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ReservationId,
    Platform,
    GuestName,
    GuestPhone,
    GuestEmail,
    CheckInDate,
    CheckOutDate,
    PropertyId,
    PropertyName,
    NumberOfGuests,
    TotalAmount,
    Currency,
    BookingDate,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReservationId => "reservation_id",
            Self::Platform => "platform",
            Self::GuestName => "guest_name",
            Self::GuestPhone => "guest_phone",
            Self::GuestEmail => "guest_email",
            Self::CheckInDate => "check_in_date",
            Self::CheckOutDate => "check_out_date",
            Self::PropertyId => "property_id",
            Self::PropertyName => "property_name",
            Self::NumberOfGuests => "number_of_guests",
            Self::TotalAmount => "total_amount",
            Self::Currency => "currency",
            Self::BookingDate => "booking_date",
        }
    }

    /// Whether content extraction can ever produce this field
    #[must_use]
    pub const fn is_extractable(self) -> bool {
        !matches!(self, Self::Platform)
    }

    /// Whether the field holds a date that goes through date normalization
    #[must_use]
    pub const fn is_date(self) -> bool {
        matches!(
            self,
            Self::CheckInDate | Self::CheckOutDate | Self::BookingDate
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason code attached to a defect
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DefectReason {
    MissingReservationId,
    MissingGuestName,
    InvalidDateRange,
    InvalidGuestCount,
    InvalidAmount,
    InvalidCurrencyCode,
    UnparseableDate,
    UnknownPlatform,
}

impl DefectReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingReservationId => "missing_reservation_id",
            Self::MissingGuestName => "missing_guest_name",
            Self::InvalidDateRange => "invalid_date_range",
            Self::InvalidGuestCount => "invalid_guest_count",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidCurrencyCode => "invalid_currency_code",
            Self::UnparseableDate => "unparseable_date",
            Self::UnknownPlatform => "unknown_platform",
        }
    }

    /// Fatal reasons prevent a booking record from being produced
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::MissingReservationId | Self::MissingGuestName | Self::InvalidDateRange
        )
    }
}

impl fmt::Display for DefectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level problem found while validating an email
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Defect {
    pub field: Field,
    pub reason: DefectReason,
}

impl Defect {
    #[must_use]
    pub const fn new(field: Field, reason: DefectReason) -> Self {
        Self { field, reason }
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.reason.is_fatal()
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// A validated booking extracted from one email
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingData {
    /// Platform-issued identifier, the sink's idempotency key
    pub reservation_id: String,
    pub platform: Platform,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub check_in_date: Option<Timestamp>,
    pub check_out_date: Option<Timestamp>,
    pub property_id: Option<String>,
    pub property_name: Option<String>,
    /// Always positive when present
    pub number_of_guests: Option<u32>,
    /// Never negative when present
    pub total_amount: Option<f64>,
    /// Three-letter currency code
    pub currency: Option<String>,
    pub booking_date: Option<Timestamp>,
    pub source_email_id: String,
    pub raw_data: RawData,
}

impl BookingData {
    /// Number of nights between check-in and check-out, when both are known
    #[must_use]
    pub fn nights(&self) -> Option<i64> {
        match (self.check_in_date, self.check_out_date) {
            (Some(check_in), Some(check_out)) => Some((check_out - check_in).num_days()),
            _ => None,
        }
    }
}

impl fmt::Display for BookingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Booking({} on {}, guest {})",
            self.reservation_id, self.platform, self.guest_name
        )
    }
}

/// An email that could not be turned into a booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParseError {
    pub source_email_id: String,
    pub platform: Platform,
    /// Every defect found, fatal and non-fatal, in rule order
    pub defects: Vec<Defect>,
    pub raw_data: RawData,
}

impl ParseError {
    /// Check whether a defect with the given reason was recorded
    #[must_use]
    pub fn has_reason(&self, reason: DefectReason) -> bool {
        self.defects.iter().any(|d| d.reason == reason)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<&str> = self.defects.iter().map(|d| d.reason.as_str()).collect();
        write!(
            f,
            "email {} ({}) rejected: {}",
            self.source_email_id,
            self.platform,
            reasons.join(", ")
        )
    }
}

/// Result of processing one email
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A booking was produced; `defects` lists the non-fatal problems
    Parsed {
        booking: BookingData,
        defects: Vec<Defect>,
    },
    /// At least one fatal defect was found
    Failed(ParseError),
}

impl Outcome {
    #[must_use]
    pub const fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }

    #[must_use]
    pub const fn booking(&self) -> Option<&BookingData> {
        match self {
            Self::Parsed { booking, .. } => Some(booking),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&ParseError> {
        match self {
            Self::Parsed { .. } => None,
            Self::Failed(error) => Some(error),
        }
    }

    #[must_use]
    pub fn defects(&self) -> &[Defect] {
        match self {
            Self::Parsed { defects, .. } => defects,
            Self::Failed(error) => &error.defects,
        }
    }

    #[must_use]
    pub const fn platform(&self) -> Platform {
        match self {
            Self::Parsed { booking, .. } => booking.platform,
            Self::Failed(error) => error.platform,
        }
    }

    #[must_use]
    pub fn source_email_id(&self) -> &str {
        match self {
            Self::Parsed { booking, .. } => &booking.source_email_id,
            Self::Failed(error) => &error.source_email_id,
        }
    }
}
