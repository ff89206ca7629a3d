//! Boundary traits for the email source and the booking sink
//!
//! The core never performs I/O itself. Mailbox access and persistence plug
//! in through these traits; the in-memory implementations back tests and
//! batch tooling.

use crate::error::Result;
use crate::types::{BookingData, EmailData, ParseError, Platform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selection applied by a source before handing emails to the core
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFilter {
    /// Keep only emails hinted as this platform
    pub platform: Option<Platform>,
    /// Received at or after
    pub since: Option<DateTime<Utc>>,
    /// Received strictly before
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of emails, taken in source order
    pub limit: Option<usize>,
}

impl SourceFilter {
    #[must_use]
    pub fn matches(&self, email: &EmailData) -> bool {
        self.platform.is_none_or(|p| email.platform_hint == Some(p))
            && self.since.is_none_or(|since| email.received >= since)
            && self.until.is_none_or(|until| email.received < until)
    }

    pub fn apply(&self, emails: impl IntoIterator<Item = EmailData>) -> Vec<EmailData> {
        emails
            .into_iter()
            .filter(|email| self.matches(email))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Supplies emails to the pipeline
pub trait EmailSource {
    fn fetch(&mut self, filter: &SourceFilter) -> Result<Vec<EmailData>>;
}

/// What an upsert did to the stored record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStatus {
    Created,
    Updated,
    Unchanged,
}

/// Receives outcomes, keyed by reservation id
pub trait BookingSink {
    /// Create or update the record for `booking.reservation_id`
    fn upsert(&mut self, booking: &BookingData) -> Result<UpsertStatus>;

    /// Record an email that produced no booking
    fn reject(&mut self, _error: &ParseError) -> Result<()> {
        Ok(())
    }
}

/// Source over an in-memory list of emails
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    emails: Vec<EmailData>,
}

impl MemorySource {
    #[must_use]
    pub const fn new(emails: Vec<EmailData>) -> Self {
        Self { emails }
    }
}

impl EmailSource for MemorySource {
    fn fetch(&mut self, filter: &SourceFilter) -> Result<Vec<EmailData>> {
        Ok(filter.apply(self.emails.iter().cloned()))
    }
}

/// Sink that keeps the latest record per reservation id
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    bookings: BTreeMap<String, BookingData>,
    rejected: Vec<ParseError>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, reservation_id: &str) -> Option<&BookingData> {
        self.bookings.get(reservation_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    #[must_use]
    pub fn rejected(&self) -> &[ParseError] {
        &self.rejected
    }
}

impl BookingSink for MemorySink {
    fn upsert(&mut self, booking: &BookingData) -> Result<UpsertStatus> {
        let status = match self.bookings.get(&booking.reservation_id) {
            None => UpsertStatus::Created,
            Some(existing) if existing == booking => UpsertStatus::Unchanged,
            Some(_) => UpsertStatus::Updated,
        };

        if status != UpsertStatus::Unchanged {
            self.bookings
                .insert(booking.reservation_id.clone(), booking.clone());
        }

        Ok(status)
    }

    fn reject(&mut self, error: &ParseError) -> Result<()> {
        self.rejected.push(error.clone());
        Ok(())
    }
}
