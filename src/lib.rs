// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Booking Confirmation Parser
//!
//! Turns vacation-rental confirmation emails (Vrbo, Airbnb, Booking.com)
//! into validated booking records, or into a precise list of what could not
//! be extracted.
//!
//! # Stages
//!
//! - Platform classification from hint, sender domain and subject
//! - Content normalization of HTML or plain-text bodies, with fallbacks
//! - Per-platform, table-driven field extraction
//! - Date normalization against per-platform format lists
//! - Validation into [`BookingData`] or [`ParseError`]
//!
//! # Example
//!
//! ```rust
//! use booking_extract::{EmailData, Pipeline};
//! use chrono::{TimeZone, Utc};
//!
//! let pipeline = Pipeline::with_defaults().unwrap();
//! let email = EmailData::new(
//!     "msg-1",
//!     "Your reservation is confirmed",
//!     "noreply@vrbo.com",
//!     Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
//! )
//! .with_text("Reservation #: VR12345\nGuest: Jane Doe\nCheck-in: 07/01/2024\nCheck-out: 07/05/2024");
//!
//! let outcome = pipeline.process(&email);
//! let booking = outcome.booking().unwrap();
//! assert_eq!(booking.reservation_id, "VR12345");
//! assert_eq!(booking.guest_name, "Jane Doe");
//! assert_eq!(booking.nights(), Some(4));
//! ```

mod classify;
mod config;
mod dates;
mod error;
mod extract;
mod io;
mod mime;
mod normalize;
mod pipeline;
mod types;
mod validate;

pub use classify::{Classification, ClassifiedBy, Classifier};
pub use config::{
    CompiledConfig, Matcher, ParserConfig, PlatformConfig, PlatformTables, PostProcessor,
    RuleConfig,
};
pub use dates::{DateError, DateNormalizer, ResolvedDates, parse_offset};
pub use error::{Error, Result};
pub use extract::{MatchOrigin, RawFieldSet, RawMatch, Rule, Strategy, currency_marker, pick_amount};
pub use io::{BookingSink, EmailSource, MemorySink, MemorySource, SourceFilter, UpsertStatus};
pub use mime::parse_email_data;
pub use normalize::{NormalizationPath, NormalizedContent, normalize};
pub use pipeline::{DrainReport, Pipeline, RunReport, RunSummary, SinkStats};
pub use types::*;
pub use validate::validate;
