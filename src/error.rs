//! Error types for configuration and the I/O boundary
//!
//! Problems found inside a single email are never reported through this
//! type; they become [`Defect`](crate::Defect) values on the email's outcome.

use crate::types::{Field, Platform};
use thiserror::Error;

/// Errors raised while loading configuration or talking to collaborators
#[derive(Error, Debug)]
pub enum Error {
    /// A configured regular expression does not compile
    #[error("Invalid pattern for {platform} ({context}): {source}")]
    InvalidPattern {
        platform: Platform,
        context: String,
        #[source]
        source: regex::Error,
    },

    /// A configured strftime format contains an unknown specifier
    #[error("Invalid date format for {platform}: {format}")]
    InvalidDateFormat { platform: Platform, format: String },

    /// The default timezone is not a recognizable UTC offset
    #[error("Invalid default timezone: {0}")]
    InvalidTimezone(String),

    /// A declared platform has no strategy table
    #[error("No extraction strategy configured for platform {0}")]
    MissingStrategy(Platform),

    /// A rule targets a field that is never extracted from content
    #[error("Field {field} cannot be extracted (platform {platform})")]
    UnextractableField { platform: Platform, field: Field },

    /// A label or cell rule was declared without any label
    #[error("Rule for {field} on {platform} has no labels")]
    EmptyLabels { platform: Platform, field: Field },

    /// A range rule pairs fields that are not dates, or its pattern lacks start and end groups
    #[error("Range rule for {field} on {platform}: {details}")]
    InvalidRange {
        platform: Platform,
        field: Field,
        details: String,
    },

    /// Configuration text could not be decoded
    #[error("Failed to decode configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The worker pool for batch processing could not be built
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Failed to parse the MIME structure of a raw message
    #[error("Failed to parse email structure: {0}")]
    Structure(#[from] mailparse::MailParseError),

    /// Missing required header
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// Invalid header format
    #[error("Invalid header format for {header}: {details}")]
    InvalidHeader { header: String, details: String },

    /// The message carries neither a text nor an HTML body
    #[error("Message {0} has no text or HTML body")]
    EmptyBody(String),

    /// The email source failed to deliver messages
    #[error("Email source failed: {0}")]
    Source(String),

    /// The sink refused a record
    #[error("Sink rejected {key}: {details}")]
    Sink { key: String, details: String },
}

/// Result type for configuration and boundary operations
pub type Result<T> = std::result::Result<T, Error>;
