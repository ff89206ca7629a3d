//! Declarative configuration for classification and extraction
//!
//! Everything the core needs at runtime (sender domains, subject patterns,
//! rule tables, date formats, default timezone) lives in [`ParserConfig`].
//! It is plain data: it can be built in code, started from the built-in
//! defaults, or decoded from TOML. [`ParserConfig::compile`] validates it
//! once and produces the immutable [`CompiledConfig`] shared by every worker.

use crate::classify::Classifier;
use crate::dates::{DateNormalizer, parse_offset};
use crate::error::{Error, Result};
use crate::extract::{self, CompiledMatcher, Rule, Strategies, Strategy};
use crate::types::{Field, Platform};
use chrono::FixedOffset;
use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Top-level parser configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParserConfig {
    /// UTC offset applied to dates that carry no timezone (`UTC`, `+02:00`, `-0500`)
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    /// One table per platform
    pub platforms: PlatformTables,
}

/// Per-platform tables, one slot per [`Platform`] variant
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformTables {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrbo: Option<PlatformConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airbnb: Option<PlatformConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_com: Option<PlatformConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown: Option<PlatformConfig>,
}

impl PlatformTables {
    #[must_use]
    pub const fn get(&self, platform: Platform) -> Option<&PlatformConfig> {
        match platform {
            Platform::Vrbo => self.vrbo.as_ref(),
            Platform::Airbnb => self.airbnb.as_ref(),
            Platform::BookingCom => self.booking_com.as_ref(),
            Platform::Unknown => self.unknown.as_ref(),
        }
    }

    pub const fn get_mut(&mut self, platform: Platform) -> Option<&mut PlatformConfig> {
        match platform {
            Platform::Vrbo => self.vrbo.as_mut(),
            Platform::Airbnb => self.airbnb.as_mut(),
            Platform::BookingCom => self.booking_com.as_mut(),
            Platform::Unknown => self.unknown.as_mut(),
        }
    }
}

/// Classification signals, extraction rules and date formats for one platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Sender domains, matched exactly or as a parent domain
    #[serde(default)]
    pub sender_domains: Vec<String>,

    /// Regular expressions tried against the subject line
    #[serde(default)]
    pub subject_patterns: Vec<String>,

    /// Candidate strftime formats, in priority order
    #[serde(default)]
    pub date_formats: Vec<String>,

    /// Fields whose matches are all kept and tie-broken
    #[serde(default = "default_collect_all")]
    pub collect_all: Vec<Field>,

    /// Ordered extraction rules
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One declarative extraction rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleConfig {
    pub field: Field,
    pub matcher: Matcher,
    #[serde(default)]
    pub post: PostProcessor,
}

/// Where and how a rule looks for its value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matcher {
    /// Regex over the flattened text; capture group 1 is the value
    Pattern { pattern: String },
    /// Regex over the subject line; capture group 1 is the value
    Subject { pattern: String },
    /// Text after `label:` on the same line, or on the next line when the label stands alone
    Label { labels: Vec<String> },
    /// Second cell of a table row whose first cell is one of the labels
    Cell { labels: Vec<String> },
    /// Date range in the subject line: group 1 fills the rule's field, group 2
    /// fills `end_field`, an optional group 3 is a year shared by both ends
    SubjectRange { pattern: String, end_field: Field },
    /// First two body matches of a single-group date pattern, start then end
    DatePair { pattern: String, end_field: Field },
}

impl Matcher {
    /// Field filled by the end of a range, for the two range matchers
    #[must_use]
    pub const fn end_field(&self) -> Option<Field> {
        match self {
            Self::SubjectRange { end_field, .. } | Self::DatePair { end_field, .. } => Some(*end_field),
            _ => None,
        }
    }
}

/// Cleanup applied to a matched string
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostProcessor {
    /// Collapse internal whitespace and trim
    #[default]
    Trim,
    /// Keep digits, `+`, `-`, parentheses and single spaces
    Phone,
    /// Keep ASCII digits only
    Digits,
    /// Reference number: must contain a digit; digit groups split by `.` or spaces are joined
    Identifier,
    /// Strip grouping separators and currency markers, keep sign and decimals
    Amount,
    Uppercase,
    /// Map a currency symbol or code to a three-letter code
    Currency,
}

impl RuleConfig {
    pub fn pattern(field: Field, pattern: impl Into<String>, post: PostProcessor) -> Self {
        Self {
            field,
            matcher: Matcher::Pattern {
                pattern: pattern.into(),
            },
            post,
        }
    }

    pub fn subject(field: Field, pattern: impl Into<String>, post: PostProcessor) -> Self {
        Self {
            field,
            matcher: Matcher::Subject {
                pattern: pattern.into(),
            },
            post,
        }
    }

    #[must_use]
    pub fn label(field: Field, labels: &[&str], post: PostProcessor) -> Self {
        Self {
            field,
            matcher: Matcher::Label {
                labels: labels.iter().map(ToString::to_string).collect(),
            },
            post,
        }
    }

    pub fn subject_range(start: Field, end: Field, pattern: impl Into<String>, post: PostProcessor) -> Self {
        Self {
            field: start,
            matcher: Matcher::SubjectRange {
                pattern: pattern.into(),
                end_field: end,
            },
            post,
        }
    }

    pub fn date_pair(start: Field, end: Field, pattern: impl Into<String>, post: PostProcessor) -> Self {
        Self {
            field: start,
            matcher: Matcher::DatePair {
                pattern: pattern.into(),
                end_field: end,
            },
            post,
        }
    }

    #[must_use]
    pub fn cell(field: Field, labels: &[&str], post: PostProcessor) -> Self {
        Self {
            field,
            matcher: Matcher::Cell {
                labels: labels.iter().map(ToString::to_string).collect(),
            },
            post,
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_collect_all() -> Vec<Field> {
    vec![Field::TotalAmount]
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            platforms: PlatformTables {
                vrbo: Some(extract::vrbo::table()),
                airbnb: Some(extract::airbnb::table()),
                booking_com: Some(extract::booking_com::table()),
                unknown: Some(extract::generic::table()),
            },
        }
    }
}

impl ParserConfig {
    /// Decode a configuration from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Validate every table and compile patterns, formats and the timezone
    pub fn compile(&self) -> Result<CompiledConfig> {
        let offset = parse_offset(&self.default_timezone)
            .ok_or_else(|| Error::InvalidTimezone(self.default_timezone.clone()))?;

        let classifier = Classifier::compile(&self.platforms)?;
        let strategies = Strategies {
            vrbo: self.compile_strategy(Platform::Vrbo, offset)?,
            airbnb: self.compile_strategy(Platform::Airbnb, offset)?,
            booking_com: self.compile_strategy(Platform::BookingCom, offset)?,
            unknown: self.compile_strategy(Platform::Unknown, offset)?,
        };

        debug!(
            "Compiled parser configuration (default offset {})",
            offset
        );

        Ok(CompiledConfig {
            default_offset: offset,
            classifier,
            strategies,
        })
    }

    fn compile_strategy(&self, platform: Platform, offset: FixedOffset) -> Result<Strategy> {
        let table = self
            .platforms
            .get(platform)
            .ok_or(Error::MissingStrategy(platform))?;

        for format in &table.date_formats {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(Error::InvalidDateFormat {
                    platform,
                    format: format.clone(),
                });
            }
        }

        let rules = table
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| compile_rule(platform, index, rule))
            .collect::<Result<Vec<_>>>()?;

        Ok(Strategy::new(
            platform,
            rules,
            table.collect_all.iter().copied().collect::<BTreeSet<_>>(),
            DateNormalizer::new(table.date_formats.clone(), offset),
        ))
    }
}

fn compile_rule(platform: Platform, index: usize, rule: &RuleConfig) -> Result<Rule> {
    if !rule.field.is_extractable() {
        return Err(Error::UnextractableField {
            platform,
            field: rule.field,
        });
    }

    let compile_regex = |pattern: &str| {
        Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            platform,
            context: format!("rule {index} ({})", rule.field),
            source,
        })
    };

    let matcher = match &rule.matcher {
        Matcher::Pattern { pattern } => CompiledMatcher::Pattern(compile_regex(pattern)?),
        Matcher::Subject { pattern } => CompiledMatcher::Subject(compile_regex(pattern)?),
        Matcher::Label { labels } => CompiledMatcher::Label(normalize_labels(platform, rule, labels)?),
        Matcher::Cell { labels } => CompiledMatcher::Cell(normalize_labels(platform, rule, labels)?),
        Matcher::SubjectRange { pattern, end_field } => {
            let re = compile_regex(pattern)?;
            check_range(platform, rule.field, *end_field, &re, 2)?;
            CompiledMatcher::SubjectRange(re, *end_field)
        }
        Matcher::DatePair { pattern, end_field } => {
            let re = compile_regex(pattern)?;
            check_range(platform, rule.field, *end_field, &re, 1)?;
            CompiledMatcher::DatePair(re, *end_field)
        }
    };

    Ok(Rule::new(rule.field, matcher, rule.post))
}

/// Both ends must be distinct date fields and the pattern must capture `groups` values
fn check_range(platform: Platform, start: Field, end: Field, re: &Regex, groups: usize) -> Result<()> {
    let invalid = |details: String| Error::InvalidRange {
        platform,
        field: start,
        details,
    };

    if !start.is_date() || !end.is_date() {
        return Err(invalid(format!("{start} and {end} must both be date fields")));
    }
    if start == end {
        return Err(invalid(format!("start and end are both {start}")));
    }
    // captures_len counts the implicit whole-match group
    if re.captures_len() <= groups {
        return Err(invalid(format!(
            "pattern has {} capture groups, needs {groups}",
            re.captures_len() - 1
        )));
    }

    Ok(())
}

/// Lowercase labels and order them longest first, so `guest name` is tried before `guest`
fn normalize_labels(platform: Platform, rule: &RuleConfig, labels: &[String]) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = labels
        .iter()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();

    if normalized.is_empty() {
        return Err(Error::EmptyLabels {
            platform,
            field: rule.field,
        });
    }

    normalized.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    normalized.dedup();
    Ok(normalized)
}

/// Validated, immutable configuration shared across workers
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    default_offset: FixedOffset,
    classifier: Classifier,
    strategies: Strategies,
}

impl CompiledConfig {
    #[must_use]
    pub const fn default_offset(&self) -> FixedOffset {
        self.default_offset
    }

    #[must_use]
    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    #[must_use]
    pub const fn strategy(&self, platform: Platform) -> &Strategy {
        self.strategies.for_platform(platform)
    }
}
