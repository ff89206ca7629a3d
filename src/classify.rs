//! Platform classification from sender and subject

use crate::config::PlatformTables;
use crate::error::{Error, Result};
use crate::types::{EmailData, Platform};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which rule decided the platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedBy {
    Hint,
    SenderDomain,
    Subject,
    Fallback,
}

/// Platform decision for one email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub platform: Platform,
    pub rule: ClassifiedBy,
}

#[derive(Debug, Clone)]
struct Signals {
    platform: Platform,
    domains: Vec<String>,
    subjects: Vec<Regex>,
}

/// Decides which platform authored an email
///
/// Rules run in a fixed order (hint, sender domain, subject) and the first
/// one that matches wins. There is no scoring: a sender-domain match on any
/// platform beats a subject match on an earlier one.
#[derive(Debug, Clone)]
pub struct Classifier {
    signals: Vec<Signals>,
}

impl Classifier {
    pub(crate) fn compile(tables: &PlatformTables) -> Result<Self> {
        let mut signals = Vec::with_capacity(Platform::KNOWN.len());

        for platform in Platform::KNOWN {
            let Some(table) = tables.get(platform) else {
                return Err(Error::MissingStrategy(platform));
            };

            let subjects = table
                .subject_patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| Error::InvalidPattern {
                        platform,
                        context: format!("subject pattern {pattern:?}"),
                        source,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            signals.push(Signals {
                platform,
                domains: table
                    .sender_domains
                    .iter()
                    .map(|d| d.trim().trim_start_matches('.').to_lowercase())
                    .filter(|d| !d.is_empty())
                    .collect(),
                subjects,
            });
        }

        Ok(Self { signals })
    }

    /// Classify an email. Never fails; `Unknown` is a legal answer.
    #[must_use]
    pub fn classify(&self, email: &EmailData) -> Classification {
        let classification = self.decide(email);
        debug!(
            "Classified email {} as {} ({:?})",
            email.id, classification.platform, classification.rule
        );
        classification
    }

    fn decide(&self, email: &EmailData) -> Classification {
        if let Some(platform) = email.platform_hint {
            return Classification {
                platform,
                rule: ClassifiedBy::Hint,
            };
        }

        if let Some(address) = email.sender_address() {
            let matched = self
                .signals
                .iter()
                .find(|s| s.domains.iter().any(|d| domain_matches(&address.domain, d)));
            if let Some(signals) = matched {
                return Classification {
                    platform: signals.platform,
                    rule: ClassifiedBy::SenderDomain,
                };
            }
        }

        let matched = self
            .signals
            .iter()
            .find(|s| s.subjects.iter().any(|re| re.is_match(&email.subject)));
        if let Some(signals) = matched {
            return Classification {
                platform: signals.platform,
                rule: ClassifiedBy::Subject,
            };
        }

        Classification {
            platform: Platform::Unknown,
            rule: ClassifiedBy::Fallback,
        }
    }
}

/// Exact match, or `domain` is a subdomain of `known`
fn domain_matches(domain: &str, known: &str) -> bool {
    domain == known
        || domain
            .strip_suffix(known)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
