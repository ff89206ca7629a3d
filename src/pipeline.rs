//! Per-email orchestration and batch runs

use crate::config::{CompiledConfig, ParserConfig};
use crate::dates::ResolvedDates;
use crate::error::Result;
use crate::io::{BookingSink, EmailSource, SourceFilter, UpsertStatus};
use crate::normalize::normalize;
use crate::types::{DefectReason, EmailData, Outcome, Platform};
use crate::validate::validate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Aggregate counts for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub by_platform: BTreeMap<Platform, usize>,
    /// Frequency of every defect reason, fatal or not
    pub defect_counts: BTreeMap<DefectReason, usize>,
    /// Reservation ids produced by more than one email, sorted
    pub duplicate_reservation_ids: Vec<String>,
}

impl RunSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

        for outcome in outcomes {
            *summary.by_platform.entry(outcome.platform()).or_default() += 1;

            for defect in outcome.defects() {
                *summary.defect_counts.entry(defect.reason).or_default() += 1;
            }

            match outcome.booking() {
                Some(booking) => {
                    summary.succeeded += 1;
                    *seen.entry(booking.reservation_id.as_str()).or_default() += 1;
                }
                None => summary.failed += 1,
            }
        }

        summary.duplicate_reservation_ids = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id.to_string())
            .collect();

        summary
    }

    /// Number of emails that produced the given defect reason
    #[must_use]
    pub fn defect_count(&self, reason: DefectReason) -> usize {
        self.defect_counts.get(&reason).copied().unwrap_or_default()
    }
}

/// Outcomes in input order plus their summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
    pub summary: RunSummary,
}

impl RunReport {
    fn new(outcomes: Vec<Outcome>) -> Self {
        let summary = RunSummary::from_outcomes(&outcomes);
        info!(
            "Processed {} emails: {} parsed, {} failed, {} duplicate reservation ids",
            summary.total,
            summary.succeeded,
            summary.failed,
            summary.duplicate_reservation_ids.len()
        );
        Self { outcomes, summary }
    }
}

/// Sink-side counts for a drained run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SinkStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub rejected: usize,
}

/// Everything [`Pipeline::drain`] did
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrainReport {
    pub run: RunReport,
    pub sink: SinkStats,
}

/// Classifies, normalizes, extracts and validates emails
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: CompiledConfig,
}

impl Pipeline {
    #[must_use]
    pub const fn new(config: CompiledConfig) -> Self {
        Self { config }
    }

    /// Pipeline over the built-in platform tables
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(ParserConfig::default().compile()?))
    }

    #[must_use]
    pub const fn config(&self) -> &CompiledConfig {
        &self.config
    }

    /// Process one email into exactly one outcome
    #[must_use]
    pub fn process(&self, email: &EmailData) -> Outcome {
        let platform = self.config.classifier().classify(email).platform;
        let content = normalize(&email.body_text, &email.body_html);
        debug!(
            "Email {} normalized via {:?} ({} lines, {} table rows)",
            email.id,
            content.path,
            content.lines().count(),
            content.table_rows.len()
        );

        let strategy = self.config.strategy(platform);
        let fields = strategy.extract(&email.subject, &content);
        let dates = ResolvedDates::resolve(&fields, strategy.dates());

        validate(platform, &fields, &dates, email)
    }

    /// Process a batch sequentially
    #[must_use]
    pub fn run(&self, emails: &[EmailData]) -> RunReport {
        RunReport::new(emails.iter().map(|email| self.process(email)).collect())
    }

    /// Process a batch on a dedicated pool of `workers` threads
    ///
    /// Outcomes come back in input order. `workers == 0` lets rayon pick the
    /// thread count.
    pub fn run_parallel(&self, emails: &[EmailData], workers: usize) -> Result<RunReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("booking-extract-{index}"))
            .build()?;

        let outcomes = pool.install(|| {
            emails
                .par_iter()
                .map(|email| self.process(email))
                .collect::<Vec<_>>()
        });

        Ok(RunReport::new(outcomes))
    }

    /// Fetch from a source, process, and hand every outcome to a sink
    pub fn drain<S, K>(&self, source: &mut S, filter: &SourceFilter, sink: &mut K) -> Result<DrainReport>
    where
        S: EmailSource + ?Sized,
        K: BookingSink + ?Sized,
    {
        let emails = source.fetch(filter)?;
        let run = self.run(&emails);
        let mut stats = SinkStats::default();

        for outcome in &run.outcomes {
            match outcome {
                Outcome::Parsed { booking, .. } => match sink.upsert(booking)? {
                    UpsertStatus::Created => stats.created += 1,
                    UpsertStatus::Updated => stats.updated += 1,
                    UpsertStatus::Unchanged => stats.unchanged += 1,
                },
                Outcome::Failed(error) => {
                    sink.reject(error)?;
                    stats.rejected += 1;
                }
            }
        }

        Ok(DrainReport { run, sink: stats })
    }
}
