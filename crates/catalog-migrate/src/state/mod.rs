//! Run state machine.
//!
//! [`RunState`] is advanced only by [`RunState::handle`], which takes one
//! [`RunEvent`] and returns the [`Command`] the driver must execute next. The
//! driver feeds the command's result back in as the following event, so a run is
//! a strict alternation of "do one thing, report it".
//!
//! ```text
//! Idle --Start--> FetchingPage --ok--> Migrating --(batch done, more pages)--> FetchingPage
//!                      |                   |
//!                      +--err--> Failed    +--(batch done, last page)--> Complete
//! ```

use crate::error::{MigrateError, Result};
use crate::source::{Page, SourceRecord};
use crate::target::ActionTaken;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    FetchingPage,
    Migrating,
    Complete,
    Failed,
}

impl Phase {
    /// Complete and Failed never transition on their own.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }

    pub fn is_running(self) -> bool {
        matches!(self, Phase::FetchingPage | Phase::Migrating)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::FetchingPage => "fetching_page",
            Phase::Migrating => "migrating",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-record result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Created,
    Updated,
    Failed(String),
}

impl From<Result<ActionTaken>> for MigrationOutcome {
    fn from(result: Result<ActionTaken>) -> Self {
        match result {
            Ok(ActionTaken::Created) => MigrationOutcome::Created,
            Ok(ActionTaken::Updated) => MigrationOutcome::Updated,
            Err(e) => MigrationOutcome::Failed(e.to_string()),
        }
    }
}

/// Outcome counters for one run. Never decrease while the run lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub created: u64,
    pub updated: u64,
    pub failed: u64,
}

impl RunStats {
    /// Records attempted so far.
    pub fn processed(&self) -> u64 {
        self.created + self.updated + self.failed
    }

    fn record(&mut self, outcome: &MigrationOutcome) {
        match outcome {
            MigrationOutcome::Created => self.created += 1,
            MigrationOutcome::Updated => self.updated += 1,
            MigrationOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug)]
pub enum RunEvent {
    /// Begin a run at page 1, discarding any previous stats.
    Start,
    /// The page requested by [`Command::FetchPage`] arrived.
    PageFetched(Page),
    /// The page fetch failed; the run cannot continue.
    PageFetchFailed(String),
    /// Result of the reconcile requested by [`Command::Reconcile`].
    RecordReconciled(MigrationOutcome),
}

impl RunEvent {
    fn name(&self) -> &'static str {
        match self {
            RunEvent::Start => "start",
            RunEvent::PageFetched(_) => "page_fetched",
            RunEvent::PageFetchFailed(_) => "page_fetch_failed",
            RunEvent::RecordReconciled(_) => "record_reconciled",
        }
    }
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchPage(u32),
    Reconcile(SourceRecord),
    /// The run reached a terminal phase.
    Stop,
}

/// Point-in-time view of a run, for rendering progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub phase: Phase,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub stats: RunStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ProgressSnapshot {
    /// Fraction of `total_count` attempted, in `0.0..=1.0`; 0 when the total is unknown.
    pub fn overall_progress(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        (self.stats.processed() as f64 / self.total_count as f64).min(1.0)
    }
}

/// The orchestrator's state for a single run.
#[derive(Debug, Clone)]
pub struct RunState {
    phase: Phase,
    /// Page being fetched, or whose records are being migrated.
    current_page: u32,
    /// Index into `queue` of the record in flight.
    cursor: usize,
    queue: Vec<SourceRecord>,
    stats: RunStats,
    total_pages: u32,
    total_count: u64,
    pages_fetched: u32,
    last_error: Option<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            current_page: 0,
            cursor: 0,
            queue: Vec::new(),
            stats: RunStats::default(),
            total_pages: 1,
            total_count: 0,
            pages_fetched: 0,
            last_error: None,
        }
    }

    /// Apply one event. An event that does not fit the current phase is
    /// rejected with [`MigrateError::InvalidIntent`] and leaves the state untouched.
    pub fn handle(&mut self, event: RunEvent) -> Result<Command> {
        match (self.phase, event) {
            (phase, RunEvent::Start) if !phase.is_running() => {
                *self = Self::new();
                self.phase = Phase::FetchingPage;
                self.current_page = 1;
                Ok(Command::FetchPage(1))
            }

            (Phase::FetchingPage, RunEvent::PageFetched(page)) => {
                if page.page_number != self.current_page {
                    return Err(MigrateError::InvalidIntent(format!(
                        "received page {} while fetching page {}",
                        page.page_number, self.current_page
                    )));
                }
                // Totals are frozen after the first page.
                if self.pages_fetched == 0 {
                    self.total_pages = page.total_pages.max(1);
                    self.total_count = page.total_count;
                }
                self.pages_fetched += 1;
                self.queue = page.records;
                self.cursor = 0;
                self.phase = Phase::Migrating;
                Ok(self.dispatch_next())
            }

            (Phase::FetchingPage, RunEvent::PageFetchFailed(message)) => {
                self.last_error = Some(message);
                self.queue.clear();
                self.cursor = 0;
                self.phase = Phase::Failed;
                Ok(Command::Stop)
            }

            (Phase::Migrating, RunEvent::RecordReconciled(outcome)) => {
                if self.cursor >= self.queue.len() {
                    return Err(MigrateError::InvalidIntent(
                        "no record in flight".to_string(),
                    ));
                }
                self.stats.record(&outcome);
                self.cursor += 1;
                Ok(self.dispatch_next())
            }

            (phase, event) => Err(MigrateError::InvalidIntent(format!(
                "event '{}' not valid in phase '{}'",
                event.name(),
                phase
            ))),
        }
    }

    /// Next record of the batch, or the batch-exhausted transition.
    fn dispatch_next(&mut self) -> Command {
        if let Some(record) = self.queue.get(self.cursor) {
            return Command::Reconcile(record.clone());
        }

        if self.current_page < self.total_pages {
            self.current_page += 1;
            self.queue.clear();
            self.cursor = 0;
            self.phase = Phase::FetchingPage;
            Command::FetchPage(self.current_page)
        } else {
            self.phase = Phase::Complete;
            Command::Stop
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            phase: self.phase,
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_count: self.total_count,
            stats: self.stats,
            last_error: self.last_error.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn queue(&self) -> &[SourceRecord] {
        &self.queue
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
