//! Sync pipeline from the fitness API into stored tabs
//!
//! For each requested tab:
//! 1. Fetch the upstream records for the local-day window
//! 2. Flatten them into a per-day batch
//! 3. Read the stored tab and merge the batch into it
//! 4. Rewrite the tab (skipped on dry runs)
//!
//! Tabs are processed one after the other. A failure aborts the run; tabs
//! already written stay written.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::client::{AccessToken, FitClient, HEART_RATE_TYPE, STEP_COUNT_TYPE};
use crate::error::Result;
use crate::extract::{extract_heart_rate, extract_sleep, extract_steps, join_on_date};
use crate::merge::{merge_with_report, MergeReport};
use crate::storage::{Tab, TabStore};
use crate::table::Table;
use crate::time::sync_window;

/// Default number of local days fetched per run
pub const DEFAULT_SYNC_DAYS: u32 = 7;

/// Options for a sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Local days to fetch, ending with `today`
    pub days: u32,
    /// Tabs to sync, in order
    pub tabs: Vec<Tab>,
    /// Merge but don't write
    pub dry_run: bool,
    /// Last day of the window; defaults to the current local date
    pub today: Option<NaiveDate>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            days: DEFAULT_SYNC_DAYS,
            tabs: Tab::ALL.to_vec(),
            dry_run: false,
            today: None,
        }
    }
}

/// Result of syncing one tab
#[derive(Debug, Clone)]
pub struct TabOutcome {
    pub tab: Tab,
    /// Rows in the fetched batch
    pub fetched: usize,
    pub report: MergeReport,
    pub written: bool,
}

/// Statistics from a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub tabs: Vec<TabOutcome>,
}

impl SyncStats {
    pub fn written(&self) -> usize {
        self.tabs.iter().filter(|t| t.written).count()
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, outcome) in self.tabs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}: fetched {}, {}{}",
                outcome.tab,
                outcome.fetched,
                outcome.report,
                if outcome.written { "" } else { " (not written)" }
            )?;
        }
        Ok(())
    }
}

/// Sync engine tying the API client to a tab store
pub struct SyncEngine<S> {
    client: FitClient,
    token: AccessToken,
    store: S,
    tz: Tz,
}

impl<S: TabStore> SyncEngine<S> {
    pub fn new(client: FitClient, token: AccessToken, store: S, tz: Tz) -> Self {
        Self {
            client,
            token,
            store,
            tz,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the pipeline for every requested tab
    pub async fn run(&self, opts: &SyncOptions) -> Result<SyncStats> {
        let today = opts
            .today
            .unwrap_or_else(|| Utc::now().with_timezone(&self.tz).date_naive());
        let (start, end) = sync_window(today, opts.days, self.tz)?;
        info!(
            %today,
            days = opts.days.max(1),
            tz = %self.tz,
            dry_run = opts.dry_run,
            "starting sync"
        );

        let mut stats = SyncStats::default();
        for &tab in &opts.tabs {
            let batch = match tab {
                Tab::Activity => self.fetch_activity(start, end).await?,
                Tab::Sleep => self.fetch_sleep(start, end).await?,
            };
            stats.tabs.push(self.merge_into(tab, batch, opts.dry_run)?);
        }
        Ok(stats)
    }

    /// Daily steps joined with daily mean heart rate
    async fn fetch_activity(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Table> {
        let steps = self
            .client
            .aggregate(&self.token, STEP_COUNT_TYPE, start, end)
            .await?;
        let heart_rate = self
            .client
            .aggregate(&self.token, HEART_RATE_TYPE, start, end)
            .await?;

        Ok(join_on_date(
            &extract_steps(&steps, self.tz),
            &extract_heart_rate(&heart_rate, self.tz),
        ))
    }

    async fn fetch_sleep(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Table> {
        let sessions = self.client.sleep_sessions(&self.token, start, end).await?;
        let segments = self.client.sleep_segments(&self.token, start, end).await?;
        Ok(extract_sleep(&sessions, &segments, self.tz))
    }

    fn merge_into(&self, tab: Tab, batch: Table, dry_run: bool) -> Result<TabOutcome> {
        let existing = self.store.read_tab(tab)?;
        let (merged, report) = merge_with_report(&existing, &batch);

        if !dry_run {
            self.store.write_tab(tab, &merged)?;
        }
        info!(
            tab = %tab,
            fetched = batch.len(),
            existing = existing.len(),
            rows = merged.len(),
            preserved = report.cells_preserved,
            dry_run,
            "tab merged"
        );

        Ok(TabOutcome {
            tab,
            fetched: batch.len(),
            report,
            written: !dry_run,
        })
    }
}
