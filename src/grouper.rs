// Pair grouper - buckets reports by (transmitter, receiver) within a time window
//
// All reports carrying one epoch_time form a window. The window closes the
// moment a report with a different time arrives, and its buckets are handed
// back to the caller as a flushed Window. Nothing is retained across windows.

use std::collections::BTreeMap;
use std::mem;

use tracing::debug;

use crate::error::{Error, Result};
use crate::report::{PairKey, Report};

/// What to do with a report older than the open window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TimeRegressionPolicy {
    /// Close the open window and start a new one at the earlier time
    #[default]
    NewWindow,
    /// Refuse the report and leave the open window untouched
    Reject,
}

/// Reports sharing one grouping key within one window, in arrival order.
///
/// Groups are only built by the grouper (or recovered from a classified
/// group) and always hold at least one report.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub(crate) key: PairKey,
    pub(crate) epoch_time: u64,
    pub(crate) reports: Vec<Report>,
}

impl Group {
    pub fn key(&self) -> &PairKey {
        &self.key
    }

    pub fn epoch_time(&self) -> u64 {
        self.epoch_time
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

/// A closed time window: every group seen at `epoch_time`, in key order
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub epoch_time: u64,
    pub groups: Vec<Group>,
}

impl Window {
    pub fn report_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }
}

/// Streaming grouper holding the currently open window
#[derive(Debug, Default)]
pub struct PairGrouper {
    policy: TimeRegressionPolicy,
    open_time: Option<u64>,
    buckets: BTreeMap<PairKey, Vec<Report>>,
    /// Reports seen with a time earlier than the open window
    pub regressions: u64,
}

impl PairGrouper {
    pub fn new(policy: TimeRegressionPolicy) -> Self {
        PairGrouper {
            policy,
            ..Default::default()
        }
    }

    /// Time of the open window, if any
    pub fn open_time(&self) -> Option<u64> {
        self.open_time
    }

    /// Number of reports held in the open window
    pub fn pending(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Add a report. Returns the previous window when this report closed it.
    ///
    /// Under [`TimeRegressionPolicy::Reject`] a report older than the open
    /// window yields [`Error::TimeRegression`] and is dropped.
    pub fn ingest(&mut self, report: Report) -> Result<Option<Window>> {
        let mut flushed = None;

        match self.open_time {
            Some(open) if open == report.epoch_time => {}
            Some(open) => {
                if report.epoch_time < open {
                    self.regressions += 1;
                    if self.policy == TimeRegressionPolicy::Reject {
                        return Err(Error::TimeRegression {
                            open,
                            got: report.epoch_time,
                        });
                    }
                    debug!(
                        "Time went backwards ({} -> {}), starting new window",
                        open, report.epoch_time
                    );
                }
                flushed = self.close();
                self.open_time = Some(report.epoch_time);
            }
            None => self.open_time = Some(report.epoch_time),
        }

        self.buckets.entry(report.key()).or_default().push(report);
        Ok(flushed)
    }

    /// Close the open window at end of input
    pub fn finish(&mut self) -> Option<Window> {
        self.close()
    }

    fn close(&mut self) -> Option<Window> {
        let epoch_time = self.open_time.take()?;
        let buckets = mem::take(&mut self.buckets);

        let groups = buckets
            .into_iter()
            .map(|(key, reports)| Group {
                key,
                epoch_time,
                reports,
            })
            .collect();

        Some(Window { epoch_time, groups })
    }
}
