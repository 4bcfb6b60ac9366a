// Coordinator - top level glue between the grouper, classifier, detector and outputs
//
// Reports enter through a Session. Each closed time window is classified
// group by group; the results feed the anomalous receiver detector, the
// per-station counts and every registered output. The session guarantees the
// last window is flushed even when the caller forgets to finish it.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::classifier::{ClassifiedGroup, ImageClassifier, ReportClass};
use crate::config::EngineConfig;
use crate::constants::{MALFORMED_WARN_LIMIT, PROGRESS_INTERVAL};
use crate::detector::AnomalousReceiverDetector;
use crate::error::{Error, Result};
use crate::grouper::{PairGrouper, Window};
use crate::harmonic::MainsFamily;
use crate::output::{prop_path, OutputHandler};
use crate::report::Report;
use crate::stats::{CountTable, ReportCounts};

/// Running counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Records read, including malformed ones
    pub records: u64,
    pub malformed: u64,
    /// Reports dropped by the frequency range filter
    pub out_of_range: u64,
    /// Reports older than the open window
    pub time_regressions: u64,
    /// Regressed reports refused under the reject policy
    pub rejected: u64,
    pub windows: u64,
    pub groups: u64,
    /// Groups with two or more reports
    pub multi_groups: u64,
    /// Groups with at least one accepted image
    pub image_groups: u64,
    pub images: u64,
    pub artifacts: u64,
    /// Artifacts by mains family
    pub artifacts_50hz: u64,
    pub artifacts_60hz: u64,
    pub coincident: u64,
    /// Reports dropped because their receiver was already flagged
    pub suspect_excluded: u64,
}

/// A receiver flagged for imaging against too many transmitters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedReceiver {
    pub receiver_id: String,
    pub transmitters: usize,
}

/// End of run report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub stats: RunStats,
    pub rx_suspect_threshold: usize,
    pub flagged_receivers: Vec<FlaggedReceiver>,
}

pub struct Coordinator {
    config: EngineConfig,
    grouper: PairGrouper,
    classifier: ImageClassifier,
    detector: AnomalousReceiverDetector,
    counts: ReportCounts,
    outputs: Vec<Box<dyn OutputHandler>>,
    stats: RunStats,
    /// Receivers excluded from later windows
    suspects: BTreeSet<String>,
}

impl Coordinator {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Coordinator {
            config,
            grouper: PairGrouper::new(config.time_regression),
            classifier: ImageClassifier::new(config.harmonic),
            detector: AnomalousReceiverDetector::new(),
            counts: ReportCounts::new(),
            outputs: Vec::new(),
            stats: RunStats::default(),
            suspects: BTreeSet::new(),
        })
    }

    /// Add an output handler
    pub fn add_output(&mut self, output: Box<dyn OutputHandler>) {
        self.outputs.push(output);
    }

    /// Start feeding reports. The returned session flushes the last window
    /// when finished or dropped.
    pub fn session(&mut self) -> Session<'_> {
        Session {
            coordinator: self,
            finished: false,
        }
    }

    /// Feed every record of `input`, flush the last window and summarize.
    ///
    /// Malformed records are skipped; I/O failures on input or outputs end
    /// the run.
    pub fn run<I>(&mut self, input: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<Report>>,
    {
        let mut session = self.session();
        for record in input {
            session.ingest_record(record)?;
        }
        session.finish()?;
        Ok(self.summary())
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn detector(&self) -> &AnomalousReceiverDetector {
        &self.detector
    }

    pub fn counts(&self) -> &ReportCounts {
        &self.counts
    }

    pub fn summary(&self) -> RunSummary {
        let threshold = self.config.rx_suspect_threshold;
        let flagged_receivers = self
            .detector
            .flagged(threshold)
            .into_iter()
            .map(|receiver_id| FlaggedReceiver {
                transmitters: self.detector.tally(&receiver_id),
                receiver_id,
            })
            .collect();

        RunSummary {
            stats: RunStats {
                time_regressions: self.grouper.regressions,
                ..self.stats
            },
            rx_suspect_threshold: threshold,
            flagged_receivers,
        }
    }

    /// Write the receiver, transmitter and pair proportion tables next to `out`
    pub fn write_count_tables(&self, out: &Path) -> Result<()> {
        for table in CountTable::ALL {
            let path = prop_path(out, table);
            let mut writer = BufWriter::new(File::create(&path)?);
            self.counts.write_table(table, &mut writer)?;
            writer.flush()?;
            debug!("Wrote {}", path.display());
        }
        Ok(())
    }

    fn ingest_record(&mut self, record: Result<Report>) -> Result<()> {
        self.stats.records += 1;
        if self.stats.records % PROGRESS_INTERVAL == 0 {
            info!("Line count = {}", self.stats.records);
        }

        match record {
            Ok(report) => self.ingest(report),
            Err(Error::MalformedRecord { line, reason }) => {
                self.stats.malformed += 1;
                if self.stats.malformed <= MALFORMED_WARN_LIMIT {
                    warn!("Skipping malformed record at line {}: {}", line, reason);
                } else {
                    debug!("Skipping malformed record at line {}: {}", line, reason);
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn ingest(&mut self, report: Report) -> Result<()> {
        if !self.config.frequency_range.contains(report.frequency) {
            self.stats.out_of_range += 1;
            return Ok(());
        }

        match self.grouper.ingest(report) {
            Ok(Some(window)) => self.flush_window(window),
            Ok(None) => Ok(()),
            Err(Error::TimeRegression { open, got }) => {
                self.stats.rejected += 1;
                warn!("Rejected report at {} while window {} is open", got, open);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn flush_window(&mut self, window: Window) -> Result<()> {
        self.stats.windows += 1;
        debug!(
            "Flushing window {} ({} groups, {} reports)",
            window.epoch_time,
            window.groups.len(),
            window.report_count()
        );

        for group in window.groups {
            if self.suspects.contains(&group.key.receiver_id) {
                self.stats.suspect_excluded += group.len() as u64;
                continue;
            }

            let classified = self.classifier.classify(group);
            self.record_group(&classified);

            for output in self.outputs.iter_mut() {
                output.handle_group(&classified)?;
            }
        }

        if self.config.exclude_suspect_rx {
            self.update_suspects();
        }
        Ok(())
    }

    /// Bar receivers flagged so far from every later window
    fn update_suspects(&mut self) {
        for receiver_id in self.detector.flagged(self.config.rx_suspect_threshold) {
            if !self.suspects.contains(&receiver_id) {
                info!(
                    "Excluding receiver {} from the rest of the log ({} transmitters)",
                    receiver_id,
                    self.detector.tally(&receiver_id)
                );
                self.suspects.insert(receiver_id);
            }
        }
    }

    fn record_group(&mut self, group: &ClassifiedGroup) {
        self.stats.groups += 1;
        if !group.is_singleton() {
            self.stats.multi_groups += 1;
        }

        for member in group.members() {
            match member.class() {
                ReportClass::Image => self.stats.images += 1,
                ReportClass::HarmonicArtifact(family) => {
                    self.stats.artifacts += 1;
                    match family {
                        MainsFamily::Hz50 => self.stats.artifacts_50hz += 1,
                        MainsFamily::Hz60 => self.stats.artifacts_60hz += 1,
                    }
                }
                ReportClass::Coincident => self.stats.coincident += 1,
                ReportClass::Singleton | ReportClass::Reference => {}
            }
        }

        if group.has_images() {
            self.stats.image_groups += 1;
            self.detector.record(&group.key);
        }
        self.counts.add_group(group);
    }

    /// Flush the open window and finish every output
    fn finish_input(&mut self) -> Result<()> {
        if let Some(window) = self.grouper.finish() {
            self.flush_window(window)?;
        }
        for output in self.outputs.iter_mut() {
            output.finish()?;
        }
        Ok(())
    }
}

/// Scoped feed of reports into a [`Coordinator`].
///
/// Dropping an unfinished session still flushes the open window, so the last
/// window's groups are never lost; errors from that flush can only be logged.
pub struct Session<'a> {
    coordinator: &'a mut Coordinator,
    finished: bool,
}

impl Session<'_> {
    pub fn ingest(&mut self, report: Report) -> Result<()> {
        self.coordinator.stats.records += 1;
        self.coordinator.ingest(report)
    }

    /// Ingest a record from a reader; malformed records are counted and skipped
    pub fn ingest_record(&mut self, record: Result<Report>) -> Result<()> {
        self.coordinator.ingest_record(record)
    }

    /// Flush the last window and finish all outputs
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.coordinator.finish_input()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.coordinator.finish_input() {
            error!("Final flush failed: {}", e);
        }
    }
}
