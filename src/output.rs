// Output handlers - marked image log, solar annotated log, proportion tables and run summary

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::classifier::{ClassifiedGroup, ClassifiedReport};
use crate::constants::RECORD_HEADER;
use crate::coordinator::RunSummary;
use crate::error::Result;
use crate::solartime;
use crate::stats::CountTable;

/// Trait for output handlers
pub trait OutputHandler {
    /// Handle one classified group
    fn handle_group(&mut self, group: &ClassifiedGroup) -> Result<()>;

    /// Called once after the last group of the run
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Format one report in spot log layout, with `snr|refsnr` and the
/// frequency offset as the last column. The result parses back as a record.
pub fn format_record(member: &ClassifiedReport) -> String {
    let r = &member.report;
    let version = if r.version.is_empty() { "UNKNOWN" } else { r.version.as_str() };

    format!(
        "{},{},{},{},{:4.1}|{:4.1},{:12.6},{},{},{:3.0},{:3.1},{:.6},{:.6},{},{},{},{}",
        r.spot_id,
        r.epoch_time,
        r.receiver_id,
        r.receiver_locator,
        r.snr,
        member.reference_snr(),
        r.frequency,
        r.transmitter_id,
        r.transmitter_locator,
        r.power,
        r.drift,
        r.distance,
        r.azimuth,
        r.band,
        version,
        r.code,
        member.frequency_offset()
    )
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Marked image output.
///
/// For every multi-report group, writes each non-reference member with a
/// non-zero offset (images, and artifacts unless disabled), followed by the
/// reference when anything was written for the group.
pub struct MarkedImagesOutput<W: Write> {
    writer: W,
    include_artifacts: bool,
}

impl<W: Write> MarkedImagesOutput<W> {
    pub fn new(writer: W, include_artifacts: bool) -> Self {
        MarkedImagesOutput {
            writer,
            include_artifacts,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl MarkedImagesOutput<BufWriter<File>> {
    pub fn create(path: &Path, include_artifacts: bool) -> Result<Self> {
        Ok(Self::new(create(path)?, include_artifacts))
    }
}

impl<W: Write> OutputHandler for MarkedImagesOutput<W> {
    fn handle_group(&mut self, group: &ClassifiedGroup) -> Result<()> {
        if group.is_singleton() {
            return Ok(());
        }

        let mut written = 0;
        for member in group.peers() {
            if member.is_image() || (self.include_artifacts && member.is_artifact()) {
                writeln!(self.writer, "{}", format_record(member))?;
                written += 1;
            }
        }
        if written > 0 {
            writeln!(self.writer, "{}", format_record(group.reference()))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Every report that is not a mains artifact, prefixed with the receiver,
/// transmitter and mid-path solar hours. Unplaceable locators leave the
/// solar columns empty.
pub struct AnnotatedOutput<W: Write> {
    writer: W,
}

impl<W: Write> AnnotatedOutput<W> {
    /// Wraps `writer` and writes the column header
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "RXSOL,TXSOL,MIDSOL,{}", RECORD_HEADER)?;
        Ok(AnnotatedOutput { writer })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl AnnotatedOutput<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        Self::new(create(path)?)
    }
}

fn hour_field(hour: Option<f64>) -> String {
    hour.map(|h| format!("{:.3}", h)).unwrap_or_default()
}

impl<W: Write> OutputHandler for AnnotatedOutput<W> {
    fn handle_group(&mut self, group: &ClassifiedGroup) -> Result<()> {
        for member in group.members() {
            if member.is_artifact() {
                continue;
            }
            let r = &member.report;
            let rx = solartime::solar_hour(r.epoch_time, &r.receiver_locator);
            let tx = solartime::solar_hour(r.epoch_time, &r.transmitter_locator);
            let mid = solartime::midpath_solar_hour(r.epoch_time, &r.transmitter_locator, &r.receiver_locator);

            writeln!(
                self.writer,
                "{},{},{},{}",
                hour_field(rx),
                hour_field(tx),
                hour_field(mid),
                format_record(member)
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Path of a proportion table next to `out`: `<dir>/<stem>_<suffix>.prop`
pub fn prop_path(out: &Path, table: CountTable) -> PathBuf {
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out.with_file_name(format!("{}_{}.prop", stem, table.suffix()))
}

/// Write the run summary as pretty JSON
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ImageClassifier;
    use crate::grouper::Group;
    use crate::report::{test_report, Report};

    fn classify(reports: Vec<Report>) -> ClassifiedGroup {
        ImageClassifier::default().classify(Group {
            key: reports[0].key(),
            epoch_time: reports[0].epoch_time,
            reports,
        })
    }

    fn image_group() -> ClassifiedGroup {
        let mut reference = test_report("T1", "R1", 14.097000, -10.0, 100);
        reference.spot_id = 1;
        let mut image = test_report("T1", "R1", 14.096813, -18.0, 100);
        image.spot_id = 2;
        let mut artifact = test_report("T1", "R1", 14.096940, -19.0, 100);
        artifact.spot_id = 3;
        classify(vec![image, reference, artifact])
    }

    fn lines(bytes: Vec<u8>) -> Vec<String> {
        String::from_utf8(bytes).unwrap().lines().map(String::from).collect()
    }

    #[test]
    fn test_format_record_parses_back() {
        let group = image_group();
        let line = format_record(&group.peers()[0]);
        assert!(line.starts_with("2,100,R1,FN42,-18.0|-10.0,   14.096813,T1,JO01,"), "{}", line);
        assert!(line.ends_with(",14,UNKNOWN,0,-187"), "{}", line);

        let parsed = Report::parse(&line).unwrap();
        assert_eq!(parsed.snr, -18.0);
        assert_eq!(parsed.transmitter_id, "T1");
        assert!((parsed.frequency - 14.096813).abs() < 1e-9);
    }

    #[test]
    fn test_marked_images_output() {
        let mut out = MarkedImagesOutput::new(Vec::new(), true);
        out.handle_group(&image_group()).unwrap();
        out.handle_group(&classify(vec![test_report("T2", "R1", 14.0971, -3.0, 100)])).unwrap();
        out.finish().unwrap();

        let lines = lines(out.into_inner());
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("2,"));
        assert!(lines[1].starts_with("3,"));
        assert!(lines[2].starts_with("1,"));
        assert!(lines[2].ends_with(",0"));
    }

    #[test]
    fn test_marked_images_output_without_artifacts() {
        let mut out = MarkedImagesOutput::new(Vec::new(), false);
        out.handle_group(&image_group()).unwrap();
        // artifact-only group writes nothing, not even its reference
        out.handle_group(&classify(vec![
            test_report("T3", "R1", 14.097000, -10.0, 100),
            test_report("T3", "R1", 14.097100, -12.0, 100),
        ]))
        .unwrap();

        let lines = lines(out.into_inner());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("2,"));
        assert!(lines[1].starts_with("1,"));
    }

    #[test]
    fn test_annotated_output() {
        let mut out = AnnotatedOutput::new(Vec::new()).unwrap();
        out.handle_group(&image_group()).unwrap();
        let mut lonely = test_report("T2", "R9", 14.0971, -3.0, 1530446400);
        lonely.receiver_locator = "JJ00".to_string();
        lonely.transmitter_locator = "??".to_string();
        out.handle_group(&classify(vec![lonely])).unwrap();

        let lines = lines(out.into_inner());
        assert_eq!(lines[0], format!("RXSOL,TXSOL,MIDSOL,{}", RECORD_HEADER));
        // reference and image, artifact dropped
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains(",1,100,R1,"));
        assert!(lines[2].contains(",2,100,R1,"));
        assert!(lines[3].starts_with("11.933,,,"), "{}", lines[3]);
    }

    #[test]
    fn test_prop_path() {
        let path = prop_path(Path::new("/tmp/run/images.csv"), CountTable::Receiver);
        assert_eq!(path, PathBuf::from("/tmp/run/images_rx.prop"));
        assert_eq!(
            prop_path(Path::new("images"), CountTable::Pair),
            PathBuf::from("images_pair.prop")
        );
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = MarkedImagesOutput::create(&dir.path().join("nope").join("out.csv"), true);
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }
}
