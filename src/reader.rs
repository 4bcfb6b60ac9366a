// Spot log input - opens (optionally gzipped) logs and yields parsed reports

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::report::Report;

/// Open a spot log for reading.
///
/// The file is gunzipped when `gzip` is set or the path ends in `.gz`.
pub fn open_input(path: &Path, gzip: bool) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let gzip = gzip || path.extension().is_some_and(|ext| ext == "gz");

    if gzip {
        debug!("Reading {} as gzip", path.display());
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Lazy, single-pass iterator of reports from a line oriented source.
///
/// Blank lines are skipped. A line that does not parse yields
/// [`Error::MalformedRecord`] and iteration continues with the next line;
/// a read failure yields [`Error::Io`].
pub struct ReportReader<R> {
    lines: Lines<R>,
    line: u64,
}

impl<R: BufRead> ReportReader<R> {
    pub fn new(input: R) -> Self {
        ReportReader {
            lines: input.lines(),
            line: 0,
        }
    }

    /// Number of lines consumed so far
    pub fn line_count(&self) -> u64 {
        self.line
    }
}

impl<R: BufRead> Iterator for ReportReader<R> {
    type Item = Result<Report>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(Report::parse(&line).map_err(|reason| Error::MalformedRecord {
                line: self.line,
                reason,
            }));
        }
    }
}
