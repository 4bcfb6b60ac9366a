// Spot report record and grouping key

use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_FREQUENCY, MIN_RECORD_FIELDS};

/// One parsed spot report: a single detection of a transmitter by a receiver.
///
/// Reports are never modified once parsed. The values computed by the
/// classifier (frequency offset, reference SNR) live in
/// [`crate::classifier::ClassifiedReport`] alongside the report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub spot_id: u64,
    /// Seconds since the Unix epoch
    pub epoch_time: u64,
    pub receiver_id: String,
    pub receiver_locator: String,
    /// Measured SNR in dB
    pub snr: f64,
    /// Frequency in MHz
    pub frequency: f64,
    pub transmitter_id: String,
    pub transmitter_locator: String,
    /// Transmit power in dBm
    pub power: f64,
    pub drift: f64,
    /// Path length in km
    pub distance: f64,
    /// Path azimuth in degrees
    pub azimuth: f64,
    pub band: i32,
    pub version: String,
    pub code: i32,
}

impl Report {
    /// Grouping key for this report
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.transmitter_id, &self.receiver_id)
    }

    /// Parse one comma separated spot record.
    ///
    /// Layout: `spot, time, rx, rxgrid, snr[|refsnr], freq, tx, txgrid,
    /// power, drift, dist, az, band, version[, code[, freqdiff]]`.
    /// A trailing frequency difference column is accepted but ignored since
    /// offsets are always recomputed.
    pub fn parse(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < MIN_RECORD_FIELDS {
            return Err(format!(
                "expected at least {} fields, got {}",
                MIN_RECORD_FIELDS,
                fields.len()
            ));
        }

        // "snr|refsnr" is written by our own outputs; only the measured value matters
        let snr_field = fields[4].split('|').next().unwrap_or_default();

        let receiver_id = fields[2].to_string();
        let transmitter_id = fields[6].to_string();
        if receiver_id.is_empty() || transmitter_id.is_empty() {
            return Err("empty station identifier".to_string());
        }

        let snr: f64 = parse_field(snr_field.trim(), "snr")?;
        if !snr.is_finite() {
            return Err(format!("non-finite snr '{}'", snr_field.trim()));
        }
        let frequency: f64 = parse_field(fields[5], "frequency")?;
        if !(frequency.is_finite() && frequency > 0.0 && frequency <= MAX_FREQUENCY) {
            return Err(format!("frequency '{}' out of range", fields[5]));
        }

        let code = match fields.get(14) {
            Some(s) if !s.is_empty() => parse_field(s, "code")?,
            _ => 0,
        };

        Ok(Report {
            spot_id: parse_field(fields[0], "spot id")?,
            epoch_time: parse_field(fields[1], "time")?,
            receiver_id,
            receiver_locator: fields[3].to_string(),
            snr,
            frequency,
            transmitter_id,
            transmitter_locator: fields[7].to_string(),
            power: parse_field(fields[8], "power")?,
            drift: parse_field(fields[9], "drift")?,
            distance: parse_field(fields[10], "distance")?,
            azimuth: parse_field(fields[11], "azimuth")?,
            band: parse_field(fields[12], "band")?,
            version: fields[13].to_string(),
            code,
        })
    }
}

fn parse_field<T: FromStr>(s: &str, name: &str) -> Result<T, String> {
    s.parse::<T>()
        .map_err(|_| format!("invalid {} '{}'", name, s))
}

/// (transmitter, receiver) pair identifying reports that may be correlated.
///
/// Orders by transmitter first, then receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub transmitter_id: String,
    pub receiver_id: String,
}

impl PairKey {
    pub fn new(transmitter_id: &str, receiver_id: &str) -> Self {
        PairKey {
            transmitter_id: transmitter_id.to_string(),
            receiver_id: receiver_id.to_string(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.transmitter_id, self.receiver_id)
    }
}

#[cfg(test)]
pub(crate) fn test_report(tx: &str, rx: &str, frequency: f64, snr: f64, epoch_time: u64) -> Report {
    Report {
        spot_id: 0,
        epoch_time,
        receiver_id: rx.to_string(),
        receiver_locator: "FN42".to_string(),
        snr,
        frequency,
        transmitter_id: tx.to_string(),
        transmitter_locator: "JO01".to_string(),
        power: 37.0,
        drift: 0.0,
        distance: 5000.0,
        azimuth: 45.0,
        band: 14,
        version: String::new(),
        code: 0,
    }
}
