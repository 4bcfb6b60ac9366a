// Shared constants for image classification and report parsing

/// Mains (power-line) frequencies in Hz, in the order they are matched.
pub const MAINS_FREQUENCIES: [i64; 2] = [50, 60];

/// Half-width of the band around each mains multiple, in Hz.
pub const DEFAULT_HARMONIC_TOLERANCE: i64 = 2;

/// Number of positive (and negative) multiples of each mains frequency checked.
pub const DEFAULT_HARMONIC_MULTIPLES: u32 = 4;

/// A receiver imaging against more distinct transmitters than this is flagged.
pub const DEFAULT_RX_SUSPECT_THRESHOLD: usize = 4;

/// Frequency offsets are expressed in millionths of the input frequency unit
/// (Hz for the MHz frequencies in wsprnet logs).
pub const OFFSET_SCALE: f64 = 1e6;

/// Largest frequency accepted from a record, in the input unit (MHz).
/// Keeps scaled offsets well inside the integer range.
pub const MAX_FREQUENCY: f64 = 1e6;

/// Minimum number of comma separated fields in a spot record.
pub const MIN_RECORD_FIELDS: usize = 14;

/// Lines between progress log messages while reading input.
pub const PROGRESS_INTERVAL: u64 = 250_000;

/// Malformed records logged at WARN before dropping to DEBUG.
pub const MALFORMED_WARN_LIMIT: u64 = 10;

/// Column header for the spot record format written by the CSV outputs.
pub const RECORD_HEADER: &str =
    "SPOT,DTIME,RXCALL,RXGRID,SNR,REFSNR,FREQ,TXCALL,TXGRID,POW,DRIFT,DIST,AZ,BAND,VER,CODE,FREQDIFF";
