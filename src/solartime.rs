// Solar time annotation
//
// Approximate local solar time at a Maidenhead locator, using the NOAA
// equation-of-time model. Used only to annotate output records.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

/// Hours in a day, the circumference used for circular means of hours
pub const HOURS_PER_DAY: f64 = 24.0;

/// Longitude in degrees of a Maidenhead locator (field, square and optional
/// subsquare). Returns None for locators too short or malformed to place.
///
/// # Examples
/// `"JO21"` -> 4.0, `"FN42"` -> -72.0
pub fn locator_longitude(grid: &str) -> Option<f64> {
    let chars: Vec<char> = grid.chars().collect();
    if chars.len() < 3 {
        return None;
    }

    let field = chars[0].to_ascii_uppercase();
    if !('A'..='R').contains(&field) {
        return None;
    }
    let square = chars[2].to_digit(10)?;

    let subsquare = match chars.get(4) {
        Some(c) => {
            let c = c.to_ascii_uppercase();
            if !('A'..='X').contains(&c) {
                return None;
            }
            (c as u32 - 'A' as u32) as f64
        }
        None => 0.0,
    };

    let field_steps = field as i32 - 'J' as i32;
    Some(20.0 * field_steps as f64 + 2.0 * square as f64 + subsquare / 12.0)
}

/// Equation of time in minutes for the given UTC instant
fn equation_of_time(utc: &DateTime<Utc>) -> f64 {
    // fractional year in radians
    let gamma = (2.0 * PI / 365.0)
        * (utc.ordinal0() as f64 - 1.0 + (utc.hour() as f64 - 12.0) / 24.0);

    229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014514 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin())
}

/// Solar time as seconds since the epoch, for a longitude in degrees
pub fn solar_epoch_time(epoch_time: u64, longitude: f64) -> Option<i64> {
    let epoch = i64::try_from(epoch_time).ok()?;
    let utc = DateTime::<Utc>::from_timestamp(epoch, 0)?;

    let offset_minutes = equation_of_time(&utc) + 4.0 * longitude;
    let offset_seconds = (offset_minutes * 60.0).floor() as i64;
    Some(epoch + offset_seconds)
}

/// Fractional solar hour of day (hour + minute / 60) at a locator
pub fn solar_hour(epoch_time: u64, grid: &str) -> Option<f64> {
    let longitude = locator_longitude(grid)?;
    let solar = solar_epoch_time(epoch_time, longitude)?;
    let tm = DateTime::<Utc>::from_timestamp(solar, 0)?;
    Some(tm.hour() as f64 + tm.minute() as f64 / 60.0)
}

/// Mean of two positions on a circle of circumference `period`, taking the
/// shorter arc between them. Result lies in `[0, period)`.
pub fn circular_mean(period: f64, a: f64, b: f64) -> f64 {
    let mut diff = b - a;
    if diff > period / 2.0 {
        diff -= period;
    } else if diff < -period / 2.0 {
        diff += period;
    }
    (a + diff / 2.0).rem_euclid(period)
}

/// Solar hour at the midpoint of the path between two locators
pub fn midpath_solar_hour(epoch_time: u64, tx_grid: &str, rx_grid: &str) -> Option<f64> {
    let tx = solar_hour(epoch_time, tx_grid)?;
    let rx = solar_hour(epoch_time, rx_grid)?;
    Some(circular_mean(HOURS_PER_DAY, tx, rx))
}
