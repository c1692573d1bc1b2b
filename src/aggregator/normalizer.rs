//! Tolerant parsing of stored log lines into telemetry records
//!
//! Line layout: `<YYYY-MM-DD HH:MM:SS> | <product>;<production>;<pause>;<total>;<quantity>`.
//!
//! Rules:
//! - no ` | ` separator, or a timestamp that does not parse: line discarded
//! - fewer than five payload fields: missing fields take their defaults
//! - a numeric field that is not an integer: 0
//! - `total_time` missing or not an integer: `production_time + pause_time`
//! - payload fields past the fifth are ignored

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const LOG_SEPARATOR: &str = " | ";
pub const FIELD_SEPARATOR: char = ';';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: NaiveDateTime,
    pub product: String,
    pub production_time: i64,
    pub pause_time: i64,
    pub total_time: i64,
    pub quantity: i64,
}

/// Build the stored form of a received message
pub fn format_log_line(timestamp: &NaiveDateTime, message: &str) -> String {
    format!("{}{}{}", timestamp.format(TIMESTAMP_FORMAT), LOG_SEPARATOR, message)
}

/// Parse one stored line. `None` means the line is discarded.
pub fn parse_line(line: &str) -> Option<TelemetryRecord> {
    let (timestamp_str, payload) = line.trim().split_once(LOG_SEPARATOR)?;
    let timestamp = NaiveDateTime::parse_from_str(timestamp_str.trim(), TIMESTAMP_FORMAT).ok()?;

    let mut fields = payload.split(FIELD_SEPARATOR).map(str::trim);

    let product = fields.next().unwrap_or_default().to_string();
    let production_time = parse_int(fields.next()).unwrap_or(0);
    let pause_time = parse_int(fields.next()).unwrap_or(0);
    // Derived total clamps at the i64 range instead of overflowing
    let total_time =
        parse_int(fields.next()).unwrap_or_else(|| production_time.saturating_add(pause_time));
    let quantity = parse_int(fields.next()).unwrap_or(0);

    Some(TelemetryRecord {
        timestamp,
        product,
        production_time,
        pause_time,
        total_time,
        quantity,
    })
}

fn parse_int(field: Option<&str>) -> Option<i64> {
    field.and_then(|value| value.parse::<i64>().ok())
}
