use crate::constants::output::SPINNER;
use crate::entity::LogEvent;

use chrono::{TimeZone, Utc};

/// Renders epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// Values outside chrono's range are printed as the raw millisecond count.
pub fn format_log_timestamp(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => millis.to_string(),
    }
}

pub fn format_log_line(event: &LogEvent) -> String {
    format!(
        "[{}] {}",
        format_log_timestamp(event.timestamp),
        event.message
    )
}

/// Progress indicator for waits of unknown length.
#[derive(Debug, Default)]
pub struct Spinner {
    frame: usize,
}

impl Spinner {
    /// Returns the current frame and advances.
    pub fn next_frame(&mut self) -> char {
        let c = SPINNER[self.frame % SPINNER.len()];
        self.frame += 1;
        c
    }
}
