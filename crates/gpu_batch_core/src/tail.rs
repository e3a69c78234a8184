use crate::entity::LogQuery;
use crate::error::BatchError;
use crate::format::format_log_line;
use crate::traits::LogsApi;

use std::io::Write;
use tracing::debug;

/// Incremental reader of a single log stream.
///
/// Remembers the timestamp of the last printed event so each [`drain`](LogTailer::drain)
/// only prints what arrived since the previous one.
#[derive(Debug, Clone)]
pub struct LogTailer {
    group: String,
    stream: String,
    start_time: i64,
}

impl LogTailer {
    pub fn new(group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stream: stream.into(),
            start_time: 0,
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// The earliest timestamp the next drain will print.
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Prints every event not seen yet and returns how many were printed.
    ///
    /// Pages forward until the service stops handing out a new forward token.
    pub async fn drain<L: LogsApi, W: Write>(
        &mut self,
        logs: &L,
        out: &mut W,
    ) -> Result<usize, BatchError> {
        let mut query = LogQuery {
            group: self.group.clone(),
            stream: self.stream.clone(),
            start_time: self.start_time,
            next_token: None,
        };
        let mut last_timestamp = None;
        let mut printed = 0;

        loop {
            let page = logs.get_log_events(&query).await?;
            debug!(
                stream = %self.stream,
                events = page.events.len(),
                "fetched log page"
            );

            for event in page.events.iter().filter(|e| e.timestamp >= self.start_time) {
                writeln!(out, "{}", format_log_line(event))?;
                last_timestamp = last_timestamp.max(Some(event.timestamp));
                printed += 1;
            }

            // An empty token or the one just sent marks the end of the stream.
            match page.next_forward_token {
                Some(token)
                    if !token.is_empty() && query.next_token.as_deref() != Some(token.as_str()) =>
                {
                    query.next_token = Some(token);
                }
                _ => break,
            }
        }

        if let Some(ts) = last_timestamp {
            self.start_time = ts.saturating_add(1);
        }
        out.flush()?;
        Ok(printed)
    }
}
