use crate::constants::{naming, output::BANNER_WIDTH};
use crate::entity::*;
use crate::error::BatchError;
use crate::format::Spinner;
use crate::poll::{PollOptions, Poller};
use crate::tail::LogTailer;
use crate::traits::{BatchApi, LogsApi};

use std::io::Write;
use tracing::{debug, info, warn};

/// Submits jobs and optionally follows them to completion, streaming their logs.
pub struct Submitter<B, L, W> {
    batch: B,
    logs: L,
    poll: PollOptions,
    out: W,
    log_group: String,
}

impl<B: BatchApi, L: LogsApi, W: Write> Submitter<B, L, W> {
    pub fn new(batch: B, logs: L, poll: PollOptions, out: W) -> Self {
        Self {
            batch,
            logs,
            poll,
            out,
            log_group: naming::LOG_GROUP.to_string(),
        }
    }

    /// Overrides the log group searched for job output. Defaults to `/aws/batch/job`.
    pub fn with_log_group(mut self, log_group: impl Into<String>) -> Self {
        self.log_group = log_group.into();
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Submits `job` and, if `wait` is set, follows it until it finishes.
    ///
    /// Returns the terminal status, or [`None`] when not waiting.
    pub async fn run(
        &mut self,
        job: &JobSubmission,
        wait: bool,
    ) -> Result<(SubmittedJob, Option<JobStatus>), BatchError> {
        let submitted = self.submit(job).await?;
        let status = if wait {
            Some(self.wait(&submitted).await?)
        } else {
            None
        };
        Ok((submitted, status))
    }

    pub async fn submit(&mut self, job: &JobSubmission) -> Result<SubmittedJob, BatchError> {
        info!(
            name = %job.name,
            queue = %job.queue,
            definition = %job.definition,
            command = ?job.command,
            "submitting job"
        );
        let submitted = self
            .poll
            .guard(&format!("job {}", job.name), self.batch.submit_job(job))
            .await?;
        writeln!(
            self.out,
            "Submitted job [{} - {}] to the job queue [{}]",
            submitted.name, submitted.id, submitted.queue
        )?;
        self.out.flush()?;
        Ok(submitted)
    }

    /// Polls the job until it reaches `SUCCEEDED` or `FAILED`.
    ///
    /// While the job is `RUNNING` its log stream is looked up and tailed. A job
    /// that runs before its stream exists prints nothing until the stream appears.
    pub async fn wait(&mut self, job: &SubmittedJob) -> Result<JobStatus, BatchError> {
        let mut poller = Poller::new(&self.poll, format!("job {} ({})", job.name, job.id));
        let mut spinner = Spinner::default();
        let mut tailer: Option<LogTailer> = None;

        loop {
            poller.tick().await?;

            let state = poller
                .guard(self.batch.describe_job(&job.id))
                .await?
                .ok_or_else(|| BatchError::NotFound(format!("job {}", job.id)))?;
            debug!(job_id = %job.id, status = %state.status, polls = poller.ticks(), "polled");

            match state.status {
                status if status.is_terminal() => {
                    if let Some(tailer) = tailer.as_mut() {
                        poller.guard(tailer.drain(&self.logs, &mut self.out)).await?;
                    }
                    if status == JobStatus::Failed {
                        warn!(
                            job_id = %job.id,
                            reason = state.reason.as_deref().unwrap_or_default(),
                            "job failed"
                        );
                    }

                    writeln!(self.out, "{}", "=".repeat(BANNER_WIDTH))?;
                    writeln!(self.out, "Job [{} - {}] {}", job.name, job.id, status)?;
                    self.out.flush()?;
                    return Ok(status);
                }
                JobStatus::Running => {
                    if tailer.is_none() {
                        tailer = poller.guard(self.find_stream(job)).await?;
                    }
                    if let Some(tailer) = tailer.as_mut() {
                        poller.guard(tailer.drain(&self.logs, &mut self.out)).await?;
                    }
                }
                status => {
                    write!(
                        self.out,
                        "\rJob [{} - {}] is {:<9}... {}",
                        job.name,
                        job.id,
                        status,
                        spinner.next_frame()
                    )?;
                    self.out.flush()?;
                }
            }
        }
    }

    /// Looks up the job's log stream, announcing the job as running the first time it is found.
    async fn find_stream(&mut self, job: &SubmittedJob) -> Result<Option<LogTailer>, BatchError> {
        let Some(stream) = self
            .logs
            .find_log_stream(&self.log_group, &job.log_stream_prefix())
            .await?
        else {
            debug!(job_id = %job.id, "no log stream yet");
            return Ok(None);
        };

        writeln!(self.out, "\rJob [{} - {}] is RUNNING.", job.name, job.id)?;
        writeln!(self.out, "Output [{}]:\n {}", stream, "=".repeat(BANNER_WIDTH))?;
        Ok(Some(LogTailer::new(self.log_group.clone(), stream)))
    }
}
