use crate::{AwsArgs, PollArgs};

use clap::Parser;
use gpu_batch_core::prelude::*;

/// Submits a job to an AWS Batch job queue and optionally tails its CloudWatch log output.
#[derive(Parser, Debug)]
#[command(name = "submit-job", version)]
pub struct SubmitArgs {
    /// Name of the job
    #[arg(long, default_value = defaults::JOB_NAME)]
    pub name: String,

    /// Name of the job queue to submit this job to
    #[arg(long, default_value = defaults::JOB_QUEUE)]
    pub job_queue: String,

    /// Name of the job definition
    #[arg(long, default_value = defaults::JOB_DEFINITION)]
    pub job_definition: String,

    /// Command to run
    #[arg(long, default_value = defaults::COMMAND)]
    pub command: String,

    /// Block until the job completes, streaming its output
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub aws: AwsArgs,

    #[command(flatten)]
    pub poll: PollArgs,
}

impl SubmitArgs {
    pub fn submission(&self) -> JobSubmission {
        JobSubmission::new(
            &self.name,
            &self.job_queue,
            &self.job_definition,
            &self.command,
        )
    }
}

/// Returns the terminal status when waiting.
pub async fn run<B: BatchApi, L: LogsApi>(
    args: &SubmitArgs,
    batch: B,
    logs: L,
    poll: PollOptions,
) -> Result<Option<JobStatus>, BatchError> {
    let mut submitter = Submitter::new(batch, logs, poll, std::io::stdout());
    let (_, status) = submitter.run(&args.submission(), args.wait).await?;
    Ok(status)
}
