use clap::Parser;
use gpu_batch_cli::submit::{self, SubmitArgs};
use gpu_batch_core::prelude::JobStatus;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    gpu_batch_cli::init_tracing();
    let args = SubmitArgs::parse();

    let config = args.aws.load().await;
    let batch = args.aws.batch(&config);
    let logs = args.aws.logs(&config);
    let poll = args.poll.options(gpu_batch_cli::cancel_on_ctrl_c());

    match submit::run(&args, batch, logs, poll).await? {
        Some(JobStatus::Failed) => Ok(ExitCode::FAILURE),
        _ => Ok(ExitCode::SUCCESS),
    }
}
