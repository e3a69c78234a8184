//! # GPU Batch CLI
//!
//! Shared plumbing for the `create-batch-entities` and `submit-job` binaries:
//! AWS and polling flags, tracing setup and Ctrl-C handling.

pub mod provision;
pub mod submit;

use aws_config::{BehaviorVersion, Region};
use clap::Args;
use gpu_batch_core::prelude::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug, Clone)]
pub struct AwsArgs {
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = defaults::REGION)]
    pub region: String,

    /// Named profile from the shared AWS config files
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Override the AWS Batch endpoint
    #[arg(long, env = "BATCH_ENDPOINT_URL")]
    pub batch_endpoint: Option<String>,

    /// Override the CloudWatch Logs endpoint
    #[arg(long, env = "LOGS_ENDPOINT_URL")]
    pub logs_endpoint: Option<String>,
}

impl AwsArgs {
    pub async fn load(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()));
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }

    pub fn batch(&self, config: &aws_config::SdkConfig) -> gpu_batch_aws::AwsBatch {
        match &self.batch_endpoint {
            Some(url) => gpu_batch_aws::AwsBatch::with_endpoint(config, url),
            None => gpu_batch_aws::AwsBatch::new(config),
        }
    }

    pub fn logs(&self, config: &aws_config::SdkConfig) -> gpu_batch_aws::AwsLogs {
        match &self.logs_endpoint {
            Some(url) => gpu_batch_aws::AwsLogs::with_endpoint(config, url),
            None => gpu_batch_aws::AwsLogs::new(config),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Seconds between two status checks
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// Give up waiting after this many seconds. Waits indefinitely when unset.
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl PollArgs {
    pub fn options(&self, cancel: CancellationToken) -> PollOptions {
        PollOptions::default()
            .with_interval(Duration::from_secs(self.poll_interval))
            .with_timeout(self.timeout.map(Duration::from_secs))
            .with_cancellation(cancel)
    }
}

/// Diagnostics go to stderr so they never interleave with job output on stdout.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Exit status of a process killed by SIGINT.
pub const INTERRUPTED: i32 = 130;

/// Returns a token that is cancelled on the first Ctrl-C.
///
/// A second Ctrl-C exits right away with [`INTERRUPTED`].
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("interrupted, stopping");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(INTERRUPTED);
        }
    });
    token
}
