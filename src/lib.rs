//! # GPU Batch
//!
//! Provision the AWS Batch entities needed to run GPU jobs and submit jobs to them.
//!
//! This crate serves as an entry point, re-exporting the core workflows and
//! optionally including service backends via feature flags.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **`aws`** | AWS Batch and CloudWatch Logs backends (`gpu_batch_aws`). |
//! | **`mock`** | Scripted in-memory backends for tests and dry runs (`gpu_batch_mock`). |
//!
//! ## Example: Submitting a Job
//!
//! ```toml
//! [dependencies]
//! gpu_batch = { version = "0.1", features = ["aws"] }
//! ```
//!
//! ```rust,ignore
//! use gpu_batch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BatchError> {
//!     let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
//!     let mut submitter = Submitter::new(
//!         AwsBatch::new(&config),
//!         AwsLogs::new(&config),
//!         PollOptions::default(),
//!         std::io::stdout(),
//!     );
//!
//!     let job = JobSubmission::new("smoke", "gpu_queue", "mxnet", "nvidia-smi");
//!     submitter.run(&job, true).await?;
//!     Ok(())
//! }
//! ```

pub use gpu_batch_core::*;

#[cfg(feature = "aws")]
pub mod aws {
    pub use gpu_batch_aws::*;
}

#[cfg(feature = "mock")]
pub mod mock {
    pub use gpu_batch_mock::*;
}

pub mod prelude {
    pub use gpu_batch_core::prelude::*;

    #[cfg(feature = "aws")]
    pub use gpu_batch_aws::{AwsBatch, AwsLogs};

    #[cfg(feature = "mock")]
    pub use gpu_batch_mock::{ScriptedBatch, ScriptedLogs};
}
