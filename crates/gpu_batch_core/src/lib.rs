//! # GPU Batch Core
//!
//! Types, traits and workflows for running GPU jobs on AWS Batch.
//!
//! - **[`Provisioner`](provision::Provisioner)**: Creates a compute environment, a job queue bound to it and a GPU job definition, waiting for each to become `VALID`.
//! - **[`Submitter`](submit::Submitter)**: Submits a job and optionally follows it to completion while tailing its log stream.
//! - **[`BatchApi`](traits::BatchApi)** / **[`LogsApi`](traits::LogsApi)**: Traits for plugging in the batch and log services (e.g. the AWS SDK, or a scripted mock).
//! - **[`PollOptions`](poll::PollOptions)**: Poll interval, optional timeout and cancellation for every wait.

pub mod constants;
pub mod entity;
pub mod error;
pub mod format;
pub mod poll;
pub mod provision;
pub mod submit;
pub mod tail;
pub mod traits;

pub mod prelude {
    pub use super::constants::*;
    pub use super::entity::*;
    pub use super::error::*;
    pub use super::format::*;
    pub use super::poll::*;
    pub use super::provision::*;
    pub use super::submit::*;
    pub use super::tail::*;
    pub use super::traits::*;
}
