use crate::entity::*;
use crate::error::BatchError;

/// A trait for injecting the batch service into the provisioning and submission workflows.
pub trait BatchApi: Send + Sync + 'static + Clone {
    /// Issues the creation request. The environment is not usable until it reports `VALID`.
    fn create_compute_environment(
        &self,
        req: &ComputeEnvironmentRequest,
    ) -> impl Future<Output = Result<(), BatchError>> + Send;

    /// Fetches the current state of a compute environment by name.
    fn describe_compute_environment(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ResourceState>, BatchError>> + Send;

    fn create_job_queue(
        &self,
        req: &JobQueueRequest,
    ) -> impl Future<Output = Result<(), BatchError>> + Send;

    fn describe_job_queue(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ResourceState>, BatchError>> + Send;

    /// Registers a job definition. Registration is synchronous, no polling needed.
    fn register_job_definition(
        &self,
        req: &JobDefinitionRequest,
    ) -> impl Future<Output = Result<RegisteredJobDefinition, BatchError>> + Send;

    fn submit_job(
        &self,
        req: &JobSubmission,
    ) -> impl Future<Output = Result<SubmittedJob, BatchError>> + Send;

    fn describe_job(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<Option<JobState>, BatchError>> + Send;
}

/// A trait for reading job output from the log service.
pub trait LogsApi: Send + Sync + 'static + Clone {
    /// Returns the name of the first stream in `group` starting with `prefix`, if any exists yet.
    fn find_log_stream(
        &self,
        group: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Option<String>, BatchError>> + Send;

    /// Fetches one page of events, oldest first.
    fn get_log_events(
        &self,
        query: &LogQuery,
    ) -> impl Future<Output = Result<LogPage, BatchError>> + Send;
}
