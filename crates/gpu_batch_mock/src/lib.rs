//! # GPU Batch Mock
//!
//! Scripted, in-memory batch and log services for development and testing.
//!
//! Every describe call answers with the next scripted state; the last one repeats.
//! Every call is recorded so tests can assert on what was sent and in which order.
//!
//! ## Usage
//!
//! ```rust
//! # use gpu_batch_mock::ScriptedBatch;
//! # use gpu_batch_core::prelude::*;
//! # fn main() {
//! let batch = ScriptedBatch::new().with_environment_statuses(
//!     "gpu",
//!     [ResourceStatus::Creating, ResourceStatus::Valid],
//! );
//! # }
//! ```

use gpu_batch_core::prelude::*;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A request received by [`ScriptedBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchCall {
    CreateComputeEnvironment(ComputeEnvironmentRequest),
    DescribeComputeEnvironment(String),
    CreateJobQueue(JobQueueRequest),
    DescribeJobQueue(String),
    RegisterJobDefinition(JobDefinitionRequest),
    SubmitJob(JobSubmission),
    DescribeJob(String),
}

impl BatchCall {
    /// The operation name, e.g. `create_job_queue`.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateComputeEnvironment(_) => "create_compute_environment",
            Self::DescribeComputeEnvironment(_) => "describe_compute_environment",
            Self::CreateJobQueue(_) => "create_job_queue",
            Self::DescribeJobQueue(_) => "describe_job_queue",
            Self::RegisterJobDefinition(_) => "register_job_definition",
            Self::SubmitJob(_) => "submit_job",
            Self::DescribeJob(_) => "describe_job",
        }
    }
}

#[derive(Default)]
struct BatchScript {
    environments: HashMap<String, VecDeque<ResourceState>>,
    queues: HashMap<String, VecDeque<ResourceState>>,
    jobs: HashMap<String, VecDeque<JobState>>,
    created: HashSet<String>,
    failures: HashMap<&'static str, String>,
    stalls: HashSet<&'static str>,
    submitted: usize,
    calls: Vec<BatchCall>,
}

/// Pops the next scripted state, keeping the last one in place.
fn next_state<T: Clone>(states: &mut VecDeque<T>) -> Option<T> {
    if states.len() > 1 {
        states.pop_front()
    } else {
        states.front().cloned()
    }
}

fn valid() -> ResourceState {
    ResourceState {
        status: ResourceStatus::Valid,
        reason: None,
    }
}

fn without_reason(status: ResourceStatus) -> ResourceState {
    ResourceState {
        status,
        reason: None,
    }
}

/// An in-memory [`BatchApi`].
///
/// Clones share state. Entities that were created but have no scripted states
/// are reported `VALID` right away. Submitted jobs get the ids `job-1`, `job-2`, ...
#[derive(Clone, Default)]
pub struct ScriptedBatch {
    inner: Arc<Mutex<BatchScript>>,
}

impl ScriptedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BatchScript> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_environment_states(
        self,
        name: impl Into<String>,
        states: impl IntoIterator<Item = ResourceState>,
    ) -> Self {
        self.lock()
            .environments
            .insert(name.into(), states.into_iter().collect());
        self
    }

    pub fn with_environment_statuses(
        self,
        name: impl Into<String>,
        statuses: impl IntoIterator<Item = ResourceStatus>,
    ) -> Self {
        self.with_environment_states(name, statuses.into_iter().map(without_reason))
    }

    pub fn with_queue_states(
        self,
        name: impl Into<String>,
        states: impl IntoIterator<Item = ResourceState>,
    ) -> Self {
        self.lock()
            .queues
            .insert(name.into(), states.into_iter().collect());
        self
    }

    pub fn with_queue_statuses(
        self,
        name: impl Into<String>,
        statuses: impl IntoIterator<Item = ResourceStatus>,
    ) -> Self {
        self.with_queue_states(name, statuses.into_iter().map(without_reason))
    }

    /// Scripts the statuses `describe_job` reports for `job_id`.
    pub fn with_job_statuses(
        self,
        job_id: impl Into<String>,
        statuses: impl IntoIterator<Item = JobStatus>,
    ) -> Self {
        let states = statuses
            .into_iter()
            .map(|status| JobState {
                status,
                reason: None,
            })
            .collect();
        self.lock().jobs.insert(job_id.into(), states);
        self
    }

    /// Makes every call to `operation` fail with [`BatchError::Api`].
    pub fn with_failure(self, operation: &'static str, message: impl Into<String>) -> Self {
        self.lock().failures.insert(operation, message.into());
        self
    }

    /// Makes every call to `operation` hang after it is recorded, like a request
    /// the service never answers.
    pub fn with_stall(self, operation: &'static str) -> Self {
        self.lock().stalls.insert(operation);
        self
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<BatchCall> {
        self.lock().calls.clone()
    }

    /// Number of calls received for `operation`.
    pub fn count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    async fn record(&self, call: BatchCall) -> Result<MutexGuard<'_, BatchScript>, BatchError> {
        let stalled = {
            let mut script = self.lock();
            let operation = call.operation();
            script.calls.push(call);
            if let Some(message) = script.failures.get(operation).cloned() {
                return Err(BatchError::Api(message));
            }
            script.stalls.contains(operation)
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        Ok(self.lock())
    }
}

impl BatchApi for ScriptedBatch {
    async fn create_compute_environment(
        &self,
        req: &ComputeEnvironmentRequest,
    ) -> Result<(), BatchError> {
        let mut script = self.record(BatchCall::CreateComputeEnvironment(req.clone())).await?;
        script.created.insert(req.name.clone());
        Ok(())
    }

    async fn describe_compute_environment(
        &self,
        name: &str,
    ) -> Result<Option<ResourceState>, BatchError> {
        let mut script = self
            .record(BatchCall::DescribeComputeEnvironment(name.to_string()))
            .await?;
        if let Some(states) = script.environments.get_mut(name) {
            return Ok(next_state(states));
        }
        Ok(script.created.contains(name).then(valid))
    }

    async fn create_job_queue(&self, req: &JobQueueRequest) -> Result<(), BatchError> {
        let mut script = self.record(BatchCall::CreateJobQueue(req.clone())).await?;
        script.created.insert(req.name.clone());
        Ok(())
    }

    async fn describe_job_queue(&self, name: &str) -> Result<Option<ResourceState>, BatchError> {
        let mut script = self.record(BatchCall::DescribeJobQueue(name.to_string())).await?;
        if let Some(states) = script.queues.get_mut(name) {
            return Ok(next_state(states));
        }
        Ok(script.created.contains(name).then(valid))
    }

    async fn register_job_definition(
        &self,
        req: &JobDefinitionRequest,
    ) -> Result<RegisteredJobDefinition, BatchError> {
        let _script = self.record(BatchCall::RegisterJobDefinition(req.clone())).await?;
        Ok(RegisteredJobDefinition {
            name: req.name.clone(),
            arn: Some(format!(
                "arn:aws:batch:us-east-1:000000000000:job-definition/{}:1",
                req.name
            )),
            revision: Some(1),
        })
    }

    async fn submit_job(&self, req: &JobSubmission) -> Result<SubmittedJob, BatchError> {
        let mut script = self.record(BatchCall::SubmitJob(req.clone())).await?;
        script.submitted += 1;
        Ok(SubmittedJob {
            id: format!("job-{}", script.submitted),
            name: req.name.clone(),
            queue: req.queue.clone(),
        })
    }

    async fn describe_job(&self, job_id: &str) -> Result<Option<JobState>, BatchError> {
        let mut script = self.record(BatchCall::DescribeJob(job_id.to_string())).await?;
        Ok(script.jobs.get_mut(job_id).and_then(next_state))
    }
}

struct ScriptedStream {
    name: String,
    /// Number of lookups that come back empty before the stream shows up.
    hidden_for: usize,
    events: Vec<LogEvent>,
}

struct LogsScript {
    streams: Vec<ScriptedStream>,
    page_size: usize,
    lookups: Vec<(String, String)>,
    queries: Vec<LogQuery>,
    stalls: HashSet<&'static str>,
}

impl Default for LogsScript {
    fn default() -> Self {
        Self {
            streams: Vec::new(),
            page_size: 100,
            lookups: Vec::new(),
            queries: Vec::new(),
            stalls: HashSet::new(),
        }
    }
}

/// An in-memory [`LogsApi`] with CloudWatch style forward tokens.
///
/// Tokens encode an offset into the events at or after the query's start time.
/// At the end of a stream the token passed in is handed back unchanged.
#[derive(Clone, Default)]
pub struct ScriptedLogs {
    inner: Arc<Mutex<LogsScript>>,
}

impl ScriptedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogsScript> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.lock().page_size = page_size.max(1);
        self
    }

    pub fn with_stream(self, name: impl Into<String>, events: Vec<LogEvent>) -> Self {
        self.with_stream_after(name, 0, events)
    }

    /// Adds a stream that only becomes visible after `lookups` unsuccessful lookups.
    pub fn with_stream_after(
        self,
        name: impl Into<String>,
        lookups: usize,
        events: Vec<LogEvent>,
    ) -> Self {
        self.lock().streams.push(ScriptedStream {
            name: name.into(),
            hidden_for: lookups,
            events,
        });
        self
    }

    /// Appends events to an existing stream, as a running job would.
    pub fn push_events(&self, stream: &str, events: impl IntoIterator<Item = LogEvent>) {
        let mut script = self.lock();
        if let Some(s) = script.streams.iter_mut().find(|s| s.name == stream) {
            s.events.extend(events);
        }
    }

    /// Makes `find_log_stream` or `get_log_events` hang after the request is recorded.
    pub fn with_stall(self, operation: &'static str) -> Self {
        self.lock().stalls.insert(operation);
        self
    }

    /// Hangs forever if `operation` is stalled.
    async fn maybe_stall(&self, operation: &str) {
        let stalled = self.lock().stalls.contains(operation);
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    /// `(group, prefix)` of every stream lookup.
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lock().lookups.clone()
    }

    pub fn queries(&self) -> Vec<LogQuery> {
        self.lock().queries.clone()
    }
}

impl LogsApi for ScriptedLogs {
    async fn find_log_stream(
        &self,
        group: &str,
        prefix: &str,
    ) -> Result<Option<String>, BatchError> {
        let seen = {
            let mut script = self.lock();
            script.lookups.push((group.to_string(), prefix.to_string()));
            script.lookups.len() - 1
        };
        self.maybe_stall("find_log_stream").await;

        let script = self.lock();
        Ok(script
            .streams
            .iter()
            .find(|s| s.name.starts_with(prefix) && seen >= s.hidden_for)
            .map(|s| s.name.clone()))
    }

    async fn get_log_events(&self, query: &LogQuery) -> Result<LogPage, BatchError> {
        self.lock().queries.push(query.clone());
        self.maybe_stall("get_log_events").await;

        let script = self.lock();
        let stream = script
            .streams
            .iter()
            .find(|s| s.name == query.stream)
            .ok_or_else(|| BatchError::Api(format!("log stream {} does not exist", query.stream)))?;

        let offset = match &query.next_token {
            Some(token) => token
                .strip_prefix("f/")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| BatchError::Api(format!("invalid next token {token}")))?,
            None => 0,
        };

        let events: Vec<LogEvent> = stream
            .events
            .iter()
            .filter(|e| e.timestamp >= query.start_time)
            .skip(offset)
            .take(script.page_size)
            .cloned()
            .collect();

        Ok(LogPage {
            next_forward_token: Some(format!("f/{}", offset + events.len())),
            events,
        })
    }
}
