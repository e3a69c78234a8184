use crate::entity::*;
use crate::error::{BatchError, ResourceKind};
use crate::format::Spinner;
use crate::poll::{PollOptions, Poller};
use crate::traits::BatchApi;

use std::io::Write;
use tracing::{debug, info};

/// Everything a provisioning run needs.
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    pub compute_environment: ComputeEnvironmentConfig,
    pub profile: GpuProfile,
}

#[derive(Debug, Clone)]
pub struct ProvisionedEntities {
    pub compute_environment: String,
    pub job_queue: String,
    pub job_definition: RegisteredJobDefinition,
}

/// Creates the compute environment, job queue and job definition, one after the other.
///
/// Nothing is rolled back on failure: a compute environment created before a
/// failing job queue is left for the operator to clean up.
pub struct Provisioner<B, W> {
    batch: B,
    poll: PollOptions,
    out: W,
}

impl<B: BatchApi, W: Write> Provisioner<B, W> {
    pub fn new(batch: B, poll: PollOptions, out: W) -> Self {
        Self { batch, poll, out }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn provision(
        &mut self,
        plan: &ProvisionPlan,
    ) -> Result<ProvisionedEntities, BatchError> {
        let env = self
            .create_compute_environment(&plan.compute_environment)
            .await?;
        let job_queue = self.create_job_queue(&env.name).await?;
        let job_definition = self
            .register_job_definition(
                &plan.profile.job_definition,
                &plan.profile.image,
                plan.profile.unit_vcpus,
                plan.profile.unit_memory,
            )
            .await?;

        writeln!(
            self.out,
            "Successfully created batch entities (compute environment, job queue, job definition)"
        )?;

        Ok(ProvisionedEntities {
            compute_environment: env.name,
            job_queue,
            job_definition,
        })
    }

    /// Creates a managed compute environment and waits until it is `VALID`.
    pub async fn create_compute_environment(
        &mut self,
        config: &ComputeEnvironmentConfig,
    ) -> Result<ComputeEnvironmentRequest, BatchError> {
        let req = ComputeEnvironmentRequest::from(config);
        info!(
            name = %req.name,
            instance_types = ?req.instance_types,
            vcpus = ?req.vcpus,
            "creating compute environment"
        );
        let what = format!("{} {}", ResourceKind::ComputeEnvironment, req.name);
        self.poll
            .guard(&what, self.batch.create_compute_environment(&req))
            .await?;
        self.wait_until_valid(ResourceKind::ComputeEnvironment, &req.name)
            .await?;
        Ok(req)
    }

    /// Creates `<compute_environment>_queue` and waits until it is `VALID`.
    pub async fn create_job_queue(
        &mut self,
        compute_environment: &str,
    ) -> Result<String, BatchError> {
        let req = JobQueueRequest::for_environment(compute_environment);
        info!(name = %req.name, compute_environment, "creating job queue");
        let what = format!("{} {}", ResourceKind::JobQueue, req.name);
        self.poll
            .guard(&what, self.batch.create_job_queue(&req))
            .await?;
        self.wait_until_valid(ResourceKind::JobQueue, &req.name)
            .await?;
        Ok(req.name)
    }

    pub async fn register_job_definition(
        &mut self,
        name: &str,
        image: &str,
        vcpus: i32,
        memory: i32,
    ) -> Result<RegisteredJobDefinition, BatchError> {
        let req = JobDefinitionRequest::gpu(name, image, vcpus, memory);
        info!(name, image, vcpus, memory, "registering job definition");
        let registered = self
            .poll
            .guard(&format!("job definition {name}"), self.batch.register_job_definition(&req))
            .await?;
        writeln!(self.out, "Created job definition {}", registered.name)?;
        Ok(registered)
    }

    async fn describe(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<ResourceState>, BatchError> {
        match kind {
            ResourceKind::ComputeEnvironment => {
                self.batch.describe_compute_environment(name).await
            }
            ResourceKind::JobQueue => self.batch.describe_job_queue(name).await,
        }
    }

    async fn wait_until_valid(&mut self, kind: ResourceKind, name: &str) -> Result<(), BatchError> {
        let mut poller = Poller::new(&self.poll, format!("{kind} {name}"));
        let mut spinner = Spinner::default();

        loop {
            let state = poller
                .guard(self.describe(kind, name))
                .await?
                .ok_or_else(|| BatchError::NotFound(format!("{kind} {name}")))?;
            debug!(%kind, name, status = %state.status, polls = poller.ticks(), "polled");

            match state.status {
                ResourceStatus::Valid => {
                    writeln!(self.out, "\rSuccessfully created {kind} {name}")?;
                    return Ok(());
                }
                ResourceStatus::Invalid => {
                    return Err(BatchError::Invalid {
                        kind,
                        reason: state.reason.unwrap_or_default(),
                    });
                }
                _ => {
                    write!(self.out, "\rCreating {kind}... {}", spinner.next_frame())?;
                    self.out.flush()?;
                }
            }

            poller.tick().await?;
        }
    }
}
