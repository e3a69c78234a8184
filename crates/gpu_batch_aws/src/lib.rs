//! # GPU Batch AWS
//!
//! [`BatchApi`] and [`LogsApi`] implementations on top of the AWS SDK.
//!
//! ## Usage
//!
//! ```no_run
//! use aws_config::BehaviorVersion;
//! use gpu_batch_aws::{AwsBatch, AwsLogs};
//!
//! # async fn run() {
//! let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
//! let batch = AwsBatch::new(&config);
//! let logs = AwsLogs::new(&config);
//! # }
//! ```

use gpu_batch_core::prelude::*;

use aws_sdk_batch::error::DisplayErrorContext;
use aws_sdk_batch::{
    Client as BatchClient,
    types::{
        CeState, CeType, ComputeEnvironmentOrder as AwsComputeEnvironmentOrder, ComputeResource,
        ContainerOverrides, ContainerProperties, CrType, Ec2Configuration, Host,
        JobDefinitionType, JqState, MountPoint as AwsMountPoint, ResourceRequirement,
        ResourceType, Volume,
    },
};
use aws_sdk_cloudwatchlogs::Client as LogsClient;
use tracing::debug;

fn api_error<E: std::error::Error>(action: &str, err: E) -> BatchError {
    BatchError::Api(format!("{action}: {}", DisplayErrorContext(err)))
}

/// A missing status is reported while the service is still setting the entity up.
fn resource_state(status: Option<&str>, reason: Option<&str>) -> ResourceState {
    ResourceState {
        status: status
            .and_then(|s| s.parse().ok())
            .unwrap_or(ResourceStatus::Creating),
        reason: reason.map(str::to_string),
    }
}

/// ECS optimized Amazon Linux 2 with the nvidia drivers the job definition mounts.
const GPU_IMAGE_TYPE: &str = "ECS_AL2_NVIDIA";

fn compute_resource(req: &ComputeEnvironmentRequest) -> ComputeResource {
    ComputeResource::builder()
        .r#type(CrType::Ec2)
        .ec2_configuration(
            Ec2Configuration::builder()
                .image_type(GPU_IMAGE_TYPE)
                .image_id_override(&req.image_id)
                .build(),
        )
        .minv_cpus(req.vcpus.min)
        .maxv_cpus(req.vcpus.max)
        .desiredv_cpus(req.vcpus.desired)
        .set_instance_types(Some(req.instance_types.clone()))
        .set_subnets(Some(req.subnets.clone()))
        .set_security_group_ids(Some(req.security_group_ids.clone()))
        .set_ec2_key_pair(req.key_pair.clone())
        .instance_role(&req.instance_role)
        .build()
}

fn queue_order(req: &JobQueueRequest) -> Vec<AwsComputeEnvironmentOrder> {
    req.compute_environments
        .iter()
        .map(|o| {
            AwsComputeEnvironmentOrder::builder()
                .order(o.order)
                .compute_environment(&o.compute_environment)
                .build()
        })
        .collect()
}

fn container_properties(req: &JobDefinitionRequest) -> ContainerProperties {
    let requirements = vec![
        ResourceRequirement::builder()
            .r#type(ResourceType::Vcpu)
            .value(req.vcpus.to_string())
            .build(),
        ResourceRequirement::builder()
            .r#type(ResourceType::Memory)
            .value(req.memory.to_string())
            .build(),
    ];

    let volumes = req
        .volumes
        .iter()
        .map(|v| {
            Volume::builder()
                .name(&v.name)
                .host(Host::builder().source_path(&v.source_path).build())
                .build()
        })
        .collect();

    let mount_points = req
        .mount_points
        .iter()
        .map(|m| {
            AwsMountPoint::builder()
                .source_volume(&m.source_volume)
                .container_path(&m.container_path)
                .read_only(m.read_only)
                .build()
        })
        .collect();

    ContainerProperties::builder()
        .image(&req.image)
        .privileged(req.privileged)
        .set_resource_requirements(Some(requirements))
        .set_volumes(Some(volumes))
        .set_mount_points(Some(mount_points))
        .build()
}

#[derive(Clone, Debug)]
pub struct AwsBatch {
    client: BatchClient,
}

impl AwsBatch {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: BatchClient::new(config),
        }
    }

    /// Uses `endpoint_url` instead of the regional default endpoint.
    pub fn with_endpoint(config: &aws_config::SdkConfig, endpoint_url: &str) -> Self {
        let conf = aws_sdk_batch::config::Builder::from(config)
            .endpoint_url(endpoint_url)
            .build();
        Self {
            client: BatchClient::from_conf(conf),
        }
    }

    pub fn from_client(client: BatchClient) -> Self {
        Self { client }
    }
}

impl BatchApi for AwsBatch {
    async fn create_compute_environment(
        &self,
        req: &ComputeEnvironmentRequest,
    ) -> Result<(), BatchError> {
        self.client
            .create_compute_environment()
            .compute_environment_name(&req.name)
            .r#type(CeType::Managed)
            .state(CeState::Enabled)
            .service_role(&req.service_role)
            .compute_resources(compute_resource(req))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| api_error("Failed to create compute environment", e))
    }

    async fn describe_compute_environment(
        &self,
        name: &str,
    ) -> Result<Option<ResourceState>, BatchError> {
        let resp = self
            .client
            .describe_compute_environments()
            .compute_environments(name)
            .send()
            .await
            .map_err(|e| api_error("Failed to describe compute environment", e))?;

        Ok(resp
            .compute_environments()
            .first()
            .map(|env| resource_state(env.status().map(|s| s.as_str()), env.status_reason())))
    }

    async fn create_job_queue(&self, req: &JobQueueRequest) -> Result<(), BatchError> {
        self.client
            .create_job_queue()
            .job_queue_name(&req.name)
            .state(JqState::Enabled)
            .priority(req.priority)
            .set_compute_environment_order(Some(queue_order(req)))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| api_error("Failed to create job queue", e))
    }

    async fn describe_job_queue(&self, name: &str) -> Result<Option<ResourceState>, BatchError> {
        let resp = self
            .client
            .describe_job_queues()
            .job_queues(name)
            .send()
            .await
            .map_err(|e| api_error("Failed to describe job queue", e))?;

        Ok(resp
            .job_queues()
            .first()
            .map(|queue| resource_state(queue.status().map(|s| s.as_str()), queue.status_reason())))
    }

    async fn register_job_definition(
        &self,
        req: &JobDefinitionRequest,
    ) -> Result<RegisteredJobDefinition, BatchError> {
        let output = self
            .client
            .register_job_definition()
            .job_definition_name(&req.name)
            .r#type(JobDefinitionType::Container)
            .container_properties(container_properties(req))
            .send()
            .await
            .map_err(|e| api_error("Failed to register job definition", e))?;

        debug!(?output, "registered job definition");
        Ok(RegisteredJobDefinition {
            name: output.job_definition_name.unwrap_or_else(|| req.name.clone()),
            arn: output.job_definition_arn,
            revision: output.revision,
        })
    }

    async fn submit_job(&self, req: &JobSubmission) -> Result<SubmittedJob, BatchError> {
        let mut builder = ContainerOverrides::builder();
        if !req.command.is_empty() {
            builder = builder.set_command(Some(req.command.clone()));
        }

        let output = self
            .client
            .submit_job()
            .job_name(&req.name)
            .job_queue(&req.queue)
            .job_definition(&req.definition)
            .container_overrides(builder.build())
            .send()
            .await
            .map_err(|e| api_error("Failed to submit job", e))?;

        let id = output
            .job_id
            .ok_or_else(|| BatchError::Api("Submit job response is missing the job id".into()))?;

        Ok(SubmittedJob {
            id,
            name: output.job_name.unwrap_or_else(|| req.name.clone()),
            queue: req.queue.clone(),
        })
    }

    async fn describe_job(&self, job_id: &str) -> Result<Option<JobState>, BatchError> {
        let resp = self
            .client
            .describe_jobs()
            .jobs(job_id)
            .send()
            .await
            .map_err(|e| api_error("Failed to describe job", e))?;

        Ok(resp.jobs().first().map(|job| JobState {
            status: job
                .status()
                .and_then(|s| s.as_str().parse().ok())
                .unwrap_or(JobStatus::Submitted),
            reason: job.status_reason().map(str::to_string),
        }))
    }
}

#[derive(Clone, Debug)]
pub struct AwsLogs {
    client: LogsClient,
}

impl AwsLogs {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: LogsClient::new(config),
        }
    }

    /// Uses `endpoint_url` instead of the regional default endpoint.
    pub fn with_endpoint(config: &aws_config::SdkConfig, endpoint_url: &str) -> Self {
        let conf = aws_sdk_cloudwatchlogs::config::Builder::from(config)
            .endpoint_url(endpoint_url)
            .build();
        Self {
            client: LogsClient::from_conf(conf),
        }
    }

    pub fn from_client(client: LogsClient) -> Self {
        Self { client }
    }
}

impl LogsApi for AwsLogs {
    async fn find_log_stream(
        &self,
        group: &str,
        prefix: &str,
    ) -> Result<Option<String>, BatchError> {
        let resp = self
            .client
            .describe_log_streams()
            .log_group_name(group)
            .log_stream_name_prefix(prefix)
            .send()
            .await
            .map_err(|e| api_error("Failed to describe log streams", e))?;

        Ok(resp
            .log_streams()
            .first()
            .and_then(|s| s.log_stream_name())
            .map(str::to_string))
    }

    async fn get_log_events(&self, query: &LogQuery) -> Result<LogPage, BatchError> {
        let output = self
            .client
            .get_log_events()
            .log_group_name(&query.group)
            .log_stream_name(&query.stream)
            .start_time(query.start_time)
            .start_from_head(true)
            .set_next_token(query.next_token.clone())
            .send()
            .await
            .map_err(|e| api_error("Failed to get log events", e))?;

        let events = output
            .events()
            .iter()
            .map(|event| LogEvent {
                timestamp: event.timestamp().unwrap_or_default(),
                message: event.message().unwrap_or_default().to_string(),
            })
            .collect();

        Ok(LogPage {
            events,
            next_forward_token: output.next_forward_token.clone(),
        })
    }
}
