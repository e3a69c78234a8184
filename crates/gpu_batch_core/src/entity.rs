use crate::constants::{defaults, naming, nvidia};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// vCPU bounds of a managed compute environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcpuRange {
    pub min: i32,
    pub max: i32,
    pub desired: i32,
}

impl VcpuRange {
    /// One unit of capacity kept warm, room to scale to two.
    pub fn from_unit(unit: i32) -> Self {
        Self {
            min: unit,
            max: unit * 2,
            desired: unit,
        }
    }
}

/// Operator supplied settings for a GPU compute environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeEnvironmentConfig {
    pub name: String,
    pub instance_type: String,
    /// vCPUs of a single instance of `instance_type`.
    pub unit_vcpus: i32,
    pub image_id: String,
    pub service_role: String,
    pub instance_role: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub key_pair: Option<String>,
}

/// A `MANAGED` compute environment backed by `EC2` instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeEnvironmentRequest {
    pub name: String,
    pub service_role: String,
    pub image_id: String,
    pub instance_types: Vec<String>,
    pub vcpus: VcpuRange,
    pub subnets: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub key_pair: Option<String>,
    pub instance_role: String,
}

impl From<&ComputeEnvironmentConfig> for ComputeEnvironmentRequest {
    fn from(config: &ComputeEnvironmentConfig) -> Self {
        Self {
            name: config.name.clone(),
            service_role: config.service_role.clone(),
            image_id: config.image_id.clone(),
            instance_types: vec![config.instance_type.clone()],
            vcpus: VcpuRange::from_unit(config.unit_vcpus),
            subnets: config.subnets.clone(),
            security_group_ids: config.security_groups.clone(),
            key_pair: config.key_pair.clone(),
            instance_role: config.instance_role.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeEnvironmentOrder {
    pub order: i32,
    pub compute_environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQueueRequest {
    pub name: String,
    pub priority: i32,
    pub compute_environments: Vec<ComputeEnvironmentOrder>,
}

impl JobQueueRequest {
    /// A queue named after `compute_environment`, bound to it alone.
    pub fn for_environment(compute_environment: &str) -> Self {
        Self {
            name: queue_name(compute_environment),
            priority: 0,
            compute_environments: vec![ComputeEnvironmentOrder {
                order: 0,
                compute_environment: compute_environment.to_string(),
            }],
        }
    }
}

/// Returns the job queue name derived from a compute environment name.
pub fn queue_name(compute_environment: &str) -> String {
    format!("{compute_environment}{}", naming::QUEUE_SUFFIX)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostVolume {
    pub name: String,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub source_volume: String,
    pub container_path: String,
    pub read_only: bool,
}

/// A `container` job definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinitionRequest {
    pub name: String,
    pub image: String,
    pub vcpus: i32,
    /// Memory in MiB.
    pub memory: i32,
    pub privileged: bool,
    pub volumes: Vec<HostVolume>,
    pub mount_points: Vec<MountPoint>,
}

impl JobDefinitionRequest {
    /// A privileged container with the host's nvidia driver mounted read-only.
    pub fn gpu(
        name: impl Into<String>,
        image: impl Into<String>,
        vcpus: i32,
        memory: i32,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            vcpus,
            memory,
            privileged: true,
            volumes: vec![HostVolume {
                name: nvidia::DRIVER_VOLUME.to_string(),
                source_path: nvidia::DRIVER_HOST_PATH.to_string(),
            }],
            mount_points: vec![MountPoint {
                source_volume: nvidia::DRIVER_VOLUME.to_string(),
                container_path: nvidia::DRIVER_CONTAINER_PATH.to_string(),
                read_only: true,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredJobDefinition {
    pub name: String,
    pub arn: Option<String>,
    pub revision: Option<i32>,
}

/// The instance shape and job definition a provisioning run is built around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuProfile {
    pub instance_type: String,
    pub unit_vcpus: i32,
    pub unit_memory: i32,
    pub job_definition: String,
    pub image: String,
}

impl Default for GpuProfile {
    fn default() -> Self {
        Self {
            instance_type: defaults::INSTANCE_TYPE.to_string(),
            unit_vcpus: defaults::UNIT_VCPUS,
            unit_memory: defaults::UNIT_MEMORY_MIB,
            job_definition: defaults::JOB_DEFINITION.to_string(),
            image: defaults::IMAGE.to_string(),
        }
    }
}

/// Lifecycle status shared by compute environments and job queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Creating,
    Updating,
    Deleting,
    Deleted,
    Valid,
    Invalid,
    Unknown(String),
}

impl FromStr for ResourceStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CREATING" => Self::Creating,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            "DELETED" => Self::Deleted,
            "VALID" => Self::Valid,
            "INVALID" => Self::Invalid,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "CREATING",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Unknown(s) => s,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    pub status: ResourceStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub name: String,
    pub queue: String,
    pub definition: String,
    /// Container command override. Left untouched when empty.
    pub command: Vec<String>,
}

impl JobSubmission {
    pub fn new(
        name: impl Into<String>,
        queue: impl Into<String>,
        definition: impl Into<String>,
        command: &str,
    ) -> Self {
        Self {
            name: name.into(),
            queue: queue.into(),
            definition: definition.into(),
            command: command.split_whitespace().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedJob {
    pub id: String,
    pub name: String,
    pub queue: String,
}

impl SubmittedJob {
    /// Log streams of a job are named `<jobName>/<jobId>/...`.
    pub fn log_stream_prefix(&self) -> String {
        format!("{}/{}", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Submitted,
    Pending,
    Runnable,
    Starting,
    Running,
    Succeeded,
    Failed,
    Unknown(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl FromStr for JobStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "SUBMITTED" => Self::Submitted,
            "PENDING" => Self::Pending,
            "RUNNABLE" => Self::Runnable,
            "STARTING" => Self::Starting,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::Pending => "PENDING",
            Self::Runnable => "RUNNABLE",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Unknown(s) => s,
        };
        // `pad` so width specifiers like `{:<9}` apply.
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub message: String,
}

/// One `GetLogEvents` request, always read from the head of the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    pub group: String,
    pub stream: String,
    pub start_time: i64,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogPage {
    pub events: Vec<LogEvent>,
    pub next_forward_token: Option<String>,
}
