use crate::{AwsArgs, PollArgs};

use clap::Parser;
use gpu_batch_core::prelude::*;

/// Creates the minimal set of AWS Batch entities (compute environment, job queue, job definition)
/// to be able to submit a GPU job.
#[derive(Parser, Debug)]
#[command(name = "create-batch-entities", version)]
pub struct ProvisionArgs {
    /// Name of the compute environment
    #[arg(long, default_value = defaults::COMPUTE_ENVIRONMENT)]
    pub compute_environment: String,

    /// Comma delimited list of subnets
    #[arg(long, required = true, value_delimiter = ',')]
    pub subnets: Vec<String>,

    /// Comma delimited list of security group ids
    #[arg(long, required = true, value_delimiter = ',')]
    pub security_groups: Vec<String>,

    /// Instance role
    #[arg(long)]
    pub instance_role: String,

    /// Service role
    #[arg(long)]
    pub service_role: String,

    /// Image id
    #[arg(long)]
    pub image_id: String,

    /// EC2 key pair
    #[arg(long)]
    pub key_pair: Option<String>,

    #[command(flatten)]
    pub aws: AwsArgs,

    #[command(flatten)]
    pub poll: PollArgs,
}

impl ProvisionArgs {
    pub fn plan(&self) -> ProvisionPlan {
        let profile = GpuProfile::default();
        ProvisionPlan {
            compute_environment: ComputeEnvironmentConfig {
                name: self.compute_environment.clone(),
                instance_type: profile.instance_type.clone(),
                unit_vcpus: profile.unit_vcpus,
                image_id: self.image_id.clone(),
                service_role: self.service_role.clone(),
                instance_role: self.instance_role.clone(),
                subnets: self.subnets.clone(),
                security_groups: self.security_groups.clone(),
                key_pair: self.key_pair.clone(),
            },
            profile,
        }
    }
}

pub async fn run<B: BatchApi>(
    args: &ProvisionArgs,
    batch: B,
    poll: PollOptions,
) -> Result<ProvisionedEntities, BatchError> {
    let mut provisioner = Provisioner::new(batch, poll, std::io::stdout());
    provisioner.provision(&args.plan()).await
}
