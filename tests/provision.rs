use gpu_batch::prelude::*;
use gpu_batch_mock::{BatchCall, ScriptedBatch};

fn plan(name: &str) -> ProvisionPlan {
    let profile = GpuProfile::default();
    ProvisionPlan {
        compute_environment: ComputeEnvironmentConfig {
            name: name.to_string(),
            instance_type: profile.instance_type.clone(),
            unit_vcpus: profile.unit_vcpus,
            image_id: "ami-0123456789".into(),
            service_role: "arn:aws:iam::000000000000:role/AWSBatchServiceRole".into(),
            instance_role: "ecsInstanceRole".into(),
            subnets: vec!["subnet-a".into(), "subnet-b".into()],
            security_groups: vec!["sg-1".into()],
            key_pair: Some("ops".into()),
        },
        profile,
    }
}

fn output(provisioner: Provisioner<ScriptedBatch, Vec<u8>>) -> String {
    String::from_utf8(provisioner.into_output()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn provisions_all_entities_in_order() {
    let batch = ScriptedBatch::new();
    let mut provisioner = Provisioner::new(batch.clone(), PollOptions::default(), Vec::<u8>::new());

    let entities = provisioner.provision(&plan("gpu")).await.unwrap();

    assert_eq!(entities.compute_environment, "gpu");
    assert_eq!(entities.job_queue, "gpu_queue");
    assert_eq!(entities.job_definition.name, "mxnet");

    let operations: Vec<_> = batch.calls().iter().map(BatchCall::operation).collect();
    assert_eq!(
        operations,
        vec![
            "create_compute_environment",
            "describe_compute_environment",
            "create_job_queue",
            "describe_job_queue",
            "register_job_definition",
        ]
    );

    let out = output(provisioner);
    assert!(out.contains("Successfully created compute environment gpu\n"));
    assert!(out.contains("Successfully created job queue gpu_queue\n"));
    assert!(out.contains("Created job definition mxnet\n"));
    assert!(out.ends_with(
        "Successfully created batch entities (compute environment, job queue, job definition)\n"
    ));
}

#[tokio::test(start_paused = true)]
async fn compute_environment_request_scales_from_one_to_two_units() {
    let batch = ScriptedBatch::new();
    let mut provisioner = Provisioner::new(batch.clone(), PollOptions::default(), Vec::<u8>::new());
    provisioner.provision(&plan("gpu")).await.unwrap();

    let Some(BatchCall::CreateComputeEnvironment(req)) = batch.calls().into_iter().next() else {
        panic!("compute environment was not created first");
    };
    assert_eq!(req.vcpus.min, 4);
    assert_eq!(req.vcpus.desired, 4);
    assert_eq!(req.vcpus.max, 8);
    assert_eq!(req.instance_types, vec!["p2.xlarge".to_string()]);
    assert_eq!(req.key_pair.as_deref(), Some("ops"));
}

#[tokio::test(start_paused = true)]
async fn job_queue_is_bound_to_the_environment() {
    let batch = ScriptedBatch::new();
    let mut provisioner = Provisioner::new(batch.clone(), PollOptions::default(), Vec::<u8>::new());
    provisioner.provision(&plan("training")).await.unwrap();

    let req = batch
        .calls()
        .into_iter()
        .find_map(|c| match c {
            BatchCall::CreateJobQueue(req) => Some(req),
            _ => None,
        })
        .unwrap();
    assert_eq!(req.name, "training_queue");
    assert_eq!(req.priority, 0);
    assert_eq!(
        req.compute_environments,
        vec![ComputeEnvironmentOrder {
            order: 0,
            compute_environment: "training".into(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn waits_for_compute_environment_to_become_valid() {
    let batch = ScriptedBatch::new().with_environment_statuses(
        "gpu",
        [
            ResourceStatus::Creating,
            ResourceStatus::Creating,
            ResourceStatus::Valid,
        ],
    );
    let mut provisioner = Provisioner::new(batch.clone(), PollOptions::default(), Vec::<u8>::new());
    let start = tokio::time::Instant::now();

    provisioner.provision(&plan("gpu")).await.unwrap();

    assert_eq!(batch.count("describe_compute_environment"), 3);
    assert_eq!(batch.count("create_job_queue"), 1);
    assert_eq!(start.elapsed(), std::time::Duration::from_secs(2));

    let out = output(provisioner);
    assert!(out.starts_with(
        "\rCreating compute environment... -\rCreating compute environment... /"
    ));
}

#[tokio::test(start_paused = true)]
async fn invalid_compute_environment_aborts_with_reason() {
    let batch = ScriptedBatch::new().with_environment_states(
        "gpu",
        [
            ResourceState {
                status: ResourceStatus::Creating,
                reason: None,
            },
            ResourceState {
                status: ResourceStatus::Invalid,
                reason: Some("CLIENT_ERROR - bad subnet".into()),
            },
        ],
    );
    let mut provisioner = Provisioner::new(batch.clone(), PollOptions::default(), Vec::<u8>::new());

    let err = provisioner.provision(&plan("gpu")).await.unwrap_err();

    assert!(matches!(
        err,
        BatchError::Invalid {
            kind: ResourceKind::ComputeEnvironment,
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "Failed to create compute environment: CLIENT_ERROR - bad subnet"
    );

    let operations: Vec<_> = batch.calls().iter().map(BatchCall::operation).collect();
    assert_eq!(
        operations,
        vec![
            "create_compute_environment",
            "describe_compute_environment",
            "describe_compute_environment",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_job_queue_leaves_environment_in_place() {
    let batch = ScriptedBatch::new().with_queue_states(
        "gpu_queue",
        [ResourceState {
            status: ResourceStatus::Invalid,
            reason: Some("CLIENT_ERROR - compute environment not enabled".into()),
        }],
    );
    let mut provisioner = Provisioner::new(batch.clone(), PollOptions::default(), Vec::<u8>::new());

    let err = provisioner.provision(&plan("gpu")).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to create job queue: CLIENT_ERROR - compute environment not enabled"
    );
    assert_eq!(batch.count("register_job_definition"), 0);
    // No cleanup calls exist on the trait; the environment was created exactly once.
    assert_eq!(batch.count("create_compute_environment"), 1);
}

#[tokio::test(start_paused = true)]
async fn api_errors_propagate_without_retry() {
    let batch = ScriptedBatch::new().with_failure("create_job_queue", "AccessDeniedException");
    let mut provisioner = Provisioner::new(batch.clone(), PollOptions::default(), Vec::<u8>::new());

    let err = provisioner.provision(&plan("gpu")).await.unwrap_err();

    assert!(matches!(err, BatchError::Api(ref msg) if msg == "AccessDeniedException"));
    assert_eq!(batch.count("create_job_queue"), 1);
    assert_eq!(batch.count("describe_job_queue"), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_environment_is_not_found() {
    let batch = ScriptedBatch::new().with_environment_states("gpu", []);
    let mut provisioner = Provisioner::new(batch, PollOptions::default(), Vec::<u8>::new());

    let err = provisioner.provision(&plan("gpu")).await.unwrap_err();
    assert!(matches!(err, BatchError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn stuck_environment_times_out() {
    let batch = ScriptedBatch::new().with_environment_statuses("gpu", [ResourceStatus::Creating]);
    let poll = PollOptions::default().with_timeout(Some(std::time::Duration::from_secs(10)));
    let mut provisioner = Provisioner::new(batch.clone(), poll, Vec::<u8>::new());

    let err = provisioner.provision(&plan("gpu")).await.unwrap_err();

    assert!(matches!(err, BatchError::TimedOut { .. }));
    assert_eq!(batch.count("describe_compute_environment"), 11);
    assert_eq!(batch.count("create_job_queue"), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_a_describe_that_never_answers() {
    let token = tokio_util::sync::CancellationToken::new();
    let batch = ScriptedBatch::new().with_stall("describe_compute_environment");
    let poll = PollOptions::default().with_cancellation(token.clone());
    let mut provisioner = Provisioner::new(batch.clone(), poll, Vec::<u8>::new());
    let start = tokio::time::Instant::now();

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        token.cancel();
    });
    let err = provisioner.provision(&plan("gpu")).await.unwrap_err();

    assert!(matches!(err, BatchError::Cancelled(ref what) if what == "compute environment gpu"));
    assert_eq!(start.elapsed(), std::time::Duration::from_millis(500));
    assert_eq!(batch.count("describe_compute_environment"), 1);
    assert_eq!(batch.count("create_job_queue"), 0);
}
