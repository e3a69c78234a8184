use gpu_batch::prelude::*;
use gpu_batch_mock::{BatchCall, ScriptedBatch, ScriptedLogs};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const STREAM: &str = "train/job-1/default/0123456789abcdef";

fn event(timestamp: i64, message: &str) -> LogEvent {
    LogEvent {
        timestamp,
        message: message.to_string(),
    }
}

fn job() -> JobSubmission {
    JobSubmission::new("train", "gpu_queue", "mxnet", "python train.py --gpus 0")
}

fn output(submitter: Submitter<ScriptedBatch, ScriptedLogs, Vec<u8>>) -> String {
    String::from_utf8(submitter.into_output()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn submit_without_wait_only_prints_the_job_id() {
    let batch = ScriptedBatch::new();
    let mut submitter = Submitter::new(
        batch.clone(),
        ScriptedLogs::new(),
        PollOptions::default(),
        Vec::<u8>::new(),
    );

    let (submitted, status) = submitter.run(&job(), false).await.unwrap();

    assert_eq!(submitted.id, "job-1");
    assert_eq!(status, None);
    assert_eq!(batch.count("describe_job"), 0);
    assert_eq!(
        batch.calls(),
        vec![BatchCall::SubmitJob(JobSubmission {
            name: "train".into(),
            queue: "gpu_queue".into(),
            definition: "mxnet".into(),
            command: vec![
                "python".into(),
                "train.py".into(),
                "--gpus".into(),
                "0".into()
            ],
        })]
    );
    assert_eq!(
        output(submitter),
        "Submitted job [train - job-1] to the job queue [gpu_queue]\n"
    );
}

#[tokio::test(start_paused = true)]
async fn follows_job_through_its_lifecycle() {
    let batch = ScriptedBatch::new().with_job_statuses(
        "job-1",
        [
            JobStatus::Submitted,
            JobStatus::Runnable,
            JobStatus::Starting,
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Succeeded,
        ],
    );
    let logs = ScriptedLogs::new().with_stream(
        STREAM,
        vec![event(1_000, "epoch 1"), event(2_000, "epoch 2")],
    );
    let mut submitter = Submitter::new(
        batch.clone(),
        logs.clone(),
        PollOptions::default(),
        Vec::<u8>::new(),
    );
    let start = tokio::time::Instant::now();

    let (_, status) = submitter.run(&job(), true).await.unwrap();

    assert_eq!(status, Some(JobStatus::Succeeded));
    assert_eq!(batch.count("describe_job"), 6);
    assert_eq!(start.elapsed(), Duration::from_secs(6));
    assert_eq!(
        logs.lookups(),
        vec![("/aws/batch/job".to_string(), "train/job-1".to_string())]
    );

    let banner = "=".repeat(80);
    let expected = format!(
        "Submitted job [train - job-1] to the job queue [gpu_queue]\n\
         \rJob [train - job-1] is SUBMITTED... -\
         \rJob [train - job-1] is RUNNABLE ... /\
         \rJob [train - job-1] is STARTING ... |\
         \rJob [train - job-1] is RUNNING.\n\
         Output [{STREAM}]:\n {banner}\n\
         [1970-01-01T00:00:01.000Z] epoch 1\n\
         [1970-01-01T00:00:02.000Z] epoch 2\n\
         {banner}\n\
         Job [train - job-1] SUCCEEDED\n"
    );
    let out = output(submitter);
    assert_eq!(out, expected);
    assert_eq!(out.matches("is RUNNING.").count(), 1);
}

#[tokio::test(start_paused = true)]
async fn running_without_stream_prints_nothing_until_it_appears() {
    let batch = ScriptedBatch::new().with_job_statuses(
        "job-1",
        [
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Succeeded,
        ],
    );
    let logs = ScriptedLogs::new().with_stream_after(STREAM, 2, vec![event(5_000, "ready")]);
    let mut submitter = Submitter::new(
        batch,
        logs.clone(),
        PollOptions::default(),
        Vec::<u8>::new(),
    );

    submitter.run(&job(), true).await.unwrap();

    assert_eq!(logs.lookups().len(), 3);
    assert_eq!(logs.queries().iter().filter(|q| q.next_token.is_none()).count(), 2);

    let out = output(submitter);
    let (before, after) = out.split_once("is RUNNING.").unwrap();
    assert_eq!(
        before,
        "Submitted job [train - job-1] to the job queue [gpu_queue]\n\rJob [train - job-1] "
    );
    assert!(after.contains("[1970-01-01T00:00:05.000Z] ready\n"));
}

#[tokio::test(start_paused = true)]
async fn failed_job_ends_with_failed_banner() {
    let batch =
        ScriptedBatch::new().with_job_statuses("job-1", [JobStatus::Runnable, JobStatus::Failed]);
    let mut submitter = Submitter::new(
        batch.clone(),
        ScriptedLogs::new(),
        PollOptions::default(),
        Vec::<u8>::new(),
    );

    let (_, status) = submitter.run(&job(), true).await.unwrap();

    assert_eq!(status, Some(JobStatus::Failed));
    assert_eq!(batch.count("describe_job"), 2);
    assert!(output(submitter).ends_with(&format!(
        "{}\nJob [train - job-1] FAILED\n",
        "=".repeat(80)
    )));
}

#[tokio::test(start_paused = true)]
async fn logs_written_after_last_running_poll_are_flushed() {
    let batch = ScriptedBatch::new()
        .with_job_statuses("job-1", [JobStatus::Running, JobStatus::Succeeded]);
    let logs = ScriptedLogs::new().with_stream(STREAM, vec![event(1_000, "start")]);
    let mut submitter = Submitter::new(
        batch.clone(),
        logs.clone(),
        PollOptions::default(),
        Vec::<u8>::new(),
    );

    let submitted = submitter.submit(&job()).await.unwrap();
    // Arrives between the RUNNING poll and the terminal poll.
    let late = logs.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        late.push_events(STREAM, [event(3_000, "done")]);
    });
    submitter.wait(&submitted).await.unwrap();

    let out = output(submitter);
    let done = out.find("] done").unwrap();
    let finished = out.find("SUCCEEDED").unwrap();
    assert!(done < finished);
    assert_eq!(out.matches("] start").count(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_wait_stops_polling() {
    let token = CancellationToken::new();
    let batch = ScriptedBatch::new().with_job_statuses("job-1", [JobStatus::Runnable]);
    let poll = PollOptions::default().with_cancellation(token.clone());
    let mut submitter = Submitter::new(batch.clone(), ScriptedLogs::new(), poll, Vec::<u8>::new());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        token.cancel();
    });
    let err = submitter.run(&job(), true).await.unwrap_err();

    assert!(matches!(err, BatchError::Cancelled(_)));
    assert_eq!(batch.count("describe_job"), 3);
}

#[tokio::test(start_paused = true)]
async fn unknown_job_is_not_found() {
    let mut submitter = Submitter::new(
        ScriptedBatch::new(),
        ScriptedLogs::new(),
        PollOptions::default(),
        Vec::<u8>::new(),
    );

    let err = submitter.run(&job(), true).await.unwrap_err();
    assert!(matches!(err, BatchError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn log_group_can_be_overridden() {
    let batch = ScriptedBatch::new().with_job_statuses("job-1", [JobStatus::Running]);
    let logs = ScriptedLogs::new();
    let poll = PollOptions::default().with_timeout(Some(Duration::from_secs(2)));
    let mut submitter = Submitter::new(batch, logs.clone(), poll, Vec::<u8>::new())
        .with_log_group("/custom/jobs");

    let err = submitter.run(&job(), true).await.unwrap_err();

    assert!(matches!(err, BatchError::TimedOut { .. }));
    let lookups = logs.lookups();
    assert!(!lookups.is_empty());
    assert!(
        lookups
            .iter()
            .all(|(group, prefix)| group == "/custom/jobs" && prefix == "train/job-1")
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_a_stream_lookup_that_never_answers() {
    let token = CancellationToken::new();
    let batch = ScriptedBatch::new().with_job_statuses("job-1", [JobStatus::Running]);
    let logs = ScriptedLogs::new()
        .with_stream(STREAM, Vec::new())
        .with_stall("find_log_stream");
    let poll = PollOptions::default().with_cancellation(token.clone());
    let mut submitter = Submitter::new(batch.clone(), logs.clone(), poll, Vec::<u8>::new());
    let start = tokio::time::Instant::now();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        token.cancel();
    });
    let err = submitter.run(&job(), true).await.unwrap_err();

    assert!(matches!(err, BatchError::Cancelled(_)));
    assert_eq!(start.elapsed(), Duration::from_millis(1_500));
    assert_eq!(batch.count("describe_job"), 1);
    assert_eq!(logs.lookups().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_a_log_fetch_that_never_answers() {
    let token = CancellationToken::new();
    let batch = ScriptedBatch::new().with_job_statuses("job-1", [JobStatus::Running]);
    let logs = ScriptedLogs::new()
        .with_stream(STREAM, Vec::new())
        .with_stall("get_log_events");
    let poll = PollOptions::default().with_cancellation(token.clone());
    let mut submitter = Submitter::new(batch, logs.clone(), poll, Vec::<u8>::new());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        token.cancel();
    });
    let err = submitter.run(&job(), true).await.unwrap_err();

    assert!(matches!(err, BatchError::Cancelled(_)));
    assert_eq!(logs.queries().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_a_submit_that_never_answers() {
    let token = CancellationToken::new();
    let batch = ScriptedBatch::new().with_stall("submit_job");
    let poll = PollOptions::default().with_cancellation(token.clone());
    let mut submitter = Submitter::new(batch, ScriptedLogs::new(), poll, Vec::<u8>::new());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });
    let err = submitter.run(&job(), false).await.unwrap_err();

    assert!(matches!(err, BatchError::Cancelled(ref what) if what == "job train"));
    assert!(submitter.into_output().is_empty());
}
