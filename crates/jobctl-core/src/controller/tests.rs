use std::sync::Arc;
use std::time::Duration;

use jobctl_model::{
    ActiveJobCheck, ConflictDecision, ControllerState, JobEventKind, JobId, JobPayload, RunOptions,
};
use tokio::time::{Instant, sleep};

use super::*;
use crate::testing::{
    Call, RecordingSubscriber, ScriptedClient, Step, active_error, cancel_error, complete,
    errored, running, submit_error,
};

fn payload() -> JobPayload {
    JobPayload::new(serde_json::json!({ "targets": ["http"], "plugins": ["harmful"] }))
}

fn controller(
    client: &Arc<ScriptedClient>,
) -> (JobController<ScriptedClient>, Arc<RecordingSubscriber>) {
    let events = Arc::new(RecordingSubscriber::default());
    let controller = JobController::builder(Arc::clone(client))
        .with_subscriber(events.clone())
        .build()
        .unwrap();
    (controller, events)
}

fn busy(result: Result<(), ControllerError>, expected: ControllerState) {
    match result {
        Err(ControllerError::Busy { state, .. }) => assert_eq!(state, expected),
        other => panic!("expected busy error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn completes_with_result_ref() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(running(&["a"])));
    client.push_status(Step::Status(complete(&["a", "b"], Some("eval-7"))));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    assert_eq!(ctl.state(), ControllerState::Polling);

    sleep(Duration::from_millis(2500)).await;

    assert_eq!(ctl.state(), ControllerState::Completed);
    assert_eq!(ctl.result_ref().as_deref(), Some("eval-7"));
    assert_eq!(ctl.logs(), vec!["a", "b"]);
    assert_eq!(client.fetches(), 2);
    assert_eq!(
        events.kinds(),
        vec![
            JobEventKind::StartRequested,
            JobEventKind::Submitted,
            JobEventKind::Completed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn complete_without_result_is_not_a_failure() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(complete(&["done"], None)));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;

    let snap = ctl.snapshot();
    assert_eq!(snap.state, ControllerState::Completed);
    assert!(snap.result_ref.is_none());
    assert!(snap.error.is_none());
    assert!(snap.warning.is_some());
    assert!(snap.finished_without_result());
    assert_eq!(events.kinds().last(), Some(&JobEventKind::CompletedWithoutResult));
}

#[tokio::test(start_paused = true)]
async fn error_status_fails_and_keeps_logs() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(running(&["a"])));
    client.push_status(Step::Status(errored(&["a", "boom"])));
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(5000)).await;

    assert_eq!(ctl.state(), ControllerState::Failed);
    assert_eq!(ctl.logs(), vec!["a", "boom"]);
    assert!(ctl.error_detail().is_some());
    assert_eq!(client.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn poll_errors_do_not_end_the_run() {
    let client = ScriptedClient::new();
    for _ in 0..3 {
        client.push_status(Step::Fail);
    }
    client.push_status(Step::Status(complete(&["ok"], Some("eval-1"))));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_secs(30)).await;

    assert_eq!(ctl.state(), ControllerState::Completed);
    assert_eq!(ctl.result_ref().as_deref(), Some("eval-1"));
    let failures: Vec<_> = events
        .events()
        .into_iter()
        .filter(|e| e.kind == JobEventKind::PollFailed)
        .filter_map(|e| e.attempt)
        .collect();
    assert_eq!(failures, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn cancel_while_polling_ends_cancelled_even_if_backend_fails() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(running(&["a"])));
    client.push_cancel(Err(cancel_error()));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(client.fetches(), 1);

    ctl.cancel().await.unwrap();

    let snap = ctl.snapshot();
    assert_eq!(snap.state, ControllerState::Cancelled);
    assert!(snap.warning.is_some());
    assert_eq!(snap.logs, vec!["a"]);
    assert!(events.kinds().contains(&JobEventKind::CancelFailed));
    assert_eq!(
        client.calls().last(),
        Some(&Call::Cancel(Some(JobId::from("job-1"))))
    );

    sleep(Duration::from_secs(10)).await;
    assert_eq!(client.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_finishes_within_one_tick_when_backend_hangs() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(running(&["a"])));
    client.set_cancel_delay(Duration::from_secs(8));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;

    let asked = Instant::now();
    ctl.cancel().await.unwrap();
    assert!(asked.elapsed() <= ctl.config().poll_interval());

    let snap = ctl.snapshot();
    assert_eq!(snap.state, ControllerState::Cancelled);
    assert!(snap.warning.unwrap().contains("unanswered"));
    assert!(events.kinds().contains(&JobEventKind::CancelFailed));
    assert_eq!(events.kinds().last(), Some(&JobEventKind::Cancelled));

    sleep(Duration::from_secs(10)).await;
    assert_eq!(client.cancels(), 1);
    assert_eq!(client.fetches(), 1);
    assert_eq!(ctl.state(), ControllerState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn cancel_aborts_a_hung_status_request() {
    let client = ScriptedClient::new();
    client.push_status(Step::Hang);
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(1200)).await;

    ctl.cancel().await.unwrap();
    assert_eq!(ctl.state(), ControllerState::Cancelled);
    assert!(ctl.snapshot().warning.is_none());
}

#[tokio::test(start_paused = true)]
async fn second_cancel_is_a_no_op() {
    let client = ScriptedClient::new();
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    ctl.cancel().await.unwrap();
    ctl.cancel().await.unwrap();

    assert_eq!(ctl.state(), ControllerState::Cancelled);
    assert_eq!(client.cancels(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_without_a_job_is_rejected() {
    let client = ScriptedClient::new();
    let (ctl, _) = controller(&client);

    busy(ctl.cancel().await, ControllerState::Idle);
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_is_rejected_while_awaiting_decision() {
    let client = ScriptedClient::new();
    client.push_active(Ok(ActiveJobCheck::running(Some(JobId::from("other")))));
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    busy(ctl.cancel().await, ControllerState::AwaitingConflictDecision);

    assert_eq!(ctl.state(), ControllerState::AwaitingConflictDecision);
    assert_eq!(client.calls(), vec![Call::CheckActive]);
}

#[tokio::test(start_paused = true)]
async fn cancel_is_rejected_after_completion() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(complete(&["x"], Some("eval-1"))));
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(ctl.state(), ControllerState::Completed);

    busy(ctl.cancel().await, ControllerState::Completed);
    assert_eq!(client.cancels(), 0);
    assert_eq!(ctl.result_ref().as_deref(), Some("eval-1"));
}

#[tokio::test(start_paused = true)]
async fn restart_clears_previous_logs() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(complete(&["old-1", "old-2"], Some("eval-1"))));
    client.push_status(Step::Status(running(&["new"])));
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(ctl.state(), ControllerState::Completed);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    let snap = ctl.snapshot();
    assert_eq!(snap.state, ControllerState::Polling);
    assert!(snap.logs.is_empty());
    assert!(snap.result_ref.is_none());

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(ctl.logs(), vec!["new"]);
}

#[tokio::test(start_paused = true)]
async fn start_while_busy_makes_no_calls() {
    let client = ScriptedClient::new();
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    let before = client.calls().len();

    busy(
        ctl.start(payload(), RunOptions::default()).await,
        ControllerState::Polling,
    );
    assert_eq!(client.calls().len(), before);
    assert_eq!(ctl.state(), ControllerState::Polling);
    busy(ctl.reset(), ControllerState::Polling);
}

#[tokio::test(start_paused = true)]
async fn start_while_awaiting_decision_is_rejected() {
    let client = ScriptedClient::new();
    client.push_active(Ok(ActiveJobCheck::running(Some(JobId::from("other")))));
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    assert_eq!(ctl.state(), ControllerState::AwaitingConflictDecision);

    busy(
        ctl.start(payload(), RunOptions::default()).await,
        ControllerState::AwaitingConflictDecision,
    );
    assert_eq!(client.calls(), vec![Call::CheckActive]);
}

#[tokio::test(start_paused = true)]
async fn cancel_and_run_cancels_once_then_submits_after_settling() {
    let client = ScriptedClient::new();
    client.push_active(Ok(ActiveJobCheck::running(Some(JobId::from("other")))));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default().with_verbose(true))
        .await
        .unwrap();
    assert_eq!(ctl.state(), ControllerState::AwaitingConflictDecision);
    assert_eq!(client.submits(), 0);

    ctl.resolve_conflict(ConflictDecision::CancelAndRun)
        .await
        .unwrap();

    assert_eq!(ctl.state(), ControllerState::Polling);
    assert_eq!(client.cancels(), 1);
    assert_eq!(client.submits(), 1);

    let calls = client.calls_at();
    let (cancelled_at, cancel) = &calls[1];
    let (submitted_at, submit) = &calls[2];
    assert_eq!(cancel, &Call::Cancel(Some(JobId::from("other"))));
    assert!(matches!(submit, Call::Submit(opts) if opts.verbose));
    assert_eq!(
        submitted_at.duration_since(*cancelled_at),
        Duration::from_millis(500)
    );
    assert_eq!(
        events.kinds(),
        vec![
            JobEventKind::StartRequested,
            JobEventKind::ConflictDetected,
            JobEventKind::ExistingJobCancelled,
            JobEventKind::Submitted
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_and_run_submits_even_if_cancel_fails() {
    let client = ScriptedClient::new();
    client.push_active(Ok(ActiveJobCheck::running(None)));
    client.push_cancel(Err(cancel_error()));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    ctl.resolve_conflict(ConflictDecision::CancelAndRun)
        .await
        .unwrap();

    assert_eq!(ctl.state(), ControllerState::Polling);
    assert_eq!(client.submits(), 1);
    assert!(events.kinds().contains(&JobEventKind::CancelFailed));
}

#[tokio::test(start_paused = true)]
async fn cancel_during_settle_delay_skips_submission() {
    let client = ScriptedClient::new();
    client.push_active(Ok(ActiveJobCheck::running(Some(JobId::from("other")))));
    let (ctl, _) = controller(&client);
    let ctl = Arc::new(ctl);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    let resolving = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.resolve_conflict(ConflictDecision::CancelAndRun).await }
    });
    sleep(Duration::from_millis(100)).await;
    assert_eq!(ctl.state(), ControllerState::Submitting);

    ctl.cancel().await.unwrap();
    assert_eq!(ctl.state(), ControllerState::Cancelled);

    resolving.await.unwrap().unwrap();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(ctl.state(), ControllerState::Cancelled);
    assert_eq!(client.submits(), 0);
    assert_eq!(client.fetches(), 0);
    assert_eq!(
        client.calls(),
        vec![
            Call::CheckActive,
            Call::Cancel(Some(JobId::from("other"))),
            Call::Cancel(None),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn second_decision_is_rejected_while_the_first_runs() {
    let client = ScriptedClient::new();
    client.push_active(Ok(ActiveJobCheck::running(Some(JobId::from("other")))));
    let (ctl, _) = controller(&client);
    let ctl = Arc::new(ctl);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    let first = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.resolve_conflict(ConflictDecision::CancelAndRun).await }
    });
    sleep(Duration::from_millis(100)).await;

    busy(
        ctl.resolve_conflict(ConflictDecision::CancelAndRun).await,
        ControllerState::Submitting,
    );
    busy(
        ctl.resolve_conflict(ConflictDecision::Abort).await,
        ControllerState::Submitting,
    );

    first.await.unwrap().unwrap();
    assert_eq!(ctl.state(), ControllerState::Polling);
    assert_eq!(client.cancels(), 1);
    assert_eq!(client.submits(), 1);
}

#[tokio::test(start_paused = true)]
async fn abort_returns_to_idle_without_calls() {
    let client = ScriptedClient::new();
    client.push_active(Ok(ActiveJobCheck::running(Some(JobId::from("other")))));
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    ctl.resolve_conflict(ConflictDecision::Abort).await.unwrap();

    assert_eq!(ctl.state(), ControllerState::Idle);
    assert_eq!(client.calls(), vec![Call::CheckActive]);

    busy(
        ctl.resolve_conflict(ConflictDecision::Abort).await,
        ControllerState::Idle,
    );
}

#[tokio::test(start_paused = true)]
async fn failed_active_check_proceeds_with_submission() {
    let client = ScriptedClient::new();
    client.push_active(Err(active_error()));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();

    assert_eq!(ctl.state(), ControllerState::Polling);
    assert!(events.kinds().contains(&JobEventKind::ActiveCheckFailed));
}

#[tokio::test(start_paused = true)]
async fn submit_failure_fails_and_allows_restart() {
    let client = ScriptedClient::new();
    client.push_submit(Err(submit_error()));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();

    let snap = ctl.snapshot();
    assert_eq!(snap.state, ControllerState::Failed);
    assert!(snap.error.unwrap().contains("invalid config"));
    assert_eq!(client.submits(), 1);
    assert_eq!(events.kinds().last(), Some(&JobEventKind::SubmitFailed));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(client.submits(), 1);
    assert_eq!(client.fetches(), 0);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    assert_eq!(ctl.state(), ControllerState::Polling);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_submission_cancels_the_accepted_job() {
    let client = ScriptedClient::new();
    client.set_submit_delay(Duration::from_secs(2));
    let (ctl, _) = controller(&client);
    let ctl = Arc::new(ctl);

    let starting = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.start(payload(), RunOptions::default()).await }
    });
    sleep(Duration::from_millis(100)).await;
    assert_eq!(ctl.state(), ControllerState::Submitting);

    ctl.cancel().await.unwrap();
    assert_eq!(ctl.state(), ControllerState::Cancelled);

    starting.await.unwrap().unwrap();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(ctl.state(), ControllerState::Cancelled);
    assert_eq!(client.fetches(), 0);
    assert_eq!(
        client.calls(),
        vec![
            Call::CheckActive,
            Call::Submit(RunOptions::default()),
            Call::Cancel(None),
            Call::Cancel(Some(JobId::from("job-1"))),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_the_controller_stops_polling() {
    let client = ScriptedClient::new();
    let (ctl, _) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(client.fetches(), 1);

    drop(ctl);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(client.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_after_completion_returns_to_idle() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(complete(&["x"], Some("eval-1"))));
    let (ctl, events) = controller(&client);

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;

    ctl.reset().unwrap();
    assert_eq!(ctl.snapshot(), ControllerSnapshot::default());
    assert_eq!(events.kinds().last(), Some(&JobEventKind::Reset));
}

#[tokio::test(start_paused = true)]
async fn state_watchers_observe_transitions() {
    let client = ScriptedClient::new();
    client.push_status(Step::Status(complete(&[], Some("eval-1"))));
    let (ctl, _) = controller(&client);
    let mut rx = ctl.subscribe_state();

    ctl.start(payload(), RunOptions::default()).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().state, ControllerState::Polling);

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().state, ControllerState::Completed);
}

#[test]
fn builder_rejects_invalid_config() {
    let client = ScriptedClient::new();
    let result = JobController::new(client, ControllerConfig::default().with_poll_interval_ms(0));
    assert!(matches!(result, Err(ControllerError::InvalidConfig(_))));
}
