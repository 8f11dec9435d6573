mod args;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use jobctl_client::{ClientConfig, HttpJobClient, JobClient};
use jobctl_core::{ControllerConfig, ControllerError, JobController, Subscribe};
use jobctl_model::{ConflictDecision, ControllerSnapshot, ControllerState, JobPayload, RunOptions};
use jobctl_observe::{Journal, LoggerConfig, logger_init};
use jobctl_prometheus::PrometheusMetrics;

use crate::args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // 1) Logger
    let cfg = LoggerConfig::default()
        .with_format(args.log_format)
        .with_level(args.log_level.clone());
    logger_init(&cfg)?;

    // 2) Job payload
    let payload = load_payload(&args.config)?;
    let options = RunOptions::default()
        .with_verbose(args.verbose)
        .with_delay_ms(args.delay_ms)
        .with_force(!args.no_force);

    // 3) Backend client
    let client = HttpJobClient::new(
        ClientConfig::new(args.base_url.clone()).with_request_timeout_ms(args.request_timeout_ms),
    )?;
    info!("backend: {}", args.base_url);

    // 4) Controller
    let metrics = PrometheusMetrics::new()?;
    let subscribers: Vec<Arc<dyn Subscribe>> =
        vec![Arc::new(Journal::new()), Arc::new(metrics.clone())];
    let controller = JobController::builder(Arc::new(client))
        .with_config(ControllerConfig::default().with_poll_interval_ms(args.poll_interval_ms))
        .with_subscribers(subscribers)
        .build()?;

    // 5) Submit, resolving a conflict if the backend slot is taken
    let mut changes = controller.subscribe_state();
    let mut interrupted = interruptible(
        &controller,
        controller.start(payload, options),
        tokio::signal::ctrl_c(),
    )
    .await?;
    if !interrupted && controller.state() == ControllerState::AwaitingConflictDecision {
        warn!(
            "another job is running; resolving with {}",
            args.on_conflict.as_str()
        );
        let decision = controller.resolve_conflict(args.on_conflict);
        interrupted = interruptible(&controller, decision, tokio::signal::ctrl_c()).await?;
        if args.on_conflict == ConflictDecision::Abort {
            info!("left the running job alone; nothing submitted");
            return Ok(ExitCode::from(2));
        }
    }

    // 6) Follow the job
    let snapshot = follow(&controller, &mut changes, interrupted).await?;

    if args.metrics {
        print!("{}", metrics.render()?);
    }
    Ok(report(&snapshot))
}

fn load_payload(path: &Path) -> anyhow::Result<JobPayload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
    Ok(JobPayload::new(document))
}

/// Drive `op` to completion. If `interrupt` fires first, cancel the job and let `op` wind down.
///
/// Returns `true` if the job was cancelled.
async fn interruptible<C, F, I>(
    controller: &JobController<C>,
    op: F,
    interrupt: I,
) -> anyhow::Result<bool>
where
    C: JobClient,
    F: Future<Output = Result<(), ControllerError>>,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(op);
    tokio::select! {
        result = &mut op => {
            result?;
            Ok(false)
        }
        signal = interrupt => {
            signal?;
            info!("interrupted; cancelling the job");
            controller.cancel().await?;
            op.await?;
            Ok(true)
        }
    }
}

/// Print log lines as they arrive until the job reaches a terminal state. Ctrl+C cancels it.
async fn follow<C: JobClient>(
    controller: &JobController<C>,
    changes: &mut watch::Receiver<ControllerSnapshot>,
    mut interrupted: bool,
) -> anyhow::Result<ControllerSnapshot> {
    let mut printed = 0;

    loop {
        let snapshot = changes.borrow_and_update().clone();
        if snapshot.logs.len() < printed {
            printed = 0;
        }
        for line in &snapshot.logs[printed..] {
            println!("{line}");
        }
        printed = snapshot.logs.len();

        if snapshot.state.is_terminal() || snapshot.state == ControllerState::Idle {
            return Ok(snapshot);
        }

        tokio::select! {
            changed = changes.changed() => changed.context("controller dropped")?,
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                signal?;
                interrupted = true;
                info!("interrupted; cancelling the job");
                controller.cancel().await?;
            }
        }
    }
}

fn report(snapshot: &ControllerSnapshot) -> ExitCode {
    if let Some(warning) = &snapshot.warning {
        warn!("{}", warning);
    }
    match snapshot.state {
        ControllerState::Completed => {
            match &snapshot.result_ref {
                Some(result) => info!("job completed; result: {}", result),
                None => info!("job completed without a result"),
            }
            ExitCode::SUCCESS
        }
        ControllerState::Cancelled => {
            info!("job cancelled");
            ExitCode::from(130)
        }
        _ => {
            let detail = snapshot.error.as_deref().unwrap_or("unknown error");
            eprintln!("job failed: {detail}");
            ExitCode::FAILURE
        }
    }
}
