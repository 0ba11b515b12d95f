//! AI job controller.
//!
//! Executes the jobs the workflow hands out and emits completion events for
//! the UI thread. Calls are never cancelled; a job outliving a reset still
//! completes and the workflow drops its stale result.

use crate::ai::ResumeAi;
use crate::model::{AiJob, WorkflowEvent};
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Run(AiJob),
    Quit,
}

/// Execute a single job against the adapter.
pub(crate) async fn execute(ai: &ResumeAi, job: AiJob) -> WorkflowEvent {
    match job {
        AiJob::Extract(job) => {
            let result = ai
                .extract_entries(&job.resume_text, job.credential.expose())
                .await;
            WorkflowEvent::Extracted {
                ticket: job.ticket,
                result,
            }
        }
        AiJob::Generate(job) => {
            let result = ai
                .generate_final_resume(&job.resume_text, &job.entries, job.credential.expose())
                .await;
            WorkflowEvent::Generated {
                ticket: job.ticket,
                result,
            }
        }
    }
}

/// Run jobs from `cmd_rx` until quit and send each completion to `event_tx`.
pub(crate) async fn run_controller(
    ai: ResumeAi,
    event_tx: UnboundedSender<WorkflowEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut in_flight = FuturesUnordered::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Run(job)) => {
                        debug!(pending = in_flight.len() + 1, "dispatching AI job");
                        let ai = ai.clone();
                        in_flight.push(async move { execute(&ai, job).await });
                    }
                    // Quit abandons in-flight calls; nobody is left to apply them.
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(event) = in_flight.next(), if !in_flight.is_empty() => {
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}
