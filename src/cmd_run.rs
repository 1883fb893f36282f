//! `storyloom run`: execute one template and stream its events.

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use storyloom_protocols::agent::AgentStatus;
use storyloom_protocols::event::OrchestrationEvent;
use storyloom_protocols::task::TaskStatus;
use storyloom_protocols::types::Parameters;
use storyloom_protocols::workflow::{WorkflowDefinition, WorkflowResult};
use storyloom_workflow::Orchestrator;

/// Run a template to completion. Returns whether the workflow succeeded.
pub(crate) async fn run_workflow(
    orchestrator: &Orchestrator,
    template: &str,
    params: Parameters,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let engine = orchestrator.engine();
    let mut workflow = engine.create_predefined_workflow(template, params)?;

    println!("Workflow {} ({})", workflow.name, workflow.id);
    let printer = tokio::spawn(print_events(orchestrator.subscribe(), workflow.id.clone()));

    let result = engine.execute_workflow(&mut workflow).await?;

    // The printer stops once the workflow settles; it only misses that after a lag.
    if tokio::time::timeout(Duration::from_secs(1), printer)
        .await
        .is_err()
    {
        debug!("Event printer did not see the workflow settle");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(result.is_success)
}

/// Single consumer of the event stream for one workflow.
async fn print_events(mut rx: broadcast::Receiver<OrchestrationEvent>, workflow_id: String) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event display fell behind, skipped {} events", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            OrchestrationEvent::TaskStatusChanged(task) if task.workflow_id == workflow_id => {
                let detail = match (task.status, task.error.as_deref()) {
                    (TaskStatus::Running, _) => format!("{}%", task.progress),
                    (_, Some(reason)) => reason.to_string(),
                    _ => String::new(),
                };
                println!(
                    "  [{:<9}] {} @{} {}",
                    task.status.to_string(),
                    task.name,
                    task.target_agent_id,
                    detail
                );
            }
            OrchestrationEvent::WorkflowStatusChanged(wf) if wf.id == workflow_id => {
                println!("{} {} {:.0}%", wf.name, wf.status, wf.progress);
                if is_settled(&wf) {
                    break;
                }
            }
            OrchestrationEvent::AgentStatusChanged(info)
                if matches!(info.status, AgentStatus::Error | AgentStatus::Offline) =>
            {
                println!("  agent {} is {}", info.agent_id, info.status);
            }
            _ => {}
        }
    }
}

/// A Failed roll-up lands before its dependents are cancelled; wait for those too.
fn is_settled(workflow: &WorkflowDefinition) -> bool {
    workflow.status.is_terminal() && workflow.all_tasks_terminal()
}

fn print_summary(result: &WorkflowResult) {
    println!(
        "Result: {} in {}ms ({} outputs, {} failed, {} cancelled)",
        result.status,
        result.duration_ms,
        result.outputs.len(),
        result.failed_task_ids.len(),
        result.cancelled_task_ids.len()
    );
    let mut outputs: Vec<_> = result.outputs.iter().collect();
    outputs.sort_by(|a, b| a.0.cmp(b.0));
    for (task_id, payload) in outputs {
        let content = payload
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        println!("  {}: {}", task_id, content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storyloom_protocols::task::WorkflowTask;

    fn workflow(statuses: &[TaskStatus]) -> WorkflowDefinition {
        let mut wf = WorkflowDefinition::new("Chapter 1", "ChapterCreation", Parameters::new());
        for (i, status) in statuses.iter().enumerate() {
            let mut task = WorkflowTask::new(&wf.id, format!("step-{i}"), "draft", "writer");
            task.transition(*status);
            wf.push_task(task);
        }
        wf.mark_started();
        wf.refresh();
        wf
    }

    #[test]
    fn test_failed_rollup_with_pending_dependent_is_not_settled() {
        let wf = workflow(&[TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Pending]);
        assert!(wf.status.is_terminal());
        assert!(!is_settled(&wf));
    }

    #[test]
    fn test_settled_once_every_task_is_terminal() {
        let wf = workflow(&[TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled]);
        assert!(is_settled(&wf));

        let wf = workflow(&[TaskStatus::Completed, TaskStatus::Running]);
        assert!(!is_settled(&wf));
    }
}
