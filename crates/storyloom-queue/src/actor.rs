//! The queue actor: sole owner of task state.
//!
//! Callers talk to it over [`Command`]s; spawned agent executions report
//! back over an internal completion channel. Every status transition goes
//! through [`QueueActor::emit`], which refreshes the status snapshot before
//! publishing the event.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use storyloom_config::QueueConfig;
use storyloom_core::{AgentRegistry, EventBus};
use storyloom_protocols::agent::{
    Agent, AgentStatus, AgentTaskResult, ProgressReporter, TaskContext, UpstreamOutput,
};
use storyloom_protocols::error::AgentError;
use storyloom_protocols::event::OrchestrationEvent;
use storyloom_protocols::task::{TaskStatus, WorkflowTask};

use crate::UPSTREAM_FAILURE;
use crate::error::QueueError;
use crate::handle::TaskHandle;
use crate::status::TaskQueueStatus;

const CANCELLED: &str = "cancelled";

pub(crate) enum Command {
    Enqueue {
        task: WorkflowTask,
        reply: oneshot::Sender<Result<TaskHandle, QueueError>>,
    },
    Cancel {
        task_id: String,
        reply: oneshot::Sender<Result<(), QueueError>>,
    },
    CancelWorkflow {
        workflow_id: String,
        reply: oneshot::Sender<usize>,
    },
    Pause {
        task_id: String,
        reply: oneshot::Sender<Result<(), QueueError>>,
    },
    Resume {
        task_id: String,
        reply: oneshot::Sender<Result<(), QueueError>>,
    },
    Clear {
        reply: oneshot::Sender<usize>,
    },
    Get {
        task_id: String,
        reply: oneshot::Sender<Option<WorkflowTask>>,
    },
    List {
        workflow_id: String,
        reply: oneshot::Sender<Vec<WorkflowTask>>,
    },
}

/// Messages from spawned executions.
enum Completion {
    Progress {
        task_id: String,
        run_id: u64,
        progress: u8,
    },
    Finished {
        task_id: String,
        agent_id: String,
        run_id: u64,
        outcome: Result<AgentTaskResult, AgentError>,
    },
}

enum Wakeup {
    Command(Command),
    Completion(Completion),
    Tick,
}

/// One dispatch of a task to its agent.
struct Run {
    id: u64,
    token: CancellationToken,
    started: Instant,
}

struct Entry {
    task: WorkflowTask,
    watch: watch::Sender<WorkflowTask>,
    run: Option<Run>,
    cancel_requested: bool,
}

enum Readiness {
    Ready,
    Blocked,
    /// A predecessor will never complete.
    Doomed,
}

pub(crate) struct QueueActor {
    registry: Arc<AgentRegistry>,
    events: EventBus,
    config: QueueConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    status: watch::Sender<TaskQueueStatus>,
    /// Task IDs in enqueue order.
    order: Vec<String>,
    entries: HashMap<String, Entry>,
    /// Agent ID -> run ID of the execution occupying it.
    busy: HashMap<String, u64>,
    /// Timed-out runs whose agent is reset once the execution yields.
    timed_out: HashMap<u64, String>,
    next_run: u64,
}

impl QueueActor {
    pub(crate) fn new(
        registry: Arc<AgentRegistry>,
        events: EventBus,
        config: QueueConfig,
        commands: mpsc::UnboundedReceiver<Command>,
        status: watch::Sender<TaskQueueStatus>,
    ) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        Self {
            registry,
            events,
            config,
            commands,
            completions_tx,
            completions,
            status,
            order: Vec::new(),
            entries: HashMap::new(),
            busy: HashMap::new(),
            timed_out: HashMap::new(),
            next_run: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut tick = tokio::time::interval(self.config.dispatch_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("Task queue started");

        loop {
            let wakeup = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => Wakeup::Command(command),
                    None => break,
                },
                Some(completion) = self.completions.recv() => Wakeup::Completion(completion),
                _ = tick.tick() => Wakeup::Tick,
            };

            match wakeup {
                Wakeup::Command(command) => self.handle_command(command),
                Wakeup::Completion(completion) => self.handle_completion(completion).await,
                Wakeup::Tick => self.expire_overdue(),
            }
            self.dispatch().await;
        }

        self.shutdown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Enqueue { task, reply } => {
                let _ = reply.send(self.enqueue(task));
            }
            Command::Cancel { task_id, reply } => {
                let _ = reply.send(self.cancel(&task_id));
            }
            Command::CancelWorkflow { workflow_id, reply } => {
                let _ = reply.send(self.cancel_workflow(&workflow_id));
            }
            Command::Pause { task_id, reply } => {
                let result = self.move_between(&task_id, TaskStatus::Pending, TaskStatus::Paused);
                let _ = reply.send(result);
            }
            Command::Resume { task_id, reply } => {
                let result = self.move_between(&task_id, TaskStatus::Paused, TaskStatus::Pending);
                let _ = reply.send(result);
            }
            Command::Clear { reply } => {
                let _ = reply.send(self.clear());
            }
            Command::Get { task_id, reply } => {
                let _ = reply.send(self.entries.get(&task_id).map(|e| e.task.clone()));
            }
            Command::List { workflow_id, reply } => {
                let tasks = self
                    .order
                    .iter()
                    .filter_map(|id| self.entries.get(id))
                    .filter(|e| e.task.workflow_id == workflow_id)
                    .map(|e| e.task.clone())
                    .collect();
                let _ = reply.send(tasks);
            }
        }
    }

    fn enqueue(&mut self, mut task: WorkflowTask) -> Result<TaskHandle, QueueError> {
        if self.entries.contains_key(&task.id) {
            return Err(QueueError::DuplicateTask(task.id));
        }

        task.progress = 0;
        task.output = None;
        task.error = None;
        task.transition(TaskStatus::Pending);

        let id = task.id.clone();
        let (watch, rx) = watch::channel(task.clone());
        debug!("Task {} enqueued for agent {}", id, task.target_agent_id);
        self.order.push(id.clone());
        self.entries.insert(
            id.clone(),
            Entry {
                task,
                watch,
                run: None,
                cancel_requested: false,
            },
        );
        self.emit(&id);
        Ok(TaskHandle::new(rx))
    }

    fn cancel(&mut self, task_id: &str) -> Result<(), QueueError> {
        let Some(entry) = self.entries.get_mut(task_id) else {
            return Err(QueueError::TaskNotFound(task_id.to_string()));
        };

        let status = entry.task.status;
        match status {
            TaskStatus::Running => {
                if !entry.cancel_requested {
                    entry.cancel_requested = true;
                    if let Some(run) = &entry.run {
                        run.token.cancel();
                    }
                    debug!("Cancellation requested for running task {}", task_id);
                }
            }
            TaskStatus::Pending | TaskStatus::Paused => {
                self.finish(task_id, TaskStatus::Cancelled, None, Some(CANCELLED.to_string()));
            }
            _ => {}
        }
        Ok(())
    }

    fn cancel_workflow(&mut self, workflow_id: &str) -> usize {
        let targets: Vec<String> = self
            .order
            .iter()
            .filter(|id| {
                self.entries.get(*id).is_some_and(|e| {
                    e.task.workflow_id == workflow_id && !e.task.is_terminal()
                })
            })
            .cloned()
            .collect();

        for id in &targets {
            let _ = self.cancel(id);
        }
        if !targets.is_empty() {
            info!("Cancelled {} tasks of workflow {}", targets.len(), workflow_id);
        }
        targets.len()
    }

    fn move_between(
        &mut self,
        task_id: &str,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<(), QueueError> {
        let Some(entry) = self.entries.get_mut(task_id) else {
            return Err(QueueError::TaskNotFound(task_id.to_string()));
        };
        if entry.task.status != from {
            return Err(QueueError::InvalidState {
                task_id: task_id.to_string(),
                status: entry.task.status,
                expected: from,
            });
        }
        entry.task.transition(to);
        debug!("Task {} moved {} -> {}", task_id, from, to);
        self.emit(task_id);
        Ok(())
    }

    fn clear(&mut self) -> usize {
        let removed = self.order.len();

        for id in std::mem::take(&mut self.order) {
            let Some(mut entry) = self.entries.remove(&id) else {
                continue;
            };
            if entry.task.is_terminal() {
                continue;
            }
            if let Some(run) = entry.run.take() {
                run.token.cancel();
            }
            entry.task.error = Some(CANCELLED.to_string());
            entry.task.transition(TaskStatus::Cancelled);
            entry.watch.send_replace(entry.task.clone());
            self.events
                .publish(OrchestrationEvent::TaskStatusChanged(entry.task));
        }

        self.entries.clear();
        self.publish_status();
        info!("Task queue cleared, {} tasks removed", removed);
        removed
    }

    async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Progress {
                task_id,
                run_id,
                progress,
            } => {
                let Some(entry) = self.entries.get_mut(&task_id) else {
                    return;
                };
                let current = entry.run.as_ref().map(|r| r.id);
                if current != Some(run_id) || entry.task.progress == progress {
                    return;
                }
                entry.task.progress = progress;
                self.emit(&task_id);
            }
            Completion::Finished {
                task_id,
                agent_id,
                run_id,
                outcome,
            } => self.handle_finished(task_id, agent_id, run_id, outcome).await,
        }
    }

    async fn handle_finished(
        &mut self,
        task_id: String,
        agent_id: String,
        run_id: u64,
        outcome: Result<AgentTaskResult, AgentError>,
    ) {
        // The agent stays claimed until its reset is done.
        if let Some(timed_out) = self.timed_out.remove(&run_id) {
            self.reset_agent(&timed_out).await;
        }
        if self.busy.get(&agent_id) == Some(&run_id) {
            self.busy.remove(&agent_id);
        }

        let Some(entry) = self.entries.get(&task_id) else {
            debug!("Dropping completion of removed task {}", task_id);
            return;
        };
        if entry.run.as_ref().map(|r| r.id) != Some(run_id) {
            debug!("Dropping stale completion of task {}", task_id);
            return;
        }

        if entry.cancel_requested {
            debug!("Task {} cancelled, discarding its output", task_id);
            self.finish(&task_id, TaskStatus::Cancelled, None, Some(CANCELLED.to_string()));
            return;
        }

        match outcome {
            Ok(result) if result.is_success => {
                debug!("Task {} completed in {:?}", task_id, result.execution_time);
                self.finish(&task_id, TaskStatus::Completed, result.payload, None);
            }
            Ok(result) => {
                let reason = result
                    .error
                    .unwrap_or_else(|| "agent reported failure".to_string());
                warn!("Task {} failed: {}", task_id, reason);
                self.finish(&task_id, TaskStatus::Failed, None, Some(reason));
            }
            Err(AgentError::Busy { .. }) => {
                warn!("Agent {} was busy, task {} returns to pending", agent_id, task_id);
                if let Some(entry) = self.entries.get_mut(&task_id) {
                    entry.run = None;
                    entry.task.progress = 0;
                    entry.task.transition(TaskStatus::Pending);
                }
                self.emit(&task_id);
            }
            Err(err) if err.is_cancelled() => {
                self.finish(&task_id, TaskStatus::Cancelled, None, Some(err.to_string()));
            }
            Err(err) => {
                warn!("Task {} failed: {}", task_id, err);
                self.finish(&task_id, TaskStatus::Failed, None, Some(err.to_string()));
            }
        }
    }

    /// Fail Running tasks that exceeded the configured timeout.
    fn expire_overdue(&mut self) {
        let Some(limit) = self.config.task_timeout() else {
            return;
        };

        let overdue: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.run.as_ref().is_some_and(|r| r.started.elapsed() >= limit))
            .map(|(id, _)| id.clone())
            .collect();

        for id in overdue {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            let Some(run) = entry.run.take() else {
                continue;
            };
            run.token.cancel();
            let agent_id = entry.task.target_agent_id.clone();
            warn!("Task {} on agent {} timed out after {:?}", id, agent_id, limit);
            self.timed_out.insert(run.id, agent_id);
            self.finish(
                &id,
                TaskStatus::Failed,
                None,
                Some(format!("timed out after {}s", limit.as_secs())),
            );
        }
    }

    /// Start every runnable task, repeating while a pass changes anything.
    async fn dispatch(&mut self) {
        loop {
            let mut changed = false;
            let pending: Vec<String> = self
                .order
                .iter()
                .filter(|id| {
                    self.entries
                        .get(*id)
                        .is_some_and(|e| e.task.status == TaskStatus::Pending)
                })
                .cloned()
                .collect();

            for task_id in pending {
                let Some(entry) = self.entries.get(&task_id) else {
                    continue;
                };
                if entry.task.status != TaskStatus::Pending {
                    continue;
                }
                let agent_id = entry.task.target_agent_id.clone();

                match self.readiness(&task_id) {
                    Readiness::Blocked => continue,
                    Readiness::Doomed => {
                        debug!("Task {} cancelled: {}", task_id, UPSTREAM_FAILURE);
                        self.finish(
                            &task_id,
                            TaskStatus::Cancelled,
                            None,
                            Some(UPSTREAM_FAILURE.to_string()),
                        );
                        changed = true;
                        continue;
                    }
                    Readiness::Ready => {}
                }

                if self.busy.contains_key(&agent_id) || self.at_capacity() {
                    continue;
                }

                let Some(agent) = self.registry.get(&agent_id) else {
                    warn!("Task {} targets unregistered agent {}", task_id, agent_id);
                    self.finish(
                        &task_id,
                        TaskStatus::Failed,
                        None,
                        Some(format!("agent {} is not registered", agent_id)),
                    );
                    changed = true;
                    continue;
                };

                let info = agent.status().await;
                if !info.status.is_available() {
                    warn!("Task {} targets agent {} in state {}", task_id, agent_id, info.status);
                    self.finish(
                        &task_id,
                        TaskStatus::Failed,
                        None,
                        Some(format!("agent {} is {}", agent_id, info.status)),
                    );
                    changed = true;
                    continue;
                }
                if info.status != AgentStatus::Idle {
                    continue;
                }

                self.start(&task_id, agent);
                changed = true;
            }

            if !changed {
                break;
            }
        }
    }

    fn readiness(&self, task_id: &str) -> Readiness {
        let Some(entry) = self.entries.get(task_id) else {
            return Readiness::Blocked;
        };

        let mut readiness = Readiness::Ready;
        for dep in &entry.task.depends_on {
            match self.entries.get(dep).map(|e| e.task.status) {
                None | Some(TaskStatus::Failed) | Some(TaskStatus::Cancelled) => {
                    return Readiness::Doomed;
                }
                Some(TaskStatus::Completed) => {}
                Some(_) => readiness = Readiness::Blocked,
            }
        }
        readiness
    }

    /// Executions still in flight count, even after their task timed out
    /// or was cleared.
    fn at_capacity(&self) -> bool {
        self.config
            .max_concurrent_tasks
            .is_some_and(|max| self.busy.len() >= max)
    }

    fn upstream_outputs(&self, task_id: &str) -> Vec<UpstreamOutput> {
        let Some(entry) = self.entries.get(task_id) else {
            return Vec::new();
        };
        entry
            .task
            .depends_on
            .iter()
            .filter_map(|dep| self.entries.get(dep))
            .filter_map(|dep| {
                dep.task.output.clone().map(|payload| UpstreamOutput {
                    task_id: dep.task.id.clone(),
                    task_type: dep.task.task_type.clone(),
                    agent_id: dep.task.target_agent_id.clone(),
                    payload,
                })
            })
            .collect()
    }

    fn start(&mut self, task_id: &str, agent: Arc<dyn Agent>) {
        let upstream = self.upstream_outputs(task_id);
        let run_id = self.next_run;
        self.next_run += 1;
        let token = CancellationToken::new();

        let Some(entry) = self.entries.get_mut(task_id) else {
            return;
        };
        entry.task.progress = 0;
        entry.task.transition(TaskStatus::Running);
        entry.run = Some(Run {
            id: run_id,
            token: token.clone(),
            started: Instant::now(),
        });
        let task = entry.task.clone();
        self.busy.insert(task.target_agent_id.clone(), run_id);
        debug!("Task {} dispatched to agent {}", task.id, task.target_agent_id);
        self.emit(task_id);

        let progress_tx = self.completions_tx.clone();
        let progress_id = task.id.clone();
        let progress = ProgressReporter::new(move |progress| {
            let _ = progress_tx.send(Completion::Progress {
                task_id: progress_id.clone(),
                run_id,
                progress,
            });
        });
        let ctx = TaskContext::new(token)
            .with_progress(progress)
            .with_upstream(upstream);

        let done = self.completions_tx.clone();
        let span = info_span!(
            "task",
            task_id = %task.id,
            agent_id = %task.target_agent_id,
            task_type = %task.task_type
        );
        tokio::spawn(
            async move {
                let outcome = agent.execute(&task, ctx).await;
                let _ = done.send(Completion::Finished {
                    task_id: task.id,
                    agent_id: task.target_agent_id,
                    run_id,
                    outcome,
                });
            }
            .instrument(span),
        );
    }

    async fn reset_agent(&self, agent_id: &str) {
        let Some(agent) = self.registry.get(agent_id) else {
            return;
        };
        match agent.reset().await {
            Ok(()) => debug!("Agent {} reset after timeout", agent_id),
            Err(err) => warn!("Failed to reset agent {}: {}", agent_id, err),
        }
    }

    fn finish(
        &mut self,
        task_id: &str,
        status: TaskStatus,
        output: Option<serde_json::Value>,
        error: Option<String>,
    ) {
        let Some(entry) = self.entries.get_mut(task_id) else {
            return;
        };
        entry.run = None;
        entry.task.output = output;
        entry.task.error = error;
        entry.task.transition(status);
        self.emit(task_id);
    }

    /// Refresh the snapshot, then notify the task's watchers and the bus.
    fn emit(&self, task_id: &str) {
        self.publish_status();
        if let Some(entry) = self.entries.get(task_id) {
            entry.watch.send_replace(entry.task.clone());
            self.events
                .publish(OrchestrationEvent::TaskStatusChanged(entry.task.clone()));
        }
    }

    fn publish_status(&self) {
        let snapshot = TaskQueueStatus::from_tasks(self.entries.values().map(|e| &e.task));
        self.status.send_replace(snapshot);
    }

    fn shutdown(&mut self) {
        for entry in self.entries.values() {
            if let Some(run) = &entry.run {
                run.token.cancel();
            }
        }
        debug!("Task queue stopped");
    }
}
