use super::*;

use std::time::Duration;

use serde_json::json;

use storyloom_agent_roles::{Role, SimulatedGenerator, StoryAgent};
use storyloom_config::QueueConfig;
use storyloom_protocols::agent::AgentStatus;
use storyloom_protocols::task::TaskStatus;

fn engine() -> WorkflowEngine {
    let events = EventBus::default();
    let registry = Arc::new(AgentRegistry::new());
    let queue = TaskQueue::new(registry.clone(), events.clone(), QueueConfig::default());
    WorkflowEngine::new(registry, events, queue)
}

fn agent(role: Role) -> Arc<dyn Agent> {
    Arc::new(StoryAgent::new(
        role,
        Arc::new(SimulatedGenerator::new(Duration::from_millis(1))),
    ))
}

async fn with_chapter_agents() -> WorkflowEngine {
    let engine = engine();
    for role in [Role::Director, Role::Writer, Role::Editor] {
        engine.register_agent(agent(role)).await.unwrap();
    }
    engine
}

fn chapter_params() -> Parameters {
    let mut params = Parameters::new();
    params.insert("chapterNumber".to_string(), json!(1));
    params.insert("outline".to_string(), json!("X"));
    params
}

#[tokio::test]
async fn test_register_duplicate_agent() {
    let engine = engine();
    engine.register_agent(agent(Role::Writer)).await.unwrap();
    let err = engine.register_agent(agent(Role::Writer)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateAgent(id) if id == "writer"));
}

#[tokio::test]
async fn test_unknown_template_checked_first() {
    let engine = engine();
    let err = engine
        .create_predefined_workflow("NotATemplate", Parameters::new())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownTemplate(name) if name == "NotATemplate"));
}

#[tokio::test]
async fn test_parameters_checked_before_agents() {
    let engine = engine();
    let err = engine
        .create_predefined_workflow("ChapterCreation", Parameters::new())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidParameters { .. }));

    let err = engine
        .create_predefined_workflow("ChapterCreation", chapter_params())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AgentNotRegistered(id) if id == "director"));
}

#[tokio::test]
async fn test_created_workflow_is_recorded() {
    let engine = with_chapter_agents().await;
    let wf = engine
        .create_predefined_workflow("ChapterCreation", chapter_params())
        .unwrap();

    let stored = engine.workflow(&wf.id).unwrap();
    assert_eq!(stored.status, WorkflowStatus::Created);
    assert_eq!(engine.workflows().len(), 1);
    assert!(engine.workflow("missing").is_none());
}

#[tokio::test]
async fn test_execute_publishes_rollups_and_updates_history() {
    let engine = with_chapter_agents().await;
    let mut rx = engine.subscribe();
    let mut wf = engine
        .create_predefined_workflow("ChapterCreation", chapter_params())
        .unwrap();

    let result = engine.execute_workflow(&mut wf).await.unwrap();
    assert!(result.is_success);
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.outputs.len(), 3);
    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert!((wf.progress - 100.0).abs() < 0.001);
    assert!(wf.tasks.iter().all(|t| t.status == TaskStatus::Completed));

    let mut rollups = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let OrchestrationEvent::WorkflowStatusChanged(w) = event {
            rollups.push(*w);
        }
    }
    assert_eq!(rollups.first().unwrap().status, WorkflowStatus::Running);
    assert_eq!(rollups.last().unwrap().status, WorkflowStatus::Completed);
    assert!(
        rollups
            .windows(2)
            .all(|pair| pair[0].progress <= pair[1].progress + 0.001)
    );

    assert_eq!(engine.workflow(&wf.id).unwrap().status, WorkflowStatus::Completed);
    assert_eq!(engine.queue_status().completed, 3);
}

#[tokio::test]
async fn test_second_execution_rejected() {
    let engine = with_chapter_agents().await;
    let mut wf = engine
        .create_predefined_workflow("ChapterCreation", chapter_params())
        .unwrap();
    engine.execute_workflow(&mut wf).await.unwrap();

    let err = engine.execute_workflow(&mut wf).await.unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyExecuted(id) if id == wf.id));
    assert_eq!(wf.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn test_cancel_before_execution() {
    let engine = with_chapter_agents().await;
    let mut wf = engine
        .create_predefined_workflow("ChapterCreation", chapter_params())
        .unwrap();

    assert_eq!(engine.cancel_workflow(&wf.id).await.unwrap(), 0);
    let mut rx = engine.subscribe();
    let result = engine.execute_workflow(&mut wf).await.unwrap();
    assert_eq!(result.status, WorkflowStatus::Cancelled);
    assert!(result.is_success);
    assert_eq!(result.cancelled_task_ids.len(), 3);
    assert!(wf.tasks.iter().all(|t| t.status == TaskStatus::Cancelled));

    let mut cancelled_events = 0;
    while let Ok(event) = rx.try_recv() {
        if let OrchestrationEvent::TaskStatusChanged(task) = event {
            assert_ne!(task.status, TaskStatus::Running, "task {} reached an agent", task.name);
            cancelled_events += 1;
        }
    }
    assert_eq!(cancelled_events, 3);
    assert_eq!(engine.queue_status().total(), 0);
    assert_eq!(engine.workflow(&wf.id).unwrap().status, WorkflowStatus::Cancelled);
}

#[tokio::test]
async fn test_cancelled_workflows_never_reach_agents() {
    let engine = with_chapter_agents().await;
    let mut rx = engine.subscribe();
    for _ in 0..20 {
        let mut wf = engine
            .create_predefined_workflow("ChapterCreation", chapter_params())
            .unwrap();
        engine.cancel_workflow(&wf.id).await.unwrap();
        engine.execute_workflow(&mut wf).await.unwrap();
    }

    while let Ok(event) = rx.try_recv() {
        if let OrchestrationEvent::TaskStatusChanged(task) = event {
            assert_ne!(task.status, TaskStatus::Running);
        }
    }
    for agent in engine.agents().await {
        assert_eq!(agent.status.status, AgentStatus::Idle);
    }
}

#[tokio::test]
async fn test_cancel_unknown_or_finished_workflow() {
    let engine = with_chapter_agents().await;
    let err = engine.cancel_workflow("nope").await.unwrap_err();
    assert!(matches!(err, WorkflowError::WorkflowNotFound(_)));

    let mut wf = engine
        .create_predefined_workflow("ChapterCreation", chapter_params())
        .unwrap();
    engine.execute_workflow(&mut wf).await.unwrap();
    assert_eq!(engine.cancel_workflow(&wf.id).await.unwrap(), 0);
    assert_eq!(engine.workflow(&wf.id).unwrap().status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn test_agents_listing_and_reset() {
    let engine = with_chapter_agents().await;
    let agents = engine.agents().await;
    let ids: Vec<&str> = agents.iter().map(|a| a.status.agent_id.as_str()).collect();
    assert_eq!(ids, vec!["director", "writer", "editor"]);
    assert_eq!(agents[1].capabilities, Role::Writer.capabilities());

    engine.reset_agent("writer").await.unwrap();
    let err = engine.reset_agent("critic").await.unwrap_err();
    assert!(matches!(err, WorkflowError::AgentNotRegistered(_)));
}

#[tokio::test]
async fn test_agent_events_reach_bus() {
    let engine = with_chapter_agents().await;
    let mut rx = engine.subscribe();
    let mut wf = engine
        .create_predefined_workflow("ChapterCreation", chapter_params())
        .unwrap();
    engine.execute_workflow(&mut wf).await.unwrap();

    // Forwarders run on their own tasks; give them a moment to drain.
    let mut completed = 0;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while completed < 3 && tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
            Ok(Ok(OrchestrationEvent::AgentTaskCompleted(result))) => {
                assert!(result.is_success);
                completed += 1;
            }
            Ok(Ok(_)) => {}
            _ => break,
        }
    }
    assert_eq!(completed, 3);
}

#[tokio::test]
async fn test_template_catalogue_exposed() {
    let engine = engine();
    let names: Vec<&str> = engine.templates().iter().map(|t| t.name).collect();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&"ConsistencyCheck"));
}
