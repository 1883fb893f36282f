use super::*;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.engine.event_capacity, 256);
    assert_eq!(config.queue.dispatch_interval(), Duration::from_millis(50));
    assert!(config.queue.max_concurrent_tasks.is_none());
    assert!(config.queue.task_timeout().is_none());
    assert_eq!(config.generator.default_model, "simulated");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file, "storyloom.log");
}

#[test]
fn test_dispatch_interval_never_zero() {
    let queue = QueueConfig {
        dispatch_interval_ms: 0,
        ..QueueConfig::default()
    };
    assert_eq!(queue.dispatch_interval(), Duration::from_millis(1));
}

#[test]
fn test_agent_entry_default_enabled() {
    let entry = AgentEntryConfig::default();
    assert!(entry.enabled);
    assert!(entry.settings.is_empty());
}

#[test]
fn test_agent_settings_lookup() {
    let mut config = Config::default();
    let mut entry = AgentEntryConfig::default();
    entry
        .settings
        .insert("temperature".to_string(), serde_json::json!(0.4));
    config.agents.insert("editor".to_string(), entry);

    assert_eq!(config.agent_settings("editor")["temperature"], 0.4);
    assert!(config.agent_settings("reader").is_empty());
}

#[test]
fn test_config_serialization_roundtrip() {
    let mut config = Config::default();
    config.queue.task_timeout_secs = Some(30);
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.queue, config.queue);
}
