use super::*;
use crate::registry::test_agent::StaticAgent;

#[test]
fn test_registry_new() {
    let registry = AgentRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_register() {
    let registry = AgentRegistry::new();
    registry.register(Arc::new(StaticAgent::new("writer"))).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.contains("writer"));
}

#[test]
fn test_register_duplicate() {
    let registry = AgentRegistry::new();
    registry.register(Arc::new(StaticAgent::new("writer"))).unwrap();

    let result = registry.register(Arc::new(StaticAgent::new("writer")));
    assert!(matches!(result, Err(RegistryError::AlreadyRegistered(id)) if id == "writer"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_get() {
    let registry = AgentRegistry::new();
    registry.register(Arc::new(StaticAgent::new("critic"))).unwrap();

    assert_eq!(registry.get("critic").unwrap().id(), "critic");
    assert!(registry.get("nobody").is_none());
}

#[test]
fn test_list_preserves_registration_order() {
    let registry = AgentRegistry::new();
    for id in ["director", "writer", "editor", "critic", "reader"] {
        registry.register(Arc::new(StaticAgent::new(id))).unwrap();
    }
    let agents = registry.list();
    let ids: Vec<&str> = agents.iter().map(|a| a.id()).collect();
    assert_eq!(ids, vec!["director", "writer", "editor", "critic", "reader"]);
}
