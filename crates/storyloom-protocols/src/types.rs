//! Common utility types.

use std::collections::HashMap;

/// Template parameters supplied by the caller, e.g. `{chapterNumber: 1}`.
pub type Parameters = HashMap<String, serde_json::Value>;

/// Free-form agent settings handed to [`Agent::initialize`](crate::Agent::initialize).
pub type AgentSettings = HashMap<String, serde_json::Value>;
