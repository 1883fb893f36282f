//! Builtin workflow templates.
//!
//! Every template is a linear chain: each step depends on the one before
//! it. Step names and inputs may reference template parameters through
//! `{{param}}` placeholders.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use storyloom_protocols::task::WorkflowTask;
use storyloom_protocols::types::Parameters;
use storyloom_protocols::workflow::WorkflowDefinition;

use crate::error::WorkflowError;

pub const PROJECT_INITIALIZATION: &str = "ProjectInitialization";
pub const CHAPTER_CREATION: &str = "ChapterCreation";
pub const CONTENT_REVIEW: &str = "ContentReview";
pub const CONSISTENCY_CHECK: &str = "ConsistencyCheck";

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").ok());

/// Accepted JSON shape of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
}

impl ParamKind {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::String => f.write_str("string"),
            ParamKind::Integer => f.write_str("integer"),
        }
    }
}

/// One declared template parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

/// One step of a template chain.
#[derive(Debug, Clone, Serialize)]
pub struct StepTemplate {
    pub name: &'static str,
    pub task_type: &'static str,
    pub agent_id: &'static str,
    /// Input key to value template.
    pub inputs: Vec<(&'static str, String)>,
    pub weight: f32,
}

impl StepTemplate {
    fn new(name: &'static str, agent_id: &'static str, task_type: &'static str) -> Self {
        Self {
            name,
            task_type,
            agent_id,
            inputs: Vec::new(),
            weight: 1.0,
        }
    }

    /// Pass parameters through unchanged under their own names.
    fn passing(mut self, params: &[&'static str]) -> Self {
        for &param in params {
            self.inputs.push((param, format!("{{{{{}}}}}", param)));
        }
        self
    }

    fn weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

/// A named recipe for building a workflow.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowTemplate {
    pub name: &'static str,
    pub description: &'static str,
    /// Workflow display name, rendered with the parameters.
    pub title: &'static str,
    pub params: Vec<ParamSpec>,
    pub steps: Vec<StepTemplate>,
}

impl WorkflowTemplate {
    /// Check required parameters are present and every declared parameter
    /// has the right shape. Undeclared parameters are ignored.
    pub fn validate(&self, params: &Parameters) -> Result<(), WorkflowError> {
        for spec in &self.params {
            match params.get(spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(self.invalid(format!("missing required parameter {}", spec.name)));
                }
                Some(value) if !value.is_null() && !spec.kind.accepts(value) => {
                    return Err(self.invalid(format!(
                        "parameter {} must be {}, got {}",
                        spec.name, spec.kind, value
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Agent IDs the chain needs, in step order without repeats.
    pub fn required_agents(&self) -> Vec<&'static str> {
        let mut agents: Vec<&'static str> = Vec::new();
        for step in &self.steps {
            if !agents.contains(&step.agent_id) {
                agents.push(step.agent_id);
            }
        }
        agents
    }

    /// Build a Created workflow. Parameters must already be validated.
    pub fn instantiate(&self, params: &Parameters) -> WorkflowDefinition {
        let mut workflow =
            WorkflowDefinition::new(render(self.title, params), self.name, params.clone());

        let mut previous: Option<String> = None;
        for step in &self.steps {
            let mut inputs = Parameters::new();
            for (key, template) in &step.inputs {
                if let Some(value) = render_value(template, params) {
                    inputs.insert(key.to_string(), value);
                }
            }

            let mut task = WorkflowTask::new(
                &workflow.id,
                render(step.name, params),
                step.task_type,
                step.agent_id,
            )
            .with_inputs(inputs)
            .with_weight(step.weight);
            if let Some(prev) = previous.take() {
                task = task.with_dependency(prev);
            }
            previous = Some(task.id.clone());
            workflow.push_task(task);
        }
        workflow
    }

    fn invalid(&self, message: String) -> WorkflowError {
        WorkflowError::InvalidParameters {
            template: self.name.to_string(),
            message,
        }
    }
}

/// The builtin catalogue.
pub fn builtin() -> Vec<WorkflowTemplate> {
    vec![
        project_initialization(),
        chapter_creation(),
        content_review(),
        consistency_check(),
    ]
}

/// Look up a builtin template by name.
fn project_initialization() -> WorkflowTemplate {
    let world = ["projectName", "genre", "premise"];
    WorkflowTemplate {
        name: PROJECT_INITIALIZATION,
        description: "Set up a new novel: world, plan, research and summary",
        title: "Initialize {{projectName}}",
        params: vec![
            ParamSpec::required("projectName", ParamKind::String, "Working title"),
            ParamSpec::optional("genre", ParamKind::String, "Genre"),
            ParamSpec::optional("premise", ParamKind::String, "One-paragraph premise"),
        ],
        steps: vec![
            StepTemplate::new("Build the world of {{projectName}}", "setting-manager", "build_setting")
                .passing(&world),
            StepTemplate::new("Plan {{projectName}}", "director", "plan_project").passing(&world),
            StepTemplate::new("Research background", "researcher", "research")
                .passing(&["genre", "premise"]),
            StepTemplate::new("Summarize the project plan", "summarizer", "summarize")
                .passing(&["projectName"]),
        ],
    }
}

fn chapter_creation() -> WorkflowTemplate {
    let chapter = ["chapterNumber", "outline"];
    WorkflowTemplate {
        name: CHAPTER_CREATION,
        description: "Plan, draft and edit one chapter",
        title: "Chapter {{chapterNumber}}",
        params: vec![
            ParamSpec::required("chapterNumber", ParamKind::Integer, "Chapter number"),
            ParamSpec::required("outline", ParamKind::String, "Chapter outline"),
        ],
        steps: vec![
            StepTemplate::new("Plan chapter {{chapterNumber}}", "director", "plan_chapter")
                .passing(&chapter),
            StepTemplate::new("Draft chapter {{chapterNumber}}", "writer", "draft_chapter")
                .passing(&chapter)
                .weight(2.0),
            StepTemplate::new("Edit chapter {{chapterNumber}}", "editor", "edit_chapter")
                .passing(&["chapterNumber"]),
        ],
    }
}

fn content_review() -> WorkflowTemplate {
    WorkflowTemplate {
        name: CONTENT_REVIEW,
        description: "Read, critique and revise a piece of content",
        title: "Content review",
        params: vec![
            ParamSpec::required("content", ParamKind::String, "Text to review"),
            ParamSpec::optional("chapterNumber", ParamKind::Integer, "Chapter the text belongs to"),
            ParamSpec::optional("focus", ParamKind::String, "What the review should focus on"),
        ],
        steps: vec![
            StepTemplate::new("Read the content", "reader", "read")
                .passing(&["content", "chapterNumber"]),
            StepTemplate::new("Critique the content", "critic", "critique")
                .passing(&["content", "focus"]),
            StepTemplate::new("Revise the content", "editor", "revise").passing(&["content", "focus"]),
        ],
    }
}

fn consistency_check() -> WorkflowTemplate {
    WorkflowTemplate {
        name: CONSISTENCY_CHECK,
        description: "Check content against the established setting",
        title: "Consistency check",
        params: vec![
            ParamSpec::required("content", ParamKind::String, "Text to check"),
            ParamSpec::optional("scope", ParamKind::String, "Part of the setting to check against"),
        ],
        steps: vec![
            StepTemplate::new("Collect setting facts", "setting-manager", "check_setting")
                .passing(&["content", "scope"]),
            StepTemplate::new("Fact check", "researcher", "fact_check").passing(&["content", "scope"]),
            StepTemplate::new("Review consistency", "critic", "consistency_review")
                .passing(&["content"]),
            StepTemplate::new("Summarize findings", "summarizer", "summarize").passing(&["scope"]),
        ],
    }
}

/// Substitute `{{param}}` placeholders. Missing parameters render empty.
pub fn render(template: &str, params: &Parameters) -> String {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return template.to_string();
    };
    re.replace_all(template, |caps: &regex::Captures| {
        params.get(&caps[1]).map(display_value).unwrap_or_default()
    })
    .into_owned()
}

/// Render an input value.
///
/// A template that is a single placeholder keeps the parameter's JSON type
/// and is dropped when the parameter is absent. Anything else renders to a
/// string.
pub fn render_value(template: &str, params: &Parameters) -> Option<Value> {
    let whole = PLACEHOLDER
        .as_ref()
        .and_then(|re| re.captures(template))
        .filter(|caps| caps.get(0).is_some_and(|m| m.as_str() == template))
        .map(|caps| caps[1].to_string());
    match whole {
        Some(name) => params.get(&name).filter(|v| !v.is_null()).cloned(),
        None => Some(Value::String(render(template, params))),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;
