//! Agent roles.

use serde::{Deserialize, Serialize};

use storyloom_protocols::agent::{Capability, UpstreamOutput};
use storyloom_protocols::task::WorkflowTask;

/// The fixed roster of story-writing roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Director,
    Writer,
    Editor,
    Critic,
    Researcher,
    Summarizer,
    Reader,
    SettingManager,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Director,
        Role::Writer,
        Role::Editor,
        Role::Critic,
        Role::Researcher,
        Role::Summarizer,
        Role::Reader,
        Role::SettingManager,
    ];

    /// Agent ID used when the role is registered with its default identity.
    pub fn id(self) -> &'static str {
        match self {
            Role::Director => "director",
            Role::Writer => "writer",
            Role::Editor => "editor",
            Role::Critic => "critic",
            Role::Researcher => "researcher",
            Role::Summarizer => "summarizer",
            Role::Reader => "reader",
            Role::SettingManager => "setting-manager",
        }
    }

    pub fn from_id(id: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.id() == id)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Director => "Director",
            Role::Writer => "Writer",
            Role::Editor => "Editor",
            Role::Critic => "Critic",
            Role::Researcher => "Researcher",
            Role::Summarizer => "Summarizer",
            Role::Reader => "Reader",
            Role::SettingManager => "Setting Manager",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Director => "Plans story arcs and breaks chapters into scenes",
            Role::Writer => "Drafts chapter prose from a plan",
            Role::Editor => "Polishes drafts for style, pacing and clarity",
            Role::Critic => "Reviews content and points out weaknesses",
            Role::Researcher => "Gathers background material and checks facts",
            Role::Summarizer => "Condenses content into concise summaries",
            Role::Reader => "Reacts to content the way a first reader would",
            Role::SettingManager => "Keeps the world bible and setting rules consistent",
        }
    }

    /// Ordered capability list.
    pub fn capabilities(self) -> Vec<Capability> {
        let caps: &[(&str, &str)] = match self {
            Role::Director => &[
                ("plan_project", "Sketch the overall arc of a new project"),
                ("plan_chapter", "Break a chapter outline into scenes"),
            ],
            Role::Writer => &[
                ("draft_chapter", "Write chapter prose from a scene plan"),
                ("continue_scene", "Continue an existing scene"),
            ],
            Role::Editor => &[
                ("edit_chapter", "Line-edit a draft"),
                ("revise", "Apply review feedback to content"),
            ],
            Role::Critic => &[
                ("critique", "Assess strengths and weaknesses"),
                ("consistency_review", "Flag contradictions with established canon"),
            ],
            Role::Researcher => &[
                ("research", "Collect background material for a premise"),
                ("fact_check", "Verify claims against the setting and real-world facts"),
            ],
            Role::Summarizer => &[("summarize", "Condense content into a short summary")],
            Role::Reader => &[("read", "Give a first-reader reaction")],
            Role::SettingManager => &[
                ("build_setting", "Establish the world bible for a project"),
                ("check_setting", "Check content against the world bible"),
            ],
        };
        caps.iter()
            .map(|(name, description)| Capability::new(*name, *description))
            .collect()
    }

    /// Default system prompt for the role.
    pub fn system_prompt(self) -> String {
        format!(
            "You are the {} of a novel-writing team. {}.",
            self.display_name().to_lowercase(),
            self.description()
        )
    }

    /// Assemble the generation prompt for a task.
    pub fn build_prompt(self, task: &WorkflowTask, upstream: &[UpstreamOutput]) -> String {
        let mut prompt = format!(
            "{}\n\nTask: {} ({})\n",
            self.instruction(&task.task_type),
            task.name,
            task.task_type
        );

        let mut keys: Vec<&String> = task.inputs.keys().collect();
        keys.sort();
        for key in keys {
            let value = &task.inputs[key];
            match value.as_str() {
                Some(text) => prompt.push_str(&format!("- {}: {}\n", key, text)),
                None => prompt.push_str(&format!("- {}: {}\n", key, value)),
            }
        }

        for output in upstream {
            let content = output
                .payload
                .get("content")
                .and_then(|c| c.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| output.payload.to_string());
            prompt.push_str(&format!(
                "\n[{} from {}]\n{}\n",
                output.task_type, output.agent_id, content
            ));
        }

        prompt
    }

    fn instruction(self, task_type: &str) -> &'static str {
        match (self, task_type) {
            (Role::Director, "plan_project") => "Outline the main arc, themes and key turning points.",
            (Role::Director, _) => "Turn the outline into an ordered list of scenes with goals.",
            (Role::Writer, _) => "Write the chapter prose following the scene plan.",
            (Role::Editor, "revise") => "Revise the content according to the review notes.",
            (Role::Editor, _) => "Edit the draft for style, pacing and clarity.",
            (Role::Critic, "consistency_review") => "List every contradiction with established canon.",
            (Role::Critic, _) => "Critique the content and rank the issues by severity.",
            (Role::Researcher, "fact_check") => "Check each claim against the setting notes.",
            (Role::Researcher, _) => "Collect background material the team will need.",
            (Role::Summarizer, _) => "Summarize the material in a few short paragraphs.",
            (Role::Reader, _) => "Describe your reaction as a first-time reader.",
            (Role::SettingManager, "check_setting") => "Extract the setting facts the content relies on.",
            (Role::SettingManager, _) => "Establish the world rules, places and factions.",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
