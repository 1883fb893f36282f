//! `storyloom templates` and `storyloom agents`.

use storyloom_workflow::{AgentSummary, WorkflowTemplate};

pub(crate) fn print_templates(templates: &[WorkflowTemplate]) {
    for template in templates {
        println!("{}", template.name);
        println!("  {}", template.description);

        let params: Vec<String> = template
            .params
            .iter()
            .map(|p| {
                let marker = if p.required { "*" } else { "" };
                format!("{}{}:{}", p.name, marker, p.kind)
            })
            .collect();
        println!("  params: {}", params.join(", "));

        let chain: Vec<String> = template
            .steps
            .iter()
            .map(|s| format!("{}({})", s.agent_id, s.task_type))
            .collect();
        println!("  chain:  {}", chain.join(" -> "));
    }
}

pub(crate) fn print_agents(agents: &[AgentSummary]) {
    for agent in agents {
        println!(
            "{:<16} {:<8} v{}  {}",
            agent.status.agent_id,
            agent.status.status.to_string(),
            agent.version,
            agent.description
        );
        for capability in &agent.capabilities {
            println!("    - {}: {}", capability.name, capability.description);
        }
    }
}
