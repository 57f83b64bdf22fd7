//! Agent-Card Projector (C2) — `project(&Agent) -> AgentCard`.
//!
//! Grounded on `original_source/.../a2agw/registry.py::ark_to_agent_card`:
//! same fixed capability set, same skill id generation, same default-skill
//! fallback, same externally-reachable URL assembly from the
//! `ARK_A2A_AGENT_CARD_*` environment variables. Expressed here with
//! [`crate::builders::AgentCardBuilder`] instead of a bare struct literal.

use serde::Deserialize;
use tracing::warn;

use crate::builders::AgentCardBuilder;
use crate::registry::Agent;
use crate::types::AgentCard;

/// Annotation key carrying an agent's list of skill names (used only to
/// decide whether the synthetic "General" fallback skill is needed).
const SKILL_NAMES_ANNOTATION: &str = "a2a.mckinsey.com/skill";

/// Annotation key carrying the structured list of skill records.
const SKILLS_ANNOTATION: &str = "a2a.mckinsey.com/skills";

#[derive(Debug, Deserialize)]
struct SkillAnnotation {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Components of the externally-reachable agent-card URL, read once from
/// the environment (SPEC_FULL §6).
#[derive(Debug, Clone)]
pub struct AgentCardUrlConfig {
    pub protocol: String,
    pub host: String,
    pub port: String,
    pub path: String,
}

impl AgentCardUrlConfig {
    pub fn from_env() -> Self {
        Self {
            protocol: std::env::var("ARK_A2A_AGENT_CARD_PROTOCOL").unwrap_or_else(|_| "http".into()),
            host: std::env::var("ARK_A2A_AGENT_CARD_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("ARK_A2A_AGENT_CARD_PORT")
                .or_else(|_| std::env::var("PORT"))
                .unwrap_or_else(|_| "8080".into()),
            path: std::env::var("ARK_A2A_AGENT_CARD_PATH").unwrap_or_default(),
        }
    }

    /// The externally reachable URL for one agent's per-agent mount point.
    pub fn external_url(&self, agent_name: &str) -> String {
        format!(
            "{}://{}:{}{}/a2a/agent/{}/",
            self.protocol, self.host, self.port, self.path, agent_name
        )
    }
}

/// Translate an Agent record into an A2A [`AgentCard`] (SPEC_FULL §4.2).
///
/// Pure given `url_config`: the same `(Agent, AgentCardUrlConfig)` pair
/// always projects to the same card. Malformed skill annotation entries are
/// dropped with a warning rather than failing the whole projection.
pub fn project(agent: &Agent, url_config: &AgentCardUrlConfig) -> AgentCard {
    let name = &agent.metadata.name;
    let description = agent
        .spec
        .description
        .clone()
        .unwrap_or_else(|| "No description".to_string());

    // This mirrors the Python projector verbatim: the fallback decision is
    // driven by `SKILL_NAMES_ANNOTATION`'s presence/length, independently of
    // whether `SKILLS_ANNOTATION`'s structured list happens to be empty too.
    // Open Question #2 (SPEC_FULL §9) — kept as specified, not reconciled.
    let skill_names_present = agent
        .metadata
        .annotations
        .get(SKILL_NAMES_ANNOTATION)
        .map(|v| !v.is_empty())
        .unwrap_or(false);

    let mut builder = AgentCardBuilder::new(name.clone(), description, "1.0.0")
        .with_streaming(true)
        .with_push_notifications(false)
        .with_input_modes(vec!["text".to_string()])
        .with_output_modes(vec!["text".to_string()]);

    if let Some(raw) = agent.metadata.annotations.get(SKILLS_ANNOTATION) {
        match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
            Ok(entries) => {
                for (idx, entry) in entries.into_iter().enumerate() {
                    match serde_json::from_value::<SkillAnnotation>(entry.clone()) {
                        Ok(skill) => {
                            let id = skill
                                .id
                                .unwrap_or_else(|| format!("{name}-skill-{idx}"));
                            builder = builder.with_skill(
                                id,
                                skill.name,
                                skill.description.unwrap_or_default(),
                                skill.tags,
                            );
                        }
                        Err(_) => {
                            warn!(agent = %name, entry = %entry, "unable to recover skill from annotation");
                        }
                    }
                }
            }
            Err(_) => {
                warn!(agent = %name, "skills annotation is not valid JSON, ignoring");
            }
        }
    }

    if !skill_names_present {
        builder = builder.with_skill(
            format!("{name}-default-skill"),
            "General",
            "General agent capabilities",
            vec!["general".to_string()],
        );
    }

    builder = builder.with_jsonrpc_interface(url_config.external_url(name));

    let mut card = builder.build();
    card.capabilities.state_transition_history = Some(false);
    card
}
