// Researcher Agent: turns the travel profile into searches and a ranked summary

use std::sync::Arc;

use super::agent::Agent;
use super::gemini::GeminiClient;
use super::Tool;
use crate::models::TravelProfile;
use crate::profile;

pub const NAME: &str = "Researcher";
pub const ROLE: &str = "Travel search expert";

const INSTRUCTIONS: [&str; 3] = [
    "Generate 3 relevant Google search terms based on user preferences.",
    "Use search_google to retrieve results for each term.",
    "Return 10 summarized, high-quality results most aligned with the user's interests.",
];

pub fn build(
    model: GeminiClient,
    search: Arc<dyn Tool>,
    profile: &TravelProfile,
    max_tool_rounds: usize,
) -> Agent {
    Agent::new(NAME, ROLE, model)
        .description(profile::researcher_brief(profile))
        .instructions(INSTRUCTIONS)
        .add_datetime_to_instructions(true)
        .tool(search)
        .max_tool_rounds(max_tool_rounds)
}
