// Planner Agent: writes the day-by-day itinerary from the profile and research

use super::agent::Agent;
use super::gemini::GeminiClient;

pub const NAME: &str = "Planner";
pub const ROLE: &str = "Travel itinerary generator";

const DESCRIPTION: &str = "You are an expert travel planner. Create a detailed itinerary based on \
                           destination, user preferences, and research insights.";

const INSTRUCTIONS: [&str; 4] = [
    "Include activities, food recommendations, and stay suggestions that align with the user's preferences.",
    "Organize the itinerary day-wise with a balance of excitement and rest based on their chosen travel pace.",
    "Suggest optional evening activities and highlight any local tips or cultural etiquette.",
    "Be realistic with travel times and locations. Make it engaging, insightful, and personalized.",
];

pub fn build(model: GeminiClient) -> Agent {
    Agent::new(NAME, ROLE, model)
        .description(DESCRIPTION)
        .instructions(INSTRUCTIONS)
        .add_datetime_to_instructions(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Delegate;
    use chrono::Local;

    #[test]
    fn planner_has_no_tools() {
        let model = GeminiClient::new(reqwest::Client::new(), "http://localhost", "gemini-test", "k");
        let agent = build(model);

        assert_eq!(agent.name(), NAME);
        assert!(agent.tool_names().is_empty());
        let system = agent.system_instruction(Local::now());
        assert!(system.starts_with("You are an expert travel planner."));
        assert!(system.contains("- Organize the itinerary day-wise"));
    }
}
