// Profile: prompt text both stages send to the hosted model

use crate::models::TravelProfile;

const PROFILE_INTERESTS_FALLBACK: &str = "General tourism";
const BRIEF_INTERESTS_FALLBACK: &str = "various attractions";

/// One line per field, embedded in the planning prompt.
pub fn profile_block(profile: &TravelProfile) -> String {
    format!(
        "Destination: {}\n\
         Days: {}\n\
         Budget: {}\n\
         Travel Style: {}\n\
         Accommodation: {}\n\
         Interests: {}\n\
         Pace: {}",
        profile.destination,
        profile.days,
        profile.budget,
        profile.travel_style,
        profile.accommodation,
        profile.interests_or(PROFILE_INTERESTS_FALLBACK),
        profile.pace,
    )
}

/// Standing description for the research agent.
pub fn researcher_brief(profile: &TravelProfile) -> String {
    format!(
        "You are a travel researcher. Use the user's preferences to search for top activities, \
         places to stay, and must-see spots in {destination}.\n\
         The user plans to travel for {days} days, prefers a {budget} trip, is traveling as a {style}, \
         wants {accommodation} type accommodation, and is interested in {interests}. \
         The user prefers a {pace} pace.\n\
         Generate 3 relevant search queries and summarize the 10 most relevant results.",
        destination = profile.destination,
        days = profile.days,
        budget = profile.budget,
        style = profile.travel_style.label().to_lowercase(),
        accommodation = profile.accommodation.label().to_lowercase(),
        interests = profile.interests_or(BRIEF_INTERESTS_FALLBACK),
        pace = profile.pace.label().to_lowercase(),
    )
}

pub fn research_prompt(profile: &TravelProfile) -> String {
    format!(
        "Plan a {} {} trip to {} for {} days. Preferences: {} accommodation, Interests: {}. Pace: {}.",
        profile.budget,
        profile.travel_style,
        profile.destination,
        profile.days,
        profile.accommodation,
        profile.interests_or(BRIEF_INTERESTS_FALLBACK),
        profile.pace,
    )
}

/// The research summary is embedded verbatim.
pub fn planning_prompt(profile: &TravelProfile, research_summary: &str) -> String {
    format!(
        "Use the following details to generate a day-by-day itinerary:\n\
         {}\n\
         Research Summary: {}",
        profile_block(profile),
        research_summary,
    )
}
