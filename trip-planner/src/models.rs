use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ApiError;
use crate::pipeline::SessionState;

pub const MIN_DAYS: i64 = 1;
pub const MAX_DAYS: i64 = 30;
pub const DEFAULT_DAYS: i64 = 5;

macro_rules! labelled_enum {
    ($name:ident { $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label $(, alias = $alias)*)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labelled_enum!(Budget {
    Low => "Low",
    MidRange => "Mid-range",
    Luxury => "Luxury",
});

labelled_enum!(TravelStyle {
    Solo => "Solo",
    Couple => "Couple",
    Family => "Family",
    Friends => "Friends",
});

labelled_enum!(Accommodation {
    Hotel => "Hotel",
    Hostel => "Hostel",
    Airbnb => "Airbnb",
    Resort => "Resort",
    NoPreference => "No preference" | "Doesn't Matter",
});

labelled_enum!(Interest {
    Nature => "Nature",
    Adventure => "Adventure",
    Culture => "Culture",
    Nightlife => "Nightlife",
    Relaxation => "Relaxation",
    Shopping => "Shopping",
    History => "History",
    LocalFood => "Local Food",
});

labelled_enum!(Pace {
    Relaxed => "Relaxed",
    Balanced => "Balanced",
    Packed => "Packed",
});

impl Default for Budget {
    fn default() -> Self {
        Budget::Low
    }
}

impl Default for TravelStyle {
    fn default() -> Self {
        TravelStyle::Solo
    }
}

impl Default for Accommodation {
    fn default() -> Self {
        Accommodation::Hotel
    }
}

impl Default for Pace {
    fn default() -> Self {
        Pace::Relaxed
    }
}

/// Preferences collected from one form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TravelProfile {
    pub destination: String,
    pub days: u8,
    pub budget: Budget,
    pub travel_style: TravelStyle,
    pub accommodation: Accommodation,
    pub interests: Vec<Interest>,
    pub pace: Pace,
}

impl TravelProfile {
    pub fn has_destination(&self) -> bool {
        !self.destination.is_empty()
    }

    /// Comma-joined interest labels, or `fallback` when none were picked.
    pub fn interests_or(&self, fallback: &str) -> String {
        if self.interests.is_empty() {
            fallback.to_string()
        } else {
            self.interests
                .iter()
                .map(|interest| interest.label())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

// API Request/Response models
#[derive(Debug, Deserialize)]
pub struct ItineraryRequest {
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub serp_api_key: Option<String>,
    #[serde(default)]
    pub destination: String,
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub travel_style: TravelStyle,
    #[serde(default)]
    pub accommodation: Accommodation,
    #[serde(default)]
    pub interests: Vec<Interest>,
    #[serde(default)]
    pub pace: Pace,
}

fn default_days() -> i64 {
    DEFAULT_DAYS
}

impl ItineraryRequest {
    pub fn to_profile(&self) -> Result<TravelProfile, ApiError> {
        if !(MIN_DAYS..=MAX_DAYS).contains(&self.days) {
            return Err(ApiError::BadRequest(format!(
                "trip duration must be between {} and {} days, got {}",
                MIN_DAYS, MAX_DAYS, self.days
            )));
        }

        let mut interests = Vec::with_capacity(self.interests.len());
        for interest in &self.interests {
            if !interests.contains(interest) {
                interests.push(*interest);
            }
        }

        Ok(TravelProfile {
            destination: self.destination.trim().to_string(),
            days: self.days as u8,
            budget: self.budget,
            travel_style: self.travel_style,
            accommodation: self.accommodation,
            interests,
            pace: self.pace,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ItineraryResponse {
    pub request_id: Uuid,
    pub state: SessionState,
    pub profile: String,
    pub research_summary: Option<String>,
    pub itinerary: Option<String>,
}
