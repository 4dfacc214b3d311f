//! Preference extraction
//!
//! Keyword heuristics over a lowercased message. Budget and pace take the
//! first matching group in priority order; interests collect every group
//! that matches. Applying an update is idempotent.

use sdk::types::{Budget, Pace, Preferences};

/// Budget keyword groups, in priority order
const BUDGET_GROUPS: &[(&[&str], Budget)] = &[
    (&["budget", "cheap", "affordable"], Budget::Budget),
    (&["luxury", "expensive", "high-end"], Budget::Luxury),
    (&["mid-range", "moderate"], Budget::MidRange),
];

/// Interest keyword groups; every matching group is recorded
const INTEREST_GROUPS: &[(&[&str], &str)] = &[
    (&["food", "restaurant", "cuisine"], "food"),
    (&["adventure", "hiking", "outdoor"], "adventure"),
    (&["culture", "museum", "history"], "culture"),
    (&["beach", "relax", "spa"], "relaxation"),
    (&["nightlife", "party", "bars"], "nightlife"),
];

/// Pace keyword groups, in priority order
const PACE_GROUPS: &[(&[&str], Pace)] = &[
    (&["relaxed", "slow", "leisurely"], Pace::Relaxed),
    (&["packed", "busy", "see everything"], Pace::Packed),
];

/// Partial preference update derived from one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub budget: Option<Budget>,
    pub interests: Vec<&'static str>,
    pub pace: Option<Pace>,
}

impl PreferenceUpdate {
    pub fn is_empty(&self) -> bool {
        self.budget.is_none() && self.interests.is_empty() && self.pace.is_none()
    }

    /// Merge into stored preferences.
    ///
    /// Budget and pace overwrite; interests are unioned, never removed.
    pub fn apply(&self, preferences: &mut Preferences) {
        if let Some(budget) = self.budget {
            preferences.budget = Some(budget);
        }
        for interest in &self.interests {
            preferences.add_interest(*interest);
        }
        if let Some(pace) = self.pace {
            preferences.pace = Some(pace);
        }
    }
}

fn first_group<T: Copy>(text: &str, groups: &[(&[&str], T)]) -> Option<T> {
    groups
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, value)| *value)
}

/// Derive preference updates from free text
pub fn extract_preferences(message: &str) -> PreferenceUpdate {
    let text = message.to_lowercase();

    let interests = INTEREST_GROUPS
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, tag)| *tag)
        .collect();

    PreferenceUpdate {
        budget: first_group(&text, BUDGET_GROUPS),
        interests,
        pace: first_group(&text, PACE_GROUPS),
    }
}
