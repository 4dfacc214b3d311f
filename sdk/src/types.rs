//! Per-user record types
//!
//! A `UserRecord` is the single JSON document persisted for each user id.
//! Field names are part of the storage format and must not change:
//! `preferences.{budget,interests,pace}`,
//! `conversationHistory[].{role,content,timestamp}` and
//! `savedTrips[].{id,destination,duration,createdAt,itinerary}`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything remembered about one user.
///
/// `UserRecord::default()` is the canonical empty record used wherever a
/// record is missing. Every field has a serde default, so documents written
/// by older versions (missing fields, extra fields such as `currentTrip`)
/// still decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    /// Inferred travel preferences
    pub preferences: Preferences,

    /// Stored conversation turns, oldest first
    pub conversation_history: Vec<Turn>,

    /// Extracted trips, in the order they were saved
    pub saved_trips: Vec<Trip>,
}

impl UserRecord {
    /// Returns true when a trip to `destination` is already saved (case-insensitive).
    pub fn has_trip_to(&self, destination: &str) -> bool {
        let wanted = destination.to_lowercase();
        self.saved_trips
            .iter()
            .any(|trip| trip.destination.to_lowercase() == wanted)
    }
}

/// Travel preferences inferred from user messages
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,

    /// Interest tags with set semantics; kept free of duplicates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<Pace>,
}

impl Preferences {
    /// True when no preference has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.budget.is_none() && self.interests.is_empty() && self.pace.is_none()
    }

    /// Adds an interest tag unless it is already present.
    ///
    /// Returns true if the tag was new.
    pub fn add_interest(&mut self, interest: impl Into<String>) -> bool {
        let interest = interest.into();
        if self.interests.contains(&interest) {
            return false;
        }
        self.interests.push(interest);
        true
    }
}

/// Budget level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Budget {
    #[serde(rename = "budget")]
    Budget,
    #[serde(rename = "mid-range")]
    MidRange,
    #[serde(rename = "luxury")]
    Luxury,
}

impl Budget {
    pub fn as_str(&self) -> &str {
        match self {
            Budget::Budget => "budget",
            Budget::MidRange => "mid-range",
            Budget::Luxury => "luxury",
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferred travel pace
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Relaxed,
    Packed,
}

impl Pace {
    pub fn as_str(&self) -> &str {
        match self {
            Pace::Relaxed => "relaxed",
            Pace::Packed => "packed",
        }
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a stored turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }
}

/// A saved trip extracted from a user message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// `trip_<createdAt>`
    pub id: String,
    pub destination: String,
    /// Normalized duration, e.g. "5 days" or "2 weeks"
    pub duration: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    /// The assistant reply that accompanied the trip request, verbatim
    pub itinerary: String,
}

impl Trip {
    pub fn new(
        destination: impl Into<String>,
        duration: impl Into<String>,
        itinerary: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: format!("trip_{}", created_at),
            destination: destination.into(),
            duration: duration.into(),
            created_at,
            itinerary: itinerary.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_record_shape() {
        let value = serde_json::to_value(UserRecord::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "preferences": {},
                "conversationHistory": [],
                "savedTrips": []
            })
        );
    }

    #[test]
    fn test_storage_field_names() {
        let mut record = UserRecord::default();
        record.preferences.budget = Some(Budget::MidRange);
        record.preferences.add_interest("food");
        record.preferences.pace = Some(Pace::Packed);
        record
            .conversation_history
            .push(Turn::new(TurnRole::User, "hi", 1));
        record
            .saved_trips
            .push(Trip::new("Tokyo", "5 days", "Day 1...", 1700000000000));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["preferences"]["budget"], "mid-range");
        assert_eq!(value["preferences"]["interests"], json!(["food"]));
        assert_eq!(value["preferences"]["pace"], "packed");
        assert_eq!(value["conversationHistory"][0]["role"], "user");
        assert_eq!(value["conversationHistory"][0]["timestamp"], 1);
        assert_eq!(value["savedTrips"][0]["id"], "trip_1700000000000");
        assert_eq!(value["savedTrips"][0]["createdAt"], 1700000000000i64);
        assert_eq!(value["savedTrips"][0]["itinerary"], "Day 1...");
    }

    #[test]
    fn test_legacy_record_decodes() {
        let legacy = json!({
            "preferences": {},
            "conversationHistory": [],
            "currentTrip": null
        });
        let record: UserRecord = serde_json::from_value(legacy).unwrap();
        assert_eq!(record, UserRecord::default());

        let trips_only = json!({ "savedTrips": [] });
        let record: UserRecord = serde_json::from_value(trips_only).unwrap();
        assert!(record.conversation_history.is_empty());
    }

    #[test]
    fn test_has_trip_to_ignores_case() {
        let mut record = UserRecord::default();
        record.saved_trips.push(Trip::new("Paris", "2 weeks", "", 1));
        assert!(record.has_trip_to("paris"));
        assert!(record.has_trip_to("PARIS"));
        assert!(!record.has_trip_to("Rome"));
    }

    #[test]
    fn test_add_interest_deduplicates() {
        let mut prefs = Preferences::default();
        assert!(prefs.is_empty());
        assert!(prefs.add_interest("food"));
        assert!(!prefs.add_interest("food"));
        assert_eq!(prefs.interests, vec!["food".to_string()]);
        assert!(!prefs.is_empty());
    }
}
