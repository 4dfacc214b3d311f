//! Trip extraction
//!
//! Two independent matchers run over the user message:
//! - destination: a trigger phrase ("trip to", "visit", "going to",
//!   "travel to", any case) followed by capitalized words
//! - duration: "<N> day(s)" or "<N> week(s)", any case
//!
//! A trip is only produced when both match in the same message and the
//! destination is not already saved (case-insensitive).

use regex::Regex;
use sdk::types::Trip;
use std::fmt;
use std::sync::OnceLock;

static DESTINATION_PATTERN: OnceLock<Regex> = OnceLock::new();
static DURATION_PATTERN: OnceLock<Regex> = OnceLock::new();

fn destination_pattern() -> &'static Regex {
    DESTINATION_PATTERN.get_or_init(|| {
        // Each word needs two letters, so a trailing "I" never joins the name.
        Regex::new(
            r"\b(?i:trip to|visit|going to|travel to)\s+([A-Z][a-zA-Z]+(?:[ \t]+[A-Z][a-zA-Z]+)*)(?:[\s,.?]|$)",
        )
        .expect("destination pattern is valid")
    })
}

fn duration_pattern() -> &'static Regex {
    DURATION_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)([0-9]+)\s*(day|week)").expect("duration pattern is valid")
    })
}

/// Unit of a trip duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Days,
    Weeks,
}

/// A matched trip duration, e.g. "5 days"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripDuration {
    pub count: u32,
    pub unit: DurationUnit,
}

impl fmt::Display for TripDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
        };
        write!(f, "{} {}", self.count, unit)
    }
}

/// Find the first destination phrase in a message
pub fn match_destination(message: &str) -> Option<String> {
    destination_pattern()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Find the first duration phrase in a message
pub fn match_duration(message: &str) -> Option<TripDuration> {
    let caps = duration_pattern().captures(message)?;
    let count = caps.get(1)?.as_str().parse().ok()?;
    let unit = if caps.get(2)?.as_str().eq_ignore_ascii_case("week") {
        DurationUnit::Weeks
    } else {
        DurationUnit::Days
    };
    Some(TripDuration { count, unit })
}

/// Detect a new trip in an exchange.
///
/// Returns `None` when either matcher misses or the destination is already
/// among `existing_trips`. The trip's `itinerary` is the assistant reply.
pub fn extract_trip(
    user_message: &str,
    assistant_reply: &str,
    existing_trips: &[Trip],
    timestamp: i64,
) -> Option<Trip> {
    let destination = match_destination(user_message)?;
    let duration = match_duration(user_message)?;

    let wanted = destination.to_lowercase();
    if existing_trips
        .iter()
        .any(|trip| trip.destination.to_lowercase() == wanted)
    {
        tracing::debug!("Trip to {} already saved, skipping", destination);
        return None;
    }

    Some(Trip::new(
        destination,
        duration.to_string(),
        assistant_reply,
        timestamp,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_trigger_phrases() {
        assert_eq!(match_destination("plan a trip to Tokyo"), Some("Tokyo".into()));
        assert_eq!(match_destination("I want to VISIT Lisbon."), Some("Lisbon".into()));
        assert_eq!(match_destination("going to Rome?"), Some("Rome".into()));
        assert_eq!(match_destination("Travel to Oslo, soon"), Some("Oslo".into()));
    }

    #[test]
    fn test_destination_multi_word() {
        assert_eq!(
            match_destination("a trip to New York for 4 days"),
            Some("New York".into())
        );
        assert_eq!(
            match_destination("trip to Paris I think"),
            Some("Paris".into())
        );
    }

    #[test]
    fn test_destination_requires_capital() {
        assert_eq!(match_destination("I want to visit for 5 days"), None);
        assert_eq!(match_destination("trip to paris"), None);
        assert_eq!(match_destination("no destination here"), None);
    }

    #[test]
    fn test_destination_needs_terminator() {
        assert_eq!(match_destination("trip to Paris!"), None);
        assert_eq!(match_destination("trip to Paris"), Some("Paris".into()));
    }

    #[test]
    fn test_duration_normalization() {
        assert_eq!(match_duration("5 day trip").unwrap().to_string(), "5 days");
        assert_eq!(match_duration("for 2 weeks").unwrap().to_string(), "2 weeks");
        assert_eq!(match_duration("3DAYS").unwrap().to_string(), "3 days");
        assert_eq!(match_duration("1 Week").unwrap().to_string(), "1 weeks");
        assert_eq!(match_duration("a long weekend"), None);
    }

    #[test]
    fn test_duration_first_match_wins() {
        let duration = match_duration("10 days, or maybe 2 weeks").unwrap();
        assert_eq!(duration, TripDuration { count: 10, unit: DurationUnit::Days });
    }

    #[test]
    fn test_extract_trip_requires_both() {
        assert!(extract_trip("trip to Tokyo", "reply", &[], 1).is_none());
        assert!(extract_trip("5 days somewhere", "reply", &[], 1).is_none());

        let trip = extract_trip("5 day trip to Tokyo", "Day 1: Asakusa", &[], 1700).unwrap();
        assert_eq!(trip.id, "trip_1700");
        assert_eq!(trip.destination, "Tokyo");
        assert_eq!(trip.duration, "5 days");
        assert_eq!(trip.created_at, 1700);
        assert_eq!(trip.itinerary, "Day 1: Asakusa");
    }

    #[test]
    fn test_extract_trip_deduplicates_case_insensitively() {
        let existing = vec![Trip::new("TOKYO", "3 days", "", 1)];
        assert!(extract_trip("7 day trip to Tokyo", "reply", &existing, 2).is_none());
        assert!(extract_trip("7 day trip to Kyoto", "reply", &existing, 2).is_some());
    }
}
