//! Heuristic extraction from user messages
//!
//! Both extractors are pure and stateless. Trip extraction gates preference
//! extraction: preferences are only learned from a message that also
//! produced a new trip.

pub mod preferences;
pub mod trips;

pub use preferences::{extract_preferences, PreferenceUpdate};
pub use trips::{extract_trip, match_destination, match_duration, DurationUnit, TripDuration};
