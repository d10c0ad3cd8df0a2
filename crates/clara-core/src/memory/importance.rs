//! Automatic importance detection

/// Phrases that explicitly ask Clara to remember something
const EXPLICIT_MARKERS: &[&str] = &[
    "remember this",
    "important",
    "don't forget",
    "for future reference",
    "keep in mind",
];

/// Phrases that usually introduce personal facts
const PERSONAL_MARKERS: &[&str] = &["my name is", "i work at", "i live in", "my favorite"];

const EXPLICIT_SCORE: f64 = 1.0;
const PERSONAL_SCORE: f64 = 0.8;

/// Scores above this are stored as important memories
pub const IMPORTANCE_THRESHOLD: f64 = 0.5;

/// Score a user message for long-term importance
pub fn importance_score(user_message: &str) -> f64 {
    let lowered = user_message.to_lowercase();

    if EXPLICIT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return EXPLICIT_SCORE;
    }
    if PERSONAL_MARKERS.iter().any(|m| lowered.contains(m)) {
        return PERSONAL_SCORE;
    }
    0.0
}
