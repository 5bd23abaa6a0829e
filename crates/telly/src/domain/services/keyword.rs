//! Keyword matching used when semantic search is unavailable and as the
//! lexical half of hybrid episode ranking.

use crate::domain::entities::{event_content, Episode};
use crate::domain::value_objects::EventType;

/// Case-insensitive substring test
pub fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    !needle_lower.is_empty() && haystack.to_lowercase().contains(needle_lower)
}

/// Fraction of query words present in `text`, in [0, 1]
pub fn word_overlap(query: &str, text: &str) -> f32 {
    let text = text.to_lowercase();
    let words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let hits = words.iter().filter(|w| text.contains(w.as_str())).count();
    hits as f32 / words.len() as f32
}

/// Weighted substring score across fields ordered by importance. The first
/// field weighs 1.0 and each later one half of the previous; the total is
/// normalised into [0, 1].
pub fn field_score(query: &str, fields: &[&str]) -> f32 {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || fields.is_empty() {
        return 0.0;
    }
    let mut weight: f32 = 1.0;
    let mut total = 0.0;
    let mut max = 0.0;
    for field in fields {
        max += weight;
        if contains_ci(field, &needle) {
            total += weight;
        } else {
            total += weight * 0.5 * word_overlap(&needle, field);
        }
        weight *= 0.5;
    }
    total / max
}

/// Keyword relevance of an episode: title hit 0.5, context hit 0.2, each
/// matching event 0.1 plus 0.3 when the match is in a chat message. Capped
/// at 1.0.
pub fn episode_keyword_score(episode: &Episode, query: &str) -> f32 {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return 0.0;
    }

    let mut score: f32 = 0.0;
    if contains_ci(&episode.title, &needle) {
        score += 0.5;
    }
    if let Some(summary) = &episode.summary {
        if contains_ci(summary, &needle) {
            score += 0.2;
        }
    }
    if !episode.context.is_null() && contains_ci(&episode.context.to_string(), &needle) {
        score += 0.2;
    }
    for event in &episode.events {
        if event.event_type == EventType::EpisodeStart || event.event_type == EventType::EpisodeEnd {
            continue;
        }
        if contains_ci(&event.data.to_string(), &needle) || contains_ci(&event.action, &needle) {
            score += 0.1;
            if event.event_type.is_message() && contains_ci(event_content(event), &needle) {
                score += 0.3;
            }
        }
    }
    score.min(1.0)
}
