//! Context Manager (Use Case)
//!
//! Assembles the memory context for one chat turn: recent short-term items,
//! long-term matches for the turn's query and an excerpt of the active
//! episode, merged under a character budget with short-term items first.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use telly::{EpisodeRepository, MemoryItem, MemoryRepository, MemorySearchFilter};

use super::episode_service::EpisodeService;
use super::long_term_service::{LongTermService, ScoredMemory};
use super::session_service::{SessionContext, SessionMemoryService};
use crate::config::ContextBudget;

/// Which store a context entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextTier {
    ShortTerm,
    LongTerm,
}

/// One memory in the merged turn context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub tier: ContextTier,
    pub item: MemoryItem,
    /// Similarity, for long-term entries
    pub score: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnContext {
    pub short_term: Vec<MemoryItem>,
    pub long_term: Vec<(MemoryItem, f32)>,
    pub episode_excerpt: Option<String>,
    /// Why long-term retrieval was skipped, if it was
    pub degraded: Option<String>,
    pub total_chars: usize,
}

impl TurnContext {
    pub fn is_empty(&self) -> bool {
        self.short_term.is_empty() && self.long_term.is_empty() && self.episode_excerpt.is_none()
    }

    /// Short-term items then long-term matches, as one ordered list
    pub fn entries(&self) -> Vec<ContextEntry> {
        let short = self.short_term.iter().map(|item| ContextEntry {
            tier: ContextTier::ShortTerm,
            item: item.clone(),
            score: None,
        });
        let long = self.long_term.iter().map(|(item, score)| ContextEntry {
            tier: ContextTier::LongTerm,
            item: item.clone(),
            score: Some(*score),
        });
        short.chain(long).collect()
    }

    /// Plain-text rendering for prompt assembly
    pub fn render(&self) -> String {
        let mut sections = Vec::new();
        if !self.short_term.is_empty() {
            let lines: Vec<String> = self
                .short_term
                .iter()
                .map(|m| format!("- {}", m.content))
                .collect();
            sections.push(format!("Recent memories:\n{}", lines.join("\n")));
        }
        if !self.long_term.is_empty() {
            let lines: Vec<String> = self
                .long_term
                .iter()
                .map(|(m, _)| format!("- {}", m.content))
                .collect();
            sections.push(format!("Relevant memories:\n{}", lines.join("\n")));
        }
        if let Some(excerpt) = &self.episode_excerpt {
            sections.push(format!("Current conversation:\n{}", excerpt));
        }
        sections.join("\n\n")
    }
}

pub struct ContextService<M: MemoryRepository, E: EpisodeRepository> {
    sessions: Arc<SessionMemoryService<M>>,
    long_term: Arc<LongTermService<M>>,
    episodes: Arc<EpisodeService<E, M>>,
    budget: ContextBudget,
}

impl<M, E> ContextService<M, E>
where
    M: MemoryRepository + 'static,
    E: EpisodeRepository + 'static,
{
    pub fn new(
        sessions: Arc<SessionMemoryService<M>>,
        long_term: Arc<LongTermService<M>>,
        episodes: Arc<EpisodeService<E, M>>,
        budget: ContextBudget,
    ) -> Self {
        Self {
            sessions,
            long_term,
            episodes,
            budget,
        }
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    /// Build the context for a turn. Memory disabled yields an empty context.
    /// A failing long-term path is reported in `degraded`, never as an error.
    pub async fn build(&self, ctx: &SessionContext, query: &str) -> TurnContext {
        if !ctx.memory_enabled {
            return TurnContext::default();
        }

        let mut turn = TurnContext::default();
        let mut remaining = self.budget.max_chars;

        let recent = self
            .sessions
            .recent(ctx, self.budget.short_term_items)
            .await;
        let mut seen: HashSet<String> = HashSet::new();
        for item in recent {
            let cost = item.content.chars().count();
            if cost > remaining {
                break;
            }
            remaining -= cost;
            seen.insert(item.id.clone());
            turn.short_term.push(item);
        }

        if self.budget.long_term_items > 0 && !query.trim().is_empty() {
            match self
                .long_term
                .search_text(query, self.budget.long_term_items, &MemorySearchFilter::default())
                .await
            {
                Ok(matches) => {
                    for ScoredMemory { item, score } in matches {
                        if seen.contains(&item.id) {
                            continue;
                        }
                        let cost = item.content.chars().count();
                        if cost > remaining {
                            continue;
                        }
                        remaining -= cost;
                        seen.insert(item.id.clone());
                        turn.long_term.push((item, score));
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %ctx.session_id, error = %e, "Long-term context unavailable");
                    turn.degraded = Some(e.to_string());
                }
            }
        }

        if self.budget.episode_excerpt_chars > 0 && remaining > 0 {
            match self.episodes.active_for_session(&ctx.session_id).await {
                Ok(Some(episode)) => {
                    let cap = self.budget.episode_excerpt_chars.min(remaining);
                    let excerpt = excerpt(&episode.conversation_history(), cap);
                    if !excerpt.is_empty() {
                        remaining -= excerpt.chars().count();
                        turn.episode_excerpt = Some(excerpt);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(session_id = %ctx.session_id, error = %e, "Episode excerpt unavailable")
                }
            }
        }

        turn.total_chars = self.budget.max_chars - remaining;
        turn
    }
}

/// Newest turns that fit in `max_chars`, rendered oldest first
fn excerpt(history: &[telly::ConversationTurn], max_chars: usize) -> String {
    let mut lines = Vec::new();
    let mut used = 0;
    for turn in history.iter().rev() {
        let line = format!("{}: {}", turn.role, turn.content);
        let cost = line.chars().count() + usize::from(!lines.is_empty());
        if used + cost > max_chars {
            break;
        }
        used += cost;
        lines.push(line);
    }
    lines.reverse();
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use telly::ConversationTurn;

    fn turn(role: &str, content: &str) -> ConversationTurn {
        ConversationTurn {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_excerpt_keeps_newest_within_cap() {
        let history = vec![turn("user", "first"), turn("assistant", "second"), turn("user", "third")];
        // "assistant: second" (17) + "\n" + "user: third" (11) = 29
        assert_eq!(excerpt(&history, 29), "assistant: second\nuser: third");
        assert_eq!(excerpt(&history, 11), "user: third");
        assert_eq!(excerpt(&history, 5), "");
    }

    #[test]
    fn test_render_sections() {
        let ctx = TurnContext {
            short_term: vec![MemoryItem::new("likes tea", Utc::now())],
            episode_excerpt: Some("user: hi".into()),
            ..Default::default()
        };
        let text = ctx.render();
        assert!(text.starts_with("Recent memories:\n- likes tea"));
        assert!(text.ends_with("Current conversation:\nuser: hi"));
        assert!(TurnContext::default().is_empty());
    }
}
