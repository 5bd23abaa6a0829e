//! EventType - Kind of an entry in an episode's event log

use serde::{Deserialize, Serialize};

/// Event kinds recorded inside an episode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EpisodeStart,
    UserMessage,
    AssistantResponse,
    ToolCall,
    Note,
    EpisodeEnd,
}

impl EventType {
    /// Chat messages, as opposed to lifecycle or bookkeeping events
    pub fn is_message(&self) -> bool {
        matches!(self, EventType::UserMessage | EventType::AssistantResponse)
    }

    /// Events emitted by the recorder itself
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, EventType::EpisodeStart | EventType::EpisodeEnd)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::EpisodeStart => write!(f, "episode_start"),
            EventType::UserMessage => write!(f, "user_message"),
            EventType::AssistantResponse => write!(f, "assistant_response"),
            EventType::ToolCall => write!(f, "tool_call"),
            EventType::Note => write!(f, "note"),
            EventType::EpisodeEnd => write!(f, "episode_end"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "episode_start" => Ok(EventType::EpisodeStart),
            "user_message" => Ok(EventType::UserMessage),
            "assistant_response" => Ok(EventType::AssistantResponse),
            "tool_call" => Ok(EventType::ToolCall),
            "note" => Ok(EventType::Note),
            "episode_end" => Ok(EventType::EpisodeEnd),
            _ => Err(format!("Unknown event type: {}", s)),
        }
    }
}
