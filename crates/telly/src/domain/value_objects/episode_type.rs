//! EpisodeType / EpisodeStatus - Classification and lifecycle of episodes

use serde::{Deserialize, Serialize};

/// Types of episodes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeType {
    #[default]
    Conversation,
    TaskCompletion,
    Learning,
    ProblemSolving,
    Creative,
}

impl std::fmt::Display for EpisodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodeType::Conversation => write!(f, "conversation"),
            EpisodeType::TaskCompletion => write!(f, "task_completion"),
            EpisodeType::Learning => write!(f, "learning"),
            EpisodeType::ProblemSolving => write!(f, "problem_solving"),
            EpisodeType::Creative => write!(f, "creative"),
        }
    }
}

impl std::str::FromStr for EpisodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conversation" => Ok(EpisodeType::Conversation),
            "task_completion" => Ok(EpisodeType::TaskCompletion),
            "learning" => Ok(EpisodeType::Learning),
            "problem_solving" => Ok(EpisodeType::ProblemSolving),
            "creative" => Ok(EpisodeType::Creative),
            _ => Err(format!("Unknown episode type: {}", s)),
        }
    }
}

/// Lifecycle state of an episode. `New` exists only before the first
/// message of a session, so persisted episodes are always active or closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    #[default]
    Active,
    Closed,
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodeStatus::Active => write!(f, "active"),
            EpisodeStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for EpisodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(EpisodeStatus::Active),
            "closed" => Ok(EpisodeStatus::Closed),
            _ => Err(format!("Unknown episode status: {}", s)),
        }
    }
}
