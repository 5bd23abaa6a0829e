//! MemoryPriority - Retention weight of a memory item

use serde::{Deserialize, Serialize};

/// Priority levels for memories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for MemoryPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryPriority::Low => write!(f, "low"),
            MemoryPriority::Medium => write!(f, "medium"),
            MemoryPriority::High => write!(f, "high"),
            MemoryPriority::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for MemoryPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(MemoryPriority::Low),
            "medium" => Ok(MemoryPriority::Medium),
            "high" => Ok(MemoryPriority::High),
            "critical" => Ok(MemoryPriority::Critical),
            _ => Err(format!("Unknown memory priority: {}", s)),
        }
    }
}

/// Where a memory item came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// Captured from a chat turn into the short-term buffer
    #[default]
    Interaction,
    /// Summary of a closed episode
    Episode,
    /// Written straight into the long-term store
    Direct,
}

impl std::fmt::Display for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemorySource::Interaction => write!(f, "interaction"),
            MemorySource::Episode => write!(f, "episode"),
            MemorySource::Direct => write!(f, "direct"),
        }
    }
}

impl std::str::FromStr for MemorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interaction" => Ok(MemorySource::Interaction),
            "episode" => Ok(MemorySource::Episode),
            "direct" => Ok(MemorySource::Direct),
            _ => Err(format!("Unknown memory source: {}", s)),
        }
    }
}
