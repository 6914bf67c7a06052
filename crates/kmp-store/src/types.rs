//! Data types for knowledge records, ideas and pulse updates.

use std::str::FromStr;

use kmp_core::Error;
use serde::{Deserialize, Serialize};

/// A compiled knowledge document. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeRecord {
    pub id: String,
    pub content: String,
    pub department: String,
    pub employee_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Epoch seconds.
    pub created_at: i64,
}

/// Lifecycle of an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    #[default]
    Proposed,
    InProgress,
    Completed,
    Rejected,
}

impl IdeaStatus {
    pub const ALL: [IdeaStatus; 4] = [
        IdeaStatus::Proposed,
        IdeaStatus::InProgress,
        IdeaStatus::Completed,
        IdeaStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdeaStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(Self::Proposed),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::InvalidValue(format!("unknown idea status: {}", other))),
        }
    }
}

/// An idea or initiative proposed by an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub employee_name: String,
    pub department: String,
    /// Employees backing the idea; no duplicates, in support order.
    pub supporters: Vec<String>,
    pub status: IdeaStatus,
    pub created_at: i64,
}

/// An organization pulse announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseUpdate {
    pub id: String,
    pub title: String,
    pub content: String,
    pub department: String,
    pub created_at: i64,
}

/// A knowledge record with its keyword-search score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: KnowledgeRecord,
    pub score: u32,
}
