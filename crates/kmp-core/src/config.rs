//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Number of follow-up questions asked before a draft is compiled.
pub const DEFAULT_MAX_TURNS: usize = 3;

/// Score at or above which two questions count as the same question.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Upper bound on a single text-generation call.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Departments offered to employees when they submit content.
pub const DEPARTMENTS: &[&str] = &[
    "Engineering",
    "Marketing",
    "Sales",
    "Human Resources",
    "Finance",
    "Operations",
    "Research & Development",
    "Customer Support",
    "Legal",
    "Product Management",
    "Administration",
];

/// Paths to all KMP data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Database directory (`data/db/`).
    pub db: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.db)?;
        Ok(paths)
    }
}

/// Policy constants for the knowledge-collection conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Questions asked per draft.
    pub max_turns: usize,
    /// Threshold handed to the similarity judge when filtering repeats.
    pub similarity_threshold: f64,
    /// Timeout applied to every collaborator call.
    pub llm_timeout_secs: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl CollectionConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

/// Top-level KMP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmpConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Conversation policy.
    pub collection: CollectionConfig,
    /// Maximum number of live collection sessions kept in memory.
    pub max_sessions: usize,
}

impl KmpConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3003);

        let llm_timeout_secs = std::env::var("KMP_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&secs: &u64| secs > 0)
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

        let max_sessions = std::env::var("KMP_MAX_SESSIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        let data_paths = DataPaths::new(data_dir)?;
        debug!(
            "Config: port={}, llm timeout={}s, max sessions={}, data={}",
            port,
            llm_timeout_secs,
            max_sessions,
            data_paths.root.display()
        );

        Ok(Self {
            port,
            data_paths,
            collection: CollectionConfig {
                llm_timeout_secs,
                ..CollectionConfig::default()
            },
            max_sessions,
        })
    }
}
