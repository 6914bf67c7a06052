//! Storage abstraction over the three record tables.

use kmp_core::Result;

use crate::search::rank_knowledge;
use crate::types::{Idea, IdeaStatus, KnowledgeRecord, PulseUpdate, ScoredRecord};

/// Persistent store for knowledge records, ideas and pulse updates.
///
/// Implementations must be safe to share across request handlers. Every
/// method is a single atomic operation from the caller's point of view.
pub trait RecordStore: Send + Sync {
    // ---------------------------------------------------------------
    // Knowledge
    // ---------------------------------------------------------------

    /// Store a compiled knowledge document. Returns the new record id.
    fn put_knowledge_record(
        &self,
        content: &str,
        department: &str,
        employee_name: &str,
        tags: &[String],
    ) -> Result<String>;

    fn get_knowledge_record(&self, id: &str) -> Result<Option<KnowledgeRecord>>;

    /// All knowledge records, newest first.
    fn scan_knowledge(&self) -> Result<Vec<KnowledgeRecord>>;

    /// Keyword search over all knowledge records, best match first.
    fn search_knowledge(&self, query: &str) -> Result<Vec<ScoredRecord>> {
        Ok(rank_knowledge(self.scan_knowledge()?, query))
    }

    // ---------------------------------------------------------------
    // Ideas
    // ---------------------------------------------------------------

    /// Store a new idea with status `proposed` and no supporters.
    fn put_idea(
        &self,
        title: &str,
        description: &str,
        employee_name: &str,
        department: &str,
    ) -> Result<String>;

    fn get_idea(&self, id: &str) -> Result<Option<Idea>>;

    /// All ideas, newest first.
    fn scan_ideas(&self) -> Result<Vec<Idea>>;

    /// Fails with `NotFound` when the idea does not exist.
    fn set_idea_status(&self, id: &str, status: IdeaStatus) -> Result<()>;

    /// Add `employee_name` to the idea's supporters if absent. Returns the
    /// resulting supporter list. Fails with `NotFound` when the idea does
    /// not exist.
    fn add_supporter(&self, id: &str, employee_name: &str) -> Result<Vec<String>>;

    // ---------------------------------------------------------------
    // Pulse
    // ---------------------------------------------------------------

    fn put_pulse_update(&self, title: &str, content: &str, department: &str) -> Result<String>;

    /// All pulse updates, newest first.
    fn scan_pulse(&self) -> Result<Vec<PulseUpdate>>;

    /// Pulse updates from the last `days` days, newest first.
    fn recent_pulse_updates(&self, days: u32) -> Result<Vec<PulseUpdate>>;
}
