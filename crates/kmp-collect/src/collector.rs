//! Shared dependencies of every collection session.

use std::sync::Arc;

use kmp_chat::{ChatMessage, CollaboratorError, TextGenerator};
use kmp_core::CollectionConfig;
use kmp_store::RecordStore;
use serde_json::Value;
use tracing::debug;

use crate::phrasing::{PhrasingStrategy, Seeded};

/// Text generator, record store, phrasing strategy and policy, shared by
/// all sessions. Sessions own their drafts; the collector owns nothing
/// session-specific.
pub struct Collector {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn RecordStore>,
    phrasing: Arc<dyn PhrasingStrategy>,
    config: CollectionConfig,
}

impl Collector {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RecordStore>,
        config: CollectionConfig,
    ) -> Self {
        Self {
            generator,
            store,
            phrasing: Arc::new(Seeded::from_entropy()),
            config,
        }
    }

    pub fn with_phrasing(mut self, phrasing: Arc<dyn PhrasingStrategy>) -> Self {
        self.phrasing = phrasing;
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub(crate) fn phrasing(&self) -> &dyn PhrasingStrategy {
        self.phrasing.as_ref()
    }

    /// Free-text collaborator call bounded by the configured timeout.
    pub(crate) async fn ask(
        &self,
        system: &str,
        turns: &[ChatMessage],
    ) -> Result<String, CollaboratorError> {
        let timeout = self.config.llm_timeout();
        debug!("Collaborator call with {} turns", turns.len());
        tokio::time::timeout(timeout, self.generator.complete(system, turns))
            .await
            .map_err(|_| CollaboratorError::Timeout(timeout))?
    }

    /// Structured collaborator call bounded by the configured timeout.
    pub(crate) async fn ask_structured(
        &self,
        system: &str,
        input: &str,
    ) -> Result<Value, CollaboratorError> {
        let timeout = self.config.llm_timeout();
        debug!("Structured collaborator call, {} input chars", input.chars().count());
        tokio::time::timeout(timeout, self.generator.complete_structured(system, input))
            .await
            .map_err(|_| CollaboratorError::Timeout(timeout))?
    }
}
