//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use kmp_chat::{LLMConfig, LlmClient, TextGenerator};
use kmp_collect::{CollectionSession, Collector};
use kmp_core::KmpConfig;
use kmp_store::RecordStore;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A collection session shared between request handlers. Each session has
/// its own async lock so one slow LLM call never blocks other sessions.
pub type SharedSession = Arc<Mutex<CollectionSession>>;

struct SessionEntry {
    session: SharedSession,
    created_at: Instant,
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: KmpConfig,
    pub store: Arc<dyn RecordStore>,
    pub llm_config: Arc<RwLock<LLMConfig>>,
    pub collector: Collector,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl AppState {
    /// State backed by the configured external LLM providers.
    pub fn new(config: KmpConfig, store: Arc<dyn RecordStore>) -> Self {
        let llm_config = Arc::new(RwLock::new(LLMConfig::load(
            &config.data_paths.llm_config_file,
        )));
        let generator = Arc::new(LlmClient::new(llm_config.clone()));
        Self::build(config, store, llm_config, generator)
    }

    /// State with an explicit text generator (offline deployments, tests).
    pub fn with_generator(
        config: KmpConfig,
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let llm_config = Arc::new(RwLock::new(LLMConfig::load(
            &config.data_paths.llm_config_file,
        )));
        Self::build(config, store, llm_config, generator)
    }

    fn build(
        config: KmpConfig,
        store: Arc<dyn RecordStore>,
        llm_config: Arc<RwLock<LLMConfig>>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let collector = Collector::new(generator, store.clone(), config.collection.clone());
        Self {
            config,
            store,
            llm_config,
            collector,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    // ---------------------------------------------------------------
    // Session registry
    // ---------------------------------------------------------------

    /// Register a new idle session and return its id. When the registry is
    /// full the oldest session is dropped.
    pub fn create_session(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.config.max_sessions.max(1) {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                info!("Session registry full, evicted {}", oldest);
            }
        }

        sessions.insert(
            id.clone(),
            SessionEntry {
                session: Arc::new(Mutex::new(CollectionSession::new(id.as_str()))),
                created_at: Instant::now(),
            },
        );
        debug!("Created session {} ({} live)", id, sessions.len());
        id
    }

    pub fn session(&self, id: &str) -> Option<SharedSession> {
        self.sessions.read().get(id).map(|e| e.session.clone())
    }

    pub fn remove_session(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}
