//! KMP Collect: turns a raw contribution into a stored knowledge document.
//!
//! A [`CollectionSession`] asks up to three follow-up questions, compiles the
//! answers into one document, tags it and persists it through the record
//! store. Every collaborator call has a deterministic fallback, so a session
//! completes the same way with or without an LLM.

pub mod collector;
pub mod compiler;
pub mod draft;
pub mod phrasing;
pub mod questions;
pub mod search;
pub mod session;

pub use collector::Collector;
pub use compiler::{compile_fallback, enhance_fallback, tags_fallback};
pub use draft::{Author, KnowledgeDraft, Turn};
pub use phrasing::{PhrasingStrategy, Rotating, Seeded};
pub use questions::fallback_question;
pub use search::{SearchHit, SearchMode, SearchResults};
pub use session::{CollectionSession, SessionReply, SessionSnapshot, SessionState};
