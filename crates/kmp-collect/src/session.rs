//! The multi-turn collection state machine: `Idle → Collecting(i) → Completed`.
//!
//! A session only changes after every collaborator and store call for a
//! transition has returned, so a dropped future or a failed store write
//! leaves it exactly as it was.

use kmp_core::error::require_text;
use kmp_core::{Error, Result};
use kmp_text::{contains_any, normalize};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::collector::Collector;
use crate::draft::{Author, KnowledgeDraft, Turn};
use crate::phrasing::choose;

const WELCOME_MESSAGES: &[&str] = &[
    "شكراً على مشاركة هذه المعلومات القيمة! لجعلها أكثر فائدة للجميع، أود أن أسألك:",
    "هذه معلومات مهمة! لإثراء قاعدة المعرفة المؤسسية:",
    "شكراً جزيلاً! لتوثيق هذه المعلومات بشكل شامل ومفيد:",
];

const FOLLOW_UP_PREFIX: &str = "شكراً على هذه المعلومات المفيدة! لدي سؤال آخر لاستكمال المعرفة:";

const COMPLETION_MESSAGES: &[&str] = &[
    "شكراً لمشاركة هذه المعلومات القيمة. لقد قمت بمعالجة ودمج جميع المعلومات في إدخال معرفة شامل:",
    "رائع! لقد اكتملت المعرفة الآن. قمت بتنظيم ودمج المعلومات التي شاركتها في معرفة متكاملة:",
    "ممتاز! اكتملت المعلومات الآن. قمت بمعالجتها وتنظيمها وتصحيحها لتصبح كما يلي:",
];

/// Content-type acknowledgments, first match wins.
const ACKNOWLEDGMENTS: &[(&[&str], &str)] = &[
    (&["كهرباء", "كهربائي", "تماس"], "أرى أن هذا يتعلق بمشكلة كهربائية. "),
    (&["حريق", "دخان"], "شكراً على الإبلاغ عن هذا الحادث المتعلق بالسلامة. "),
    (&["عطل", "صيانة"], "أفهم أن هناك مشكلة تحتاج للصيانة. "),
    (&["دور", "طابق", "مكتب"], "أرى أن هذا يتعلق بموقع محدد في المبنى. "),
];

fn acknowledgment(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    ACKNOWLEDGMENTS
        .iter()
        .find(|(keywords, _)| contains_any(&lowered, keywords))
        .map(|(_, ack)| *ack)
        .unwrap_or("")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum SessionState {
    Idle,
    /// Waiting for the answer to question `turn` (0-based).
    Collecting { turn: usize },
    Completed {
        record_id: String,
        document: String,
        tags: Vec<String>,
    },
}

/// What the caller shows after a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReply {
    /// Assistant message, ready for display.
    pub message: String,
    /// The pending question, if collection continues.
    pub question: Option<String>,
    /// Questions asked so far.
    pub turn: usize,
    pub max_turns: usize,
    pub is_complete: bool,
    pub record_id: Option<String>,
    pub document: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    #[serde(flatten)]
    pub state: SessionState,
    pub max_turns: usize,
    pub draft: Option<KnowledgeDraft>,
}

/// One user's collection conversation. Owned by the caller; every
/// transition borrows the shared [`Collector`].
#[derive(Debug, Clone)]
pub struct CollectionSession {
    id: String,
    state: SessionState,
    draft: Option<KnowledgeDraft>,
}

impl CollectionSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Idle,
            draft: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn draft(&self) -> Option<&KnowledgeDraft> {
        self.draft.as_ref()
    }

    pub fn snapshot(&self, max_turns: usize) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            state: self.state.clone(),
            max_turns,
            draft: self.draft.clone(),
        }
    }

    /// Begin collecting `text`. Allowed from `Idle` and `Completed`.
    pub async fn start(
        &mut self,
        collector: &Collector,
        text: &str,
        author: Author,
    ) -> Result<SessionReply> {
        require_text("text", text)?;
        if let SessionState::Collecting { turn } = self.state {
            return Err(Error::InvalidState(format!(
                "session {} is collecting (question {}); reset it first",
                self.id,
                turn + 1
            )));
        }

        let original = text.trim().to_string();
        let enhanced = collector.enhance(&normalize(&original)).await;
        let mut draft = KnowledgeDraft::new(original, enhanced, author);
        let question = collector.next_question(&draft).await;
        draft.turns.push(Turn::pending(question.as_str()));

        let message = format!(
            "{}{}\n\n{}",
            acknowledgment(&draft.normalized_text),
            choose(collector.phrasing(), WELCOME_MESSAGES),
            question
        );

        info!(
            "Session {} started collecting ({} chars)",
            self.id,
            draft.original_text.chars().count()
        );
        self.draft = Some(draft);
        self.state = SessionState::Collecting { turn: 0 };

        Ok(SessionReply {
            message,
            question: Some(question),
            turn: 1,
            max_turns: collector.config().max_turns,
            is_complete: false,
            record_id: None,
            document: None,
            tags: Vec::new(),
        })
    }

    /// Answer the pending question. The answer goes through the same
    /// normalizer as the opening text. Blank answers are accepted and
    /// skipped when the document is compiled.
    pub async fn answer(&mut self, collector: &Collector, text: &str) -> Result<SessionReply> {
        let (turn, mut draft) = match (&self.state, &self.draft) {
            (SessionState::Collecting { turn }, Some(draft)) => (*turn, draft.clone()),
            _ => {
                return Err(Error::InvalidState(format!(
                    "session {} has no pending question",
                    self.id
                )))
            }
        };

        let pending = draft.turns.get_mut(turn).ok_or_else(|| {
            Error::Internal(format!("session {} lost question {}", self.id, turn + 1))
        })?;
        pending.answer = normalize(text.trim());

        let max_turns = collector.config().max_turns;
        if turn + 1 < max_turns {
            let question = collector.next_question(&draft).await;
            draft.turns.push(Turn::pending(question.as_str()));

            info!("Session {} advanced to question {}", self.id, turn + 2);
            self.draft = Some(draft);
            self.state = SessionState::Collecting { turn: turn + 1 };

            return Ok(SessionReply {
                message: format!("{}\n\n{}", FOLLOW_UP_PREFIX, question),
                question: Some(question),
                turn: turn + 2,
                max_turns,
                is_complete: false,
                record_id: None,
                document: None,
                tags: Vec::new(),
            });
        }

        let document = collector.compile(&draft.normalized_text, &draft.turns).await;
        let tags = collector.extract_tags(&document).await;
        let record_id = collector
            .store()
            .put_knowledge_record(
                &document,
                &draft.author.department,
                &draft.author.employee_name,
                &tags,
            )
            .map_err(|e| {
                error!("Session {} failed to store knowledge: {}", self.id, e);
                e
            })?;

        draft.is_complete = true;
        info!(
            "Session {} completed, stored knowledge {} with {} tags",
            self.id,
            record_id,
            tags.len()
        );

        let message = format!(
            "{}\n\n{}\n\n**الكلمات المفتاحية:** {}",
            choose(collector.phrasing(), COMPLETION_MESSAGES),
            document,
            tags.join("، ")
        );
        self.draft = Some(draft);
        self.state = SessionState::Completed {
            record_id: record_id.clone(),
            document: document.clone(),
            tags: tags.clone(),
        };

        Ok(SessionReply {
            message,
            question: None,
            turn: max_turns,
            max_turns,
            is_complete: true,
            record_id: Some(record_id),
            document: Some(document),
            tags,
        })
    }

    /// Drop any draft and return to `Idle`.
    pub fn reset(&mut self) {
        if self.state != SessionState::Idle {
            info!("Session {} reset", self.id);
        }
        self.state = SessionState::Idle;
        self.draft = None;
    }
}
