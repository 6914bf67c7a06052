//! End-to-end collection sessions against a real SQLite store, with the
//! collaborator unavailable, scripted, slow, or the store failing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use kmp_chat::{ChatMessage, CollaboratorError, TextGenerator, Unavailable};
use kmp_collect::questions::{category_questions, GENERIC_QUESTIONS};
use kmp_collect::{Author, Collector, CollectionSession, Rotating, SearchMode, SessionState};
use kmp_core::{CollectionConfig, Error, Result};
use kmp_store::{Idea, IdeaStatus, KnowledgeRecord, PulseUpdate, RecordStore, SqliteStore};
use kmp_text::{are_similar, Category};
use parking_lot::Mutex;
use tempfile::TempDir;

// ---------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------

/// Replies with queued answers in order, then reports `NotConfigured`.
#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<std::result::Result<String, CollaboratorError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedGenerator {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(
        &self,
        _system: &str,
        turns: &[ChatMessage],
    ) -> std::result::Result<String, CollaboratorError> {
        self.calls.lock().push(turns.to_vec());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Err(CollaboratorError::NotConfigured))
    }
}

/// Never answers within any sane timeout.
struct SlowGenerator;

#[async_trait]
impl TextGenerator for SlowGenerator {
    async fn complete(
        &self,
        _system: &str,
        _turns: &[ChatMessage],
    ) -> std::result::Result<String, CollaboratorError> {
        tokio::time::sleep(Duration::from_secs(300)).await;
        Ok("متأخر جداً".into())
    }
}

/// SQLite store whose knowledge writes fail while `failing` is set.
struct FlakyStore {
    inner: SqliteStore,
    failing: AtomicBool,
}

impl RecordStore for FlakyStore {
    fn put_knowledge_record(
        &self,
        content: &str,
        department: &str,
        employee_name: &str,
        tags: &[String],
    ) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Database("database is locked".into()));
        }
        self.inner
            .put_knowledge_record(content, department, employee_name, tags)
    }

    fn get_knowledge_record(&self, id: &str) -> Result<Option<KnowledgeRecord>> {
        self.inner.get_knowledge_record(id)
    }

    fn scan_knowledge(&self) -> Result<Vec<KnowledgeRecord>> {
        self.inner.scan_knowledge()
    }

    fn put_idea(
        &self,
        title: &str,
        description: &str,
        employee_name: &str,
        department: &str,
    ) -> Result<String> {
        self.inner.put_idea(title, description, employee_name, department)
    }

    fn get_idea(&self, id: &str) -> Result<Option<Idea>> {
        self.inner.get_idea(id)
    }

    fn scan_ideas(&self) -> Result<Vec<Idea>> {
        self.inner.scan_ideas()
    }

    fn set_idea_status(&self, id: &str, status: IdeaStatus) -> Result<()> {
        self.inner.set_idea_status(id, status)
    }

    fn add_supporter(&self, id: &str, employee_name: &str) -> Result<Vec<String>> {
        self.inner.add_supporter(id, employee_name)
    }

    fn put_pulse_update(&self, title: &str, content: &str, department: &str) -> Result<String> {
        self.inner.put_pulse_update(title, content, department)
    }

    fn scan_pulse(&self) -> Result<Vec<PulseUpdate>> {
        self.inner.scan_pulse()
    }

    fn recent_pulse_updates(&self, days: u32) -> Result<Vec<PulseUpdate>> {
        self.inner.recent_pulse_updates(days)
    }
}

// ---------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------

fn open_store() -> (TempDir, Arc<SqliteStore>) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path()).unwrap());
    (dir, store)
}

fn collector_with(
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn RecordStore>,
    config: CollectionConfig,
) -> Collector {
    Collector::new(generator, store, config).with_phrasing(Arc::new(Rotating::new()))
}

fn author() -> Author {
    Author {
        employee_name: "سامي".into(),
        department: "Operations".into(),
    }
}

const ELEVATOR: &str = "يوجد عطل في المصعد";

// ---------------------------------------------------------------
// Offline sessions
// ---------------------------------------------------------------

#[tokio::test]
async fn test_offline_session_completes_after_three_answers() {
    let (_dir, store) = open_store();
    let collector = collector_with(Arc::new(Unavailable), store.clone(), CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    let reply = session.start(&collector, ELEVATOR, author()).await.unwrap();
    let equipment = category_questions(Category::Equipment);
    let first = reply.question.clone().unwrap();
    assert_eq!(first, equipment[0]);
    assert!(reply.message.starts_with("أفهم أن هناك مشكلة تحتاج للصيانة. "));
    assert!(reply.message.ends_with(&first));
    assert_eq!(session.state(), &SessionState::Collecting { turn: 0 });

    let r1 = session.answer(&collector, "منذ يومين").await.unwrap();
    assert_eq!(r1.turn, 2);
    let r2 = session.answer(&collector, "لم تتم أي محاولة").await.unwrap();
    assert_eq!(r2.turn, 3);
    assert!(!r2.is_complete);
    let done = session.answer(&collector, "نعم بشكل كبير").await.unwrap();

    assert!(done.is_complete);
    assert!(done.question.is_none());
    let draft = session.draft().unwrap();
    assert_eq!(draft.turns.len(), 3);
    assert!(draft.is_complete);

    // Follow-ups come from the equipment pool and never repeat.
    let asked: Vec<&str> = draft.questions().collect();
    for q in &asked {
        assert!(equipment.contains(q), "{} not in pool", q);
    }
    for (i, a) in asked.iter().enumerate() {
        for b in &asked[i + 1..] {
            assert!(!are_similar(a, b, 0.7));
        }
    }

    let document = done.document.unwrap();
    assert!(document.starts_with("# يوجد عطل في المصعد\n\n"));
    assert!(document.contains("## تفاصيل المعدة/الجهاز"));
    assert!(document.contains(&format!("### {}\nمنذ يومين", first)));
    assert!((1..=5).contains(&done.tags.len()));

    let record_id = done.record_id.unwrap();
    let stored = store.get_knowledge_record(&record_id).unwrap().unwrap();
    assert_eq!(stored.content, document);
    assert_eq!(stored.employee_name, "سامي");
    assert_eq!(stored.department, "Operations");
    assert_eq!(stored.tags, done.tags);
    assert!(matches!(session.state(), SessionState::Completed { .. }));
}

#[tokio::test]
async fn test_three_empty_answers_compile_skeleton_document() {
    let (_dir, store) = open_store();
    let collector = collector_with(Arc::new(Unavailable), store, CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    session.start(&collector, ELEVATOR, author()).await.unwrap();
    session.answer(&collector, "").await.unwrap();
    session.answer(&collector, "   ").await.unwrap();
    let done = session.answer(&collector, "").await.unwrap();

    let document = done.document.unwrap();
    assert!(document.starts_with("# "));
    assert!(document.contains(ELEVATOR));
    assert!(document.contains("## ملاحظات ختامية"));
    assert!(!document.contains("###"));
}

#[tokio::test]
async fn test_document_and_answers_are_normalized() {
    let (_dir, store) = open_store();
    let collector = collector_with(Arc::new(Unavailable), store, CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    session
        .start(&collector, "يوجد عطل فى المصعد", author())
        .await
        .unwrap();
    session
        .answer(&collector, "ذهبت الى الطابق فى الصباح")
        .await
        .unwrap();

    let draft = session.draft().unwrap();
    assert_eq!(draft.original_text, "يوجد عطل فى المصعد");
    assert_eq!(draft.turns[0].answer, "ذهبت إلى الطابق في الصباح");

    session.answer(&collector, "نعم").await.unwrap();
    let done = session.answer(&collector, "لا").await.unwrap();
    let document = done.document.unwrap();
    assert!(document.starts_with("# يوجد عطل في المصعد\n\nيوجد عطل في المصعد\n\n"));
    assert!(document.contains("ذهبت إلى الطابق في الصباح"));
    assert!(!document.contains(" فى "));
}

#[tokio::test]
async fn test_general_content_uses_generic_questions() {
    let (_dir, store) = open_store();
    let collector = collector_with(Arc::new(Unavailable), store, CollectionConfig::default());
    let mut session = CollectionSession::new("s1");
    let reply = session.start(&collector, "مرحبا بالجميع", author()).await.unwrap();
    assert!(GENERIC_QUESTIONS.contains(&reply.question.unwrap().as_str()));
}

// ---------------------------------------------------------------
// Invalid transitions
// ---------------------------------------------------------------

#[tokio::test]
async fn test_invalid_transitions_leave_session_untouched() {
    let (_dir, store) = open_store();
    let collector = collector_with(Arc::new(Unavailable), store, CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    assert!(matches!(
        session.answer(&collector, "جواب").await,
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(
        session.start(&collector, "  \n", author()).await,
        Err(Error::EmptyInput("text"))
    ));
    assert_eq!(session.state(), &SessionState::Idle);

    session.start(&collector, ELEVATOR, author()).await.unwrap();
    let before = session.draft().cloned();
    assert!(matches!(
        session.start(&collector, "نص آخر", author()).await,
        Err(Error::InvalidState(_))
    ));
    assert_eq!(session.draft().cloned(), before);

    session.reset();
    assert_eq!(session.state(), &SessionState::Idle);
    assert!(session.draft().is_none());
    session.start(&collector, "نص آخر", author()).await.unwrap();
}

#[tokio::test]
async fn test_completed_session_can_start_again() {
    let (_dir, store) = open_store();
    let collector = collector_with(Arc::new(Unavailable), store.clone(), CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    session.start(&collector, ELEVATOR, author()).await.unwrap();
    for _ in 0..3 {
        session.answer(&collector, "لا").await.unwrap();
    }
    assert!(matches!(
        session.answer(&collector, "زيادة").await,
        Err(Error::InvalidState(_))
    ));

    session.start(&collector, "مورد جديد للورق", author()).await.unwrap();
    assert_eq!(session.state(), &SessionState::Collecting { turn: 0 });
    assert_eq!(store.scan_knowledge().unwrap().len(), 1);
}

// ---------------------------------------------------------------
// Store failure
// ---------------------------------------------------------------

#[tokio::test]
async fn test_store_failure_keeps_last_question_pending() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FlakyStore {
        inner: SqliteStore::open(dir.path()).unwrap(),
        failing: AtomicBool::new(true),
    });
    let collector = collector_with(Arc::new(Unavailable), store.clone(), CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    session.start(&collector, ELEVATOR, author()).await.unwrap();
    session.answer(&collector, "أمس").await.unwrap();
    session.answer(&collector, "لا").await.unwrap();

    let err = session.answer(&collector, "نعم").await.unwrap_err();
    assert!(err.is_store_failure());
    assert_eq!(session.state(), &SessionState::Collecting { turn: 2 });
    let draft = session.draft().unwrap();
    assert_eq!(draft.turns.len(), 3);
    assert!(draft.turns[2].answer.is_empty());
    assert!(!draft.is_complete);

    // Retry once the store is back.
    store.failing.store(false, Ordering::SeqCst);
    let done = session.answer(&collector, "نعم").await.unwrap();
    assert!(done.is_complete);
    assert_eq!(store.scan_knowledge().unwrap().len(), 1);
}

// ---------------------------------------------------------------
// Collaborator paths
// ---------------------------------------------------------------

#[tokio::test]
async fn test_enhanced_text_reaches_fallback_document() {
    let (_dir, store) = open_store();
    // Enhancement succeeds; every later call falls back.
    let generator = Arc::new(ScriptedGenerator::new(&["نص محسن عن عطل المصعد"]));
    let collector = collector_with(generator, store.clone(), CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    session.start(&collector, ELEVATOR, author()).await.unwrap();
    assert_eq!(session.draft().unwrap().normalized_text, "نص محسن عن عطل المصعد");
    session.answer(&collector, "منذ الصباح").await.unwrap();
    session.answer(&collector, "").await.unwrap();
    let done = session.answer(&collector, "").await.unwrap();

    let document = done.document.unwrap();
    assert!(document.starts_with("# نص محسن عن عطل المصعد\n\nنص محسن عن عطل المصعد\n\n"));
    let stored = store
        .get_knowledge_record(done.record_id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, document);
}

#[tokio::test]
async fn test_scripted_collaborator_drives_every_step() {
    let (_dir, store) = open_store();
    let generator = Arc::new(ScriptedGenerator::new(&[
        "عطل في المصعد الرئيسي",
        "\"متى لاحظت العطل؟\"",
        "من المسؤول عن الصيانة؟",
        "«هل تم إبلاغ الشركة المصنعة؟»",
        "# عطل المصعد\n\nتفاصيل موحدة",
        r#"{"tags": ["مصعد", "صيانة", "مصعد"]}"#,
    ]));
    let collector = collector_with(generator.clone(), store, CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    let reply = session.start(&collector, ELEVATOR, author()).await.unwrap();
    assert_eq!(reply.question.as_deref(), Some("متى لاحظت العطل؟"));
    assert_eq!(session.draft().unwrap().normalized_text, "عطل في المصعد الرئيسي");

    session.answer(&collector, "صباح اليوم").await.unwrap();
    let r2 = session.answer(&collector, "فريق الصيانة").await.unwrap();
    assert_eq!(r2.question.as_deref(), Some("هل تم إبلاغ الشركة المصنعة؟"));

    let done = session.answer(&collector, "نعم").await.unwrap();
    assert_eq!(done.document.as_deref(), Some("# عطل المصعد\n\nتفاصيل موحدة"));
    assert_eq!(done.tags, vec!["مصعد", "صيانة"]);
    assert!(done.message.ends_with("**الكلمات المفتاحية:** مصعد، صيانة"));

    // Third question call: opening turn, two answered pairs, final instruction.
    let calls = generator.calls.lock();
    assert_eq!(calls.len(), 6);
    let third_question_call = &calls[3];
    assert_eq!(third_question_call.len(), 6);
    assert_eq!(third_question_call[1].role, "assistant");
    assert_eq!(third_question_call[1].content, "متى لاحظت العطل؟");
    assert_eq!(third_question_call[2].content, "صباح اليوم");
}

#[tokio::test]
async fn test_malformed_tag_reply_falls_back() {
    let (_dir, store) = open_store();
    let generator = Arc::new(ScriptedGenerator::new(&[
        "مورد جديد يقدم خدمة توصيل",
        "سؤال أول؟",
        "سؤال ثان؟",
        "سؤال ثالث؟",
        "مورد جديد يقدم خدمة توصيل للمكاتب",
        "these are not tags",
    ]));
    let collector = collector_with(generator, store, CollectionConfig::default());
    let mut session = CollectionSession::new("s1");

    session
        .start(&collector, "مورد جديد يقدم خدمة توصيل", author())
        .await
        .unwrap();
    for answer in ["أ", "ب", "ج"] {
        session.answer(&collector, answer).await.unwrap();
    }
    let SessionState::Completed { tags, .. } = session.state().clone() else {
        panic!("session did not complete");
    };
    assert_eq!(tags[0], "مورد");
    assert!(tags.len() <= 5);
}

#[tokio::test]
async fn test_slow_collaborator_times_out_to_fallback() {
    let (_dir, store) = open_store();
    let config = CollectionConfig {
        llm_timeout_secs: 1,
        ..CollectionConfig::default()
    };
    let collector = collector_with(Arc::new(SlowGenerator), store, config);
    let mut session = CollectionSession::new("s1");

    let started = Instant::now();
    let reply = session.start(&collector, ELEVATOR, author()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(
        reply.question.as_deref(),
        Some(category_questions(Category::Equipment)[0])
    );
}

// ---------------------------------------------------------------
// Search
// ---------------------------------------------------------------

#[tokio::test]
async fn test_semantic_search_falls_back_to_keywords() {
    let (_dir, store) = open_store();
    store
        .put_knowledge_record("فولت فولت فولت في اللوحة", "كهرباء", "سالم", &[])
        .unwrap();
    store
        .put_knowledge_record("مورد جديد للورق", "المشتريات", "هند", &[])
        .unwrap();
    let collector = collector_with(Arc::new(Unavailable), store, CollectionConfig::default());

    let results = collector.search("فولت", SearchMode::Semantic).await.unwrap();
    assert!(results.fell_back);
    assert_eq!(results.results.len(), 1);
    assert!(results.results[0].score.unwrap() > 0);
}

#[tokio::test]
async fn test_semantic_search_uses_reply_order() {
    let (_dir, store) = open_store();
    let a = store.put_knowledge_record("أ", "x", "y", &[]).unwrap();
    let b = store.put_knowledge_record("ب", "x", "y", &[]).unwrap();
    let reply = format!(r#"{{"ids": ["{}", "unknown", "{}"]}}"#, b, a);
    let generator = Arc::new(ScriptedGenerator::new(&[reply.as_str()]));
    let collector = collector_with(generator, store, CollectionConfig::default());

    let results = collector.search("أي شيء", SearchMode::Semantic).await.unwrap();
    assert!(!results.fell_back);
    let ids: Vec<&str> = results.results.iter().map(|h| h.record.id.as_str()).collect();
    assert_eq!(ids, vec![b.as_str(), a.as_str()]);
}

#[tokio::test]
async fn test_keyword_search() {
    let (_dir, store) = open_store();
    store
        .put_knowledge_record("فولت فولت فولت", "كهرباء", "سالم", &[])
        .unwrap();
    store.put_knowledge_record("لا علاقة", "إدارة", "هند", &[]).unwrap();
    let collector = collector_with(Arc::new(Unavailable), store, CollectionConfig::default());

    let results = collector.search("فولت", SearchMode::Keyword).await.unwrap();
    assert!(!results.fell_back);
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0].score, Some(21));
}
