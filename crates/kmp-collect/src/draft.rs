//! The in-progress knowledge item a collection session works on.

use serde::{Deserialize, Serialize};

/// One follow-up round. `answer` stays empty while the question is pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn pending(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: String::new(),
        }
    }
}

/// Who submitted the knowledge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub employee_name: String,
    pub department: String,
}

/// Mutable state of one knowledge item under collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDraft {
    /// As submitted. Never changes after creation.
    pub original_text: String,
    /// Normalized and enhanced text; the basis for follow-up questions and
    /// the compiled document.
    pub normalized_text: String,
    pub turns: Vec<Turn>,
    pub is_complete: bool,
    pub author: Author,
}

impl KnowledgeDraft {
    pub fn new(original_text: String, normalized_text: String, author: Author) -> Self {
        Self {
            original_text,
            normalized_text,
            turns: Vec::new(),
            is_complete: false,
            author,
        }
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.turns.iter().map(|t| t.question.as_str())
    }

    /// Turns whose answer carries text, in order.
    pub fn answered_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| !t.answer.trim().is_empty())
    }

    /// Normalized text followed by every non-empty answer, one per line.
    pub fn context_text(&self) -> String {
        let mut context = self.normalized_text.clone();
        for turn in self.answered_turns() {
            context.push('\n');
            context.push_str(&turn.answer);
        }
        context
    }
}
