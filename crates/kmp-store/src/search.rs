//! Keyword scoring for knowledge search.
//!
//! Per query term: content occurrences ×2 (capped at 10), +5 when the term
//! appears in the department, +5 when it appears in the employee name.
//! The whole query appearing in the content adds 15.

use crate::types::{KnowledgeRecord, ScoredRecord};

const OCCURRENCE_WEIGHT: u32 = 2;
const OCCURRENCE_CAP: u32 = 10;
const FIELD_MATCH: u32 = 5;
const PHRASE_MATCH: u32 = 15;

/// Score one record against a query. Zero means no match.
pub fn keyword_score(query: &str, record: &KnowledgeRecord) -> u32 {
    let query = query.trim().to_lowercase();
    let content = record.content.to_lowercase();
    let department = record.department.to_lowercase();
    let employee = record.employee_name.to_lowercase();

    let mut score = 0;
    for term in query.split_whitespace() {
        let occurrences = content.matches(term).count() as u32;
        score += (occurrences * OCCURRENCE_WEIGHT).min(OCCURRENCE_CAP);
        if department.contains(term) {
            score += FIELD_MATCH;
        }
        if employee.contains(term) {
            score += FIELD_MATCH;
        }
    }
    if !query.is_empty() && content.contains(&query) {
        score += PHRASE_MATCH;
    }
    score
}

/// Score and rank records, keeping only matches, best first.
/// Ties keep their input order.
pub fn rank_knowledge(records: Vec<KnowledgeRecord>, query: &str) -> Vec<ScoredRecord> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<ScoredRecord> = records
        .into_iter()
        .filter_map(|record| {
            let score = keyword_score(query, &record);
            (score > 0).then_some(ScoredRecord { record, score })
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}
