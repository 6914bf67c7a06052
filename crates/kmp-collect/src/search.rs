//! Knowledge search: keyword ranking from the store, or collaborator-ranked
//! semantic search that degrades to keyword ranking.

use kmp_core::Result;
use kmp_store::{KnowledgeRecord, ScoredRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::collector::Collector;

const SEMANTIC_PROMPT: &str = "You are a knowledge management assistant helping with semantic \
search. Given a user query and a set of knowledge items, return the IDs of the most relevant \
items in order of relevance. Return response as a JSON array of IDs with at most 5 results.";

/// Results returned by semantic search and its keyword fallback.
pub const SEMANTIC_LIMIT: usize = 5;

const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Keyword,
    Semantic,
}

/// One search result. `score` is set for keyword matches only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub record: KnowledgeRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl From<ScoredRecord> for SearchHit {
    fn from(scored: ScoredRecord) -> Self {
        Self {
            record: scored.record,
            score: Some(scored.score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub mode: SearchMode,
    /// True when semantic search was requested but keyword ranking answered.
    pub fell_back: bool,
    pub results: Vec<SearchHit>,
}

/// Record ids out of a `{"ids": [...]}` object or a bare array.
fn ids_from_reply(reply: &Value) -> Option<Vec<String>> {
    let items = match reply {
        Value::Array(items) => items,
        Value::Object(map) => map.get("ids")?.as_array()?,
        _ => return None,
    };
    Some(
        items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
    )
}

/// Records named by `ids`, in that order, unknown ids dropped.
fn pick_by_ids(records: &[KnowledgeRecord], ids: &[String]) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = Vec::new();
    for id in ids {
        if hits.len() == SEMANTIC_LIMIT {
            break;
        }
        if hits.iter().any(|h| &h.record.id == id) {
            continue;
        }
        if let Some(record) = records.iter().find(|r| &r.id == id) {
            hits.push(SearchHit {
                record: record.clone(),
                score: None,
            });
        }
    }
    hits
}

fn corpus(records: &[KnowledgeRecord]) -> String {
    records
        .iter()
        .map(|r| {
            let preview: String = r.content.chars().take(PREVIEW_CHARS).collect();
            format!("ID: {}\nContent: {}...", r.id, preview)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl Collector {
    /// Search stored knowledge. Store failures propagate; collaborator
    /// failures in semantic mode fall back to keyword ranking.
    pub async fn search(&self, query: &str, mode: SearchMode) -> Result<SearchResults> {
        let query = query.trim();
        match mode {
            SearchMode::Keyword => {
                let results = self
                    .store()
                    .search_knowledge(query)?
                    .into_iter()
                    .map(SearchHit::from)
                    .collect();
                Ok(SearchResults {
                    mode,
                    fell_back: false,
                    results,
                })
            }
            SearchMode::Semantic => self.semantic_search(query).await,
        }
    }

    async fn semantic_search(&self, query: &str) -> Result<SearchResults> {
        let records = self.store().scan_knowledge()?;
        if records.is_empty() || query.is_empty() {
            return Ok(SearchResults {
                mode: SearchMode::Semantic,
                fell_back: false,
                results: Vec::new(),
            });
        }

        let input = format!("Query: {}\n\nKnowledge Items:\n{}", query, corpus(&records));
        let picked = match self.ask_structured(SEMANTIC_PROMPT, &input).await {
            Ok(reply) => match ids_from_reply(&reply) {
                Some(ids) => pick_by_ids(&records, &ids),
                None => {
                    warn!("Semantic search reply had no id list");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Semantic search falling back to keyword ranking: {}", e);
                Vec::new()
            }
        };

        if !picked.is_empty() {
            debug!("Semantic search picked {} records", picked.len());
            return Ok(SearchResults {
                mode: SearchMode::Semantic,
                fell_back: false,
                results: picked,
            });
        }

        let results = kmp_store::search::rank_knowledge(records, query)
            .into_iter()
            .take(SEMANTIC_LIMIT)
            .map(SearchHit::from)
            .collect();
        Ok(SearchResults {
            mode: SearchMode::Semantic,
            fell_back: true,
            results,
        })
    }
}
