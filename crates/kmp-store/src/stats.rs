//! Dashboard aggregation over stored knowledge and ideas.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::traits::RecordStore;
use crate::types::{Idea, IdeaStatus, KnowledgeRecord};
use kmp_core::Result;

const SECONDS_PER_DAY: i64 = 86_400;
const TOP_CONTRIBUTORS: usize = 10;
const POPULAR_IDEAS: usize = 5;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStats {
    pub total: usize,
    pub by_department: BTreeMap<String, usize>,
    pub today: usize,
    pub week: usize,
    pub month: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_department: BTreeMap<String, usize>,
    pub avg_supporters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub employee_name: String,
    pub contributions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentActivity {
    pub knowledge_count: usize,
    pub ideas_count: usize,
    /// Newest `created_at` across both kinds, epoch seconds.
    pub last_activity: Option<i64>,
}

/// Per-day counts, keyed by `YYYY-MM-DD` (UTC).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: String,
    pub knowledge: usize,
    pub ideas: usize,
}

/// Everything the dashboard shows, computed in one pass over the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub knowledge: KnowledgeStats,
    pub ideas: IdeaStats,
    pub top_contributors: Vec<Contributor>,
    pub popular_ideas: Vec<Idea>,
    pub departments: BTreeMap<String, DepartmentActivity>,
    pub activity: Vec<DailyActivity>,
}

impl DashboardStats {
    pub fn collect(store: &dyn RecordStore) -> Result<Self> {
        let knowledge = store.scan_knowledge()?;
        let ideas = store.scan_ideas()?;
        Ok(Self::compute(&knowledge, &ideas, chrono::Utc::now().timestamp()))
    }

    pub fn compute(knowledge: &[KnowledgeRecord], ideas: &[Idea], now: i64) -> Self {
        Self {
            knowledge: knowledge_stats(knowledge, now),
            ideas: idea_stats(ideas),
            top_contributors: top_contributors(knowledge, TOP_CONTRIBUTORS),
            popular_ideas: popular_ideas(ideas, POPULAR_IDEAS),
            departments: department_activity(knowledge, ideas),
            activity: activity_over_time(knowledge, ideas),
        }
    }
}

/// Whole days elapsed between `created_at` and `now`.
fn age_days(created_at: i64, now: i64) -> i64 {
    (now - created_at).div_euclid(SECONDS_PER_DAY)
}

pub fn knowledge_stats(records: &[KnowledgeRecord], now: i64) -> KnowledgeStats {
    let mut stats = KnowledgeStats {
        total: records.len(),
        ..Default::default()
    };
    for record in records {
        *stats
            .by_department
            .entry(record.department.clone())
            .or_default() += 1;

        let age = age_days(record.created_at, now);
        if age < 1 {
            stats.today += 1;
        }
        if age < 7 {
            stats.week += 1;
        }
        if age < 30 {
            stats.month += 1;
        }
    }
    stats
}

pub fn idea_stats(ideas: &[Idea]) -> IdeaStats {
    let mut by_status: BTreeMap<String, usize> = IdeaStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut by_department = BTreeMap::new();
    let mut total_supporters = 0usize;

    for idea in ideas {
        *by_status.entry(idea.status.as_str().to_string()).or_default() += 1;
        *by_department.entry(idea.department.clone()).or_default() += 1;
        total_supporters += idea.supporters.len();
    }

    let avg_supporters = if ideas.is_empty() {
        0.0
    } else {
        total_supporters as f64 / ideas.len() as f64
    };

    IdeaStats {
        total: ideas.len(),
        by_status,
        by_department,
        avg_supporters,
    }
}

/// Employees ranked by number of knowledge records, ties by name.
pub fn top_contributors(records: &[KnowledgeRecord], limit: usize) -> Vec<Contributor> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.employee_name.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<Contributor> = counts
        .into_iter()
        .map(|(name, contributions)| Contributor {
            employee_name: name.to_string(),
            contributions,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.contributions
            .cmp(&a.contributions)
            .then_with(|| a.employee_name.cmp(&b.employee_name))
    });
    ranked.truncate(limit);
    ranked
}

/// Ideas with the most supporters. Ties keep input order.
pub fn popular_ideas(ideas: &[Idea], limit: usize) -> Vec<Idea> {
    let mut sorted = ideas.to_vec();
    sorted.sort_by(|a, b| b.supporters.len().cmp(&a.supporters.len()));
    sorted.truncate(limit);
    sorted
}

pub fn department_activity(
    records: &[KnowledgeRecord],
    ideas: &[Idea],
) -> BTreeMap<String, DepartmentActivity> {
    let mut departments: BTreeMap<String, DepartmentActivity> = BTreeMap::new();

    let touch = |entry: &mut DepartmentActivity, at: i64| {
        entry.last_activity = Some(entry.last_activity.map_or(at, |prev| prev.max(at)));
    };

    for record in records {
        let entry = departments.entry(record.department.clone()).or_default();
        entry.knowledge_count += 1;
        touch(entry, record.created_at);
    }
    for idea in ideas {
        let entry = departments.entry(idea.department.clone()).or_default();
        entry.ideas_count += 1;
        touch(entry, idea.created_at);
    }
    departments
}

fn day_key(created_at: i64) -> String {
    chrono::DateTime::from_timestamp(created_at, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Knowledge and idea submissions per UTC day, oldest day first.
pub fn activity_over_time(records: &[KnowledgeRecord], ideas: &[Idea]) -> Vec<DailyActivity> {
    let mut days: BTreeMap<String, DailyActivity> = BTreeMap::new();
    for record in records {
        let key = day_key(record.created_at);
        days.entry(key.clone())
            .or_insert_with(|| DailyActivity {
                date: key,
                ..Default::default()
            })
            .knowledge += 1;
    }
    for idea in ideas {
        let key = day_key(idea.created_at);
        days.entry(key.clone())
            .or_insert_with(|| DailyActivity {
                date: key,
                ..Default::default()
            })
            .ideas += 1;
    }
    days.into_values().collect()
}
