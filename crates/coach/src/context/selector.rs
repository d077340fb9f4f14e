//! Relevance selection — narrowing fetched records before the model sees them.
//!
//! Two strategies:
//!
//! - [`SelectionStrategy::Default`]: goals, then tasks, then journals, each in
//!   the store's natural order, truncated. This is a category-priority
//!   heuristic, not a relevance ranking.
//! - [`SelectionStrategy::Search`]: case-insensitive substring match of the
//!   query against each record's title/description (goals, tasks) or
//!   content (journals). Matches get a fixed per-kind score (goal 0.8,
//!   task 0.7, journal 0.6) that ignores match quality, and are stably
//!   sorted by it.
//!
//! Both are deterministic: identical inputs give identical output order.

use digm_core::record::{RecordItem, RecordKind};
use std::str::FromStr;

pub use digm_core::record::MAX_RELEVANT_ITEMS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    #[default]
    Default,
    Search,
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "search" => Ok(Self::Search),
            other => Err(format!("unknown selection strategy '{other}'")),
        }
    }
}

/// Fixed score for a search match of the given kind.
pub fn kind_weight(kind: RecordKind) -> f32 {
    match kind {
        RecordKind::Goal => 0.8,
        RecordKind::Task => 0.7,
        RecordKind::Journal => 0.6,
    }
}

/// Concatenate goals, tasks, journals in order and keep the first `limit`.
pub fn select_default(
    goals: &[RecordItem],
    tasks: &[RecordItem],
    journals: &[RecordItem],
    limit: usize,
) -> Vec<RecordItem> {
    goals
        .iter()
        .chain(tasks)
        .chain(journals)
        .take(limit)
        .cloned()
        .collect()
}

/// Substring search with fixed per-kind scores, best first.
pub fn search(
    goals: &[RecordItem],
    tasks: &[RecordItem],
    journals: &[RecordItem],
    query: &str,
    limit: usize,
) -> Vec<RecordItem> {
    let query_lower = query.to_lowercase();

    let mut matches: Vec<RecordItem> = goals
        .iter()
        .chain(tasks)
        .chain(journals)
        .filter(|item| item.matches(&query_lower))
        .map(|item| {
            let mut item = item.clone();
            item.relevance_score = Some(kind_weight(item.kind));
            item
        })
        .collect();

    // Vec::sort_by is stable: equal scores keep goal/task/journal order.
    matches.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(limit);
    matches
}

/// The configured selection policy for coaching prompts.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceSelector {
    strategy: SelectionStrategy,
    limit: usize,
}

impl Default for RelevanceSelector {
    fn default() -> Self {
        Self::new(SelectionStrategy::Default, MAX_RELEVANT_ITEMS)
    }
}

impl RelevanceSelector {
    /// `limit` is clamped to `1..=MAX_RELEVANT_ITEMS`.
    pub fn new(strategy: SelectionStrategy, limit: usize) -> Self {
        Self {
            strategy,
            limit: limit.clamp(1, MAX_RELEVANT_ITEMS),
        }
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Select at most `limit` records for `query`.
    pub fn select(
        &self,
        goals: &[RecordItem],
        tasks: &[RecordItem],
        journals: &[RecordItem],
        query: &str,
    ) -> Vec<RecordItem> {
        match self.strategy {
            SelectionStrategy::Default => select_default(goals, tasks, journals, self.limit),
            SelectionStrategy::Search => search(goals, tasks, journals, query, self.limit),
        }
    }
}
