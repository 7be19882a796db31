//! Run summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::state::{ItemState, Stage};

/// Outcome of one item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub group: String,
    /// 1-based position within the group.
    pub index: usize,
    pub title: String,
    pub url: String,
    pub state: ItemState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One summary line: `<group> #<index> "<title>": <state>` plus the key or the error.
impl fmt::Display for ItemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        };
        write!(f, "{} #{} {:?}: {}", self.group, self.index, title, self.state)?;
        match (&self.error, self.stage, &self.key) {
            (Some(error), Some(stage), _) => write!(f, " at {} ({})", stage.as_str(), error),
            (Some(error), None, _) => write!(f, " ({})", error),
            (None, _, Some(key)) => write!(f, " -> {}", key),
            (None, _, None) => Ok(()),
        }
    }
}

/// Everything a run attempted, with terminal states.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub items: Vec<ItemReport>,
    pub counts: BTreeMap<ItemState, usize>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            items: Vec::new(),
            counts: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, report: ItemReport) {
        *self.counts.entry(report.state).or_insert(0) += 1;
        self.items.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn count(&self, state: ItemState) -> usize {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    /// Items whose bytes reached the store.
    pub fn uploaded(&self) -> usize {
        self.count(ItemState::CleanedUp) + self.count(ItemState::Uploaded)
    }

    pub fn skipped(&self) -> usize {
        self.count(ItemState::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(ItemState::Failed)
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }
}

impl Default for BatchSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(state: ItemState) -> ItemReport {
        ItemReport {
            group: "g".to_string(),
            index: 1,
            title: "t".to_string(),
            url: "https://x".to_string(),
            state,
            stage: None,
            key: None,
            size_bytes: None,
            error: None,
        }
    }

    #[test]
    fn test_counts() {
        let mut summary = BatchSummary::new();
        summary.record(report(ItemState::CleanedUp));
        summary.record(report(ItemState::Skipped));
        summary.record(report(ItemState::Skipped));
        summary.record(report(ItemState::Failed));

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.uploaded(), 1);
        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn test_item_line_shows_key_or_error() {
        let mut ok = report(ItemState::CleanedUp);
        ok.key = Some("g/t.pdf".to_string());
        assert_eq!(ok.to_string(), r#"g #1 "t": cleaned_up -> g/t.pdf"#);

        let mut failed = report(ItemState::Failed);
        failed.key = Some("g/t.pdf".to_string());
        failed.stage = Some(Stage::Transfer);
        failed.error = Some("HTTP 403".to_string());
        assert_eq!(
            failed.to_string(),
            r#"g #1 "t": failed at transfer (HTTP 403)"#
        );

        let mut untitled = report(ItemState::Skipped);
        untitled.title = String::new();
        assert_eq!(untitled.to_string(), r#"g #1 "https://x": skipped"#);
    }

    #[test]
    fn test_serializes_counts_by_state_name() {
        let mut summary = BatchSummary::new();
        summary.record(report(ItemState::CleanedUp));
        summary.finish();

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["counts"]["cleaned_up"], 1);
        assert_eq!(json["items"][0]["state"], "cleaned_up");
        assert!(json["items"][0].get("error").is_none());
    }
}
