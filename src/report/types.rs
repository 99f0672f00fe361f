use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::github::PullRequest;

/// Per-PR entry in the final report, in fetch (chronological) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrAnalysis {
    pub pr_number: u64,
    pub pr_title: String,
    pub pr_url: String,
    /// None when classification failed; `error` then carries the reason.
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrAnalysis {
    pub fn classified(pr: &PullRequest, classification: Classification) -> Self {
        Self {
            pr_number: pr.number,
            pr_title: pr.title.clone(),
            pr_url: pr.url.clone(),
            classification: Some(classification),
            error: None,
        }
    }

    pub fn unclassified(pr: &PullRequest, error: String) -> Self {
        Self {
            pr_number: pr.number,
            pr_title: pr.title.clone(),
            pr_url: pr.url.clone(),
            classification: None,
            error: Some(error),
        }
    }

    pub fn is_user_facing(&self) -> bool {
        self.classification.as_ref().is_some_and(|c| c.user_facing)
    }
}

/// Complete report for one run. Counts and doc sets are derived from the
/// entries in `build()`, never set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Repository in owner/name form
    pub repository: String,
    pub generated_at: DateTime<Utc>,
    /// Cutoff: only PRs merged at or after this date were analyzed
    pub since_date: DateTime<Utc>,
    pub total_prs: usize,
    pub user_facing_prs: usize,
    /// Union of all per-PR existing-doc lists, sorted
    pub docs_to_update: Vec<String>,
    /// Union of all per-PR new-doc lists, sorted
    pub docs_to_create: Vec<String>,
    /// One entry per fetched PR, in fetch order
    pub entries: Vec<PrAnalysis>,
}
