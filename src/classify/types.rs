use serde::{Deserialize, Serialize};

/// Documentation impact proposed by the model for one PR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocsImpact {
    /// Existing documentation files that need updates
    #[serde(default)]
    pub update_existing: Vec<String>,
    /// New documentation files or sections to create
    #[serde(default)]
    pub create_new: Vec<String>,
    /// Suggested content for the updates
    #[serde(default)]
    pub suggested_content: Vec<String>,
}

/// Structured judgment produced by the model for one PR. Never mutated after
/// creation; parsed directly from the completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Whether the PR affects behavior visible to end users
    pub user_facing: bool,
    /// Documentation changes warranted by the PR
    pub docs_impact: DocsImpact,
    /// The model's brief explanation for its verdict
    pub reasoning: String,
}
