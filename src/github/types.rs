use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A merged pull request with everything the classifier needs.
/// Immutable once fetched; constructed from the listing entry plus the
/// changed-file list and raw diff.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR description body (empty when the author left it blank)
    pub body: String,
    /// HTML URL for the report
    pub url: String,
    /// Author's GitHub login
    pub author: String,
    /// When the PR was merged
    pub merged_at: DateTime<Utc>,
    /// Paths of all files changed by the PR
    pub changed_files: Vec<String>,
    /// Raw unified diff text
    pub diff: String,
}

/// One entry of the /pulls listing response. Only the fields the pipeline
/// consumes are deserialized.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PullListItem {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub html_url: String,
    pub user: Option<User>,
    pub merged_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct User {
    pub login: String,
}

/// One entry of the /pulls/{n}/files response.
#[derive(Debug, Deserialize)]
pub(crate) struct PullFile {
    pub filename: String,
}

/// Release lookup response; used for both tag and latest-release queries.
#[derive(Debug, Deserialize)]
pub(crate) struct Release {
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_pull_list_item() {
        let json = r#"{
            "number": 42,
            "title": "Add OAuth2 login flow",
            "body": "Adds a login command.",
            "html_url": "https://github.com/org/repo/pull/42",
            "user": { "login": "alice" },
            "merged_at": "2024-05-01T12:00:00Z",
            "updated_at": "2024-05-01T12:30:00Z",
            "state": "closed"
        }"#;
        let item: PullListItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.number, 42);
        assert_eq!(item.user.unwrap().login, "alice");
        assert!(item.merged_at.is_some());
    }

    #[test]
    fn test_deserialize_unmerged_pr_has_no_merged_at() {
        let json = r#"{
            "number": 7,
            "title": "Abandoned idea",
            "body": null,
            "html_url": "https://github.com/org/repo/pull/7",
            "user": null,
            "merged_at": null,
            "updated_at": "2024-04-20T08:00:00Z"
        }"#;
        let item: PullListItem = serde_json::from_str(json).unwrap();
        assert!(item.merged_at.is_none());
        assert!(item.body.is_none());
    }

    #[test]
    fn test_deserialize_release() {
        let json = r#"{
            "created_at": "2024-04-01T00:00:00Z",
            "published_at": "2024-04-02T00:00:00Z",
            "tag_name": "v1.2.0"
        }"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert!(release.published_at.unwrap() > release.created_at);
    }
}
