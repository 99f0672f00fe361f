pub mod types;

pub use types::PullRequest;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::repo::RepoRef;
use types::{PullFile, PullListItem, Release};

/// GitHub listing page size (API maximum).
const PAGE_SIZE: u32 = 100;

/// Cap on PRs analyzed per run, keeping cost and wall-clock time bounded.
const MAX_PRS: usize = 100;

/// Simultaneous in-flight per-PR detail fetches (files + diff).
const DETAIL_CONCURRENCY: usize = 4;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Release tag not found: {0}")]
    TagNotFound(String),

    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Thin client over the GitHub REST API. Holds the token and base URL from the
/// resolved configuration; one instance per run.
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self, GitHubError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            token: config.github_token.clone(),
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("User-Agent", "doc-impact")
            .bearer_auth(&self.token)
    }

    /// Determine the cutoff timestamp for the run.
    ///
    /// Precedence: release tag's creation date, then an explicit --since date,
    /// then the latest release's publish date, then 30 days ago. The --since /
    /// --release-tag conflict is rejected at the CLI layer, so at most one of
    /// them is set here.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn resolve_cutoff(
        &self,
        repo: &RepoRef,
        since: Option<&str>,
        release_tag: Option<&str>,
    ) -> Result<DateTime<Utc>, GitHubError> {
        if let Some(tag) = release_tag {
            let date = self.release_date_for_tag(repo, tag).await?;
            info!(tag, cutoff = %date, "using release tag date");
            return Ok(date);
        }

        if let Some(raw) = since {
            let date = parse_since_date(raw)?;
            info!(cutoff = %date, "using explicit --since date");
            return Ok(date);
        }

        if let Some(date) = self.latest_release_date(repo).await? {
            info!(cutoff = %date, "using latest release date");
            return Ok(date);
        }

        let fallback = Utc::now() - Duration::days(30);
        warn!(cutoff = %fallback, "no releases found, falling back to 30 days ago");
        Ok(fallback)
    }

    async fn release_date_for_tag(
        &self,
        repo: &RepoRef,
        tag: &str,
    ) -> Result<DateTime<Utc>, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.api_url, repo.owner, repo.name, tag
        );
        let response = self.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GitHubError::TagNotFound(tag.to_string()));
        }
        let release: Release = response.error_for_status()?.json().await?;
        Ok(release.created_at)
    }

    async fn latest_release_date(
        &self,
        repo: &RepoRef,
    ) -> Result<Option<DateTime<Utc>>, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url, repo.owner, repo.name
        );
        let response = self.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let release: Release = response.error_for_status()?.json().await?;
        Ok(Some(release.published_at.unwrap_or(release.created_at)))
    }

    /// Fetch all PRs merged at or after the cutoff, in ascending merge order,
    /// with their changed-file lists and raw diffs. Fails atomically: any
    /// request error aborts the whole fetch.
    #[instrument(skip(self), fields(repo = %repo, cutoff = %cutoff))]
    pub async fn fetch_merged_prs(
        &self,
        repo: &RepoRef,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let url = format!("{}/repos/{}/{}/pulls", self.api_url, repo.owner, repo.name);
        let mut selected: Vec<PullListItem> = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!(page, "fetching pull request listing page");
            let per_page = PAGE_SIZE.to_string();
            let page_param = page.to_string();
            let items: Vec<PullListItem> = self
                .get(&url)
                .query(&[
                    ("state", "closed"),
                    ("sort", "updated"),
                    ("direction", "desc"),
                    ("per_page", per_page.as_str()),
                    ("page", page_param.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if items.is_empty() {
                break;
            }
            // Listing is sorted by updated_at descending and merged_at never
            // exceeds updated_at, so once a whole page is older than the cutoff
            // no later page can contain a qualifying PR.
            let exhausted = page_exhausted(&items, cutoff);
            selected.extend(select_merged_since(items, cutoff));
            if exhausted || selected.len() >= MAX_PRS {
                break;
            }
            page += 1;
        }

        if selected.len() > MAX_PRS {
            warn!(
                found = selected.len(),
                kept = MAX_PRS,
                "too many merged PRs since cutoff, keeping the most recent"
            );
            selected.truncate(MAX_PRS);
        }

        sort_chronological(&mut selected);
        debug!(count = selected.len(), "selected merged PRs, fetching details");

        // buffered() preserves input order, so the chronological sort above
        // survives the concurrent detail fetches.
        let prs: Vec<PullRequest> =
            stream::iter(selected.into_iter().map(|item| self.fetch_details(repo, item)))
                .buffered(DETAIL_CONCURRENCY)
                .try_collect()
                .await?;

        Ok(prs)
    }

    /// Fetch the changed-file list and raw diff for one selected PR and
    /// assemble the full record.
    async fn fetch_details(
        &self,
        repo: &RepoRef,
        item: PullListItem,
    ) -> Result<PullRequest, GitHubError> {
        let changed_files = self.fetch_changed_files(repo, item.number).await?;
        let diff = self.fetch_diff(repo, item.number).await?;
        debug!(
            pr = item.number,
            files = changed_files.len(),
            diff_bytes = diff.len(),
            "fetched PR details"
        );

        // merged_at is guaranteed by select_merged_since; fall back to
        // updated_at rather than panic if the invariant is ever violated.
        let merged_at = item.merged_at.unwrap_or(item.updated_at);

        Ok(PullRequest {
            number: item.number,
            title: item.title,
            body: item.body.unwrap_or_default(),
            url: item.html_url,
            author: item
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| "unknown".to_string()),
            merged_at,
            changed_files,
            diff,
        })
    }

    async fn fetch_changed_files(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<String>, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/files",
            self.api_url, repo.owner, repo.name, number
        );
        let mut files = Vec::new();
        let mut page: u32 = 1;
        loop {
            let per_page = PAGE_SIZE.to_string();
            let page_param = page.to_string();
            let batch: Vec<PullFile> = self
                .get(&url)
                .query(&[
                    ("per_page", per_page.as_str()),
                    ("page", page_param.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let done = (batch.len() as u32) < PAGE_SIZE;
            files.extend(batch.into_iter().map(|f| f.filename));
            if done {
                break;
            }
            page += 1;
        }
        Ok(files)
    }

    async fn fetch_diff(&self, repo: &RepoRef, number: u64) -> Result<String, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, repo.owner, repo.name, number
        );
        let diff = self
            .get(&url)
            .header("Accept", "application/vnd.github.diff")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(diff)
    }
}

/// Parse a --since value as a YYYY-MM-DD date, interpreted as midnight UTC.
pub fn parse_since_date(raw: &str) -> Result<DateTime<Utc>, GitHubError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| GitHubError::InvalidDate(raw.to_string()))
}

/// Keep only PRs actually merged at or after the cutoff.
fn select_merged_since(items: Vec<PullListItem>, cutoff: DateTime<Utc>) -> Vec<PullListItem> {
    items
        .into_iter()
        .filter(|item| item.merged_at.is_some_and(|m| m >= cutoff))
        .collect()
}

/// True when every item on the page was last updated before the cutoff.
fn page_exhausted(items: &[PullListItem], cutoff: DateTime<Utc>) -> bool {
    items.iter().all(|item| item.updated_at < cutoff)
}

/// Sort ascending by merge time. The API contract on listing order is
/// unstated, so ordering for the report is established here.
fn sort_chronological(items: &mut [PullListItem]) {
    items.sort_by_key(|item| item.merged_at);
}
