pub mod types;

pub use types::{PrAnalysis, Report};

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::repo::RepoRef;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Markdown,
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Markdown => "md",
            Format::Json => "json",
        }
    }
}

/// Fold per-PR entries into the final report. Pure: counts and doc sets are
/// always derived from the entries.
pub fn build(repo: &RepoRef, since: DateTime<Utc>, entries: Vec<PrAnalysis>) -> Report {
    let mut docs_to_update = BTreeSet::new();
    let mut docs_to_create = BTreeSet::new();
    let mut user_facing_prs = 0;

    for entry in &entries {
        let Some(classification) = &entry.classification else {
            continue;
        };
        if classification.user_facing {
            user_facing_prs += 1;
        }
        docs_to_update.extend(classification.docs_impact.update_existing.iter().cloned());
        docs_to_create.extend(classification.docs_impact.create_new.iter().cloned());
    }

    Report {
        repository: repo.full_name(),
        generated_at: Utc::now(),
        since_date: since,
        total_prs: entries.len(),
        user_facing_prs,
        docs_to_update: docs_to_update.into_iter().collect(),
        docs_to_create: docs_to_create.into_iter().collect(),
        entries,
    }
}

/// Render the report and write it into `output_dir`, returning the path.
///
/// The file name is deterministic from repository name and generation date,
/// so same-day re-runs against the same repository overwrite their report.
/// The content is rendered fully in memory and moved into place with a
/// rename, so an interrupted run never leaves a partial report behind.
#[instrument(skip(report), fields(repo = %report.repository, total = report.total_prs))]
pub fn write(report: &Report, output_dir: &Path, format: Format) -> Result<PathBuf, ReportError> {
    let rendered = match format {
        Format::Markdown => render_markdown(report),
        Format::Json => serde_json::to_string_pretty(report)?,
    };

    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(file_name(report, format));
    let tmp = path.with_extension(format!("{}.tmp", format.extension()));
    debug!(path = %path.display(), "writing report");
    fs::write(&tmp, rendered)?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}

fn file_name(report: &Report, format: Format) -> String {
    let repo_name = report
        .repository
        .rsplit('/')
        .next()
        .unwrap_or(&report.repository);
    format!(
        "doc_impact_{}_{}.{}",
        repo_name,
        report.generated_at.format("%Y%m%d"),
        format.extension()
    )
}

/// Render the fixed-layout Markdown report: header, summary counts,
/// aggregated documentation updates, then one detail entry per fetched PR.
fn render_markdown(report: &Report) -> String {
    let mut md = String::new();
    md.push_str(&format!(
        "# Documentation Update Report for {}\n\n",
        report.repository
    ));
    md.push_str(&format!(
        "Generated on: {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    md.push_str(&format!(
        "Analyzing PRs since: {}\n\n",
        report.since_date.format("%Y-%m-%d")
    ));

    md.push_str("## Summary\n\n");
    md.push_str(&format!("Total PRs analyzed: {}\n", report.total_prs));
    md.push_str(&format!(
        "PRs with user-facing changes: {}\n\n",
        report.user_facing_prs
    ));

    if report.user_facing_prs == 0 {
        md.push_str("No user-facing changes detected in the analyzed PRs.\n\n");
    }

    render_doc_updates(report, &mut md);

    if !report.entries.is_empty() {
        md.push_str("## Detailed PR Analysis\n\n");
        for entry in &report.entries {
            render_entry(entry, &mut md);
        }
    }

    md
}

fn render_doc_updates(report: &Report, md: &mut String) {
    let suggestions: Vec<(u64, &str)> = report
        .entries
        .iter()
        .filter_map(|e| e.classification.as_ref().map(|c| (e.pr_number, c)))
        .flat_map(|(number, c)| {
            c.docs_impact
                .suggested_content
                .iter()
                .map(move |s| (number, s.as_str()))
        })
        .collect();

    if report.docs_to_update.is_empty() && report.docs_to_create.is_empty() && suggestions.is_empty()
    {
        return;
    }

    md.push_str("## Documentation Updates Needed\n\n");

    if !report.docs_to_update.is_empty() {
        md.push_str("### Existing Documentation to Update\n\n");
        for doc in &report.docs_to_update {
            md.push_str(&format!("- {doc}\n"));
        }
        md.push('\n');
    }

    if !report.docs_to_create.is_empty() {
        md.push_str("### New Documentation to Create\n\n");
        for doc in &report.docs_to_create {
            md.push_str(&format!("- {doc}\n"));
        }
        md.push('\n');
    }

    if !suggestions.is_empty() {
        md.push_str("### Suggested Content Updates\n\n");
        for (number, suggestion) in suggestions {
            md.push_str(&format!("- PR #{number}: {suggestion}\n"));
        }
        md.push('\n');
    }
}

fn render_entry(entry: &PrAnalysis, md: &mut String) {
    md.push_str(&format!(
        "### PR #{}: {}\n\n",
        entry.pr_number, entry.pr_title
    ));
    md.push_str(&format!("- URL: {}\n", entry.pr_url));

    let Some(classification) = &entry.classification else {
        let reason = entry.error.as_deref().unwrap_or("unknown error");
        md.push_str(&format!("- Classification failed: {reason}\n\n"));
        return;
    };

    md.push_str(&format!(
        "- User-facing: {}\n",
        if entry.is_user_facing() { "Yes" } else { "No" }
    ));
    md.push_str(&format!("- Reasoning: {}\n\n", classification.reasoning));

    let impact = &classification.docs_impact;
    if !impact.update_existing.is_empty() {
        md.push_str("#### Existing Documentation to Update\n\n");
        for doc in &impact.update_existing {
            md.push_str(&format!("- {doc}\n"));
        }
        md.push('\n');
    }
    if !impact.create_new.is_empty() {
        md.push_str("#### New Documentation to Create\n\n");
        for doc in &impact.create_new {
            md.push_str(&format!("- {doc}\n"));
        }
        md.push('\n');
    }
    if !impact.suggested_content.is_empty() {
        md.push_str("#### Suggested Content\n\n");
        for suggestion in &impact.suggested_content {
            md.push_str(&format!("- {suggestion}\n"));
        }
        md.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classification, DocsImpact};
    use chrono::TimeZone;

    fn repo() -> RepoRef {
        RepoRef {
            owner: "org".to_string(),
            name: "repo".to_string(),
        }
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn entry(number: u64, user_facing: bool, update: &[&str], create: &[&str]) -> PrAnalysis {
        PrAnalysis {
            pr_number: number,
            pr_title: format!("PR {number}"),
            pr_url: format!("https://github.com/org/repo/pull/{number}"),
            classification: Some(Classification {
                user_facing,
                docs_impact: DocsImpact {
                    update_existing: update.iter().map(|s| s.to_string()).collect(),
                    create_new: create.iter().map(|s| s.to_string()).collect(),
                    suggested_content: vec![],
                },
                reasoning: "because".to_string(),
            }),
            error: None,
        }
    }

    fn failed_entry(number: u64) -> PrAnalysis {
        PrAnalysis {
            pr_number: number,
            pr_title: format!("PR {number}"),
            pr_url: format!("https://github.com/org/repo/pull/{number}"),
            classification: None,
            error: Some("completion timed out".to_string()),
        }
    }

    #[test]
    fn test_build_empty() {
        let report = build(&repo(), since(), vec![]);
        assert_eq!(report.total_prs, 0);
        assert_eq!(report.user_facing_prs, 0);
        assert!(report.docs_to_update.is_empty());
        assert!(report.docs_to_create.is_empty());
        assert!(report.entries.is_empty());
    }

    #[test]
    fn test_build_counts() {
        let entries = vec![
            entry(1, true, &[], &[]),
            entry(2, false, &[], &[]),
            entry(3, true, &[], &[]),
            failed_entry(4),
        ];
        let report = build(&repo(), since(), entries);
        assert_eq!(report.total_prs, 4);
        assert_eq!(report.user_facing_prs, 2);
    }

    #[test]
    fn test_build_union_overlapping() {
        let entries = vec![
            entry(1, true, &["docs/a.md", "docs/b.md"], &["docs/new.md"]),
            entry(2, true, &["docs/b.md", "docs/c.md"], &["docs/new.md"]),
        ];
        let report = build(&repo(), since(), entries);
        assert_eq!(report.docs_to_update, vec!["docs/a.md", "docs/b.md", "docs/c.md"]);
        assert_eq!(report.docs_to_create, vec!["docs/new.md"]);
    }

    #[test]
    fn test_build_union_disjoint() {
        let entries = vec![
            entry(1, true, &["docs/x.md"], &[]),
            entry(2, true, &["docs/y.md"], &[]),
        ];
        let report = build(&repo(), since(), entries);
        assert_eq!(report.docs_to_update, vec!["docs/x.md", "docs/y.md"]);
    }

    #[test]
    fn test_build_failed_entries_contribute_nothing() {
        let entries = vec![failed_entry(1), failed_entry(2)];
        let report = build(&repo(), since(), entries);
        assert_eq!(report.total_prs, 2);
        assert_eq!(report.user_facing_prs, 0);
        assert!(report.docs_to_update.is_empty());
    }

    #[test]
    fn test_markdown_three_pr_scenario() {
        let entries = vec![
            entry(1, true, &["docs/cli.md"], &[]),
            entry(2, true, &["docs/config.md"], &[]),
            entry(3, false, &[], &[]),
        ];
        let report = build(&repo(), since(), entries);
        let md = render_markdown(&report);

        assert!(md.contains("Total PRs analyzed: 3"));
        assert!(md.contains("PRs with user-facing changes: 2"));
        assert!(md.contains("### Existing Documentation to Update"));
        assert!(md.contains("- docs/cli.md"));
        assert!(md.contains("- docs/config.md"));
        assert!(md.contains("### PR #3: PR 3"));
        assert!(md.contains("- User-facing: No"));
    }

    #[test]
    fn test_markdown_zero_prs() {
        let report = build(&repo(), since(), vec![]);
        let md = render_markdown(&report);
        assert!(md.contains("Total PRs analyzed: 0"));
        assert!(md.contains("PRs with user-facing changes: 0"));
        assert!(md.contains("No user-facing changes detected"));
        assert!(!md.contains("## Documentation Updates Needed"));
        assert!(!md.contains("## Detailed PR Analysis"));
    }

    #[test]
    fn test_markdown_marks_unclassified_pr() {
        let entries = vec![entry(1, true, &["docs/a.md"], &[]), failed_entry(2)];
        let report = build(&repo(), since(), entries);
        let md = render_markdown(&report);
        assert!(md.contains("Total PRs analyzed: 2"));
        assert!(md.contains("### PR #2: PR 2"));
        assert!(md.contains("- Classification failed: completion timed out"));
    }

    #[test]
    fn test_markdown_suggested_content_keyed_by_pr() {
        let mut e = entry(7, true, &[], &[]);
        if let Some(c) = &mut e.classification {
            c.docs_impact.suggested_content = vec!["Describe the new login flow".to_string()];
        }
        let report = build(&repo(), since(), vec![e]);
        let md = render_markdown(&report);
        assert!(md.contains("### Suggested Content Updates"));
        assert!(md.contains("- PR #7: Describe the new login flow"));
    }

    #[test]
    fn test_json_round_trip() {
        let entries = vec![
            entry(1, true, &["docs/a.md"], &["docs/new.md"]),
            failed_entry(2),
        ];
        let report = build(&repo(), since(), entries);
        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_file_name_deterministic() {
        let mut report = build(&repo(), since(), vec![]);
        report.generated_at = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        assert_eq!(file_name(&report, Format::Markdown), "doc_impact_repo_20240615.md");
        assert_eq!(file_name(&report, Format::Json), "doc_impact_repo_20240615.json");
    }

    #[test]
    fn test_write_markdown_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = build(&repo(), since(), vec![entry(1, true, &["docs/a.md"], &[])]);
        let path = write(&report, dir.path(), Format::Markdown).unwrap();

        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Documentation Update Report for org/repo"));

        // No leftover temp file.
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_write_json_report_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let report = build(&repo(), since(), vec![entry(1, false, &[], &[])]);
        let path = write(&report, dir.path(), Format::Json).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let parsed: Report = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_write_creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports");
        let report = build(&repo(), since(), vec![]);
        let path = write(&report, &nested, Format::Markdown).unwrap();
        assert!(path.exists());
    }
}
