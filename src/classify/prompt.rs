use crate::github::PullRequest;

/// Diffs are truncated to keep the request inside the model's context budget.
const MAX_DIFF_CHARS: usize = 10_000;

/// Fixed instruction asking the model for a JSON verdict on documentation
/// impact. The schema here must stay in sync with `types::Classification`.
pub const SYSTEM_PROMPT: &str = r#"You are a documentation specialist analyzing GitHub pull requests. Your task is to:

1. Determine if this PR contains end-user facing changes (Yes/No)
   - End-user facing changes are those that affect the people who use the finished software product, NOT the developers working on the code

   Examples of end-user facing changes:
   - Changes to CLI commands or arguments
   - Changes to configuration file formats
   - Changes to APIs that users directly interact with
   - New features or modifications to existing features that users interact with
   - Changes to error messages shown to users
   - Changes to user documentation

   Examples of NON-user facing changes:
   - Internal refactoring
   - Code cleanup or formatting
   - Development documentation updates
   - Test improvements
   - CI/CD pipeline changes
   - Internal logging changes
   - Performance optimizations (unless they require user action)
   - Security fixes (unless they require user action)

2. Identify documentation impact:
   - Only suggest documentation updates for changes that affect end-users
   - Existing user documentation files that need updates
   - New user documentation sections that should be created
   - Suggested content for user-facing documentation updates

Analyze the PR title, description, and code changes (diff) to make your determination.
Be conservative - if a change is purely internal, mark it as not user-facing.

Your response MUST be a valid JSON object matching this structure:
{
  "user_facing": boolean,
  "docs_impact": {
    "update_existing": ["list of existing docs to update"],
    "create_new": ["list of new docs to create"],
    "suggested_content": ["list of suggested content or sections"]
  },
  "reasoning": "brief explanation of your analysis and why it is/isn't user-facing"
}

Do not include any text outside the JSON object."#;

/// Assemble the per-PR user message embedding title, description, changed
/// files, and the (truncated) diff.
pub fn user_message(pr: &PullRequest) -> String {
    let files = pr
        .changed_files
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Pull Request #{number}: {title}\n\n\
         Description:\n{body}\n\n\
         Changed Files:\n{files}\n\n\
         Diff:\n```diff\n{diff}\n```\n\n\
         Please analyze this PR and determine if it contains user-facing changes \
         and what documentation updates are needed.",
        number = pr.number,
        title = pr.title,
        body = pr.body,
        files = files,
        diff = truncate_chars(&pr.diff, MAX_DIFF_CHARS),
    )
}

/// Truncate on a char boundary; byte slicing could split a UTF-8 sequence.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_pr(diff: &str) -> PullRequest {
        PullRequest {
            number: 42,
            title: "Add OAuth2 login flow".to_string(),
            body: "Adds a `login` subcommand.".to_string(),
            url: "https://github.com/org/repo/pull/42".to_string(),
            author: "alice".to_string(),
            merged_at: Utc::now(),
            changed_files: vec!["src/cli.rs".to_string(), "docs/cli.md".to_string()],
            diff: diff.to_string(),
        }
    }

    #[test]
    fn test_user_message_embeds_pr_fields() {
        let msg = user_message(&sample_pr("+fn login() {}"));
        assert!(msg.contains("Pull Request #42: Add OAuth2 login flow"));
        assert!(msg.contains("Adds a `login` subcommand."));
        assert!(msg.contains("- src/cli.rs"));
        assert!(msg.contains("- docs/cli.md"));
        assert!(msg.contains("+fn login() {}"));
    }

    #[test]
    fn test_user_message_truncates_long_diff() {
        let long_diff = "x".repeat(MAX_DIFF_CHARS + 500);
        let msg = user_message(&sample_pr(&long_diff));
        assert!(!msg.contains(&long_diff));
        assert!(msg.contains(&"x".repeat(MAX_DIFF_CHARS)));
    }

    #[test]
    fn test_truncate_chars_respects_utf8_boundaries() {
        let s = "héllo wörld";
        assert_eq!(truncate_chars(s, 4), "héll");
        assert_eq!(truncate_chars(s, 100), s);
        assert_eq!(truncate_chars("", 10), "");
    }

    #[test]
    fn test_system_prompt_demands_json_schema() {
        assert!(SYSTEM_PROMPT.contains("\"user_facing\""));
        assert!(SYSTEM_PROMPT.contains("\"docs_impact\""));
        assert!(SYSTEM_PROMPT.contains("\"reasoning\""));
    }
}
