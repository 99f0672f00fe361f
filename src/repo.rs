use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Invalid repository reference: {0} (expected a GitHub URL or owner/name)")]
    InvalidReference(String),
}

/// Validated (owner, name) pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse a repository reference into its owner and name.
///
/// Accepted forms:
/// - https://github.com/owner/name
/// - http://github.com/owner/name
/// - github.com/owner/name
/// - owner/name
///
/// A trailing .git suffix and surrounding slashes are stripped.
/// Returns RepoError::InvalidReference for anything else.
pub fn parse_repo_ref(input: &str) -> Result<RepoRef, RepoError> {
    let trimmed = input.trim().trim_matches('/');
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let parts: Vec<&str> = without_scheme
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let (owner, name) = if let Some(idx) = parts.iter().position(|p| *p == "github.com") {
        match (parts.get(idx + 1), parts.get(idx + 2)) {
            (Some(owner), Some(name)) => (*owner, *name),
            _ => return Err(RepoError::InvalidReference(input.to_string())),
        }
    } else if parts.len() == 2 {
        (parts[0], parts[1])
    } else {
        return Err(RepoError::InvalidReference(input.to_string()));
    };

    let name = name.strip_suffix(".git").unwrap_or(name);

    if owner.is_empty()
        || name.is_empty()
        || owner.contains(char::is_whitespace)
        || name.contains(char::is_whitespace)
    {
        return Err(RepoError::InvalidReference(input.to_string()));
    }

    Ok(RepoRef {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}
