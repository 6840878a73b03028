//! Repository identifiers of the form `owner/name`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IssueDbError, Result};

static REPO_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("repo part regex should compile"));

/// A validated `owner/name` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Parse from string like "octocat/hello-world"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| IssueDbError::RepoFormat(s.to_string()))?;

        if !REPO_PART_RE.is_match(owner) || !REPO_PART_RE.is_match(name) {
            return Err(IssueDbError::RepoFormat(s.to_string()));
        }

        Ok(RepoId {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = IssueDbError;

    fn from_str(s: &str) -> Result<Self> {
        RepoId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let repo = RepoId::parse("octocat/hello-world").unwrap();
        assert_eq!(repo.owner(), "octocat");
        assert_eq!(repo.name(), "hello-world");
        assert_eq!(repo.to_string(), "octocat/hello-world");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let repo: RepoId = " monalisa/data.store ".parse().unwrap();
        assert_eq!(repo.name(), "data.store");
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "octocat", "octocat/", "/repo", "a/b/c", "own er/repo", "o/r?x"] {
            let err = RepoId::parse(input).unwrap_err();
            assert!(
                matches!(err, IssueDbError::RepoFormat(_)),
                "expected RepoFormat for {input:?}, got {err:?}"
            );
        }
    }
}
