//! GitHub Issues transport implementation.

use jiff::Timestamp;
use octocrab::Octocrab;
use octocrab::models::IssueState as GitHubIssueState;
use octocrab::models::issues::Issue;
use octocrab::params;
use secrecy::{ExposeSecret, SecretString};

use crate::config::Config;
use crate::error::{IssueDbError, Result};
use crate::repo::RepoId;

use super::error::github_error;
use super::{
    Bucket, BucketStatus, IssueState, IssueTransport, IssueUpdate, NewIssue, RateLimitSnapshot,
    RawIssue,
};

/// GitHub Issues transport
pub struct GitHubTransport {
    client: Octocrab,
}

impl GitHubTransport {
    /// Create a new GitHub transport from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.github_token().ok_or_else(|| {
            IssueDbError::Auth(
                "GitHub token not configured. Set ISSUE_DB_GITHUB_TOKEN or GITHUB_TOKEN, or add auth.github.token to the config file".to_string()
            )
        })?;

        Self::build(&token, config.api_url.as_deref())
    }

    /// Create a new GitHub transport with a token
    pub fn new(token: &SecretString) -> Result<Self> {
        Self::build(token, None)
    }

    fn build(token: &SecretString, api_url: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.expose_secret().to_string());
        if let Some(url) = api_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| IssueDbError::Config(format!("invalid api_url '{url}': {e}")))?;
        }

        let client = builder
            .build()
            .map_err(|e| IssueDbError::Api(format!("Failed to create GitHub client: {}", e)))?;

        Ok(Self { client })
    }
}

impl IssueTransport for GitHubTransport {
    async fn list_issues(&self, repo: &RepoId, label: &str) -> Result<Vec<RawIssue>> {
        let labels = [label.to_string()];
        let first_page = self
            .client
            .issues(repo.owner(), repo.name())
            .list()
            .labels(&labels)
            .state(params::State::All)
            .sort(params::issues::Sort::Created)
            .direction(params::Direction::Descending)
            .per_page(100)
            .send()
            .await
            .map_err(|e| github_error("Failed to list GitHub issues", e))?;

        let issues = self
            .client
            .all_pages(first_page)
            .await
            .map_err(|e| github_error("Failed to page through GitHub issues", e))?;

        Ok(issues
            .iter()
            .filter(|issue| issue.pull_request.is_none())
            .map(convert_github_issue)
            .collect())
    }

    async fn get_issue(&self, repo: &RepoId, number: u64) -> Result<RawIssue> {
        let issue = self
            .client
            .issues(repo.owner(), repo.name())
            .get(number)
            .await
            .map_err(|e| github_error(&format!("Failed to fetch GitHub issue #{number}"), e))?;

        Ok(convert_github_issue(&issue))
    }

    async fn create_issue(&self, repo: &RepoId, issue: &NewIssue) -> Result<RawIssue> {
        let created = self
            .client
            .issues(repo.owner(), repo.name())
            .create(&issue.title)
            .body(&issue.body)
            .labels(issue.labels.clone())
            .assignees(issue.assignees.clone())
            .send()
            .await
            .map_err(|e| {
                github_error(
                    &format!("Failed to create GitHub issue '{}'", issue.title),
                    e,
                )
            })?;

        Ok(convert_github_issue(&created))
    }

    async fn update_issue(
        &self,
        repo: &RepoId,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<RawIssue> {
        let issues_handler = self.client.issues(repo.owner(), repo.name());
        let mut builder = issues_handler.update(number);

        // Only fields that are set are sent; omitted fields keep their
        // current value on GitHub.
        if let Some(title) = &update.title {
            builder = builder.title(title);
        }
        if let Some(body) = &update.body {
            builder = builder.body(body);
        }
        if let Some(labels) = &update.labels {
            builder = builder.labels(labels.as_slice());
        }
        if let Some(assignees) = &update.assignees {
            builder = builder.assignees(assignees.as_slice());
        }

        let updated = builder
            .send()
            .await
            .map_err(|e| github_error(&format!("Failed to update GitHub issue #{number}"), e))?;

        Ok(convert_github_issue(&updated))
    }

    async fn close_issue(&self, repo: &RepoId, number: u64) -> Result<RawIssue> {
        let closed = self
            .client
            .issues(repo.owner(), repo.name())
            .update(number)
            .state(GitHubIssueState::Closed)
            .send()
            .await
            .map_err(|e| github_error(&format!("Failed to close GitHub issue #{number}"), e))?;

        Ok(convert_github_issue(&closed))
    }

    async fn rate_limit(&self) -> Result<RateLimitSnapshot> {
        let limits = self
            .client
            .ratelimit()
            .get()
            .await
            .map_err(|e| github_error("Failed to fetch GitHub rate limits", e))?;

        let mut snapshot = RateLimitSnapshot::default()
            .with_bucket(Bucket::Core, convert_rate(&limits.resources.core))
            .with_bucket(Bucket::Search, convert_rate(&limits.resources.search));
        if let Some(graphql) = &limits.resources.graphql {
            snapshot = snapshot.with_bucket(Bucket::Graphql, convert_rate(graphql));
        }

        Ok(snapshot)
    }

    async fn add_label(
        &self,
        repo: &RepoId,
        name: &str,
        color: &str,
        description: &str,
    ) -> Result<()> {
        self.client
            .issues(repo.owner(), repo.name())
            .create_label(name, color, description)
            .await
            .map_err(|e| github_error(&format!("Failed to create label '{name}'"), e))?;

        Ok(())
    }
}

fn convert_github_issue(issue: &Issue) -> RawIssue {
    let state = match issue.state {
        GitHubIssueState::Closed => IssueState::Closed,
        _ => IssueState::Open,
    };

    RawIssue {
        number: issue.number,
        title: issue.title.clone(),
        body: issue.body.clone().unwrap_or_default(),
        state,
        labels: issue.labels.iter().map(|l| l.name.clone()).collect(),
        assignees: issue.assignees.iter().map(|a| a.login.clone()).collect(),
        url: issue.html_url.to_string(),
    }
}

fn convert_rate(rate: &octocrab::models::Rate) -> BucketStatus {
    let reset_at = i64::try_from(rate.reset)
        .ok()
        .and_then(|secs| Timestamp::from_second(secs).ok())
        .unwrap_or_else(Timestamp::now);

    BucketStatus {
        limit: rate.limit as u64,
        used: rate.used as u64,
        remaining: rate.remaining as u64,
        reset_at,
    }
}
