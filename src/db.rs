//! The document store.
//!
//! [`IssueDb`] maps keys to issue titles and JSON documents to issue bodies.
//! Reads are served from the [`RecordCache`]; writes go through the
//! throttled transport and patch the cache afterwards.

use std::time::Duration;

use serde_json::Value;

use crate::cache::{DEFAULT_CACHE_EXPIRY, RecordCache};
use crate::client::ThrottledTransport;
use crate::codec::{self, Guards};
use crate::config::{Config, DEFAULT_LABEL};
use crate::error::{IssueDbError, Result};
use crate::record::Record;
use crate::repo::RepoId;
use crate::throttle::RetryPolicy;
use crate::transport::{GitHubTransport, IssueTransport, IssueUpdate, NewIssue, RawIssue};

pub const LABEL_COLOR: &str = "000000";
pub const LABEL_DESCRIPTION: &str = "Managed via the issue-db library";

/// Construction-time settings for an [`IssueDb`]
#[derive(Debug, Clone)]
pub struct DbOptions {
    pub label: String,
    pub cache_expiry: Duration,
    pub retry: RetryPolicy,
    pub guards: Guards,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            cache_expiry: DEFAULT_CACHE_EXPIRY,
            retry: RetryPolicy::default(),
            guards: Guards::default(),
        }
    }
}

impl From<&Config> for DbOptions {
    fn from(config: &Config) -> Self {
        Self {
            label: config.label.clone(),
            cache_expiry: config.cache_expiry(),
            retry: config.retry.clone(),
            guards: Guards::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub include_closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub include_closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Also treat a closed record with the same key as existing
    pub include_closed: bool,
    pub text_before: Option<String>,
    pub text_after: Option<String>,
    /// Extra labels; the management label is always added
    pub labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub include_closed: bool,
    /// Replaces the existing prose before the data when set
    pub text_before: Option<String>,
    /// Replaces the existing prose after the data when set
    pub text_after: Option<String>,
    /// Replaces the issue's labels when set; the management label is kept
    pub labels: Option<Vec<String>>,
    /// Replaces the issue's assignees when set
    pub assignees: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub include_closed: bool,
    pub labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
}

/// A JSON document store backed by the issues of one repository.
///
/// All methods take `&mut self`: an instance serves one caller at a time.
pub struct IssueDb<T> {
    repo: RepoId,
    label: String,
    guards: Guards,
    transport: ThrottledTransport<T>,
    cache: RecordCache,
}

impl IssueDb<GitHubTransport> {
    /// Connect to GitHub using the configured repository and token.
    pub fn from_config(config: &Config) -> Result<Self> {
        let repo = config.repo_id()?;
        let transport = GitHubTransport::from_config(config)?;
        Ok(Self::with_repo(transport, repo, DbOptions::from(config)))
    }
}

impl<T: IssueTransport> IssueDb<T> {
    /// Create a store over `repo` ("owner/name").
    pub fn new(transport: T, repo: &str, options: DbOptions) -> Result<Self> {
        let repo = RepoId::parse(repo)?;
        Ok(Self::with_repo(transport, repo, options))
    }

    fn with_repo(transport: T, repo: RepoId, options: DbOptions) -> Self {
        Self {
            repo,
            label: options.label,
            guards: options.guards,
            transport: ThrottledTransport::new(transport, options.retry),
            cache: RecordCache::new(options.cache_expiry),
        }
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn transport(&self) -> &ThrottledTransport<T> {
        &self.transport
    }

    /// Create the record `key` unless it already exists.
    ///
    /// An existing record is returned untouched; create never overwrites.
    pub async fn create(&mut self, key: &str, data: &Value, options: CreateOptions) -> Result<Record> {
        if let Some(existing) = self.find(key, options.include_closed).await? {
            tracing::info!(
                "record '{key}' already exists as issue #{}, leaving it unchanged",
                existing.number
            );
            return Record::from_issue(&existing, &self.guards);
        }

        let body = codec::encode(
            data,
            options.text_before.as_deref(),
            options.text_after.as_deref(),
            &self.guards,
        )?;

        let new_issue = NewIssue {
            title: key.to_string(),
            body,
            labels: self.with_management_label(options.labels.unwrap_or_default()),
            assignees: options.assignees.unwrap_or_default(),
        };

        let issue = self.transport.create_issue(&self.repo, &new_issue).await?;
        tracing::info!("created record '{key}' as issue #{}", issue.number);

        let record = Record::from_issue(&issue, &self.guards);
        self.cache.push(issue);
        record
    }

    /// Read the record `key`.
    pub async fn read(&mut self, key: &str, options: ReadOptions) -> Result<Record> {
        let issue = self.require(key, options.include_closed).await?;
        Record::from_issue(&issue, &self.guards)
    }

    /// Replace the data of record `key`.
    ///
    /// Prose around the data is kept unless overridden. Labels and assignees
    /// are only sent when supplied, so omitting them preserves the issue's
    /// current sets.
    pub async fn update(&mut self, key: &str, data: &Value, options: UpdateOptions) -> Result<Record> {
        let existing = self.require(key, options.include_closed).await?;
        let current = Record::from_issue(&existing, &self.guards)?;

        let text_before = options.text_before.unwrap_or(current.text_before);
        let text_after = options.text_after.unwrap_or(current.text_after);
        let body = codec::encode(data, Some(text_before.as_str()), Some(text_after.as_str()), &self.guards)?;

        let update = IssueUpdate {
            title: Some(key.to_string()),
            body: Some(body),
            labels: options.labels.map(|labels| self.with_management_label(labels)),
            assignees: options.assignees,
        };

        let issue = self
            .transport
            .update_issue(&self.repo, existing.number, &update)
            .await?;
        tracing::info!("updated record '{key}' (issue #{})", issue.number);

        let record = Record::from_issue(&issue, &self.guards);
        self.patch_cache(issue).await;
        record
    }

    /// Soft-delete the record `key` by closing its issue.
    ///
    /// The closed record stays readable with `include_closed`.
    pub async fn delete(&mut self, key: &str, options: DeleteOptions) -> Result<Record> {
        let existing = self.require(key, options.include_closed).await?;

        let update = IssueUpdate {
            labels: options.labels.map(|labels| self.with_management_label(labels)),
            assignees: options.assignees,
            ..IssueUpdate::default()
        };
        if !update.is_empty() {
            self.transport
                .update_issue(&self.repo, existing.number, &update)
                .await?;
        }

        let issue = self.transport.close_issue(&self.repo, existing.number).await?;
        tracing::info!("deleted record '{key}' (closed issue #{})", issue.number);

        let record = Record::from_issue(&issue, &self.guards);
        self.patch_cache(issue).await;
        record
    }

    /// Keys of all records visible under `options`, in cache order.
    pub async fn list_keys(&mut self, options: ListOptions) -> Result<Vec<String>> {
        self.ensure_fresh().await?;
        Ok(self
            .cache
            .visible(options.include_closed)
            .map(|issue| issue.title.clone())
            .collect())
    }

    /// All records visible under `options`, decoded.
    pub async fn list(&mut self, options: ListOptions) -> Result<Vec<Record>> {
        self.ensure_fresh().await?;
        self.cache
            .visible(options.include_closed)
            .map(|issue| Record::from_issue(issue, &self.guards))
            .collect()
    }

    /// Refetch the cache now, returning the raw issues.
    pub async fn refresh(&mut self) -> Result<Vec<RawIssue>> {
        let issues = self
            .cache
            .refresh(&self.transport, &self.repo, &self.label)
            .await?;
        Ok(issues.to_vec())
    }

    /// Make sure the management label exists in the repository.
    ///
    /// Returns true if the label was created, false if it already existed.
    pub async fn ensure_label(&mut self) -> Result<bool> {
        match self
            .transport
            .add_label(&self.repo, &self.label, LABEL_COLOR, LABEL_DESCRIPTION)
            .await
        {
            Ok(()) => {
                tracing::info!("created label '{}' in {}", self.label, self.repo);
                Ok(true)
            }
            Err(e) if e.is_already_exists() => {
                tracing::debug!("label '{}' already exists in {}", self.label, self.repo);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_fresh(&mut self) -> Result<()> {
        self.cache
            .ensure_fresh(&self.transport, &self.repo, &self.label)
            .await
    }

    async fn find(&mut self, key: &str, include_closed: bool) -> Result<Option<RawIssue>> {
        self.ensure_fresh().await?;
        Ok(self.cache.find_by_key(key, include_closed).cloned())
    }

    async fn require(&mut self, key: &str, include_closed: bool) -> Result<RawIssue> {
        self.find(key, include_closed)
            .await?
            .ok_or_else(|| IssueDbError::RecordNotFound(key.to_string()))
    }

    /// Swap the written issue into the cache, refetching if it has vanished.
    ///
    /// The write has already landed, so a failed refetch only drops the
    /// snapshot and the next read starts from the remote.
    async fn patch_cache(&mut self, issue: RawIssue) {
        let number = issue.number;
        if self.cache.replace(issue) {
            return;
        }

        tracing::warn!("issue #{number} is missing from the cache, forcing a full refresh");
        if let Err(e) = self
            .cache
            .refresh(&self.transport, &self.repo, &self.label)
            .await
        {
            tracing::warn!("cache repair after writing issue #{number} failed: {e}");
            self.cache.invalidate();
        }
    }

    /// The management label followed by `labels`, with the management label
    /// appearing exactly once.
    ///
    /// Label writes replace the whole set, so every path that sends labels
    /// keeps the issue inside the store.
    fn with_management_label(&self, labels: Vec<String>) -> Vec<String> {
        let mut merged = vec![self.label.clone()];
        merged.extend(labels.into_iter().filter(|l| *l != self.label));
        merged
    }
}
