//! In-memory snapshot of every issue managed by the store.
//!
//! The snapshot is refreshed wholesale: one listing call replaces the whole
//! set once it is older than the configured expiry. Single writes patch the
//! snapshot in place (append on create, replace by issue number on
//! update/close) so they don't force a refetch.

use std::time::Duration;

use tokio::time::Instant;

use crate::client::ThrottledTransport;
use crate::error::{IssueDbError, Result};
use crate::repo::RepoId;
use crate::transport::{IssueState, IssueTransport, RawIssue};

pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RecordCache {
    issues: Vec<RawIssue>,
    refreshed_at: Option<Instant>,
    expiry: Duration,
}

impl RecordCache {
    pub fn new(expiry: Duration) -> Self {
        Self {
            issues: Vec::new(),
            refreshed_at: None,
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// True when no snapshot exists or the snapshot has outlived the expiry.
    pub fn is_stale(&self) -> bool {
        match self.refreshed_at {
            None => true,
            Some(at) => at.elapsed() > self.expiry,
        }
    }

    /// Refresh the snapshot if it is stale.
    pub async fn ensure_fresh<T: IssueTransport>(
        &mut self,
        transport: &ThrottledTransport<T>,
        repo: &RepoId,
        label: &str,
    ) -> Result<()> {
        if self.is_stale() {
            self.refresh(transport, repo, label).await?;
        }
        Ok(())
    }

    /// Replace the snapshot with every issue carrying `label`.
    pub async fn refresh<T: IssueTransport>(
        &mut self,
        transport: &ThrottledTransport<T>,
        repo: &RepoId,
        label: &str,
    ) -> Result<&[RawIssue]> {
        let issues = transport
            .list_issues(repo, label)
            .await
            .map_err(|e| IssueDbError::CacheRefresh {
                source: Box::new(e),
            })?;

        tracing::debug!(
            "refreshed issue cache for {repo}: {} issues labeled '{label}'",
            issues.len()
        );
        self.replace_all(issues);
        Ok(&self.issues)
    }

    /// Swap in a complete snapshot and restart the expiry clock.
    pub fn replace_all(&mut self, issues: Vec<RawIssue>) {
        self.issues = issues;
        self.refreshed_at = Some(Instant::now());
    }

    /// Drop the snapshot so the next read refetches.
    pub fn invalidate(&mut self) {
        self.issues.clear();
        self.refreshed_at = None;
    }

    /// First issue titled `key`, in snapshot order.
    ///
    /// Closed issues only match when `include_closed` is set. Keys shared by
    /// several issues resolve to whichever comes first.
    pub fn find_by_key(&self, key: &str, include_closed: bool) -> Option<&RawIssue> {
        self.issues
            .iter()
            .find(|issue| issue.title == key && (include_closed || issue.state == IssueState::Open))
    }

    /// Issues visible under the given filter, in snapshot order.
    pub fn visible(&self, include_closed: bool) -> impl Iterator<Item = &RawIssue> {
        self.issues
            .iter()
            .filter(move |issue| include_closed || issue.state == IssueState::Open)
    }

    /// Append a freshly created issue.
    pub fn push(&mut self, issue: RawIssue) {
        self.issues.push(issue);
    }

    /// Replace the entry with the same issue number.
    ///
    /// Returns false, leaving the snapshot untouched, when no entry matches.
    pub fn replace(&mut self, issue: RawIssue) -> bool {
        match self.issues.iter_mut().find(|cached| cached.number == issue.number) {
            Some(slot) => {
                *slot = issue;
                true
            }
            None => false,
        }
    }

    pub fn issues(&self) -> &[RawIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_EXPIRY)
    }
}
