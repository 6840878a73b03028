//! Throttled access to an [`IssueTransport`].

use std::future::Future;

use crate::error::Result;
use crate::repo::RepoId;
use crate::throttle::{RateLimiter, RetryPolicy, SECONDARY_LIMIT_SLEEP, retry_request};
use crate::transport::{Bucket, IssueTransport, IssueUpdate, NewIssue, RateLimitSnapshot, RawIssue};

/// Wraps every transport call with rate-limit accounting, retries and
/// secondary-limit backoff.
pub struct ThrottledTransport<T> {
    inner: T,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl<T: IssueTransport> ThrottledTransport<T> {
    pub fn new(inner: T, retry: RetryPolicy) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(),
            retry,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Run one transport call under `policy`.
    ///
    /// Each attempt first waits for capacity in `bucket`. A secondary rate
    /// limit failure pauses for [`SECONDARY_LIMIT_SLEEP`] and is then handed
    /// back to the retry loop like any other failure.
    async fn call<R, F, Fut>(
        &self,
        bucket: Bucket,
        policy: &RetryPolicy,
        operation: &str,
        op: F,
    ) -> Result<R>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let limiter = &self.limiter;
        let inner = &self.inner;
        let op = &op;

        retry_request(policy, operation, move || async move {
            limiter
                .wait_for_capacity(bucket, move || inner.rate_limit())
                .await?;

            let result = op().await;
            if let Err(e) = &result
                && e.is_secondary_rate_limit()
            {
                tracing::warn!(
                    "{operation} hit a secondary rate limit, pausing {:?}: {e}",
                    SECONDARY_LIMIT_SLEEP
                );
                tokio::time::sleep(SECONDARY_LIMIT_SLEEP).await;
            }
            result
        })
        .await
    }

    pub async fn list_issues(&self, repo: &RepoId, label: &str) -> Result<Vec<RawIssue>> {
        let inner = &self.inner;
        self.call(Bucket::Search, &self.retry, "list issues", move || {
            inner.list_issues(repo, label)
        })
        .await
    }

    pub async fn get_issue(&self, repo: &RepoId, number: u64) -> Result<RawIssue> {
        let inner = &self.inner;
        self.call(Bucket::Core, &self.retry, "get issue", move || {
            inner.get_issue(repo, number)
        })
        .await
    }

    pub async fn create_issue(&self, repo: &RepoId, issue: &NewIssue) -> Result<RawIssue> {
        let inner = &self.inner;
        self.call(Bucket::Core, &self.retry, "create issue", move || {
            inner.create_issue(repo, issue)
        })
        .await
    }

    pub async fn update_issue(
        &self,
        repo: &RepoId,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<RawIssue> {
        let inner = &self.inner;
        self.call(Bucket::Core, &self.retry, "update issue", move || {
            inner.update_issue(repo, number, update)
        })
        .await
    }

    pub async fn close_issue(&self, repo: &RepoId, number: u64) -> Result<RawIssue> {
        let inner = &self.inner;
        self.call(Bucket::Core, &self.retry, "close issue", move || {
            inner.close_issue(repo, number)
        })
        .await
    }

    /// Fetch the tracker's rate limits directly. Not accounted against any bucket.
    pub async fn rate_limit(&self) -> Result<RateLimitSnapshot> {
        self.inner.rate_limit().await
    }

    /// Create a label. Never retried, so a duplicate response reaches the caller.
    pub async fn add_label(
        &self,
        repo: &RepoId,
        name: &str,
        color: &str,
        description: &str,
    ) -> Result<()> {
        let inner = &self.inner;
        self.call(Bucket::Core, &RetryPolicy::disabled(), "add label", move || {
            inner.add_label(repo, name, color, description)
        })
        .await
    }
}
