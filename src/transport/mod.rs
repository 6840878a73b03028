//! Issue tracker transport.
//!
//! This module defines the operations the document store needs from an
//! issue tracker, along with the tracker-neutral issue and rate-limit types.
//! The GitHub implementation lives in [`github`].

pub mod error;
pub mod github;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::repo::RepoId;

pub use github::GitHubTransport;

/// Remote issue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueState::Open => write!(f, "open"),
            IssueState::Closed => write!(f, "closed"),
        }
    }
}

/// An issue as returned by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    /// Issue number, used to address updates and closes
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: IssueState,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    /// Web URL to view the issue
    pub url: String,
}

/// Fields for a new issue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

/// Changes to apply to an existing issue.
///
/// `None` leaves the field untouched on the remote side; `Some(vec![])`
/// clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.labels.is_none() && self.assignees.is_none()
    }
}

/// A rate-limit quota category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Core,
    Search,
    Graphql,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Core => write!(f, "core"),
            Bucket::Search => write!(f, "search"),
            Bucket::Graphql => write!(f, "graphql"),
        }
    }
}

/// Quota accounting for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketStatus {
    pub limit: u64,
    pub used: u64,
    pub remaining: u64,
    pub reset_at: Timestamp,
}

/// Rate-limit state of every bucket the tracker reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitSnapshot {
    pub buckets: HashMap<Bucket, BucketStatus>,
}

impl RateLimitSnapshot {
    pub fn with_bucket(mut self, bucket: Bucket, status: BucketStatus) -> Self {
        self.buckets.insert(bucket, status);
        self
    }

    pub fn get(&self, bucket: Bucket) -> Option<&BucketStatus> {
        self.buckets.get(&bucket)
    }

    pub fn get_mut(&mut self, bucket: Bucket) -> Option<&mut BucketStatus> {
        self.buckets.get_mut(&bucket)
    }
}

/// Operations the document store performs against an issue tracker.
///
/// Implementations make exactly one remote call per method and never retry;
/// throttling and retries are layered on by [`crate::client::ThrottledTransport`].
pub trait IssueTransport: Send + Sync {
    /// List every issue (open and closed) carrying `label`, newest first.
    fn list_issues(
        &self,
        repo: &RepoId,
        label: &str,
    ) -> impl Future<Output = Result<Vec<RawIssue>>> + Send;

    fn get_issue(&self, repo: &RepoId, number: u64)
    -> impl Future<Output = Result<RawIssue>> + Send;

    fn create_issue(
        &self,
        repo: &RepoId,
        issue: &NewIssue,
    ) -> impl Future<Output = Result<RawIssue>> + Send;

    fn update_issue(
        &self,
        repo: &RepoId,
        number: u64,
        update: &IssueUpdate,
    ) -> impl Future<Output = Result<RawIssue>> + Send;

    fn close_issue(&self, repo: &RepoId, number: u64)
    -> impl Future<Output = Result<RawIssue>> + Send;

    fn rate_limit(&self) -> impl Future<Output = Result<RateLimitSnapshot>> + Send;

    fn add_label(
        &self,
        repo: &RepoId,
        name: &str,
        color: &str,
        description: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
