pub mod cache;
pub mod client;
pub mod codec;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod record;
pub mod repo;
pub mod throttle;
pub mod transport;

pub use cache::RecordCache;
pub use client::ThrottledTransport;
pub use codec::{DecodedBody, Guards};
pub use config::Config;
pub use db::{CreateOptions, DbOptions, DeleteOptions, IssueDb, ListOptions, ReadOptions, UpdateOptions};
pub use error::{IssueDbError, Result};
pub use record::Record;
pub use repo::RepoId;
pub use throttle::{RateLimiter, RetryPolicy};
pub use transport::{
    Bucket, BucketStatus, GitHubTransport, IssueState, IssueTransport, IssueUpdate, NewIssue,
    RateLimitSnapshot, RawIssue,
};
