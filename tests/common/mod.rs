#![allow(dead_code)]

pub mod env;
pub mod mock;

use std::time::Duration;

use issue_db::{DbOptions, IssueDb, RetryPolicy};

pub use mock::{Call, MockTransport};

pub const REPO: &str = "octocat/records";

/// Options with short, fixed retries so paused-clock tests stay predictable
pub fn test_options() -> DbOptions {
    DbOptions {
        retry: RetryPolicy {
            tries: 3,
            delay: Duration::from_secs(1),
            exponential: false,
        },
        ..DbOptions::default()
    }
}

pub fn test_db() -> IssueDb<MockTransport> {
    test_db_with(MockTransport::new(), test_options())
}

pub fn test_db_with(transport: MockTransport, options: DbOptions) -> IssueDb<MockTransport> {
    IssueDb::new(transport, REPO, options).expect("test repo should parse")
}
