use serde::Serialize;
use serde_json::Value;

use crate::codec::{self, Guards};
use crate::error::Result;
use crate::transport::{IssueState, RawIssue};

/// Decoded document view of a remote issue.
///
/// Records are rebuilt from the raw issue after every write, never edited
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub key: String,
    pub data: Value,
    pub text_before: String,
    pub text_after: String,
    pub source_state: IssueState,
    pub source_id: u64,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub url: String,
}

impl Record {
    /// Decode the data embedded in `issue`'s body.
    pub fn from_issue(issue: &RawIssue, guards: &Guards) -> Result<Self> {
        let decoded = codec::decode(&issue.body, guards)?;

        Ok(Record {
            key: issue.title.clone(),
            data: decoded.data,
            text_before: decoded.text_before,
            text_after: decoded.text_after,
            source_state: issue.state,
            source_id: issue.number,
            labels: issue.labels.clone(),
            assignees: issue.assignees.clone(),
            url: issue.url.clone(),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.source_state == IssueState::Closed
    }

    /// Re-encode this record in the issue body wire format.
    pub fn body(&self, guards: &Guards) -> Result<String> {
        codec::encode(
            &self.data,
            Some(self.text_before.as_str()),
            Some(self.text_after.as_str()),
            guards,
        )
    }
}
