//! In-memory issue tracker that records every call.

use std::collections::VecDeque;

use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;

use issue_db::{
    Bucket, BucketStatus, IssueDbError, IssueState, IssueTransport, IssueUpdate, NewIssue,
    RateLimitSnapshot, RawIssue, RepoId, Result,
};

/// A recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List { label: String },
    Get(u64),
    Create(NewIssue),
    Update(u64, IssueUpdate),
    Close(u64),
    RateLimit,
    AddLabel(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Create(_) | Call::Update(..) | Call::Close(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Create,
    Update,
    Close,
    AddLabel,
}

struct MockState {
    issues: Vec<RawIssue>,
    next_number: u64,
    calls: Vec<Call>,
    rate_limit: RateLimitSnapshot,
    failures: VecDeque<(Op, String)>,
    renumber_next_update: Option<u64>,
}

pub struct MockTransport {
    state: Mutex<MockState>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        let plenty = BucketStatus {
            limit: 5000,
            used: 0,
            remaining: 5000,
            reset_at: Timestamp::now() + SignedDuration::from_hours(1),
        };
        Self {
            state: Mutex::new(MockState {
                issues: Vec::new(),
                next_number: 1,
                calls: Vec::new(),
                rate_limit: RateLimitSnapshot::default()
                    .with_bucket(Bucket::Core, plenty)
                    .with_bucket(Bucket::Search, plenty),
                failures: VecDeque::new(),
                renumber_next_update: None,
            }),
        }
    }

    /// Add an existing issue, returning its number.
    pub fn seed(&self, title: &str, body: &str, state: IssueState) -> u64 {
        self.seed_with_labels(title, body, state, &["issue-db"])
    }

    pub fn seed_with_labels(&self, title: &str, body: &str, state: IssueState, labels: &[&str]) -> u64 {
        let mut s = self.state.lock();
        let number = s.next_number;
        s.next_number += 1;
        s.issues.push(RawIssue {
            number,
            title: title.to_string(),
            body: body.to_string(),
            state,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            assignees: vec![],
            url: format!("https://github.com/octocat/records/issues/{number}"),
        });
        number
    }

    /// Make the next call of kind `op` fail with `message`.
    pub fn fail_next(&self, op: Op, message: &str) {
        self.state.lock().failures.push_back((op, message.to_string()));
    }

    pub fn set_rate_limit(&self, snapshot: RateLimitSnapshot) {
        self.state.lock().rate_limit = snapshot;
    }

    /// The next update returns the issue under a different number.
    pub fn renumber_next_update(&self, number: u64) {
        self.state.lock().renumber_next_update = Some(number);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn list_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::List { .. }))
    }

    pub fn rate_limit_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::RateLimit))
    }

    pub fn write_calls(&self) -> usize {
        self.count(Call::is_write)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn issue(&self, number: u64) -> Option<RawIssue> {
        self.state
            .lock()
            .issues
            .iter()
            .find(|i| i.number == number)
            .cloned()
    }

    fn record(&self, call: Call, op: Option<Op>) -> Result<()> {
        let mut s = self.state.lock();
        s.calls.push(call);
        if let Some(op) = op
            && s.failures.front().is_some_and(|(failing, _)| *failing == op)
        {
            let (_, message) = s.failures.pop_front().unwrap_or((op, String::new()));
            return Err(IssueDbError::Api(message));
        }
        Ok(())
    }
}

impl IssueTransport for MockTransport {
    async fn list_issues(&self, _repo: &RepoId, label: &str) -> Result<Vec<RawIssue>> {
        self.record(
            Call::List {
                label: label.to_string(),
            },
            Some(Op::List),
        )?;

        let s = self.state.lock();
        let mut issues: Vec<RawIssue> = s
            .issues
            .iter()
            .filter(|i| i.labels.iter().any(|l| l == label))
            .cloned()
            .collect();
        // Newest first, like the GitHub listing
        issues.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(issues)
    }

    async fn get_issue(&self, _repo: &RepoId, number: u64) -> Result<RawIssue> {
        self.record(Call::Get(number), None)?;
        self.issue(number)
            .ok_or_else(|| IssueDbError::Api(format!("issue #{number} not found")))
    }

    async fn create_issue(&self, _repo: &RepoId, issue: &NewIssue) -> Result<RawIssue> {
        self.record(Call::Create(issue.clone()), Some(Op::Create))?;

        let mut s = self.state.lock();
        let number = s.next_number;
        s.next_number += 1;
        let created = RawIssue {
            number,
            title: issue.title.clone(),
            body: issue.body.clone(),
            state: IssueState::Open,
            labels: issue.labels.clone(),
            assignees: issue.assignees.clone(),
            url: format!("https://github.com/octocat/records/issues/{number}"),
        };
        s.issues.push(created.clone());
        Ok(created)
    }

    async fn update_issue(&self, _repo: &RepoId, number: u64, update: &IssueUpdate) -> Result<RawIssue> {
        self.record(Call::Update(number, update.clone()), Some(Op::Update))?;

        let mut s = self.state.lock();
        let renumber = s.renumber_next_update.take();
        let issue = s
            .issues
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or_else(|| IssueDbError::Api(format!("issue #{number} not found")))?;

        if let Some(title) = &update.title {
            issue.title = title.clone();
        }
        if let Some(body) = &update.body {
            issue.body = body.clone();
        }
        if let Some(labels) = &update.labels {
            issue.labels = labels.clone();
        }
        if let Some(assignees) = &update.assignees {
            issue.assignees = assignees.clone();
        }

        let mut updated = issue.clone();
        if let Some(new_number) = renumber {
            updated.number = new_number;
        }
        Ok(updated)
    }

    async fn close_issue(&self, _repo: &RepoId, number: u64) -> Result<RawIssue> {
        self.record(Call::Close(number), Some(Op::Close))?;

        let mut s = self.state.lock();
        let issue = s
            .issues
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or_else(|| IssueDbError::Api(format!("issue #{number} not found")))?;
        issue.state = IssueState::Closed;
        Ok(issue.clone())
    }

    async fn rate_limit(&self) -> Result<RateLimitSnapshot> {
        self.record(Call::RateLimit, None)?;
        Ok(self.state.lock().rate_limit.clone())
    }

    async fn add_label(&self, _repo: &RepoId, name: &str, _color: &str, _description: &str) -> Result<()> {
        self.record(Call::AddLabel(name.to_string()), Some(Op::AddLabel))
    }
}
