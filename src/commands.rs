//! Command implementations behind the `issue-db` binary.
//!
//! Each command returns the text to print on stdout.

use serde_json::Value;

use crate::db::{CreateOptions, DeleteOptions, IssueDb, ListOptions, ReadOptions, UpdateOptions};
use crate::error::{IssueDbError, Result};
use crate::transport::IssueTransport;

/// Options shared by `set` for both the create and update paths
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub text_before: Option<String>,
    pub text_after: Option<String>,
    pub labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
}

pub async fn cmd_get<T: IssueTransport>(
    db: &mut IssueDb<T>,
    key: &str,
    include_closed: bool,
) -> Result<String> {
    let record = db.read(key, ReadOptions { include_closed }).await?;
    Ok(serde_json::to_string_pretty(&record)?)
}

/// Create `key` with `json`, or replace its data if it already exists.
pub async fn cmd_set<T: IssueTransport>(
    db: &mut IssueDb<T>,
    key: &str,
    json: &str,
    options: SetOptions,
) -> Result<String> {
    let data: Value = serde_json::from_str(json)?;

    let record = match db.read(key, ReadOptions::default()).await {
        Ok(_) => {
            db.update(
                key,
                &data,
                UpdateOptions {
                    include_closed: false,
                    text_before: options.text_before,
                    text_after: options.text_after,
                    labels: options.labels,
                    assignees: options.assignees,
                },
            )
            .await?
        }
        Err(IssueDbError::RecordNotFound(_)) => {
            db.create(
                key,
                &data,
                CreateOptions {
                    include_closed: false,
                    text_before: options.text_before,
                    text_after: options.text_after,
                    labels: options.labels,
                    assignees: options.assignees,
                },
            )
            .await?
        }
        Err(e) => return Err(e),
    };

    Ok(serde_json::to_string_pretty(&record)?)
}

pub async fn cmd_delete<T: IssueTransport>(db: &mut IssueDb<T>, key: &str) -> Result<String> {
    let record = db.delete(key, DeleteOptions::default()).await?;
    Ok(serde_json::to_string_pretty(&record)?)
}

pub async fn cmd_list<T: IssueTransport>(
    db: &mut IssueDb<T>,
    include_closed: bool,
    keys_only: bool,
) -> Result<String> {
    let options = ListOptions { include_closed };
    if keys_only {
        let keys = db.list_keys(options).await?;
        return Ok(keys.join("\n"));
    }

    let records = db.list(options).await?;
    Ok(serde_json::to_string_pretty(&records)?)
}

pub async fn cmd_label<T: IssueTransport>(db: &mut IssueDb<T>) -> Result<String> {
    let created = db.ensure_label().await?;
    Ok(if created {
        format!("Created label '{}' in {}", db.label(), db.repo())
    } else {
        format!("Label '{}' already exists in {}", db.label(), db.repo())
    })
}
