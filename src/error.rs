use thiserror::Error;

#[derive(Error, Debug)]
pub enum IssueDbError {
    #[error("invalid repository '{0}': expected format owner/name")]
    RepoFormat(String),

    #[error("malformed issue body: {0}")]
    MalformedBody(String),

    #[error("failed to parse data segment as JSON: {source}")]
    DataParse {
        #[source]
        source: serde_json::Error,
    },

    #[error("record '{0}' not found")]
    RecordNotFound(String),

    #[error("failed to refresh issue cache: {source}")]
    CacheRefresh {
        #[source]
        source: Box<IssueDbError>,
    },

    #[error("secondary rate limit: {0}")]
    SecondaryRateLimit(String),

    #[error("{0}")]
    Api(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IssueDbError {
    /// True when the failure is GitHub's abuse-detection throttle.
    ///
    /// GitHub signals these with a 403 and a message, not a dedicated status,
    /// so detection is by message content.
    pub fn is_secondary_rate_limit(&self) -> bool {
        match self {
            IssueDbError::SecondaryRateLimit(_) => true,
            IssueDbError::Api(message) => mentions_secondary_limit(message),
            _ => false,
        }
    }

    /// True when a create call failed because the resource already exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            IssueDbError::Api(message) => message.to_lowercase().contains("already_exists"),
            _ => false,
        }
    }
}

pub(crate) fn mentions_secondary_limit(message: &str) -> bool {
    message.to_lowercase().contains("secondary rate limit")
}

pub type Result<T> = std::result::Result<T, IssueDbError>;
