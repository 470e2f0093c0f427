//! Usage record and commit event entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_usage_id, UsageValidationError};
use crate::domain::storage::{StorageEntity, StorageKey};

/// Usage record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsageId(String);

impl UsageId {
    /// Create a new UsageId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, UsageValidationError> {
        let id = id.into();
        validate_usage_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UsageId {
    type Error = UsageValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UsageId> for String {
    fn from(id: UsageId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UsageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for UsageId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl StorageEntity for Usage {
    type Key = UsageId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Outcome of a tracked CLI action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStatus {
    Success,
    Failure,
}

impl std::fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// What the CLI sent to the model for one action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    #[serde(default)]
    pub user_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_response_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// One usage entry reported by the CLI
///
/// The wire and storage shapes are the same. A missing `timestamp`
/// defaults to the time the event is deserialized, which is ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEvent {
    pub commit_message: String,
    pub status: CommitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repolink: Option<String>,
    #[serde(default)]
    pub request_details: RequestDetails,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl CommitEvent {
    /// Create an event stamped with the current time
    pub fn new(commit_message: impl Into<String>, status: CommitStatus) -> Self {
        Self {
            commit_message: commit_message.into(),
            status,
            branch: None,
            remote: None,
            repolink: None,
            request_details: RequestDetails::default(),
            timestamp: Utc::now(),
        }
    }

    /// Builder-style setter for the event time
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == CommitStatus::Success
    }
}

/// Per-key usage record, one-to-one with an API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    id: UsageId,
    total_requests: u64,
    success_count: u64,
    failure_count: u64,
    /// Events in ingestion order
    #[serde(default)]
    commits: Vec<CommitEvent>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Usage {
    /// Create a zeroed usage record
    pub fn new(id: UsageId) -> Self {
        let now = Utc::now();

        Self {
            id,
            total_requests: 0,
            success_count: 0,
            failure_count: 0,
            commits: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    // Getters

    pub fn id(&self) -> &UsageId {
        &self.id
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    pub fn commits(&self) -> &[CommitEvent] {
        &self.commits
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Mutators

    /// Append a batch of events and bring the counters up to date.
    ///
    /// Counters grow by the batch tally only, so after every call they equal
    /// a full-history tally without rescanning `commits`.
    pub fn record_batch(&mut self, events: impl IntoIterator<Item = CommitEvent>) {
        for event in events {
            match event.status {
                CommitStatus::Success => self.success_count += 1,
                CommitStatus::Failure => self.failure_count += 1,
            }
            self.commits.push(event);
        }

        self.total_requests = self.commits.len() as u64;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
