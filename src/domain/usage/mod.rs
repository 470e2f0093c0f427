//! Usage tracking domain
//!
//! Per-key usage records, the commit events the CLI reports, and the
//! rollups the dashboard reads.

pub mod analytics;
mod entity;
mod repository;
mod validation;

pub use analytics::{ActivityEntry, DayActivity, SuccessFailure, UsageSummary};
pub use entity::{CommitEvent, CommitStatus, RequestDetails, Usage, UsageId};
pub use repository::UsageRepository;
pub use validation::{validate_commit_message, validate_usage_id, UsageValidationError};

#[cfg(test)]
pub use repository::MockUsageRepository;
