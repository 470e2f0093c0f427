//! Usage validation utilities

use thiserror::Error;

/// Errors that can occur during usage validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UsageValidationError {
    #[error("Usage ID cannot be empty")]
    EmptyId,

    #[error("Usage ID exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("Usage ID contains invalid character: '{0}'. Only alphanumeric characters and hyphens are allowed")]
    InvalidCharacter(char),

    #[error("Commit message cannot be empty")]
    EmptyCommitMessage,
}

const MAX_USAGE_ID_LENGTH: usize = 50;

/// Validate a usage ID
pub fn validate_usage_id(id: &str) -> Result<(), UsageValidationError> {
    if id.is_empty() {
        return Err(UsageValidationError::EmptyId);
    }

    if id.len() > MAX_USAGE_ID_LENGTH {
        return Err(UsageValidationError::TooLong(MAX_USAGE_ID_LENGTH));
    }

    if let Some(c) = id.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        return Err(UsageValidationError::InvalidCharacter(c));
    }

    Ok(())
}

/// Validate the message of a reported commit event
pub fn validate_commit_message(message: &str) -> Result<(), UsageValidationError> {
    if message.trim().is_empty() {
        return Err(UsageValidationError::EmptyCommitMessage);
    }

    Ok(())
}
