//! API Key validation utilities

use thiserror::Error;

/// Errors that can occur during API key validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("API key ID cannot be empty")]
    EmptyId,

    #[error("API key ID exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("API key ID must start with a letter or number")]
    InvalidStart,

    #[error("API key ID must end with a letter or number")]
    InvalidEnd,

    #[error("API key ID contains invalid character: '{0}'. Only alphanumeric characters and hyphens are allowed")]
    InvalidCharacter(char),

    #[error("API key ID cannot contain consecutive hyphens")]
    ConsecutiveHyphens,

    #[error("API key name cannot be empty")]
    EmptyDisplayKey,

    #[error("API key name exceeds maximum length of {0} characters")]
    DisplayKeyTooLong(usize),

    #[error("Limit must be a non-negative integer no greater than {max}")]
    InvalidLimit { max: u32 },
}

const MAX_API_KEY_ID_LENGTH: usize = 50;
const MAX_DISPLAY_KEY_LENGTH: usize = 200;

/// Validate an API key ID
///
/// Rules:
/// - Cannot be empty
/// - Maximum 50 characters
/// - Only alphanumeric characters and hyphens
/// - Must start and end with alphanumeric
/// - No consecutive hyphens
pub fn validate_api_key_id(id: &str) -> Result<(), ApiKeyValidationError> {
    if id.is_empty() {
        return Err(ApiKeyValidationError::EmptyId);
    }

    if id.len() > MAX_API_KEY_ID_LENGTH {
        return Err(ApiKeyValidationError::TooLong(MAX_API_KEY_ID_LENGTH));
    }

    let chars: Vec<char> = id.chars().collect();

    if !chars[0].is_ascii_alphanumeric() {
        return Err(ApiKeyValidationError::InvalidStart);
    }

    if !chars[chars.len() - 1].is_ascii_alphanumeric() {
        return Err(ApiKeyValidationError::InvalidEnd);
    }

    let mut prev_hyphen = false;

    for c in &chars {
        if *c == '-' {
            if prev_hyphen {
                return Err(ApiKeyValidationError::ConsecutiveHyphens);
            }
            prev_hyphen = true;
        } else if c.is_ascii_alphanumeric() {
            prev_hyphen = false;
        } else {
            return Err(ApiKeyValidationError::InvalidCharacter(*c));
        }
    }

    Ok(())
}

/// Validate the client-supplied display form of a key
pub fn validate_display_key(display_key: &str) -> Result<(), ApiKeyValidationError> {
    if display_key.trim().is_empty() {
        return Err(ApiKeyValidationError::EmptyDisplayKey);
    }

    if display_key.chars().count() > MAX_DISPLAY_KEY_LENGTH {
        return Err(ApiKeyValidationError::DisplayKeyTooLong(MAX_DISPLAY_KEY_LENGTH));
    }

    Ok(())
}

/// Convert a client-supplied quota into the stored representation
pub fn validate_limit(limit: i64) -> Result<u32, ApiKeyValidationError> {
    u32::try_from(limit).map_err(|_| ApiKeyValidationError::InvalidLimit { max: u32::MAX })
}
