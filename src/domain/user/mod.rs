//! User domain
//!
//! This module provides domain types and traits for dashboard accounts,
//! including user entities, validation, and repository traits.

mod entity;
mod repository;
mod validation;

pub use entity::{User, UserId};
pub use repository::UserRepository;
pub use validation::{validate_user_id, UserValidationError};

#[cfg(test)]
pub use repository::mock::MockUserRepository;
