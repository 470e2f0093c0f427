//! User service for signup, login and account lookup

use std::sync::Arc;

use tracing::{debug, info};
use validator::Validate;

use crate::domain::user::{User, UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::auth::SecretHasher;

/// Request for creating a new account
///
/// Only presence and the email shape are checked; username, password and
/// image URL are free-form.
#[derive(Debug, Clone, Validate)]
pub struct SignupRequest {
    pub name: String,
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

impl SignupRequest {
    fn has_required_fields(&self) -> bool {
        [&self.name, &self.username, &self.email, &self.password]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// User service for authentication and account management
#[derive(Debug)]
pub struct UserService<R, H>
where
    R: UserRepository + ?Sized,
    H: SecretHasher + ?Sized,
{
    repository: Arc<R>,
    hasher: Arc<H>,
}

impl<R, H> UserService<R, H>
where
    R: UserRepository + ?Sized,
    H: SecretHasher + ?Sized,
{
    /// Create a new user service
    pub fn new(repository: Arc<R>, hasher: Arc<H>) -> Self {
        Self { repository, hasher }
    }

    /// Register a new account
    pub async fn signup(&self, request: SignupRequest) -> Result<User, DomainError> {
        if !request.has_required_fields() {
            return Err(DomainError::validation("All fields are required"));
        }

        request
            .validate()
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let password_hash = self.hasher.hash(&request.password)?;

        let user = User::new(
            UserId::generate(),
            request.name.trim(),
            &request.username,
            request.email.to_lowercase(),
            password_hash,
        )
        .with_image_url(request.image_url);

        let user = self.repository.create(user).await.map_err(|e| match e {
            DomainError::Conflict { .. } => DomainError::validation("User already exists"),
            other => other,
        })?;

        info!(user_id = %user.id(), "User signed up");
        Ok(user)
    }

    /// Check credentials and return the account
    pub async fn login(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let user = self
            .repository
            .get_by_email(&email.to_lowercase())
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if !self.hasher.verify(password, user.password_hash()) {
            debug!(user_id = %user.id(), "Password verification failed");
            return Err(DomainError::unauthorized("Invalid credentials"));
        }

        Ok(user)
    }

    /// Get an account by ID
    pub async fn get(&self, id: &UserId) -> Result<User, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))
    }

    /// Count accounts
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }
}
