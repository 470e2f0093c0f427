//! User infrastructure module
//!
//! Storage-backed user repository and the account service.

mod service;
mod storage_repository;

pub use service::{SignupRequest, UserService};
pub use storage_repository::StorageUserRepository;
