//! Infrastructure layer - storage backends, hashing, sessions and services

pub mod api_key;
pub mod auth;
pub mod logging;
pub mod observability;
pub mod storage;
pub mod usage;
pub mod user;
