//! Authentication infrastructure module
//!
//! Session tokens (HS256 JWT) and Argon2 hashing of passwords and API key
//! secrets.

mod hasher;
mod jwt;

pub use hasher::{Argon2Hasher, SecretHasher};
pub use jwt::{JwtClaims, JwtConfig, JwtGenerator, JwtService};
