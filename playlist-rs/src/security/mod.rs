//! Security module
//!
//! Provides credential handling:
//! - [`password`]: Argon2 password hashing
//! - [`access`]: signed read-only access credentials for storage namespaces

pub mod access;
pub mod password;

pub use access::{AccessCredential, AccessCredentialIssuer};
pub use password::{hash_password, verify_password};
