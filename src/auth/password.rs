use crate::error::AppError;
use bcrypt::{hash, verify};

/// Hashes `password` with a fresh random salt; equal inputs give different hashes.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

/// Returns whether `password` produced `hashed_password`.
///
/// A stored hash bcrypt cannot parse is a server-side fault, not a mismatch.
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password).map_err(AppError::from)
}
