/// Hash a plaintext password for storage.
pub fn hash_password(plaintext: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)
}

/// Verify a plaintext password against a stored hash - constant-time via
/// bcrypt. Any bcrypt failure counts as a mismatch.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}
