use rand::Rng;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Salted bcrypt hash of `plain`.
pub fn hash_password(plain: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, cost)
}

/// Never errors: a malformed stored hash simply fails verification.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

/// Random 8-digit numeric code for password resets.
pub fn generate_reset_code() -> String {
    rand::thread_rng()
        .gen_range(10_000_000..=99_999_999u32)
        .to_string()
}

/// Compares two secrets without short-circuiting on the first differing byte.
pub fn secrets_match(provided: &str, stored: &str) -> bool {
    let a = provided.as_bytes();
    let b = stored.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
