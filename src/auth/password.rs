use super::AuthError;
use crate::config;

/// Hash a password with bcrypt at the configured cost.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let cost = config::config().security.bcrypt_cost;
    Ok(bcrypt::hash(password, cost)?)
}

/// Compare a password against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    Ok(bcrypt::verify(password, hash)?)
}
