//! Password hashing and generation
//!
//! bcrypt is CPU bound, so hashing and verification run on the blocking pool.

use rand::distributions::Alphanumeric;
use rand::Rng;

use super::service::AuthError;

pub async fn hash_password(plain: &str) -> Result<String, AuthError> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// False for a wrong password or a malformed stored hash
pub async fn verify_password(plain: &str, hash: &str) -> Result<bool, AuthError> {
    let plain = plain.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?;

    Ok(verified.unwrap_or(false))
}

/// Random alphanumeric password of `len` characters
pub fn generate_password(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_shape() {
        let password = generate_password(8);
        assert_eq!(password.len(), 8);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_password(16), generate_password(16));
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("s3cret!").await.unwrap();
        assert_ne!(hash, "s3cret!");
        assert!(verify_password("s3cret!", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_does_not_verify() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash").await.unwrap());
    }
}
