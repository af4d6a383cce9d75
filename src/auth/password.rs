use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hashes a registration password with the default argon2id parameters.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("argon2 hash failed: {e}"))
}

/// Checks a login attempt against the stored hash. A mismatch is
/// `Ok(false)`; an unreadable stored hash is an error.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("stored hash unreadable: {e}"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_accepts_only_the_registered_password() {
        let hash = hash_password("1234pass5678").unwrap();
        assert!(verify_password("1234pass5678", &hash).unwrap());
        assert!(!verify_password("1234pass5679", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted_per_registration() {
        let first = hash_password("same-password").unwrap();
        let second = hash_password("same-password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn stored_garbage_is_an_error_not_a_mismatch() {
        assert!(verify_password("anything", "garbage").is_err());
    }
}
