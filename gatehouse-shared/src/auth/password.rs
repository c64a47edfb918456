/// Password hashing with Argon2id
///
/// Hashes are stored in PHC string format, so the parameters travel with
/// the hash and verification keeps working if they are raised later.
///
/// - **Memory**: 64 MB
/// - **Iterations**: 3
/// - **Parallelism**: 4 lanes
/// - **Output**: 32 bytes, 16-byte random salt
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Corr3ct-horse")?;
/// assert!(verify_password("Corr3ct-horse", &hash)?);
/// assert!(!verify_password("battery-staple", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};

/// Minimum password length accepted on signup and password change
pub const MIN_PASSWORD_LEN: usize = 8;

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Verification failed for a reason other than a mismatch
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Password does not meet the strength rules
    #[error("{0}")]
    TooWeak(&'static str),
}

fn params() -> Result<Params, PasswordError> {
    ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))
}

/// Hashes a password with Argon2id and a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params()?);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Verifies a password against a stored hash
///
/// Returns `Ok(false)` on mismatch; errors are reserved for unusable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks the password strength rules
///
/// At least [`MIN_PASSWORD_LEN`] characters with an uppercase letter, a
/// lowercase letter, a digit and a symbol.
///
/// ```
/// use gatehouse_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("MyP@ssw0rd!").is_ok());
/// assert!(validate_password_strength("Password123").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    let rules: [(bool, &'static str); 5] = [
        (
            password.chars().count() >= MIN_PASSWORD_LEN,
            "Password must be at least 8 characters long",
        ),
        (
            password.chars().any(char::is_uppercase),
            "Password must contain at least one uppercase letter",
        ),
        (
            password.chars().any(char::is_lowercase),
            "Password must contain at least one lowercase letter",
        ),
        (
            password.chars().any(char::is_numeric),
            "Password must contain at least one digit",
        ),
        (
            password.chars().any(|c| !c.is_alphanumeric()),
            "Password must contain at least one special character",
        ),
    ];

    match rules.iter().find(|(ok, _)| !ok) {
        Some((_, message)) => Err(PasswordError::TooWeak(message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_format() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=65536,t=3,p=4"));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_verify() {
        let hash = hash_password("correct_password").unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_unusable_hash() {
        assert!(matches!(
            verify_password("password", "plaintext"),
            Err(PasswordError::InvalidHash(_))
        ));
        assert!(verify_password("password", "$argon2id$invalid").is_err());
    }

    #[test]
    fn test_unicode_password_round_trip() {
        let hash = hash_password("unicode-密码-パスワード").unwrap();
        assert!(verify_password("unicode-密码-パスワード", &hash).unwrap());
    }

    #[test]
    fn test_strength_rules() {
        for (password, fragment) in [
            ("Sh0rt!", "at least 8 characters"),
            ("lowercase1!", "uppercase letter"),
            ("UPPERCASE1!", "lowercase letter"),
            ("NoDigits!!", "digit"),
            ("NoSpecial123", "special character"),
        ] {
            let err = validate_password_strength(password).unwrap_err();
            assert!(err.to_string().contains(fragment), "{}: {}", password, err);
        }

        assert!(validate_password_strength("C0mpl3x#Pwd").is_ok());
    }
}
