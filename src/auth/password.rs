//! Password hashing and one-time password generation.

use bcrypt::DEFAULT_COST;
use rand::Rng;

use crate::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    Ok(bcrypt::hash(password, DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    Ok(bcrypt::verify(password, hash)?)
}

/// Generate a password for admin-created accounts:
/// nine alphanumerics followed by one special character.
pub fn generate_password() -> String {
    const LETTERS_AND_NUMBERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    const SPECIAL_CHARACTERS: &[u8] = b"!@#$%^&*()-_=+";

    let mut rng = rand::thread_rng();
    let mut password: String = (0..9)
        .map(|_| LETTERS_AND_NUMBERS[rng.gen_range(0..LETTERS_AND_NUMBERS.len())] as char)
        .collect();
    password.push(SPECIAL_CHARACTERS[rng.gen_range(0..SPECIAL_CHARACTERS.len())] as char);
    password
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_generated_password_shape() {
        let pw = generate_password();
        assert_eq!(pw.len(), 10);
        assert!(pw[..9].chars().all(|c| c.is_ascii_alphanumeric()));
        assert!("!@#$%^&*()-_=+".contains(pw.chars().last().unwrap()));
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }
}
