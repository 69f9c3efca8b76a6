/// Password digest utilities.
///
/// A single unsalted SHA-256 hex digest, matching the hash format the
/// extension has always persisted. This is deliberately not a hardened KDF.
use sha2::{Digest, Sha256};

/// Hash a password to its lowercase hex SHA-256 digest.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check an input password against a stored digest.
pub fn verify_password(input: &str, stored_hash: &str) -> bool {
    hash_password(input) == stored_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_hex_sha256() {
        assert_eq!(
            hash_password("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_empty_password_hashes() {
        let hash = hash_password("");
        assert_eq!(hash.len(), 64);
        assert!(verify_password("", &hash));
    }
}
