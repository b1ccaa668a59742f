use sha2::{Digest, Sha256};

/// Length of a password digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// One-way digest sent in place of a password: unsalted SHA-256, lowercase hex.
///
/// The server stores and compares this value, so the scheme has to match
/// what it expects byte for byte.
pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_fixed_length_lowercase_hex() {
        let digest = password_digest("secret");
        assert_eq!(digest.len(), DIGEST_HEX_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(
            digest,
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
    }

    #[test]
    fn digest_is_deterministic_and_input_sensitive() {
        assert_eq!(password_digest("secret"), password_digest("secret"));
        assert_ne!(password_digest("secret"), password_digest("secret2"));
        assert_ne!(password_digest(""), password_digest(" "));
    }
}
