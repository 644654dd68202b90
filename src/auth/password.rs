//! bcrypt password hashing.
//!
//! New hashes use [`HASH_COST`]. Stored hashes carry their own cost, so
//! records written with a different cost still verify.

use anyhow::Context;
use tracing::warn;

pub const HASH_COST: u32 = 12;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    bcrypt::hash(plain, HASH_COST).context("bcrypt hash")
}

/// `false` when the password does not match, including when the stored hash
/// is not a bcrypt hash at all.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match bcrypt::verify(plain, hash) {
        Ok(matches) => matches,
        Err(e) => {
            warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash.starts_with("$2b$12$"));
        assert!(verify_password(password, &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verifies_hashes_written_with_another_cost() {
        let hash = bcrypt::hash("legacy", 4).unwrap();
        assert!(verify_password("legacy", &hash));
    }

    #[test]
    fn foreign_or_malformed_hash_never_verifies() {
        for stored in [
            "not-a-valid-hash",
            "",
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNo",
            "$2b$12$tooshort",
        ] {
            assert!(!verify_password("anything", stored), "{stored:?}");
        }
    }
}
