use sha3::{Digest, Sha3_256};
use uuid::Uuid;

pub fn get_sha3_256_hash(data: &str) -> String {
    let mut hasher = Sha3_256::default();
    hasher.update(data);
    format!("{:X}", hasher.finalize())
}

/// Salted hash stored as `salt$HEX`.
pub fn hash_password(pwd: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = get_sha3_256_hash(&format!("{salt}{pwd}"));
    format!("{salt}${digest}")
}

pub fn verify_password(pwd: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => get_sha3_256_hash(&format!("{salt}{pwd}")) == digest,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashes_are_salted() {
        let first = hash_password("violette");
        let second = hash_password("violette");
        assert_ne!(first, second);
        assert!(verify_password("violette", &first));
        assert!(verify_password("violette", &second));
        assert!(!verify_password("cassoulet", &first));
        assert!(!verify_password("violette", "garbage"));
    }
}
