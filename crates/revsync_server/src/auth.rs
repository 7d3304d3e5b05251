//! Client-uid minting and verification.
//!
//! ## Uid Format
//!
//! A client uid is `<id>.<signature>` where `<id>` is a random 32-char
//! hex identifier and `<signature>` is the first 8 bytes of its
//! HMAC-SHA256, hex-encoded. The uid is opaque to clients; only the
//! service interprets it.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Mints and verifies signed client uids.
#[derive(Clone)]
pub struct TokenMinter {
    secret: Vec<u8>,
}

impl TokenMinter {
    /// Creates a minter with the given signing secret.
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Mints a new signed client uid.
    pub fn mint(&self) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let signature = self.sign(id.as_bytes());
        format!("{id}.{}", hex(&signature[..8]))
    }

    /// Verifies that a client uid was minted by this service.
    pub fn verify(&self, uid: &str) -> bool {
        let Some((id, signature)) = uid.split_once('.') else {
            return false;
        };
        let expected = self.sign(id.as_bytes());
        signature == hex(&expected[..8])
    }

    fn sign(&self, data: &[u8]) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(data);
        mac.finalize().into_bytes().into()
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_and_verify() {
        let minter = TokenMinter::new(b"test-secret".to_vec());
        let uid = minter.mint();

        assert!(minter.verify(&uid));
    }

    #[test]
    fn minted_uids_are_unique() {
        let minter = TokenMinter::new(b"test-secret".to_vec());
        assert_ne!(minter.mint(), minter.mint());
    }

    #[test]
    fn reject_tampered_uid() {
        let minter = TokenMinter::new(b"test-secret".to_vec());
        let uid = minter.mint();

        let mut tampered = uid.into_bytes();
        tampered[0] = if tampered[0] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(tampered).unwrap();

        assert!(!minter.verify(&tampered));
    }

    #[test]
    fn reject_uid_signed_with_other_secret() {
        let minter = TokenMinter::new(b"secret-a".to_vec());
        let other = TokenMinter::new(b"secret-b".to_vec());

        let uid = minter.mint();
        assert!(!other.verify(&uid));
    }

    #[test]
    fn reject_unstructured_uid() {
        let minter = TokenMinter::new(b"test-secret".to_vec());
        assert!(!minter.verify("no-separator"));
        assert!(!minter.verify(""));
    }
}
