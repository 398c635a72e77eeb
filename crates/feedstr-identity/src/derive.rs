// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed derivation of per-feed identities.

use feedstr_core::FeedstrError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::keypair::FeedKeypair;

type HmacSha256 = Hmac<Sha256>;

/// Derive the identity of the feed at `source_url`.
///
/// HMAC-SHA256 keyed by `secret` over the URL bytes is the 32-byte private
/// key. Identical inputs always produce the identical keypair; rotating the
/// secret changes every identity.
pub fn derive_identity(source_url: &str, secret: &str) -> Result<FeedKeypair, FeedstrError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| FeedstrError::Identity(format!("invalid derivation secret: {e}")))?;
    mac.update(source_url.as_bytes());
    let digest = mac.finalize().into_bytes();
    let mut material = [0u8; 32];
    material.copy_from_slice(&digest);
    FeedKeypair::from_bytes(&material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_identity("https://example.com/feed.xml", "secret").unwrap();
        let b = derive_identity("https://example.com/feed.xml", "secret").unwrap();
        assert_eq!(a.public_hex(), b.public_hex());
        assert_eq!(a.private_hex(), b.private_hex());
    }

    #[test]
    fn private_key_is_hmac_of_url() {
        let kp = derive_identity("https://example.com/feed.xml", "secret").unwrap();
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"https://example.com/feed.xml");
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(kp.private_hex(), expected);
    }

    #[test]
    fn different_urls_yield_different_identities() {
        let a = derive_identity("https://example.com/a.xml", "secret").unwrap();
        let b = derive_identity("https://example.com/b.xml", "secret").unwrap();
        assert_ne!(a.public_hex(), b.public_hex());
    }

    #[test]
    fn rotating_the_secret_changes_the_identity() {
        let a = derive_identity("https://example.com/feed.xml", "one").unwrap();
        let b = derive_identity("https://example.com/feed.xml", "two").unwrap();
        assert_ne!(a.public_hex(), b.public_hex());
    }

    #[test]
    fn empty_secret_still_derives() {
        // HMAC accepts zero-length keys; validation of the secret happens in config.
        assert!(derive_identity("https://example.com/feed.xml", "").is_ok());
    }

    proptest! {
        #[test]
        fn any_url_derives_a_stable_identity(url in "\\PC{0,80}", secret in "\\PC{1,32}") {
            let a = derive_identity(&url, &secret).unwrap();
            let b = derive_identity(&url, &secret).unwrap();
            prop_assert_eq!(a.public_hex().len(), 64);
            prop_assert_eq!(a.public_hex(), b.public_hex());
        }
    }
}
