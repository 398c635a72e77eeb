// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ed25519 keypairs for feeds and for the service itself.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use feedstr_core::{FeedstrError, Record, UnsignedRecord};

use crate::record::record_id;

/// An Ed25519 keypair that authors records.
#[derive(Clone)]
pub struct FeedKeypair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for FeedKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedKeypair")
            .field("public", &self.public_hex())
            .field("private", &"[redacted]")
            .finish()
    }
}

impl FeedKeypair {
    /// Reconstruct a keypair from private key bytes.
    pub fn from_bytes(private_bytes: &[u8; 32]) -> Result<Self, FeedstrError> {
        let signing_key = SigningKey::from_bytes(private_bytes);
        let verifying_key = VerifyingKey::from(&signing_key);
        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Reconstruct a keypair from a hex-encoded private key, as stored in the
    /// aggregate or the config file.
    pub fn from_hex(private_hex: &str) -> Result<Self, FeedstrError> {
        let bytes = hex::decode(private_hex.trim())
            .map_err(|e| FeedstrError::Identity(format!("private key is not hex: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            FeedstrError::Identity(format!("private key must be 32 bytes, got {}", b.len()))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Hex-encoded public key, the identity other records refer to.
    pub fn public_hex(&self) -> String {
        hex::encode(self.public_bytes())
    }

    /// Hex-encoded private key. Only the aggregate record may carry it.
    pub fn private_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Compute the id of `unsigned` and sign it.
    ///
    /// Fails when the record claims a different author than this keypair.
    pub fn sign_record(&self, unsigned: UnsignedRecord) -> Result<Record, FeedstrError> {
        let public = self.public_hex();
        if unsigned.pubkey != public {
            return Err(FeedstrError::Signing(format!(
                "record author {} does not match signing key {public}",
                unsigned.pubkey
            )));
        }
        let id = record_id(&unsigned);
        let id_bytes = hex::decode(&id)
            .map_err(|e| FeedstrError::Signing(format!("record id is not hex: {e}")))?;
        let sig = self.sign(&id_bytes);
        Ok(Record {
            id,
            pubkey: unsigned.pubkey,
            created_at: unsigned.created_at,
            kind: unsigned.kind,
            tags: unsigned.tags,
            content: unsigned.content,
            sig: hex::encode(sig.to_bytes()),
        })
    }

    /// Start an unsigned record authored by this keypair.
    pub fn unsigned(
        &self,
        kind: u32,
        created_at: feedstr_core::Timestamp,
        tags: Vec<feedstr_core::Tag>,
        content: impl Into<String>,
    ) -> UnsignedRecord {
        UnsignedRecord {
            pubkey: self.public_hex(),
            created_at,
            kind,
            tags,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::verify_record;
    use feedstr_core::{kinds, Tag};
    use rand::RngCore;

    fn random_keypair() -> FeedKeypair {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        FeedKeypair::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn from_hex_roundtrip() {
        let kp1 = random_keypair();
        let kp2 = FeedKeypair::from_hex(&kp1.private_hex()).unwrap();
        assert_eq!(kp1.public_hex(), kp2.public_hex());
        assert_eq!(kp1.public_hex().len(), 64);
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            FeedKeypair::from_hex("zz"),
            Err(FeedstrError::Identity(_))
        ));
        assert!(matches!(
            FeedKeypair::from_hex("abcd"),
            Err(FeedstrError::Identity(msg)) if msg.contains("32 bytes")
        ));
    }

    #[test]
    fn signed_record_verifies() {
        let kp = random_keypair();
        let unsigned = kp.unsigned(
            kinds::TEXT_NOTE,
            100,
            vec![Tag::new(["proxy", "https://example.com/feed.xml#1", "rss"])],
            "**hello**",
        );
        let record = kp.sign_record(unsigned).unwrap();
        assert_eq!(record.id.len(), 64);
        assert_eq!(record.sig.len(), 128);
        assert!(verify_record(&record).is_ok());
    }

    #[test]
    fn signing_for_another_author_fails() {
        let kp = random_keypair();
        let other = random_keypair();
        let unsigned = other.unsigned(kinds::TEXT_NOTE, 1, vec![], "x");
        assert!(matches!(
            kp.sign_record(unsigned),
            Err(FeedstrError::Signing(_))
        ));
    }

    #[test]
    fn debug_hides_private_key() {
        let kp = random_keypair();
        let debug = format!("{kp:?}");
        assert!(!debug.contains(&kp.private_hex()));
        assert!(debug.contains(&kp.public_hex()));
    }
}
