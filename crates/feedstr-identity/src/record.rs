// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical record ids and signature verification.

use ed25519_dalek::{Signature, VerifyingKey};
use feedstr_core::{FeedstrError, Record, UnsignedRecord};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `[0, pubkey, created_at, kind, tags, content]`
/// serialized as compact JSON.
pub fn record_id(unsigned: &UnsignedRecord) -> String {
    let canonical = serde_json::json!([
        0,
        unsigned.pubkey,
        unsigned.created_at,
        unsigned.kind,
        unsigned.tags,
        unsigned.content,
    ]);
    hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
}

/// Check that `record.id` matches its content and `record.sig` is a valid
/// signature by `record.pubkey` over it.
pub fn verify_record(record: &Record) -> Result<(), FeedstrError> {
    let expected = record_id(&record.unsigned());
    if expected != record.id {
        return Err(FeedstrError::Signing(format!(
            "record id {} does not match content",
            record.id
        )));
    }

    let key_bytes: [u8; 32] = decode_fixed(&record.pubkey, "public key")?;
    let sig_bytes: [u8; 64] = decode_fixed(&record.sig, "signature")?;
    let id_bytes: [u8; 32] = decode_fixed(&record.id, "record id")?;

    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| FeedstrError::Signing(format!("invalid public key: {e}")))?;
    key.verify_strict(&id_bytes, &Signature::from_bytes(&sig_bytes))
        .map_err(|e| FeedstrError::Signing(format!("signature verification failed: {e}")))
}

fn decode_fixed<const N: usize>(value: &str, what: &str) -> Result<[u8; N], FeedstrError> {
    let bytes = hex::decode(value)
        .map_err(|e| FeedstrError::Signing(format!("{what} is not hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| FeedstrError::Signing(format!("{what} must be {N} bytes")))
}
