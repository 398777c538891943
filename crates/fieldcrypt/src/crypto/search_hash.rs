//! Keyed one-way digests for exact-match search without decryption.

use sha2::{Digest, Sha256};

use crate::keys::KEY_LEN;

/// Hex-encoded `SHA256(key || utf8(plaintext))`, 64 lowercase characters.
///
/// Absent and empty input both yield `None`, never the digest of `""`, so a
/// search index can tell "no value" apart from a real value.
pub fn search_hash(key: &[u8; KEY_LEN], plaintext: Option<&str>) -> Option<String> {
    let plaintext = plaintext.filter(|p| !p.is_empty())?;
    let digest = Sha256::new()
        .chain_update(key)
        .chain_update(plaintext.as_bytes())
        .finalize();
    Some(hex::encode(digest))
}
