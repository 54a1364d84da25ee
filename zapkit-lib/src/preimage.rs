//! Payment preimage and hash generation.
//!
//! A [`CommitmentPair`] is created fresh for every zap attempt. It is neither
//! `Clone` nor `Copy`: handing it to the invoice service moves it into the
//! resulting [`Invoice`](crate::invoice::Invoice), so one pair can back at most
//! one invoice.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Result, ZapError};

/// Length in bytes of a payment preimage.
pub const PREIMAGE_LEN: usize = 32;

/// A random preimage and its SHA-256 payment hash.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CommitmentPair {
    preimage: [u8; PREIMAGE_LEN],
    hash: [u8; 32],
}

impl CommitmentPair {
    /// Generate a new pair from the operating system CSPRNG.
    ///
    /// Fails with [`ZapError::Entropy`] if the random source is unavailable.
    /// There is no fallback source.
    pub fn generate() -> Result<Self> {
        let mut preimage = [0u8; PREIMAGE_LEN];
        OsRng
            .try_fill_bytes(&mut preimage)
            .map_err(|e| ZapError::Entropy(e.to_string()))?;
        let pair = Self::from_preimage(preimage);
        preimage.zeroize();
        Ok(pair)
    }

    /// Build a pair from a known preimage.
    pub fn from_preimage(preimage: [u8; PREIMAGE_LEN]) -> Self {
        let hash: [u8; 32] = Sha256::digest(preimage).into();
        Self { preimage, hash }
    }

    /// Raw preimage bytes.
    pub fn preimage(&self) -> &[u8; PREIMAGE_LEN] {
        &self.preimage
    }

    /// Raw payment hash bytes.
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Preimage as lowercase hex, the encoding used in protocol tags.
    pub fn preimage_hex(&self) -> String {
        hex::encode(self.preimage)
    }

    /// Payment hash as lowercase hex.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Preimage as standard base64, the encoding the LND REST API expects.
    pub fn preimage_base64(&self) -> String {
        BASE64.encode(self.preimage)
    }

    /// Payment hash as standard base64.
    pub fn hash_base64(&self) -> String {
        BASE64.encode(self.hash)
    }

    /// Returns true if `preimage` hashes to this pair's payment hash.
    pub fn matches_preimage(&self, preimage: &[u8]) -> bool {
        Sha256::digest(preimage).as_slice() == self.hash
    }
}

impl fmt::Debug for CommitmentPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitmentPair")
            .field("preimage", &"<redacted>")
            .field("hash", &self.hash_hex())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_sha256_of_preimage() {
        let pair = CommitmentPair::generate().unwrap();
        let expected: [u8; 32] = Sha256::digest(pair.preimage()).into();
        assert_eq!(pair.hash(), &expected);
        assert!(pair.matches_preimage(pair.preimage()));
    }

    #[test]
    fn test_pairs_are_fresh() {
        let a = CommitmentPair::generate().unwrap();
        let b = CommitmentPair::generate().unwrap();
        assert_ne!(a.preimage(), b.preimage());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_known_vector() {
        // SHA-256 of 32 zero bytes
        let pair = CommitmentPair::from_preimage([0u8; 32]);
        assert_eq!(
            pair.hash_hex(),
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925"
        );
        assert_eq!(
            pair.preimage_base64(),
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
        );
    }

    #[test]
    fn test_encodings_round_trip() {
        let pair = CommitmentPair::generate().unwrap();

        let from_hex = hex::decode(pair.preimage_hex()).unwrap();
        let from_b64 = BASE64.decode(pair.preimage_base64()).unwrap();
        assert_eq!(from_hex, from_b64);
        assert_eq!(from_hex.as_slice(), pair.preimage());

        let hash_hex = hex::decode(pair.hash_hex()).unwrap();
        let reencoded = BASE64.encode(&hash_hex);
        assert_eq!(reencoded, pair.hash_base64());
    }

    #[test]
    fn test_debug_redacts_preimage() {
        let pair = CommitmentPair::from_preimage([7u8; 32]);
        let debug = format!("{:?}", pair);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&pair.preimage_hex()));
    }
}
