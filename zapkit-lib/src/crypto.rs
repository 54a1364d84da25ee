//! Signing and hashing capabilities.
//!
//! Builders never call a crypto library directly; they receive a [`Signer`]
//! and a [`Hasher`]. Production code uses [`SecpSigner`] (BIP-340 Schnorr over
//! secp256k1) and [`Sha256Hasher`]; tests can inject fixed keys.

use std::fmt;
use std::str::FromStr;

use bitcoin::secp256k1::{schnorr, All, Keypair, Message, Secp256k1, XOnlyPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{Result, ZapError};

/// Produces SHA-256 digests.
pub trait Hasher: Send + Sync {
    /// SHA-256 of `data`.
    fn sha256(&self, data: &[u8]) -> [u8; 32];
}

/// Signs event ids on behalf of a single key.
pub trait Signer: Send + Sync {
    /// X-only public key as 64 lowercase hex characters.
    fn public_key(&self) -> String;

    /// Schnorr signature over a 32-byte event id, hex encoded.
    ///
    /// Signatures may be randomized; callers must not rely on two signatures
    /// over the same id being equal.
    fn sign(&self, id: &[u8; 32]) -> Result<String>;
}

/// [`Hasher`] backed by the `sha2` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}

/// [`Signer`] holding a secp256k1 keypair.
pub struct SecpSigner {
    secp: Secp256k1<All>,
    keypair: Keypair,
    public_key: XOnlyPublicKey,
}

impl SecpSigner {
    /// Create a signer from a 64-character hex secret key.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let secret = secret_hex.trim();
        if secret.is_empty() {
            return Err(ZapError::Signing("secret key is empty".to_string()));
        }
        let bytes = Zeroizing::new(
            hex::decode(secret)
                .map_err(|e| ZapError::Signing(format!("secret key is not hex: {}", e)))?,
        );
        Self::from_secret_bytes(&bytes)
    }

    /// Create a signer from 32 raw secret key bytes.
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self> {
        let secp = Secp256k1::new();
        let keypair = Keypair::from_seckey_slice(&secp, secret)
            .map_err(|e| ZapError::Signing(format!("invalid secret key: {}", e)))?;
        let (public_key, _parity) = keypair.x_only_public_key();
        Ok(Self {
            secp,
            keypair,
            public_key,
        })
    }
}

impl Signer for SecpSigner {
    fn public_key(&self) -> String {
        self.public_key.to_string()
    }

    fn sign(&self, id: &[u8; 32]) -> Result<String> {
        let msg = Message::from_digest(*id);
        let sig = self.secp.sign_schnorr(&msg, &self.keypair);
        Ok(hex::encode(sig.serialize()))
    }
}

impl fmt::Debug for SecpSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecpSigner")
            .field("public_key", &self.public_key.to_string())
            .finish_non_exhaustive()
    }
}

/// Returns true if `value` is exactly 64 lowercase hex characters.
pub fn is_hex32(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Verify a hex Schnorr signature over `id` for an x-only hex public key.
pub fn verify_signature(public_key_hex: &str, id: &[u8; 32], sig_hex: &str) -> Result<()> {
    let public_key = XOnlyPublicKey::from_str(public_key_hex)
        .map_err(|e| ZapError::malformed("pubkey", e.to_string()))?;
    let sig_bytes = hex::decode(sig_hex).map_err(|e| ZapError::malformed("sig", e.to_string()))?;
    let sig = schnorr::Signature::from_slice(&sig_bytes)
        .map_err(|e| ZapError::malformed("sig", e.to_string()))?;

    let secp = Secp256k1::verification_only();
    secp.verify_schnorr(&sig, &Message::from_digest(*id), &public_key)
        .map_err(|_| ZapError::malformed("sig", "signature does not verify"))
}
