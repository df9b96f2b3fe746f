//! One-way hash primitives.
//!
//! There are two deliberately separate families here. [`ReceiptDigest`] is
//! SHA-256 and is the only one that may be used for receipts, vote hashes or
//! anything an auditor relies on. [`CacheKeyDigest`] is MD5 and is only fit
//! for deriving cache keys. Both are deterministic and side-effect free.

use data_encoding::HEXLOWER;
use md5::Md5;
use sha2::{
    digest::{CtOutput, Output},
    Digest, Sha256,
};

/// A deterministic digest rendered as fixed-length lowercase hex.
pub trait HexDigest {
    /// Length of the hex output in characters.
    const HEX_LEN: usize;

    /// Hash `data` and hex-encode the result.
    fn hex(data: &[u8]) -> String;
}

/// Collision-resistant digest for receipts and vote hashes.
#[derive(Debug, Copy, Clone)]
pub struct ReceiptDigest;

impl ReceiptDigest {
    /// Recompute the digest of `data` and compare it against a previously
    /// stored hex digest. The byte comparison does not exit early.
    pub fn matches(data: &[u8], stored_hex: &str) -> bool {
        let stored = match HEXLOWER.decode(stored_hex.as_bytes()) {
            Ok(bytes) if bytes.len() == Self::HEX_LEN / 2 => bytes,
            _ => return false,
        };
        let stored = CtOutput::<Sha256>::new(Output::<Sha256>::clone_from_slice(&stored));
        let recomputed = CtOutput::<Sha256>::new(Sha256::digest(data));
        recomputed == stored
    }
}

impl HexDigest for ReceiptDigest {
    const HEX_LEN: usize = 64;

    fn hex(data: &[u8]) -> String {
        HEXLOWER.encode(&Sha256::digest(data))
    }
}

/// Fast digest for cache keys. Never use this for secrecy or verification.
#[derive(Debug, Copy, Clone)]
pub struct CacheKeyDigest;

impl HexDigest for CacheKeyDigest {
    const HEX_LEN: usize = 32;

    fn hex(data: &[u8]) -> String {
        HEXLOWER.encode(&Md5::digest(data))
    }
}
