//! Key file format.
//!
//! V1 File Format:
//! ```text
//! MAGIC (4) | VERSION (1) | SECRET (32) | PUBLIC (32)
//! ```

use crate::crypto::X25519_KEY_LEN;
use anyhow::{Result, bail};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Magic bytes identifying an assetpack key file ("APKY").
pub const MAGIC: &[u8; 4] = b"APKY";
/// Length of magic bytes.
pub const MAGIC_LEN: usize = 4;
/// Length of version field.
pub const VER_LEN: usize = 1;
/// Current file format version.
pub const VERSION_V1: u8 = 1;

const FILE_LEN: usize = MAGIC_LEN + VER_LEN + 2 * X25519_KEY_LEN;

/// Serializes a key pair to v1 key file bytes.
pub fn serialize(secret: &StaticSecret, public: &PublicKey) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(Vec::with_capacity(FILE_LEN));

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION_V1);
    buf.extend_from_slice(secret.as_bytes());
    buf.extend_from_slice(public.as_bytes());

    buf
}

/// Parses a key file.
///
/// # Errors
///
/// Returns an error if:
/// - The file is too short or too long
/// - The magic bytes are invalid
/// - The version is unsupported
/// - The stored public key does not belong to the stored secret
pub fn parse(data: &[u8]) -> Result<(StaticSecret, PublicKey)> {
    if data.len() < MAGIC_LEN + VER_LEN {
        bail!("key file too short");
    }

    if &data[..MAGIC_LEN] != MAGIC {
        bail!("invalid key file magic");
    }

    let version = data[MAGIC_LEN];
    if version != VERSION_V1 {
        bail!("unsupported key file version: {version}");
    }

    if data.len() != FILE_LEN {
        bail!("key file has {} bytes, expected {FILE_LEN}", data.len());
    }

    let mut offset = MAGIC_LEN + VER_LEN;

    let mut secret_bytes = Zeroizing::new([0u8; X25519_KEY_LEN]);
    secret_bytes.copy_from_slice(&data[offset..offset + X25519_KEY_LEN]);
    offset += X25519_KEY_LEN;

    let public_bytes: [u8; X25519_KEY_LEN] = data[offset..offset + X25519_KEY_LEN].try_into()?;

    let secret = StaticSecret::from(*secret_bytes);
    let public = PublicKey::from(public_bytes);

    if PublicKey::from(&secret) != public {
        bail!("key file public half does not match its secret");
    }

    Ok((secret, public))
}
