//! Wraps a per-file content key for a project's X25519 public key.
//!
//! Wrapped layout:
//! ```text
//! EPHEMERAL_PUBLIC (32) | NONCE (24) | SEALED_KEY (32 + 16 tag)
//! ```

use super::{NONCE_LEN, WRAPPED_KEY_LEN, X25519_KEY_LEN, aead, random_array};
use anyhow::{Result, bail};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

const KEK_CONTEXT: &str = "assetpack 2026-10 content key wrap v1";

fn derive_kek(shared: &[u8], ephemeral: &PublicKey, recipient: &PublicKey) -> Zeroizing<[u8; 32]> {
    let mut material = Zeroizing::new(Vec::with_capacity(3 * X25519_KEY_LEN));
    material.extend_from_slice(shared);
    material.extend_from_slice(ephemeral.as_bytes());
    material.extend_from_slice(recipient.as_bytes());
    Zeroizing::new(blake3::derive_key(KEK_CONTEXT, &material))
}

/// Seals `content_key` so only the holder of `recipient`'s secret can open it.
pub fn wrap_key(recipient: &PublicKey, content_key: &[u8]) -> Result<Vec<u8>> {
    let ephemeral = StaticSecret::from(random_array::<X25519_KEY_LEN>()?);
    let ephemeral_public = PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(recipient);
    let kek = derive_kek(shared.as_bytes(), &ephemeral_public, recipient);

    let (sealed, nonce) = aead::seal(&kek[..], content_key)?;

    let mut out = Vec::with_capacity(X25519_KEY_LEN + NONCE_LEN + sealed.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Opens a wrapped content key with the recipient's secret.
///
/// # Errors
///
/// Fails if the block is malformed or was wrapped for a different key pair.
pub fn unwrap_key(secret: &StaticSecret, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        bail!(
            "wrapped key has {} bytes, expected {WRAPPED_KEY_LEN}",
            wrapped.len()
        );
    }

    let ephemeral_bytes: [u8; X25519_KEY_LEN] = wrapped[..X25519_KEY_LEN].try_into()?;
    let ephemeral_public = PublicKey::from(ephemeral_bytes);
    let nonce = &wrapped[X25519_KEY_LEN..X25519_KEY_LEN + NONCE_LEN];
    let sealed = &wrapped[X25519_KEY_LEN + NONCE_LEN..];

    let recipient = PublicKey::from(secret);
    let shared = secret.diffie_hellman(&ephemeral_public);
    let kek = derive_kek(shared.as_bytes(), &ephemeral_public, &recipient);

    aead::open(&kek[..], nonce, sealed)
}
