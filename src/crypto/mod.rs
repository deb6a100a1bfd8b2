//! Cryptographic primitives for packed containers.
//!
//! Bulk content uses AES-256-CBC; the per-file content key is wrapped for the
//! project's X25519 public key.

pub mod aead;
pub mod stream;
pub mod wrap;

pub use aead::{random_array, secure_random};
pub use stream::{CbcDecryptWriter, CbcEncryptWriter};
pub use wrap::{unwrap_key, wrap_key};

/// Length of the content key (32 bytes / AES-256).
pub const CONTENT_KEY_LEN: usize = 32;
/// Length of the CBC initialization vector (one AES block).
pub const IV_LEN: usize = 16;
/// AES block size.
pub const BLOCK_LEN: usize = 16;
/// Length of an X25519 key, public or secret.
pub const X25519_KEY_LEN: usize = 32;
/// Length of the nonce (24 bytes for XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;
/// Length of the Poly1305 tag.
pub const TAG_LEN: usize = 16;
/// Length of a wrapped content key: ephemeral public key, nonce, sealed key.
pub const WRAPPED_KEY_LEN: usize = X25519_KEY_LEN + NONCE_LEN + CONTENT_KEY_LEN + TAG_LEN;
