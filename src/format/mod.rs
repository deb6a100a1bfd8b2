//! On-disk formats: packed containers and key files.
//!
//! Container layout (all integers little-endian):
//! ```text
//! KEY_LEN (4) | IV_LEN (4) | WRAPPED_KEY (KEY_LEN) | IV (IV_LEN) | CIPHERTEXT
//! ```

use anyhow::{Result, bail};

pub mod keyfile;

/// Length of one length field.
pub const LEN_FIELD: usize = 4;
/// Length of the two length fields at the head of a container.
pub const HEADER_LEN: usize = 2 * LEN_FIELD;

/// Lengths recorded at the head of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    key_len: u32,
    iv_len: u32,
}

impl ContainerHeader {
    pub fn new(key_len: usize, iv_len: usize) -> Result<Self> {
        let (Ok(key_len), Ok(iv_len)) = (u32::try_from(key_len), u32::try_from(iv_len)) else {
            bail!("key block too large for container header");
        };
        Ok(Self { key_len, iv_len })
    }

    pub fn key_len(&self) -> usize {
        self.key_len as usize
    }

    pub fn iv_len(&self) -> usize {
        self.iv_len as usize
    }

    /// Offset of the first ciphertext byte.
    pub fn ciphertext_offset(&self) -> u64 {
        HEADER_LEN as u64 + u64::from(self.key_len) + u64::from(self.iv_len)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..LEN_FIELD].copy_from_slice(&self.key_len.to_le_bytes());
        buf[LEN_FIELD..].copy_from_slice(&self.iv_len.to_le_bytes());
        buf
    }

    /// Parses the header; both length fields are read in full.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            bail!("container too short");
        }

        let key_len = u32::from_le_bytes(data[..LEN_FIELD].try_into()?);
        let iv_len = u32::from_le_bytes(data[LEN_FIELD..HEADER_LEN].try_into()?);

        Ok(Self { key_len, iv_len })
    }
}
