//! Streaming AES-256-CBC with PKCS#7 padding.
//!
//! Both directions are `Write` adapters: plaintext (or ciphertext) is pushed in
//! arbitrary slices and whole blocks are transformed as soon as they are
//! available, so memory use stays bounded by the caller's chunk size.

use std::io::{self, Write};

use aes::Block;
use aes::cipher::block_padding::{Padding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::{BLOCK_LEN, CONTENT_KEY_LEN, IV_LEN};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub struct CbcEncryptWriter<W: Write> {
    inner: W,
    cipher: Aes256CbcEnc,
    pending: Vec<u8>,
}

impl<W: Write> CbcEncryptWriter<W> {
    pub fn new(inner: W, key: &[u8; CONTENT_KEY_LEN], iv: &[u8; IV_LEN]) -> Self {
        Self {
            inner,
            cipher: Aes256CbcEnc::new(&(*key).into(), &(*iv).into()),
            pending: Vec::with_capacity(BLOCK_LEN),
        }
    }

    /// Pads and encrypts the final block, flushes, and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        let pos = self.pending.len();
        let mut last = Block::default();
        last[..pos].copy_from_slice(&self.pending);
        Pkcs7::pad(&mut last, pos);
        self.cipher.encrypt_block_mut(&mut last);

        self.inner.write_all(&last)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for CbcEncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = Vec::with_capacity(self.pending.len() + buf.len());
        data.append(&mut self.pending);
        data.extend_from_slice(buf);

        let whole = data.len() - data.len() % BLOCK_LEN;
        self.pending.extend_from_slice(&data[whole..]);
        data.truncate(whole);

        for chunk in data.chunks_exact_mut(BLOCK_LEN) {
            self.cipher.encrypt_block_mut(Block::from_mut_slice(chunk));
        }
        self.inner.write_all(&data)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct CbcDecryptWriter<W: Write> {
    inner: W,
    cipher: Aes256CbcDec,
    // always holds back the last full block so padding can be stripped in `finish`
    pending: Vec<u8>,
}

impl<W: Write> CbcDecryptWriter<W> {
    pub fn new(inner: W, key: &[u8; CONTENT_KEY_LEN], iv: &[u8; IV_LEN]) -> Self {
        Self {
            inner,
            cipher: Aes256CbcDec::new(&(*key).into(), &(*iv).into()),
            pending: Vec::with_capacity(2 * BLOCK_LEN),
        }
    }

    /// Decrypts the held-back block, strips its padding, and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.pending.len() != BLOCK_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "ciphertext is not a whole number of blocks",
            ));
        }

        let mut last = Block::clone_from_slice(&self.pending);
        self.cipher.decrypt_block_mut(&mut last);

        let plain = Pkcs7::unpad(&last)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid padding"))?;

        self.inner.write_all(plain)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for CbcDecryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);

        if self.pending.len() <= BLOCK_LEN {
            return Ok(buf.len());
        }

        // keep the last full block (or the trailing partial one plus nothing more)
        let keep = match self.pending.len() % BLOCK_LEN {
            0 => BLOCK_LEN,
            rem => rem,
        };
        let ready = self.pending.len() - keep;
        let mut data: Vec<u8> = self.pending.drain(..ready).collect();

        for chunk in data.chunks_exact_mut(BLOCK_LEN) {
            self.cipher.decrypt_block_mut(Block::from_mut_slice(chunk));
        }
        self.inner.write_all(&data)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
