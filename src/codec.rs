//! Encodes single asset files into packed containers and reads them back.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{
    CONTENT_KEY_LEN, CbcDecryptWriter, CbcEncryptWriter, IV_LEN, WRAPPED_KEY_LEN, random_array,
    unwrap_key, wrap_key,
};
use crate::error::{Error, Result};
use crate::extension::{is_textual, packed_file_name};
use crate::format::{ContainerHeader, HEADER_LEN};
use crate::keystore::KeyPair;
use crate::rewrite::rewrite_line;
use crate::storage::AtomicFile;

/// Size of the chunks streamed through the cipher.
pub const STREAM_CHUNK: usize = 16 * 1024;

const BOM: char = '\u{feff}';

/// Progress notification for one file-level transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path")]
pub enum EncryptionEvent {
    Encrypting(PathBuf),
    Skipped(PathBuf),
    FileDone(PathBuf),
    AllDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Encrypting,
    Skipped,
    FileDone,
    AllDone,
}

impl EncryptionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EncryptionEvent::Encrypting(_) => EventKind::Encrypting,
            EncryptionEvent::Skipped(_) => EventKind::Skipped,
            EncryptionEvent::FileDone(_) => EventKind::FileDone,
            EncryptionEvent::AllDone => EventKind::AllDone,
        }
    }

    /// Source file the event refers to; `None` for `AllDone`.
    pub fn path(&self) -> Option<&Path> {
        match self {
            EncryptionEvent::Encrypting(p)
            | EncryptionEvent::Skipped(p)
            | EncryptionEvent::FileDone(p) => Some(p),
            EncryptionEvent::AllDone => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeOutcome {
    Encrypted(PathBuf),
    Skipped(PathBuf),
}

/// Container path for `source` inside `dest_folder`, with the packed extension.
pub fn container_path(source: &Path, dest_folder: &Path) -> Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        Error::not_found(
            source,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    Ok(dest_folder.join(packed_file_name(&name.to_string_lossy())))
}

/// Hybrid file codec bound to one key pair.
pub struct FileCodec<'k> {
    keys: &'k KeyPair,
}

impl<'k> FileCodec<'k> {
    pub fn new(keys: &'k KeyPair) -> Self {
        Self { keys }
    }

    /// Encrypts `source` into `dest_folder`.
    ///
    /// An existing container is left untouched unless `force_build` is set.
    /// The container only appears once it has been completely written.
    pub fn encode(
        &self,
        source: &Path,
        dest_folder: &Path,
        force_build: bool,
        on_event: &mut dyn FnMut(EncryptionEvent),
    ) -> Result<EncodeOutcome> {
        let dest = container_path(source, dest_folder)?;

        if dest.exists() && !force_build {
            on_event(EncryptionEvent::Skipped(source.to_path_buf()));
            return Ok(EncodeOutcome::Skipped(dest));
        }

        let input = File::open(source).map_err(|e| Error::not_found(source, e))?;

        let content_key = Zeroizing::new(random_array::<CONTENT_KEY_LEN>().map_err(Error::crypto)?);
        let iv: [u8; IV_LEN] = random_array().map_err(Error::crypto)?;
        let wrapped = wrap_key(self.keys.public(), &content_key[..]).map_err(Error::crypto)?;
        let header = ContainerHeader::new(wrapped.len(), iv.len()).map_err(Error::crypto)?;

        let mut out = AtomicFile::create(&dest).map_err(Error::storage)?;
        out.write_all(&header.to_bytes())?;
        out.write_all(&wrapped)?;
        out.write_all(&iv)?;

        let mut cipher = CbcEncryptWriter::new(out, &content_key, &iv);
        if is_textual(source) {
            encode_text(BufReader::new(input), &mut cipher)?;
        } else {
            on_event(EncryptionEvent::Encrypting(source.to_path_buf()));
            debug!(file = %source.display(), "encrypting binary asset");
            stream_chunks(input, &mut cipher)?;
        }

        let out = cipher.finish()?;
        out.commit().map_err(Error::storage)?;

        on_event(EncryptionEvent::FileDone(source.to_path_buf()));
        Ok(EncodeOutcome::Encrypted(dest))
    }

    /// Decrypts a container into memory.
    ///
    /// With `as_textual`, carriage returns are stripped and a NUL terminator is appended.
    pub fn decode(&self, container: &Path, as_textual: bool) -> Result<Vec<u8>> {
        debug!(file = %container.display(), "decrypting container");

        let file = File::open(container).map_err(|e| Error::not_found(container, e))?;
        let total_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut head = [0u8; HEADER_LEN];
        reader
            .read_exact(&mut head)
            .map_err(|_| Error::corrupt(container, "truncated header"))?;
        let header = ContainerHeader::from_bytes(&head)
            .map_err(|e| Error::corrupt(container, e.to_string()))?;

        if header.key_len() != WRAPPED_KEY_LEN {
            return Err(Error::corrupt(
                container,
                format!("unexpected wrapped key length {}", header.key_len()),
            ));
        }
        if header.iv_len() != IV_LEN {
            return Err(Error::corrupt(
                container,
                format!("unexpected IV length {}", header.iv_len()),
            ));
        }
        if header.ciphertext_offset() > total_len {
            return Err(Error::corrupt(container, "key block exceeds file length"));
        }

        let mut wrapped = vec![0u8; header.key_len()];
        reader.read_exact(&mut wrapped)?;
        let mut iv = [0u8; IV_LEN];
        reader.read_exact(&mut iv)?;

        let content_key = unwrap_key(self.keys.secret(), &wrapped).map_err(|e| {
            debug!(file = %container.display(), error = %e, "key unwrap failed");
            Error::KeyMismatch {
                path: container.to_path_buf(),
            }
        })?;
        let content_key: Zeroizing<[u8; CONTENT_KEY_LEN]> = Zeroizing::new(
            content_key
                .as_slice()
                .try_into()
                .map_err(|_| Error::corrupt(container, "content key has wrong length"))?,
        );

        let capacity = (total_len - header.ciphertext_offset()) as usize;
        let mut plain = CbcDecryptWriter::new(Vec::with_capacity(capacity), &content_key, &iv);
        stream_chunks(reader, &mut plain)?;
        let mut plaintext = plain
            .finish()
            .map_err(|e| Error::corrupt(container, e.to_string()))?;

        if as_textual {
            plaintext.retain(|&b| b != b'\r');
            plaintext.push(0);
        }

        Ok(plaintext)
    }
}

fn stream_chunks<R: Read, W: Write>(mut input: R, out: &mut W) -> io::Result<()> {
    let mut buf = vec![0u8; STREAM_CHUNK];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        out.write_all(&buf[..n])?;
    }
}

/// Feeds a textual asset line by line through the rewriter, CRLF-terminated and ASCII-encoded.
fn encode_text<R: BufRead, W: Write>(mut input: R, out: &mut W) -> io::Result<()> {
    let mut raw = Vec::new();
    let mut first = true;

    while read_line(&mut input, &mut raw)? {
        let decoded = String::from_utf8_lossy(&raw);
        let line: &str = if first {
            decoded.strip_prefix(BOM).unwrap_or(&decoded)
        } else {
            &decoded
        };
        first = false;

        let mut bytes: Vec<u8> = rewrite_line(line)
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect();
        bytes.extend_from_slice(b"\r\n");
        out.write_all(&bytes)?;
    }

    Ok(())
}

/// Reads one line into `line`, without its terminator.
///
/// A line ends at LF, CR or CRLF. Returns `false` once the input is exhausted.
fn read_line<R: BufRead>(input: &mut R, line: &mut Vec<u8>) -> io::Result<bool> {
    line.clear();
    let mut read_any = false;

    loop {
        let available = match input.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(read_any);
        }
        read_any = true;

        let Some(end) = available.iter().position(|&b| b == b'\n' || b == b'\r') else {
            let n = available.len();
            line.extend_from_slice(available);
            input.consume(n);
            continue;
        };

        let ended_with_cr = available[end] == b'\r';
        line.extend_from_slice(&available[..end]);
        input.consume(end + 1);

        if ended_with_cr && input.fill_buf()?.first() == Some(&b'\n') {
            input.consume(1);
        }
        return Ok(true);
    }
}
