//! Packs raw game asset trees into encrypted containers that a runtime can
//! load without the original files.

pub mod codec;
pub mod crypto;
mod error;
pub mod extension;
pub mod format;
pub mod keystore;
pub mod pipeline;
pub mod project;
pub mod rewrite;
mod storage;

pub use crate::codec::{EncodeOutcome, EncryptionEvent, EventKind, FileCodec, container_path};
pub use crate::error::{Error, Result};
pub use crate::keystore::{KeyPair, KeyRepository, KeyStore, default_repository};
pub use crate::pipeline::{
    BatchReport, FileOutcome, FileResult, PackWorker, PackagePipeline, RunConfig, RunRequest,
    Selection, WorkerMessage,
};
pub use crate::project::{PACKED_DIR, Project};
