use std::path::{Path, PathBuf};

use crate::pipeline::RunConfig;

/// Name of the segment that marks a packed tree.
pub const PACKED_DIR: &str = "Packed";

/// A named asset tree and the folder its packed counterpart lives in.
///
/// The name doubles as the key pair name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    raw_root: PathBuf,
    packed_root: PathBuf,
}

impl Project {
    pub fn new(name: impl Into<String>, raw_root: PathBuf, packed_root: PathBuf) -> Self {
        Self {
            name: name.into(),
            raw_root,
            packed_root,
        }
    }

    /// Uses `<raw_root>/Packed` as the packed root.
    pub fn with_default_packed_root(name: impl Into<String>, raw_root: PathBuf) -> Self {
        let packed_root = raw_root.join(PACKED_DIR);
        Self::new(name, raw_root, packed_root)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_root(&self) -> &Path {
        &self.raw_root
    }

    pub fn packed_root(&self) -> &Path {
        &self.packed_root
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && !self.raw_root.as_os_str().is_empty()
            && !self.packed_root.as_os_str().is_empty()
    }

    pub fn run_config(&self, force_build: bool) -> RunConfig {
        RunConfig {
            source_root: self.raw_root.clone(),
            destination_root: self.packed_root.clone(),
            force_build,
        }
    }
}
