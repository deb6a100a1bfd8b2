//! Project key pairs and the directory-backed repository that persists them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use tracing::{debug, info};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::crypto::{X25519_KEY_LEN, random_array};
use crate::error::{Error, Result};
use crate::format::keyfile;
use crate::storage::write_atomic;

const KEY_FILE_EXT: &str = "key";

/// An X25519 key pair identified by a project-scoped name.
#[derive(Clone)]
pub struct KeyPair {
    name: String,
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generates a fresh key pair from the OS random generator.
    pub fn generate(name: &str) -> Result<Self> {
        let secret = StaticSecret::from(random_array::<X25519_KEY_LEN>().map_err(Error::crypto)?);
        let public = PublicKey::from(&secret);
        Ok(Self {
            name: name.to_string(),
            secret,
            public,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("name", &self.name)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Directory of key files, one `<name>.key` per key pair.
#[derive(Debug, Clone)]
pub struct KeyRepository {
    dir: PathBuf,
}

impl KeyRepository {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.key_path(name)?.is_file())
    }

    pub fn load(&self, name: &str) -> Result<KeyPair> {
        let path = self.key_path(name)?;
        let data = fs::read(&path).map_err(|e| {
            Error::Configuration(format!("cannot read key file {}: {e}", path.display()))
        })?;

        let (secret, public) = keyfile::parse(&data)
            .with_context(|| format!("invalid key file {}", path.display()))
            .map_err(|e| Error::Configuration(format!("{e:#}")))?;

        Ok(KeyPair {
            name: name.to_string(),
            secret,
            public,
        })
    }

    pub fn store(&self, pair: &KeyPair) -> Result<()> {
        let path = self.key_path(pair.name())?;
        let bytes = keyfile::serialize(&pair.secret, &pair.public);
        write_atomic(&path, &bytes)
            .map_err(|e| Error::Configuration(format!("cannot persist key '{}': {e:#}", pair.name())))
    }

    fn key_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{KEY_FILE_EXT}")))
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Configuration("key name cannot be empty".into()));
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(Error::Configuration(format!(
            "key name '{name}' must not contain path separators or '..'"
        )));
    }
    Ok(())
}

/// The platform data directory used when no repository path is given.
pub fn default_repository() -> Result<KeyRepository> {
    let project_dirs = ProjectDirs::from("", "", "assetpack").ok_or_else(|| {
        Error::Configuration("could not determine platform directories".into())
    })?;

    Ok(KeyRepository::new(project_dirs.data_dir().join("keys")))
}

/// Holds the single active key pair of a session.
pub struct KeyStore {
    repository: KeyRepository,
    active: Option<KeyPair>,
}

impl KeyStore {
    pub fn new(repository: KeyRepository) -> Self {
        Self {
            repository,
            active: None,
        }
    }

    pub fn repository(&self) -> &KeyRepository {
        &self.repository
    }

    /// Generates a new pair, persists it under `name`, and makes it active.
    pub fn create_keys(&mut self, name: &str) -> Result<&KeyPair> {
        let pair = KeyPair::generate(name)?;
        self.repository.store(&pair)?;
        info!(key = name, dir = %self.repository.dir().display(), "created key pair");
        Ok(&*self.active.insert(pair))
    }

    /// Loads the pair stored under `name`, creating it if absent, and makes it active.
    pub fn init_keys(&mut self, name: &str) -> Result<&KeyPair> {
        if !self.repository.contains(name)? {
            return self.create_keys(name);
        }

        let pair = self.repository.load(name)?;
        debug!(key = name, "loaded key pair");
        Ok(&*self.active.insert(pair))
    }

    pub fn active(&self) -> Result<&KeyPair> {
        self.active
            .as_ref()
            .ok_or_else(|| Error::Configuration("no active key pair".into()))
    }

    pub fn into_active(self) -> Result<KeyPair> {
        self.active
            .ok_or_else(|| Error::Configuration("no active key pair".into()))
    }
}
