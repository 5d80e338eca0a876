use log::{debug, info};
use once_cell::sync::OnceCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{ClientError, ClientResult};
use crate::models::Identity;

const CACHE_FILE: &str = "identity.json";

static CONFIG_DIR_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Point the config directory somewhere else (e.g. `--config-dir`).
/// Only the first call wins.
pub fn set_config_dir_override(dir: PathBuf) {
    if CONFIG_DIR_OVERRIDE.set(dir).is_err() {
        debug!("Config dir override already set, ignoring");
    }
}

pub fn get_config_dir() -> ClientResult<PathBuf> {
    let config_dir = match CONFIG_DIR_OVERRIDE.get() {
        Some(dir) => dir.clone(),
        None => dirs::config_dir()
            .ok_or_else(|| ClientError::Validation("Could not determine config directory".to_string()))?
            .join("chatroom-client"),
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Local display cache for the last logged-in username.
///
/// This is not a credential: the server session is the cookie.
pub trait IdentityCache: Send + Sync {
    fn load(&self) -> ClientResult<Option<Identity>>;
    fn store(&self, identity: &Identity) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

pub struct FileIdentityCache {
    path: PathBuf,
}

impl FileIdentityCache {
    pub fn new(dir: &Path) -> Self {
        FileIdentityCache {
            path: dir.join(CACHE_FILE),
        }
    }

    /// Cache in the default (or overridden) config directory.
    pub fn in_config_dir() -> ClientResult<Self> {
        Ok(Self::new(&get_config_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityCache for FileIdentityCache {
    fn load(&self) -> ClientResult<Option<Identity>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)?;
        let identity: Identity = serde_json::from_reader(file)?;
        info!("Loaded cached identity {} from {}", identity.username, self.path.display());
        Ok(Some(identity))
    }

    fn store(&self, identity: &Identity) -> ClientResult<()> {
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, identity)?;
        info!("Cached identity for {}", identity.username);
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
