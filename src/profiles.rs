//! @acp:module "Profiles"
//! @acp:summary "Named credentials for remote service instances and the store holding them"
//! @acp:domain cli
//! @acp:layer config
//!
//! Profiles live in a single JSON file:
//!
//! ```json
//! {
//!   "default": "lab",
//!   "profiles": [
//!     { "name": "lab", "url": "http://lab.example.com/MAAS/", "api_key": "ck:tk:ts" }
//!   ]
//! }
//! ```
//!
//! The file is read when the store is opened and the handle is released
//! before `open` returns; a [`ProfileStore`] is a snapshot and only touches the
//! disk again on [`ProfileStore::save`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// Environment variable overriding the profile store location
pub const PROFILES_ENV: &str = "TETHER_PROFILES";

/// A named credential/endpoint record for one remote service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Server URL, e.g. `http://region.example.com/MAAS/`
    pub url: String,
    /// API key; empty means anonymous
    #[serde(default)]
    pub api_key: String,
}

impl Profile {
    pub fn new(name: impl Into<String>, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

/// On-disk layout of the store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    profiles: Vec<Profile>,
}

/// Keyed collection of profiles plus the default
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    path: Option<PathBuf>,
    profiles: BTreeMap<String, Profile>,
    default: Option<String>,
}

impl ProfileStore {
    /// @acp:summary "Load the store at `path`; a missing file is an empty store"
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => StoreFile::default(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| CliError::InvalidStore {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(e.into()),
        };

        let mut store = Self::build(file.profiles, file.default.as_deref()).map_err(|e| {
            CliError::InvalidStore {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        store.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), profiles = store.profiles.len(), "opened profile store");
        Ok(store)
    }

    /// Store that lives only in memory; `save` is a no-op
    pub fn in_memory(
        profiles: impl IntoIterator<Item = Profile>,
        default: Option<&str>,
    ) -> Result<Self> {
        Self::build(profiles, default)
    }

    fn build(profiles: impl IntoIterator<Item = Profile>, default: Option<&str>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for profile in profiles {
            if map.contains_key(&profile.name) {
                return Err(CliError::DuplicateProfile(profile.name));
            }
            map.insert(profile.name.clone(), profile);
        }
        if let Some(name) = default {
            if !map.contains_key(name) {
                return Err(CliError::ProfileNotFound(name.to_string()));
            }
        }
        Ok(Self {
            path: None,
            profiles: map,
            default: default.map(str::to_string),
        })
    }

    /// Sorted profile names
    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn default_profile(&self) -> Option<&Profile> {
        self.default.as_deref().and_then(|name| self.profiles.get(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Add a profile. An existing profile of the same name is only
    /// overwritten when `replace` is set.
    pub fn insert(&mut self, profile: Profile, replace: bool) -> Result<()> {
        if !replace && self.profiles.contains_key(&profile.name) {
            return Err(CliError::DuplicateProfile(profile.name));
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Remove a profile, clearing the default if it pointed there
    pub fn remove(&mut self, name: &str) -> Result<Profile> {
        let profile = self
            .profiles
            .remove(name)
            .ok_or_else(|| CliError::ProfileNotFound(name.to_string()))?;
        if self.default.as_deref() == Some(name) {
            self.default = None;
        }
        Ok(profile)
    }

    pub fn set_default(&mut self, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) if !self.profiles.contains_key(name) => {
                Err(CliError::ProfileNotFound(name.to_string()))
            }
            _ => {
                self.default = name.map(str::to_string);
                Ok(())
            }
        }
    }

    /// @acp:summary "Write the store back to the file it was opened from"
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = StoreFile {
            default: self.default.clone(),
            profiles: self.profiles.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        // Write beside the target then rename, so a crash never leaves half a file.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&staging, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&staging, path)?;
        tracing::info!(path = %path.display(), "saved profile store");
        Ok(())
    }
}

/// Source of profile stores.
///
/// Every call to `open` yields a fresh snapshot; nothing is held open
/// between calls.
pub trait OpenStore {
    fn open(&self) -> Result<ProfileStore>;
}

/// Store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$TETHER_PROFILES`, or under the user's config directory
    pub fn from_env() -> Self {
        Self::new(default_store_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OpenStore for FileStore {
    fn open(&self) -> Result<ProfileStore> {
        ProfileStore::open(&self.path)
    }
}

/// Fixed in-memory snapshot, mostly for tests
#[derive(Debug, Clone)]
pub struct MemoryStore(ProfileStore);

impl MemoryStore {
    pub fn new(store: ProfileStore) -> Self {
        Self(store)
    }
}

impl OpenStore for MemoryStore {
    fn open(&self) -> Result<ProfileStore> {
        Ok(self.0.clone())
    }
}

/// Resolve the profile store location
pub fn default_store_path() -> PathBuf {
    if let Some(path) = std::env::var_os(PROFILES_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("tether").join("profiles.json"))
        .unwrap_or_else(|| PathBuf::from(".tether/profiles.json"))
}

/// Profile names and the default, read once at process start
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    names: Vec<String>,
    default: Option<String>,
}

impl ProfileCatalog {
    pub fn load(source: &dyn OpenStore) -> Result<Self> {
        let store = source.open()?;
        Ok(Self {
            names: store.names(),
            default: store.default_profile().map(|p| p.name.clone()),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }
}
