//! JSON persistence for the device log and the notification settings.
//!
//! Both documents are read once at startup and rewritten wholesale on every
//! change. A missing or unreadable file yields the default value so the
//! process can always start. The device log is never silently replaced: an
//! unreadable log file is moved aside before the first save.

use crate::error::{Result, SentryError};
use crate::status_log::DeviceLog;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, error, warn};

/// Save hook for the device log.
pub trait LogStore: Send + Sync {
    /// Persist the whole log.
    ///
    /// # Errors
    ///
    /// Returns `SentryError::Persistence` if the log cannot be written
    fn save(&self, log: &DeviceLog) -> Result<()>;
}

/// A JSON document stored at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the document, falling back to `T::default()` when the file is
    /// missing or cannot be parsed.
    pub fn load_or_default<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load() {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("{} does not exist, using defaults", self.path.display());
                T::default()
            }
            Err(e) => {
                error!("Failed to read {}: {e}", self.path.display());
                T::default()
            }
        }
    }

    /// Like [`JsonFileStore::load_or_default`], but an unreadable file is
    /// renamed to `<file>.corrupt` so the next write cannot destroy it.
    pub fn load_or_set_aside<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load() {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("{} does not exist, starting empty", self.path.display());
                T::default()
            }
            Err(e) => {
                error!("Failed to read {}: {e}", self.path.display());
                let aside = self.set_aside_path();
                match fs::rename(&self.path, &aside) {
                    Ok(()) => warn!(
                        "Moved unreadable {} to {}",
                        self.path.display(),
                        aside.display()
                    ),
                    Err(e) => error!("Failed to move {} aside: {e}", self.path.display()),
                }
                T::default()
            }
        }
    }

    fn set_aside_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    /// Read the document; `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded
    pub fn load<T>(&self) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Write the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `SentryError::Persistence` if serialization or the write fails
    pub fn write<T>(&self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| SentryError::Persistence(format!("Failed to serialize: {e}")))?;
        fs::write(&self.path, json).map_err(|e| {
            SentryError::Persistence(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

impl LogStore for JsonFileStore {
    fn save(&self, log: &DeviceLog) -> Result<()> {
        self.write(log)
    }
}
