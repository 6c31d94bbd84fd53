//! Persistence of prefix/suffix choices between sessions.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::*;

/// Key under which remembered prefixes are stored.
pub const PREFIX_KEY: &str = "prefix_values";
/// Key under which remembered suffixes are stored.
pub const SUFFIX_KEY: &str = "suffix_values";

pub const DEFAULT_PREFIXES: [&str; 4] = ["sticker", "character", "emoji", "avatar"];
pub const DEFAULT_SUFFIXES: [&str; 6] = ["happy", "sad", "angry", "surprised", "confused", "love"];

const LIST_SEPARATOR: char = ',';

/// Key/value store holding string lists.
///
/// Loading never fails: a missing or unreadable key is an empty list.
pub trait NameStore {
    fn load_strings(&self, key: &str) -> Vec<String>;
    fn save_strings(&mut self, key: &str, values: &[String]) -> io::Result<()>;
}

/// In-memory store, for tests and hosts that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryNameStore {
    entries: BTreeMap<String, Vec<String>>,
}

impl MemoryNameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameStore for MemoryNameStore {
    fn load_strings(&self, key: &str) -> Vec<String> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    fn save_strings(&mut self, key: &str, values: &[String]) -> io::Result<()> {
        self.entries.insert(key.to_string(), values.to_vec());
        Ok(())
    }
}

/// Plain text store, one `key=a,b,c` line per key.
#[derive(Debug, Clone)]
pub struct FileNameStore {
    path: PathBuf,
}

impl FileNameStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> io::Result<BTreeMap<String, Vec<String>>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e),
        };
        Ok(text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, list)| {
                let values = list
                    .split(LIST_SEPARATOR)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                (key.trim().to_string(), values)
            })
            .collect())
    }
}

impl NameStore for FileNameStore {
    fn load_strings(&self, key: &str) -> Vec<String> {
        match self.read_entries() {
            Ok(mut entries) => entries.remove(key).unwrap_or_default(),
            Err(e) => {
                warn!("Could not read name store {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn save_strings(&mut self, key: &str, values: &[String]) -> io::Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), values.to_vec());

        let mut text = String::new();
        for (key, values) in &entries {
            text.push_str(key);
            text.push('=');
            text.push_str(&values.join(","));
            text.push('\n');
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, text)?;
        debug!("Saved {} values under {} to {}", values.len(), key, self.path.display());
        Ok(())
    }
}

/// Remembered prefixes and suffixes, backed by a [`NameStore`].
///
/// # Example
/// ```
/// use gridsplit::{MemoryNameStore, NameHistory};
///
/// let mut history = NameHistory::load(MemoryNameStore::new());
/// assert_eq!(history.prefixes()[0], "sticker");
///
/// assert!(history.remember_prefix("cat").unwrap());
/// assert!(!history.remember_prefix("cat").unwrap());
/// assert_eq!(history.prefixes().last().map(String::as_str), Some("cat"));
/// ```
#[derive(Debug, Clone)]
pub struct NameHistory<S> {
    store: S,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
}

impl<S: NameStore> NameHistory<S> {
    /// Loads both lists, falling back to the built-in defaults for an empty
    /// list.
    pub fn load(store: S) -> Self {
        let load = |key: &str, defaults: &[&str]| {
            let values = store.load_strings(key);
            if values.is_empty() {
                defaults.iter().map(|v| v.to_string()).collect()
            } else {
                values
            }
        };
        let prefixes = load(PREFIX_KEY, &DEFAULT_PREFIXES);
        let suffixes = load(SUFFIX_KEY, &DEFAULT_SUFFIXES);
        Self {
            store,
            prefixes,
            suffixes,
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Appends `value` to the prefix list and persists it.
    ///
    /// Returns `Ok(false)` for a blank value, one already listed, or one
    /// containing the list separator.
    pub fn remember_prefix(&mut self, value: &str) -> io::Result<bool> {
        remember(&mut self.store, &mut self.prefixes, PREFIX_KEY, value)
    }

    /// Appends `value` to the suffix list and persists it.
    pub fn remember_suffix(&mut self, value: &str) -> io::Result<bool> {
        remember(&mut self.store, &mut self.suffixes, SUFFIX_KEY, value)
    }
}

fn remember(
    store: &mut impl NameStore,
    list: &mut Vec<String>,
    key: &str,
    value: &str,
) -> io::Result<bool> {
    let value = value.trim();
    if value.is_empty() || list.iter().any(|v| v == value) {
        return Ok(false);
    }
    if value.contains(LIST_SEPARATOR) || value.contains('\n') {
        warn!("Not remembering {:?}: it contains a list separator", value);
        return Ok(false);
    }
    list.push(value.to_string());
    store.save_strings(key, list)?;
    Ok(true)
}
