use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted per-category visibility, keyed by tag.
pub type VisibilityState = BTreeMap<String, CategoryState>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryState {
    pub visible: bool,
    pub name: String,
}

/// Durable store seam; the visibility controller only ever talks to this.
pub trait StateStore {
    /// Persists the full state. Failures stay inside the store.
    fn save(&self, state: &VisibilityState);
    /// Previously saved state, or None when absent or unreadable.
    fn load(&self) -> Option<VisibilityState>;
}

const LEGEND_ENTRY: &str = "legend_state";
const DARK_MODE_ENTRY: &str = "dark_mode";

/// File-backed store, one JSON file per named entry under the state directory.
#[derive(Clone, Debug)]
pub struct LegendStore {
    base: PathBuf,
}

impl LegendStore {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// Default state directory, overridable via CAMPUS_ATLAS_STATE.
    pub fn default_dir() -> PathBuf {
        std::env::var_os("CAMPUS_ATLAS_STATE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("state"))
    }

    fn entry_path(&self, entry: &str) -> PathBuf {
        self.base.join(format!("{entry}.json"))
    }

    fn write_entry(&self, entry: &str, json: String) {
        let result =
            fs::create_dir_all(&self.base).and_then(|_| fs::write(self.entry_path(entry), json));
        if let Err(err) = result {
            warn!("could not persist {entry}: {err}");
        }
    }

    fn read_entry<T: serde::de::DeserializeOwned>(&self, entry: &str) -> Option<T> {
        let bytes = fs::read(self.entry_path(entry)).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("ignoring corrupt {entry} entry: {err}");
                None
            }
        }
    }

    /// Dark-mode preference, consumed only by presentation. Defaults to off.
    pub fn dark_mode(&self) -> bool {
        self.read_entry(DARK_MODE_ENTRY).unwrap_or(false)
    }

    pub fn set_dark_mode(&self, on: bool) {
        self.write_entry(DARK_MODE_ENTRY, on.to_string());
    }
}

impl StateStore for LegendStore {
    fn save(&self, state: &VisibilityState) {
        match serde_json::to_string(state) {
            Ok(json) => self.write_entry(LEGEND_ENTRY, json),
            Err(err) => warn!("could not serialize legend state: {err}"),
        }
    }

    fn load(&self) -> Option<VisibilityState> {
        self.read_entry(LEGEND_ENTRY)
    }
}
