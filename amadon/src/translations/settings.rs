//! Persisted user settings.
//!
//! Settings live in a small JSON document shared with the rest of the
//! application. Only the translation keys are interpreted here; every other
//! key is carried through untouched on save.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::download::publish_atomically;
use super::error::{TranslationError, TranslationResult};
use super::slots::SlotAssignment;

/// Default settings filename.
pub const SETTINGS_FILENAME: &str = "settings.json";

/// Persisted settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Catalog ordinal held by slot 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_slot1: Option<i64>,

    /// Catalog ordinal held by slot 2, or `-1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_slot2: Option<i64>,

    /// Catalog ordinal held by slot 3, or `-1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_slot3: Option<i64>,

    /// Catalog file chosen by the user, tried before the built-in candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Unrelated preferences (theme, window geometry...).
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Settings {
    /// Load settings; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsParseFailed` when the file exists but is not valid.
    pub fn load(path: &Path) -> TranslationResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(TranslationError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|e| TranslationError::SettingsParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load settings, falling back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Using default settings");
            Self::default()
        })
    }

    /// Write settings atomically as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> TranslationResult<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| TranslationError::SettingsParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        publish_atomically(path, json.as_bytes())
    }

    /// Raw slot values as read from disk.
    pub fn persisted_slots(&self) -> [Option<i64>; 3] {
        [
            self.translation_slot1,
            self.translation_slot2,
            self.translation_slot3,
        ]
    }

    /// Store a slot assignment.
    pub fn store_slots(&mut self, slots: &SlotAssignment) {
        let [first, second, third] = slots.to_raw();
        self.translation_slot1 = Some(first);
        self.translation_slot2 = Some(second);
        self.translation_slot3 = Some(third);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translations::slots::SlotValue;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load(&temp.path().join(SETTINGS_FILENAME)).unwrap();
        assert_eq!(settings.persisted_slots(), [None, None, None]);
    }

    #[test]
    fn test_round_trip_preserves_unrelated_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILENAME);
        fs::write(
            &path,
            r#"{"dark_mode": true, "win_size": [800, 600], "translation_slot2": -1}"#,
        )
        .unwrap();

        let mut settings = Settings::load(&path).unwrap();
        assert_eq!(settings.persisted_slots(), [None, Some(-1), None]);

        settings.store_slots(&SlotAssignment::new(3, SlotValue::None, SlotValue::Entry(1)));
        settings.save(&path).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["dark_mode"], Value::Bool(true));
        assert_eq!(raw["win_size"], serde_json::json!([800, 600]));
        assert_eq!(raw["translation_slot1"], serde_json::json!(3));
        assert_eq!(raw["translation_slot2"], serde_json::json!(-1));
        assert_eq!(raw["translation_slot3"], serde_json::json!(1));
    }

    #[test]
    fn test_invalid_document() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILENAME);
        fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(TranslationError::SettingsParseFailed { .. })
        ));
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }
}
