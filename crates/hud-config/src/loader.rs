//! Parse and load settings and user flags from RON.

use std::{fs, path::Path};

use serde::de::DeserializeOwned;

use crate::{Error, Settings, UserFlags};

/// Parse a RON document, mapping errors to a located [`Error::Parse`].
pub fn parse_ron<T: DeserializeOwned>(source: &str, path: Option<&Path>) -> Result<T, Error> {
    ron::from_str(source).map_err(|e| Error::from_ron(&e, source, path))
}

/// Read a file to a string, mapping failures to [`Error::Read`].
fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })
}

/// Reject settings values that parse but cannot be used.
pub fn validate_settings(settings: &Settings, path: Option<&Path>) -> Result<(), Error> {
    if settings.debounce_ms > 5_000 {
        return Err(Error::Validation {
            path: path.map(Path::to_path_buf),
            message: format!(
                "debounce_ms must be at most 5000 (got {})",
                settings.debounce_ms
            ),
        });
    }
    if settings.style.trim().is_empty() {
        return Err(Error::Validation {
            path: path.map(Path::to_path_buf),
            message: "style must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Parse settings from a RON string.
pub fn load_settings_from_str(source: &str, path: Option<&Path>) -> Result<Settings, Error> {
    let settings: Settings = parse_ron(source, path)?;
    validate_settings(&settings, path)?;
    Ok(settings)
}

/// Load any RON document from `path`.
pub fn load_ron_from_path<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let source = read(path)?;
    parse_ron(&source, Some(path))
}

/// Load settings from a RON file at `path`.
pub fn load_settings_from_path(path: &Path) -> Result<Settings, Error> {
    let source = read(path)?;
    load_settings_from_str(&source, Some(path))
}

/// Load user flags from `path`; a missing file yields the defaults.
pub fn load_flags_from_path(path: &Path) -> Result<UserFlags, Error> {
    if !path.exists() {
        return Ok(UserFlags::default());
    }
    let source = read(path)?;
    parse_ron(&source, Some(path))
}
