//! Palette store: ordered mapping from role name to color value.
//!
//! The palette is the source of truth for valid roles. Insertion order is
//! meaningful: it defines the 1-indexed keyboard slot of each role (only the
//! first nine are addressable) and breaks ties when two roles share the same
//! normalized color. Persisted as a JSON object; `serde_json` is built with
//! `preserve_order` so the object's key order is the role order.
//!
//! Loading fails soft: an absent or unparsable palette file falls back to
//! the built-in default palette. Renaming is not supported - remove + add.

use crate::log;
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Number of roles addressable via keyboard slots.
pub const KEY_SLOTS: usize = 9;

/// Class prefix attached to shapes carrying a role.
pub const ROLE_CLASS_PREFIX: &str = "tinct-";

/// Palette-related errors.
#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("palette is not a JSON object of name → color strings")]
    Parse(#[source] serde_json::Error),

    #[error("palette entry `{0}` is not a string")]
    NonStringColor(String),

    #[error("role name must be a non-empty string")]
    EmptyRole,

    #[error("color value must be a non-empty string")]
    EmptyColor,
}

/// Ordered role → color mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<(String, String)>,
}

impl Default for Palette {
    /// The built-in default palette.
    fn default() -> Self {
        Self {
            entries: vec![
                ("gold".into(), "#ad8957".into()),
                ("red".into(), "#fa3a3d".into()),
                ("grey".into(), "#dbdbdb".into()),
                ("dark".into(), "#272320".into()),
            ],
        }
    }
}

impl Palette {
    /// Create an empty palette.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Look up the color assigned to a role.
    pub fn get(&self, role: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == role)
            .map(|(_, color)| color.as_str())
    }

    /// Set a role's color. Existing roles keep their position; new roles
    /// append at the end (their keyboard slot is the next free index).
    pub fn set(&mut self, role: &str, color: &str) -> Result<(), PaletteError> {
        if role.is_empty() {
            return Err(PaletteError::EmptyRole);
        }
        if color.is_empty() {
            return Err(PaletteError::EmptyColor);
        }
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| name == role) {
            entry.1 = color.to_string();
        } else {
            self.entries.push((role.to_string(), color.to_string()));
        }
        Ok(())
    }

    /// Remove a role. Returns true if it existed.
    pub fn remove(&mut self, role: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(name, _)| name != role);
        self.entries.len() != before
    }

    /// Role names in insertion order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// (role, color) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, color)| (name.as_str(), color.as_str()))
    }

    /// Role bound to the given keyboard slot (1-indexed, slots 1-9).
    pub fn role_at(&self, slot: usize) -> Option<&str> {
        if slot == 0 || slot > KEY_SLOTS {
            return None;
        }
        self.entries.get(slot - 1).map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // persistence
    // ========================================================================

    /// Parse a palette from its serialized JSON object form.
    pub fn from_json(json: &str) -> Result<Self, PaletteError> {
        let map: serde_json::Map<String, Value> =
            serde_json::from_str(json).map_err(PaletteError::Parse)?;

        let mut palette = Self::empty();
        for (name, value) in map {
            let Some(color) = value.as_str() else {
                return Err(PaletteError::NonStringColor(name));
            };
            palette.set(&name, color)?;
        }
        Ok(palette)
    }

    /// Serialize to the JSON object form (role order preserved).
    pub fn to_json(&self) -> String {
        let mut map = serde_json::Map::new();
        for (name, color) in &self.entries {
            map.insert(name.clone(), Value::String(color.clone()));
        }
        serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".into())
    }

    /// Load from disk, falling back to the default palette when the file is
    /// absent or unparsable.
    pub fn load(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match Self::from_json(&json) {
            Ok(palette) => palette,
            Err(e) => {
                log!("palette"; "ignoring unparsable {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json())
    }

    // ========================================================================
    // stylesheet export
    // ========================================================================

    /// Render the palette as a CSS stylesheet: `:root` variables plus one
    /// fill rule per role class, with the literal color as fallback.
    pub fn css_stylesheet(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, color) in &self.entries {
            css.push_str(&format!("    --{name}: {color};\n"));
        }
        css.push_str("}\n\n");

        for (name, color) in &self.entries {
            css.push_str(&format!(
                ".{ROLE_CLASS_PREFIX}{name} {{ fill: var(--{name}, {color}); }}\n"
            ));
        }
        css
    }
}
