use std::path::{Path, PathBuf};

use crate::models::theme::{Theme, ThemeSummary};

/// Loads poster themes from a directory of JSON assets.
///
/// Lookup is case-insensitive. Unknown ids fall back to the default theme
/// asset; an unreadable or malformed asset falls back to the hard-coded
/// default record, so `load` always returns a usable theme.
pub struct ThemeStore {
    dir: PathBuf,
}

/// Theme asset used when the requested id does not exist.
const DEFAULT_THEME_ID: &str = "terracotta";

impl ThemeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, theme_id: &str) -> Theme {
        let theme_id = theme_id.to_lowercase();
        let mut path = self.dir.join(format!("{theme_id}.json"));

        if !path.exists() {
            tracing::debug!(theme_id, "Unknown theme id, using default theme");
            path = self.dir.join(format!("{DEFAULT_THEME_ID}.json"));
        }

        match Self::read_theme(&path) {
            Ok(theme) => theme,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Theme asset unreadable, using built-in fallback");
                Theme::fallback()
            }
        }
    }

    /// List available themes, skipping malformed assets.
    pub fn list(&self) -> Vec<ThemeSummary> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, dir = %self.dir.display(), "Themes directory unreadable");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths
            .iter()
            .filter_map(|path| {
                let id = path.file_stem()?.to_str()?.to_string();
                let theme = Self::read_theme(path).ok()?;
                Some(ThemeSummary {
                    id,
                    name: theme.name,
                    description: theme.description,
                })
            })
            .collect()
    }

    fn read_theme(path: &Path) -> Result<Theme, ThemeLoadError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, thiserror::Error)]
enum ThemeLoadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}
