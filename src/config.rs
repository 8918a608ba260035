//! Persistent processor settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::taxonomy::Renderer;
use crate::usd::CollectOptions;
use crate::util::{io, Result};

/// Settings that persist between runs. CLI flags override them per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Conversion
    pub default_target: Renderer,
    /// Houdini context recreated VOP builders live in.
    pub target_context: String,
    /// Scope new USD materials are created under.
    pub parent_scope: String,
    pub reassign_prims: bool,

    // Intermediate dumps
    pub dump_intermediates: bool,
    pub dump_dir: PathBuf,

    // Collect materials
    pub collect_preview: bool,
    pub collect_arnold: bool,
    pub collect_mtlx: bool,
    pub preview_texture_format: Option<String>,
    pub transmissive_keywords: Vec<String>,

    // Recent inputs (most recent first, max 10)
    pub recent_inputs: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_target: Renderer::Mtlx,
            target_context: "/mat".to_string(),
            parent_scope: "/materials".to_string(),
            reassign_prims: true,
            dump_intermediates: false,
            dump_dir: std::env::temp_dir().join("MaterialProcessorTemp"),
            collect_preview: true,
            collect_arnold: true,
            collect_mtlx: false,
            preview_texture_format: None,
            transmissive_keywords: vec!["glass".to_string(), "glas".to_string()],
            recent_inputs: Vec::new(),
        }
    }
}

const MAX_RECENT_INPUTS: usize = 10;

impl Settings {
    /// Get settings file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("material-processor");
            std::fs::create_dir_all(&p).ok();
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the config dir, falling back to defaults.
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Load settings from an explicit file. Missing keys take defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        io::load_json(path)
    }

    /// Save settings to the config dir
    pub fn save(&self) {
        if let Some(path) = Self::path() {
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = std::fs::write(path, json);
            }
        }
    }

    /// Save settings to an explicit file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        io::dump_json(self, path)
    }

    /// Add an input to the recent list (moves to top if already present)
    pub fn add_recent(&mut self, path: PathBuf) {
        self.recent_inputs.retain(|p| p != &path);
        self.recent_inputs.insert(0, path);
        self.recent_inputs.truncate(MAX_RECENT_INPUTS);
    }

    /// Recent inputs that still exist.
    pub fn recent_inputs(&self) -> Vec<&PathBuf> {
        self.recent_inputs.iter().filter(|p| p.exists()).collect()
    }

    /// Collect material options from these settings.
    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            preview: self.collect_preview,
            preview_format: self.preview_texture_format.clone(),
            arnold: self.collect_arnold,
            mtlx: self.collect_mtlx,
            transmissive_keywords: self.transmissive_keywords.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "default_target": "arnold", "collect_mtlx": true }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.default_target, Renderer::Arnold);
        assert!(settings.collect_mtlx);
        assert_eq!(settings.parent_scope, "/materials");
        assert!(settings.reassign_prims);
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            preview_texture_format: Some("png".into()),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_recent_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        for i in 0..12 {
            settings.add_recent(dir.path().join(format!("net{}.json", i)));
        }
        settings.add_recent(dir.path().join("net5.json"));
        assert_eq!(settings.recent_inputs.len(), MAX_RECENT_INPUTS);
        assert_eq!(settings.recent_inputs[0], dir.path().join("net5.json"));
        assert_eq!(settings.recent_inputs.iter().filter(|p| p.ends_with("net5.json")).count(), 1);

        std::fs::write(dir.path().join("net5.json"), "{}").unwrap();
        assert_eq!(settings.recent_inputs(), vec![&dir.path().join("net5.json")]);
    }

    #[test]
    fn test_collect_options() {
        let settings = Settings {
            collect_arnold: false,
            ..Default::default()
        };
        let options = settings.collect_options();
        assert!(options.preview && !options.arnold && !options.mtlx);
        assert_eq!(options.transmissive_keywords, CollectOptions::default().transmissive_keywords);
    }
}
