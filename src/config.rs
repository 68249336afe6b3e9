use crate::app::{MAX_BRUSH_SIZE, MAX_DENSITY, MAX_TICKS_PER_FRAME};
use crate::color::Palette;
use crate::error::{Result, SandError};
use crate::settings::SimulationSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u32 = 1;

/// Complete application configuration for export/import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// Simulation settings
    pub settings: SimulationSettings,
    /// Paint color (app-level)
    pub palette: Palette,
    /// Simulation ticks per rendered frame (1-20)
    pub ticks_per_frame: usize,
    /// Brush radius in cells (0-5)
    pub brush_size: i32,
    /// Pixels per cell in PNG/GIF exports (1-8)
    pub density: u32,
}

impl AppConfig {
    /// Default config location, e.g. `~/.config/falling-sand/config.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("falling-sand").join("config.json"))
            .ok_or(SandError::NoConfigDir)
    }

    /// Check the simulation settings and the host values against the
    /// ranges the app runs with
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        if !(1..=MAX_TICKS_PER_FRAME).contains(&self.ticks_per_frame) {
            return Err(SandError::InvalidSettings(format!(
                "ticks per frame must be 1-{}, got {}",
                MAX_TICKS_PER_FRAME, self.ticks_per_frame
            )));
        }
        if !(0..=MAX_BRUSH_SIZE).contains(&self.brush_size) {
            return Err(SandError::InvalidSettings(format!(
                "brush size must be 0-{}, got {}",
                MAX_BRUSH_SIZE, self.brush_size
            )));
        }
        if !(1..=MAX_DENSITY).contains(&self.density) {
            return Err(SandError::InvalidSettings(format!(
                "density must be 1-{}, got {}",
                MAX_DENSITY, self.density
            )));
        }
        Ok(())
    }

    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Import config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        if config.version != CONFIG_VERSION {
            return Err(SandError::UnsupportedVersion {
                found: config.version,
                expected: CONFIG_VERSION,
            });
        }
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            settings: SimulationSettings::default(),
            palette: Palette::default(),
            ticks_per_frame: 1,
            brush_size: 0,
            density: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{EdgeBehavior, FloorBehavior};
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig {
            version: CONFIG_VERSION,
            settings: SimulationSettings {
                width: 200,
                height: 120,
                depth: 6,
                rest_threshold: 8,
                floor_behavior: FloorBehavior::Hold,
                edge_behavior: EdgeBehavior::Wrap,
                rain_rate: 3,
            },
            palette: Palette::Green,
            ticks_per_frame: 4,
            brush_size: 2,
            density: 5,
        };

        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_file_save_and_load() {
        let config = AppConfig::default();

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        config.save_to_file(&path).unwrap();
        let loaded = AppConfig::load_from_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        AppConfig::default().save_to_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_config_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "not valid json").unwrap();

        let result = AppConfig::load_from_file(temp_file.path());
        assert!(matches!(result, Err(SandError::Json(_))));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = AppConfig::default();
        config.settings.depth = 42;
        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();

        let result = AppConfig::load_from_file(temp_file.path());
        assert!(matches!(result, Err(SandError::InvalidSettings(_))));
    }

    #[test]
    fn test_out_of_range_host_values_rejected() {
        let configs = [
            AppConfig {
                ticks_per_frame: 0,
                ..AppConfig::default()
            },
            AppConfig {
                ticks_per_frame: MAX_TICKS_PER_FRAME + 1,
                ..AppConfig::default()
            },
            AppConfig {
                brush_size: -1,
                ..AppConfig::default()
            },
            AppConfig {
                density: MAX_DENSITY + 1,
                ..AppConfig::default()
            },
        ];

        for config in configs {
            let temp_file = NamedTempFile::new().unwrap();
            config.save_to_file(temp_file.path()).unwrap();

            let result = AppConfig::load_from_file(temp_file.path());
            assert!(matches!(result, Err(SandError::InvalidSettings(_))), "{:?}", config);
        }
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let config = AppConfig {
            version: 99,
            ..AppConfig::default()
        };
        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();

        let result = AppConfig::load_from_file(temp_file.path());
        assert!(matches!(
            result,
            Err(SandError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let result = AppConfig::load_from_file(Path::new("/nonexistent/path/config.json"));
        assert!(matches!(result, Err(SandError::Io(_))));
    }
}
