use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub display: DisplayConfig,
}

/// Pacing constants for the calibration/validation/test phases. These match
/// what the estimation service expects per target point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub points_per_calibration: u32,
    pub points_per_validation: u32,
    pub points_per_test: u32,
    pub test_point_count: usize,
    pub blink_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
    pub target_fps: u32,
    pub point_radius: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            points_per_calibration: 100,
            points_per_validation: 300,
            points_per_test: 400,
            test_point_count: 5,
            blink_threshold: 0.25,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3226".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            target_fps: 30,
            point_radius: 24.0,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            server: ServerConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl AppConfig {
    pub const PATH: &'static str = "config.json";

    pub fn load() -> Result<Self> {
        Self::load_from(Self::PATH)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let config = if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            // Missing fields fall back to defaults via #[serde(default)]
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    info!("Loaded configuration from {}", path);
                    c
                }
                Err(e) => {
                    warn!("Error parsing {}: {}. Loading defaults.", path, e);
                    Self::default()
                }
            }
        } else {
            info!("Configuration file not found. Creating default at {}", path);
            Self::default()
        };

        // Always save back so newly added fields appear in the file
        config.save_to(path)?;

        Ok(config)
    }

    pub fn save_to(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_expectations() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.session.points_per_calibration, 100);
        assert_eq!(cfg.session.points_per_validation, 300);
        assert_eq!(cfg.session.points_per_test, 400);
        assert_eq!(cfg.session.test_point_count, 5);
        assert_eq!(cfg.session.blink_threshold, 0.25);
    }

    #[test]
    fn partial_config_fills_missing_sections() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"server": {"address": "10.0.0.1:4000"}}"#).unwrap();
        assert_eq!(cfg.server.address, "10.0.0.1:4000");
        assert_eq!(cfg.session.points_per_test, 400);
        assert_eq!(cfg.display.target_fps, 30);
    }
}
