use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Upper bound for `cooldown_secs` (one day).
pub const MAX_COOLDOWN_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub device: String,
    pub fourcc: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: "/dev/video0".into(),
            fourcc: "MJPG".into(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
        }
    }
}

/// Scanner and web service settings, stored as JSON. Fields missing from the
/// file keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where accepted scans are POSTed.
    pub api_url: String,
    pub db_path: PathBuf,
    /// Seconds before the same code may be recorded again.
    pub cooldown_secs: u64,
    pub request_timeout_secs: u64,
    pub camera: CameraSettings,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api/attendance".into(),
            db_path: PathBuf::from("attendance.db"),
            cooldown_secs: 5,
            request_timeout_secs: 3,
            camera: CameraSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, or returns defaults when no path is given
    /// or the file does not exist yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings from {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse settings in {}", path.display()))?
            }
            Some(path) => {
                warn!("Settings file {} not found, using defaults", path.display());
                Settings::default()
            }
            None => Settings::default(),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            bail!("api_url must not be empty");
        }
        if self.cooldown_secs > MAX_COOLDOWN_SECS {
            bail!("cooldown_secs must be at most {MAX_COOLDOWN_SECS}");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classroom_setup() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.api_url, "http://localhost:3000/api/attendance");
        assert_eq!(settings.db_path, PathBuf::from("attendance.db"));
        assert_eq!(settings.cooldown(), Duration::from_secs(5));
        assert_eq!(settings.camera.width, 640);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "api_url": "http://10.0.0.5:3000/api/attendance", "camera": { "fps": 15 } }"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.api_url, "http://10.0.0.5:3000/api/attendance");
        assert_eq!(settings.camera.fps, 15);
        assert_eq!(settings.camera.device, "/dev/video0");
        assert_eq!(settings.cooldown_secs, 5);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.cooldown_secs = 10;
        settings.server.bind = "127.0.0.1:8080".into();

        settings.save(&path).unwrap();

        assert_eq!(Settings::load(Some(&path)).unwrap(), settings);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let settings = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn oversized_cooldown_is_rejected() {
        let settings = Settings {
            cooldown_secs: u64::MAX,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            cooldown_secs: MAX_COOLDOWN_SECS,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }
}
