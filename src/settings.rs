// SPDX-License-Identifier: MIT

use config::{Config, File, FileFormat};
use promodesk_core::{chunk::DEFAULT_MAX_HOURS, deadline::Timeouts};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_chunk_max_hours() -> f64 {
    DEFAULT_MAX_HOURS
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    #[serde(skip_serializing, skip_deserializing)]
    file_name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_chunk_max_hours")]
    pub chunk_max_hours: f64,

    #[serde(default)]
    pub timeouts: Timeouts,
}

impl Settings {
    /// A missing file gives the defaults, a broken one is an error.
    pub fn new(file_name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        tracing::info!(target: "settings", file_name=file_name, "Load config");

        let settings = Config::builder()
            .add_source(File::new(file_name, FileFormat::Toml).required(false))
            .build()?
            .try_deserialize::<Self>()?;

        Ok(Self {
            file_name: file_name.to_string(),
            ..settings
        })
    }

    #[cfg(test)]
    fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let s = toml::to_string(self)?;
        std::fs::write(&self.file_name, s)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let s = Settings::new(path.to_str().unwrap()).unwrap();

        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.chunk_max_hours, 4.0);
        assert_eq!(s.timeouts, Timeouts::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://promo.example.com/api"
chunk_max_hours = 2.5

[timeouts]
batch_secs = 20
"#,
        )
        .unwrap();

        let s = Settings::new(path.to_str().unwrap()).unwrap();
        assert_eq!(s.base_url, "https://promo.example.com/api");
        assert_eq!(s.chunk_max_hours, 2.5);
        assert_eq!(s.timeouts.single(), Duration::from_secs(10));
        assert_eq!(s.timeouts.batch(), Duration::from_secs(20));
        assert_eq!(s.timeouts.file(), Duration::from_secs(30));
    }

    #[test]
    fn saved_settings_are_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut s = Settings::new(path.to_str().unwrap()).unwrap();
        s.base_url = "https://promo.example.com/api".to_string();
        s.timeouts.file_secs = 45;
        s.save().unwrap();

        let loaded = Settings::new(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.base_url, "https://promo.example.com/api");
        assert_eq!(loaded.timeouts.file_secs, 45);
        assert_eq!(loaded.file_name(), path.to_str().unwrap());
    }
}
