//! Application Configuration
//! Optional `covidash.json` next to the binary; every field has a default so
//! the file can be partial or absent.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_FILE: &str = "covidash.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// CSV dataset loaded at startup.
    pub data_path: PathBuf,
    /// Ranking size for the top-countries bar chart.
    pub top_n: usize,
    /// Milliseconds between animation frames in the spread view.
    pub frame_millis: u64,
    /// How many countries each spread frame shows.
    pub map_slots: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("covid_19_clean_complete.csv"),
            top_n: 10,
            frame_millis: 400,
            map_slots: 30,
        }
    }
}

impl AppConfig {
    /// Read configuration from `path`, falling back to defaults when the file
    /// is absent or malformed.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "bad config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/covidash.json"));
        assert_eq!(config.top_n, 10);
        assert_eq!(config.data_path, PathBuf::from("covid_19_clean_complete.csv"));
    }

    #[test]
    fn partial_file_keeps_defaults_for_omitted_fields() {
        let mut tmp = NamedTempFile::new().expect("temp file");
        tmp.write_all(br#"{"top_n": 5}"#).expect("write config");

        let config = AppConfig::load(tmp.path());
        assert_eq!(config.top_n, 5);
        assert_eq!(config.frame_millis, 400);
        assert_eq!(config.map_slots, 30);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut tmp = NamedTempFile::new().expect("temp file");
        tmp.write_all(b"{not json").expect("write config");

        let config = AppConfig::load(tmp.path());
        assert_eq!(config.top_n, 10);
    }
}
