use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use wxodds_core::{Granularity, YearWindow};
use wxodds_fetch::PowerSettings;

/// Configuration file read from the working directory when present
pub const CONFIG_FILE: &str = "wxodds.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub community: String,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let settings = PowerSettings::default();
        Self {
            base_url: settings.base_url,
            community: settings.community,
            timeout_secs: settings.timeout.as_secs(),
            max_concurrency: settings.max_concurrency,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Client settings for the configured provider
    pub fn settings(&self) -> PowerSettings {
        PowerSettings {
            base_url: self.base_url.clone(),
            community: self.community.clone(),
            timeout: self.timeout(),
            max_concurrency: self.max_concurrency,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub granularity: Granularity,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            start_year: 2001,
            end_year: 2024,
            granularity: Granularity::HourOfDay,
        }
    }
}

impl HistoryConfig {
    pub fn window(&self) -> Option<YearWindow> {
        YearWindow::new(self.start_year, self.end_year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address used when the binary runs without arguments
    pub dev_bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dev_bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub history: HistoryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load `wxodds.toml` from the working directory, or defaults if absent
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.year_window()?;
        if self.provider.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "provider.max_concurrency must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.provider.base_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "provider.base_url {:?}: {e}",
                self.provider.base_url
            ))
        })?;
        Ok(())
    }

    pub fn year_window(&self) -> Result<YearWindow, ConfigError> {
        self.history.window().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "history.start_year ({}) is after history.end_year ({})",
                self.history.start_year, self.history.end_year
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_power_setup() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.dev_bind, "127.0.0.1:8000");
        assert_eq!(cfg.history.granularity, Granularity::HourOfDay);
        assert_eq!(cfg.year_window().unwrap(), YearWindow::new(2001, 2024).unwrap());
        assert_eq!(cfg.provider.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.provider.base_url, wxodds_fetch::DEFAULT_BASE_URL);
    }

    #[test]
    fn provider_settings_follow_file_values() {
        let mut cfg = AppConfig::default();
        cfg.provider.base_url = "http://127.0.0.1:9000/point".to_string();
        cfg.provider.timeout_secs = 5;
        cfg.provider.max_concurrency = 2;

        let settings = cfg.provider.settings();
        assert_eq!(settings.base_url, "http://127.0.0.1:9000/point");
        assert_eq!(settings.community, PowerSettings::default().community);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.max_concurrency, 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.history.start_year, 2001);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[history]\nstart_year = 2020\ngranularity = \"day-hour\"\n\n[provider]\nmax_concurrency = 2"
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.history.start_year, 2020);
        assert_eq!(cfg.history.end_year, 2024);
        assert_eq!(cfg.history.granularity, Granularity::DayOfYearHour);
        assert_eq!(cfg.provider.max_concurrency, 2);
        assert_eq!(cfg.provider.community, "re");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[history]\nstart_year = 2030\nend_year = 2001\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.provider.base_url = "not a url".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[history\nstart_year = ").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::Toml(_))
        ));
    }
}
