use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Articles rendered on the index page
    #[serde(default = "default_initial_page_size")]
    pub initial_page_size: i64,
    /// Limit used by the feed API when the request omits one
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
    /// Distance from the bottom of the timeline, in pixels, at which
    /// scrolling triggers the next page
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: u32,
}

fn default_bind_address() -> String {
    "0.0.0.0:3003".to_string()
}

fn default_database_url() -> String {
    "sqlite:news.db?mode=rwc".to_string()
}

fn default_initial_page_size() -> i64 {
    15
}

fn default_page_size() -> i64 {
    10
}

fn default_max_page_size() -> i64 {
    100
}

pub(crate) fn default_scroll_threshold() -> u32 {
    800
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database_url: default_database_url(),
            initial_page_size: default_initial_page_size(),
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            scroll_threshold: default_scroll_threshold(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load the config file, or fall back to defaults when it does not exist.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.initial_page_size < 1 || self.page_size < 1 {
            anyhow::bail!("page sizes must be positive");
        }
        if self.max_page_size < self.page_size {
            anyhow::bail!(
                "max_page_size ({}) must be at least page_size ({})",
                self.max_page_size,
                self.page_size
            );
        }
        Ok(())
    }

    /// Apply `DATABASE_URL` and `PORT` overrides.
    pub fn with_overrides(mut self, database_url: Option<String>, port: Option<String>) -> Self {
        if let Some(url) = database_url.filter(|u| !u.is_empty()) {
            self.database_url = url;
        }
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            self.bind_address = match self.bind_address.rsplit_once(':') {
                Some((host, _)) => format!("{}:{}", host, port),
                None => format!("{}:{}", self.bind_address, port),
            };
        }
        self
    }

    pub fn with_env_overrides(self) -> Self {
        let database_url = std::env::var("DATABASE_URL").ok();
        let port = std::env::var("PORT").ok();
        self.with_overrides(database_url, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address, "0.0.0.0:3003");
        assert_eq!(config.initial_page_size, 15);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.scroll_threshold, 800);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            bind_address = "127.0.0.1:8080"
            database_url = "sqlite::memory:"
            initial_page_size = 20
            page_size = 5
            max_page_size = 50
            scroll_threshold = 400
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.initial_page_size, 20);
        assert_eq!(config.page_size, 5);
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.scroll_threshold, 400);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/news.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/path/news.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_rejects_non_positive_page_size() {
        assert!(Config::from_str("page_size = 0").is_err());
        assert!(Config::from_str("initial_page_size = -3").is_err());
    }

    #[test]
    fn test_rejects_max_below_page_size() {
        let result = Config::from_str("page_size = 20\nmax_page_size = 10");
        assert!(result.is_err());
    }

    #[test]
    fn test_port_override_replaces_port() {
        let config = Config::default().with_overrides(None, Some("9000".to_string()));
        assert_eq!(config.bind_address, "0.0.0.0:9000");
    }

    #[test]
    fn test_database_url_override() {
        let config = Config::default()
            .with_overrides(Some("sqlite:other.db".to_string()), None);
        assert_eq!(config.database_url, "sqlite:other.db");
        assert_eq!(config.bind_address, "0.0.0.0:3003");
    }

    #[test]
    fn test_empty_overrides_are_ignored() {
        let config = Config::default().with_overrides(Some(String::new()), Some(String::new()));
        assert_eq!(config, Config::default());
    }
}
