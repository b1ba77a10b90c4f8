use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clients::DocumentConfig;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub invoicer: InvoicerConfig,
    pub ordering: OrderingConfig,
    pub mapping: MappingConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InvoicerConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub document_type: String,
    pub payment_id: String,
    pub register_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    /// Tickets are read from `feed_path`.
    File,
    /// Tickets are fetched from the ordering platform.
    Platform,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OrderingConfig {
    pub source: FeedSource,
    pub feed_path: PathBuf,
    pub base_url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub facility_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub manual_import: bool,
    pub only_today: bool,
}

// secrets stay out of logs
impl std::fmt::Debug for InvoicerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoicerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("document_type", &self.document_type)
            .field("payment_id", &self.payment_id)
            .field("register_id", &self.register_id)
            .finish()
    }
}

impl std::fmt::Debug for OrderingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderingConfig")
            .field("source", &self.source)
            .field("feed_path", &self.feed_path)
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("facility_id", &self.facility_id)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://invoices.db".to_string(),
            },
            invoicer: InvoicerConfig {
                base_url: crate::clients::vendus::DEFAULT_BASE_URL.to_string(),
                api_key: None,
                document_type: "FR".to_string(),
                payment_id: "94305968".to_string(),
                register_id: 94305980,
            },
            ordering: OrderingConfig {
                source: FeedSource::File,
                feed_path: PathBuf::from("orders.json"),
                base_url: crate::clients::otter::DEFAULT_BASE_URL.to_string(),
                user: None,
                password: None,
                facility_id: None,
            },
            mapping: MappingConfig {
                path: PathBuf::from("invoicing.json"),
            },
            poll: PollConfig {
                interval_ms: 1000,
                manual_import: true,
                only_today: true,
            },
        }
    }
}

impl AppConfig {
    /// Defaults, then `settings.{toml,json,yaml}` in the working directory,
    /// then `APP__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Some(Path::new("settings")))
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&AppConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }

        let config: AppConfig = builder
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config.with_legacy_env())
    }

    /// Variable names used by earlier deployments still win when set.
    fn with_legacy_env(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(key) = std::env::var("VENDUS_API_KEY") {
            self.invoicer.api_key = Some(key);
        }
        if let Ok(user) = std::env::var("OTTER_USER") {
            self.ordering.user = Some(user);
        }
        if let Ok(password) = std::env::var("OTTER_PASSWORD") {
            self.ordering.password = Some(password);
        }
        self
    }

    pub fn document(&self) -> DocumentConfig {
        DocumentConfig {
            document_type: self.invoicer.document_type.clone(),
            payment_id: self.invoicer.payment_id.clone(),
            register_id: self.invoicer.register_id,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = AppConfig::load_from(None).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ordering.source, FeedSource::File);
        assert_eq!(config.mapping.path, PathBuf::from("invoicing.json"));
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert!(config.poll.only_today);
        assert_eq!(config.document().document_type, "FR");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
            [ordering]
            source = "platform"
            facility_id = "fac-1"

            [poll]
            interval_ms = 3000
            manual_import = false
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.ordering.source, FeedSource::Platform);
        assert_eq!(config.ordering.facility_id.as_deref(), Some("fac-1"));
        assert_eq!(config.poll.interval_ms, 3000);
        assert!(!config.poll.manual_import);
        assert!(config.poll.only_today);
        assert_eq!(config.database.url, "sqlite://invoices.db".to_string());
    }

    #[test]
    fn debug_hides_secrets() {
        let mut config = AppConfig::default();
        config.invoicer.api_key = Some("secret-key".to_string());
        config.ordering.password = Some("hunter2".to_string());

        let text = format!("{:?}", config);
        assert!(!text.contains("secret-key"));
        assert!(!text.contains("hunter2"));
    }
}
