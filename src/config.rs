//! Configuration file handling for EduWallet.
//!
//! The configuration file is stored at `$EDUWALLET_HOME/config.json` and identifies the local
//! user (an id that owns every stored record and the email address alerts are sent to) along
//! with the URL of the email relay.

use crate::db::Db;
use crate::error::{ErrorType, IntoResult, Res};
use crate::Result;
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_NAME: &str = "eduwallet";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const EDUWALLET_SQLITE: &str = "eduwallet.sqlite";

/// Where the email relay listens unless told otherwise.
pub const DEFAULT_RELAY_URL: &str = "http://localhost:8888/send-email";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$EDUWALLET_HOME` and from there it loads `$EDUWALLET_HOME/config.json`. It
/// also opens the SQLite record store that lives in the same directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory and:
    /// - Creates an initial `config.json` with a freshly generated user id
    /// - Creates and migrates the SQLite database
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/eduwallet`
    /// - `email` - The address that alerts and reports are sent to.
    /// - `relay_url` - The send-email endpoint. `None` uses `DEFAULT_RELAY_URL`.
    ///
    /// # Errors
    /// - The email or relay URL is invalid.
    /// - A config file already exists in `dir`.
    /// - Any file or database operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        email: &str,
        relay_url: Option<&str>,
    ) -> Res<Self> {
        let email = validate_email(email)?;
        let relay_url = validate_relay_url(relay_url.unwrap_or(DEFAULT_RELAY_URL))?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the eduwallet home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            );
        }

        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            user_id: uuid::Uuid::new_v4().to_string(),
            email,
            relay_url,
        };
        config_file.save(&config_path).await?;

        let sqlite_path = root.join(EDUWALLET_SQLITE);
        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// This will
    /// - validate that `eduwallet_home` exists and that the config file exists
    /// - load and validate the config file
    /// - open the SQLite database, running any pending migrations
    ///
    /// # Errors
    /// - Returns a config error if any of the above fails.
    pub async fn load(eduwallet_home: impl Into<PathBuf>) -> Result<Self> {
        Self::open(eduwallet_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn open(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("EduWallet home is missing, run 'eduwallet init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let sqlite_path = root.join(EDUWALLET_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// The id that owns every record written through this configuration.
    pub fn user_id(&self) -> &str {
        &self.config_file.user_id
    }

    /// The address alerts and reports are delivered to.
    pub fn email(&self) -> &str {
        &self.config_file.email
    }

    pub fn relay_url(&self) -> &str {
        &self.config_file.relay_url
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "eduwallet",
///   "config_version": 1,
///   "user_id": "0b9a3c2e-4f1d-4c55-9a57-2f1f0f5e8c11",
///   "email": "student@example.com",
///   "relay_url": "http://localhost:8888/send-email"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "eduwallet"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Owner of all records in the store
    user_id: String,

    /// Recipient of alert and report emails
    email: String,

    /// The send-email endpoint of the relay
    #[serde(default = "default_relay_url")]
    relay_url: String,
}

fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if its values are invalid.
    pub async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            !config.user_id.trim().is_empty(),
            "The user_id in the config file is empty"
        );
        validate_email(&config.email)?;
        validate_relay_url(&config.relay_url)?;

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

fn validate_email(email: &str) -> Res<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(email.to_string())
        }
        _ => bail!("Invalid email address '{email}'"),
    }
}

fn validate_relay_url(relay_url: &str) -> Res<String> {
    let url = Url::parse(relay_url.trim())
        .with_context(|| format!("Invalid relay URL '{relay_url}'"))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => bail!("The relay URL must use http or https, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create_and_load() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("eduwallet_home");

        let config = Config::create(&home_dir, "student@example.com", None)
            .await
            .unwrap();
        assert_eq!(config.email(), "student@example.com");
        assert_eq!(config.relay_url(), DEFAULT_RELAY_URL);
        assert!(config.sqlite_path().is_file());
        assert!(config.config_path().is_file());

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.user_id(), config.user_id());
        assert_eq!(loaded.root(), config.root());
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), "a@example.com", None)
            .await
            .unwrap();
        let err = Config::create(dir.path(), "a@example.com", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_config_create_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        assert!(Config::create(dir.path(), "not-an-email", None)
            .await
            .is_err());
        assert!(
            Config::create(dir.path(), "a@example.com", Some("ftp://relay.example.com"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nothing")).await.unwrap_err();
        assert!(err.to_string().contains("EduWallet home is missing"));
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "wrong_app",
            "config_version": 1,
            "user_id": "u1",
            "email": "a@example.com"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let err = ConfigFile::load(&config_path).await.unwrap_err();
        assert!(err.to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_relay_url_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "eduwallet",
            "config_version": 1,
            "user_id": "u1",
            "email": "a@example.com"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.relay_url, DEFAULT_RELAY_URL);

        let copy = temp_dir.path().join("copy.json");
        config.save(&copy).await.unwrap();
        assert_eq!(ConfigFile::load(&copy).await.unwrap(), config);
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email(" s@uni.edu ").unwrap(),
            "s@uni.edu".to_string()
        );
        assert!(validate_email("@uni.edu").is_err());
        assert!(validate_email("s@localhost").is_err());
    }
}
