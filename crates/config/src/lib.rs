//! Uploader configuration management.
//!
//! Configuration is stored as TOML with three sections:
//! `[credentials]`, `[locations]` and `[behaviour]`. A missing file is
//! created with defaults on first run so the user has something to edit.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cloudpush.toml";

/// Errors from loading, saving or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Account used to sign in to the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Full mailbox address, including the domain.
    #[serde(default = "default_email")]
    pub email: String,

    #[serde(default = "default_password")]
    pub password: String,
}

/// Local and remote path roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locations {
    /// Local directory whose tree is uploaded.
    #[serde(default = "default_upload_path")]
    pub upload_path: PathBuf,

    /// Local directory that receives uploaded files when `move_uploaded` is set.
    #[serde(default = "default_uploaded_path")]
    pub uploaded_path: PathBuf,

    /// Remote root, `/`-separated and absolute.
    #[serde(default = "default_cloud_path")]
    pub cloud_path: String,
}

/// Behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behaviour {
    /// Compress files into single-entry zip archives before upload.
    #[serde(default = "default_true")]
    pub archive_files: bool,

    /// Move uploaded files under `uploaded_path`.
    #[serde(default)]
    pub move_uploaded: bool,

    /// Delete uploaded files. Ignored when `move_uploaded` is set.
    #[serde(default)]
    pub remove_uploaded: bool,

    /// Remove local directories left empty after relocation.
    #[serde(default)]
    pub remove_folders: bool,
}

/// Uploader configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub locations: Locations,

    #[serde(default)]
    pub behaviour: Behaviour,
}

/// Result of [`Config::load_or_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file existed and was parsed.
    Loaded(Config),
    /// The file was missing; defaults were written to it.
    Created(Config),
}

fn default_email() -> String {
    "your_email@mail.ru".into()
}

fn default_password() -> String {
    "your_email_password".into()
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("./upload")
}

fn default_uploaded_path() -> PathBuf {
    PathBuf::from("./uploaded")
}

fn default_cloud_path() -> String {
    "/backups".into()
}

fn default_true() -> bool {
    true
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: default_email(),
            password: default_password(),
        }
    }
}

impl Default for Locations {
    fn default() -> Self {
        Self {
            upload_path: default_upload_path(),
            uploaded_path: default_uploaded_path(),
            cloud_path: default_cloud_path(),
        }
    }
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            archive_files: default_true(),
            move_uploaded: false,
            remove_uploaded: false,
            remove_folders: false,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or writes defaults there if the
    /// file does not exist.
    pub fn load_or_create(path: &Path) -> Result<LoadOutcome, ConfigError> {
        if path.exists() {
            return Self::load(path).map(LoadOutcome::Loaded);
        }

        let config = Config::default();
        config.save(path)?;
        tracing::info!(path = %path.display(), "default configuration created");
        Ok(LoadOutcome::Created(config))
    }

    /// Loads configuration from an existing file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)?;

        // The file holds a password.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Checks the settings the run cannot work without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let email = self.credentials.email.trim();
        if email.is_empty() {
            return Err(ConfigError::Invalid("email is empty".into()));
        }
        if self.email_domain().is_none() {
            return Err(ConfigError::Invalid(format!(
                "email must contain a domain: {email}"
            )));
        }
        if self.credentials.password.is_empty() {
            return Err(ConfigError::Invalid("password is empty".into()));
        }
        if !self.locations.cloud_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "cloud_path must start with '/': {}",
                self.locations.cloud_path
            )));
        }
        if self.behaviour.move_uploaded
            && self.locations.uploaded_path == self.locations.upload_path
        {
            return Err(ConfigError::Invalid(
                "uploaded_path must differ from upload_path when move_uploaded is set".into(),
            ));
        }
        Ok(())
    }

    /// Returns the part of the email after `@`, if any.
    pub fn email_domain(&self) -> Option<&str> {
        self.credentials
            .email
            .split_once('@')
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.behaviour.archive_files);
        assert!(!config.behaviour.move_uploaded);
        assert!(!config.behaviour.remove_uploaded);
        assert!(!config.behaviour.remove_folders);
        assert_eq!(config.locations.cloud_path, "/backups");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_file() {
        let toml = r#"
            [credentials]
            email = "someone@mail.ru"
            password = "secret"

            [locations]
            upload_path = "/data/outbox"
            uploaded_path = "/data/sent"
            cloud_path = "/archive"

            [behaviour]
            archive_files = false
            move_uploaded = true
            remove_uploaded = true
            remove_folders = true
        "#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.credentials.email, "someone@mail.ru");
        assert_eq!(config.locations.upload_path, PathBuf::from("/data/outbox"));
        assert_eq!(config.locations.cloud_path, "/archive");
        assert!(!config.behaviour.archive_files);
        assert!(config.behaviour.move_uploaded);
        assert!(config.behaviour.remove_folders);
        assert_eq!(config.email_domain(), Some("mail.ru"));
    }

    #[test]
    fn parse_partial_file_fills_defaults() {
        let toml = r#"
            [behaviour]
            move_uploaded = true
        "#;
        let config = Config::parse(toml).unwrap();
        assert!(config.behaviour.move_uploaded);
        assert!(config.behaviour.archive_files);
        assert_eq!(config.locations, Locations::default());
        assert_eq!(config.credentials, Credentials::default());
    }

    #[test]
    fn load_or_create_writes_defaults_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("cloudpush.toml");

        let first = Config::load_or_create(&path).unwrap();
        assert_eq!(first, LoadOutcome::Created(Config::default()));
        assert!(path.exists());

        let second = Config::load_or_create(&path).unwrap();
        assert_eq!(second, LoadOutcome::Loaded(Config::default()));
    }

    #[cfg(unix)]
    #[test]
    fn created_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cloudpush.toml");
        Config::load_or_create(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cloudpush.toml");

        let mut config = Config::default();
        config.credentials.email = "a@b.c".into();
        config.behaviour.remove_uploaded = true;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn load_malformed_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.toml");
        std::fs::write(&path, "[behaviour\narchive_files = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.credentials.email = "no-domain".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.credentials.email = "user@".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.credentials.password.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.locations.cloud_path = "backups".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cloud_path"));
    }

    #[test]
    fn validate_rejects_moving_into_upload_root() {
        let mut config = Config::default();
        config.behaviour.move_uploaded = true;
        config.locations.uploaded_path = config.locations.upload_path.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("uploaded_path"));

        config.behaviour.move_uploaded = false;
        assert!(config.validate().is_ok());
    }
}
