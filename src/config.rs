use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "sodeod.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Relative paths resolve against the working directory.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub to_email: String,
    /// Socket timeout handed to the SMTP transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportConfig {
    pub sender_name: String,
    pub greeting: String,
    /// Lines printed under "Best regards,".
    pub signature: Vec<String>,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("tasks.db")
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            email: EmailConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: "your_email@gmail.com".to_string(),
            password: "your_app_password".to_string(),
            from_email: "your_email@gmail.com".to_string(),
            to_email: "your_manager@example.com".to_string(),
            timeout_secs: Some(30),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            sender_name: "Your Name".to_string(),
            greeting: "Respected Sir,".to_string(),
            signature: vec!["Your Name".to_string()],
        }
    }
}

impl AppConfig {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "{} not found. Run `sodeod setup-config` first.",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Store-only commands run without a config file.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Writes the defaults to `path`, leaving an existing file untouched.
    pub fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::Config(format!(
                "{} already exists, edit it instead",
                path.display()
            )));
        }

        let content = toml::to_string_pretty(&Self::default())?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn database_path_in(&self, dir: &Path) -> PathBuf {
        if self.database_path.is_absolute() {
            self.database_path.clone()
        } else {
            dir.join(&self.database_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_points_at_setup() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&AppConfig::path_in(dir.path())).unwrap_err();
        assert!(err.to_string().contains("setup-config"));
        assert_eq!(
            AppConfig::load_or_default(&AppConfig::path_in(dir.path())).unwrap(),
            AppConfig::default()
        );
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = AppConfig::path_in(dir.path());

        AppConfig::write_default(&path).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.email.smtp_port, 587);

        assert!(AppConfig::write_default(&path).is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = AppConfig::path_in(dir.path());
        fs::write(
            &path,
            r#"
[email]
smtp_server = "mail.example.com"
smtp_port = 2525
username = "me"
password = "secret"
from_email = "me@example.com"
to_email = "lead@example.com"
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.email.smtp_server, "mail.example.com");
        assert_eq!(config.email.timeout_secs, None);
        assert_eq!(config.report, ReportConfig::default());
        assert_eq!(config.database_path_in(dir.path()), dir.path().join("tasks.db"));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = AppConfig::path_in(dir.path());
        fs::write(&path, "database_path = [").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(Error::Config(_))));
    }
}
