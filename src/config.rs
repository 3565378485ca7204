use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::PoolConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LeadlineConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub fallback: FallbackConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Static site assets served for every path the API does not handle
    pub static_dir: Option<PathBuf>,
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: Some(PathBuf::from("public")),
            cors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub max_connections: usize,
    pub connect_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_database_path_in(Path::new(".")),
            max_connections: 5,
            connect_timeout_ms: 10_000,
        }
    }
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(&self.path)
            .with_max_connections(self.max_connections)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackConfig {
    pub path: PathBuf,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("form-submissions.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token for `GET /api/submissions`. The endpoint is not mounted
    /// without one.
    pub token: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("leadline.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join("data").join("leadline.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<LeadlineConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: LeadlineConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Load the config file (defaults when absent) and apply environment overrides
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<LeadlineConfig> {
    let mut config = load_config(path)?.unwrap_or_default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Recognised variables: `HOST`, `PORT`, `DB_ENABLED`, `DB_PATH`,
/// `FALLBACK_PATH`, `ADMIN_TOKEN`.
pub fn apply_env_overrides<F>(config: &mut LeadlineConfig, var: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = var("HOST") {
        config.server.host = host;
    }
    if let Some(port) = var("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| crate::Error::Config(format!("PORT is not a valid port: {}", port)))?;
    }
    if let Some(enabled) = var("DB_ENABLED") {
        config.database.enabled = !matches!(
            enabled.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        );
    }
    if let Some(path) = var("DB_PATH") {
        config.database.path = PathBuf::from(path);
    }
    if let Some(path) = var("FALLBACK_PATH") {
        config.fallback.path = PathBuf::from(path);
    }
    if let Some(token) = var("ADMIN_TOKEN") {
        config.admin.token = Some(token).filter(|t| !t.trim().is_empty());
    }
    Ok(())
}

pub fn write_config(path: &Path, config: &LeadlineConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: LeadlineConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [database]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.database.enabled);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.fallback.path, PathBuf::from("form-submissions.json"));
        assert_eq!(config.admin.token, None);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "4100"),
            ("DB_PATH", "/var/lib/leads.db"),
            ("DB_ENABLED", "false"),
            ("ADMIN_TOKEN", "s3cret"),
        ]
        .into_iter()
        .collect();

        let mut config = LeadlineConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.server.port, 4100);
        assert_eq!(config.database.path, PathBuf::from("/var/lib/leads.db"));
        assert!(!config.database.enabled);
        assert_eq!(config.admin.token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let mut config = LeadlineConfig::default();
        let result = apply_env_overrides(&mut config, |k| (k == "PORT").then(|| "http".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leadline.toml");

        write_config(&path, &LeadlineConfig::default(), false).unwrap();
        assert!(write_config(&path, &LeadlineConfig::default(), false).is_err());
        write_config(&path, &LeadlineConfig::default(), true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, LeadlineConfig::default());
    }
}
