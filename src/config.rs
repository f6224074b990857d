//! Server configuration
//!
//! Defaults, then an optional `aigo.toml`, then environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::paths;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address
    pub listen_addr: SocketAddr,
    /// Path to sqlite database
    pub db_path: PathBuf,
    /// Directory holding the built frontend (`dist/`) and other public files
    pub public_dir: PathBuf,
    /// Exact origins allowed by CORS in addition to localhost
    pub cors_origins: Vec<String>,
    pub llm: LlmConfig,
    pub identity: IdentityConfig,
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_path: paths::db_path(),
            public_dir: paths::public_dir(),
            cors_origins: vec!["https://aigooooo.com".to_string()],
            llm: LlmConfig::default(),
            identity: IdentityConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Model endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier (e.g., "gpt-5-chat-latest")
    pub model: String,
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    /// API key; `None` selects the mock model
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5-chat-latest".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

/// Identity provider settings (Supabase-compatible)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: Option<String>,
    /// Public (anon) key sent as `apikey`
    pub anon_key: Option<String>,
}

impl IdentityConfig {
    /// Both URL and key are set and non-blank
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.url) && present(&self.anon_key)
    }
}

/// Fixed-window request limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Requests per minute per client address, all routes
    pub requests_per_minute: u32,
    /// Model-backed room requests per minute per user
    pub ai_requests_per_minute: u32,
    /// Rooms a user may create per hour
    pub rooms_per_hour: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            ai_requests_per_minute: 30,
            rooms_per_hour: 5,
        }
    }
}

/// Config file structure (`aigo.toml`)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub listen: Option<SocketAddr>,
    pub db_path: Option<PathBuf>,
    pub public_dir: Option<PathBuf>,
    pub cors_origins: Option<Vec<String>>,
    pub llm: Option<LlmConfig>,
    pub identity: Option<IdentityConfig>,
    pub limits: Option<LimitsConfig>,
}

impl FileConfig {
    /// Load config from a TOML file; a missing file yields defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl Config {
    /// Resolve configuration from the config file and the environment
    pub fn load() -> Result<Self> {
        let file = FileConfig::load(paths::config_path())?;
        let mut config = Self::default();
        config.apply_file(file);
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay values present in the config file
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(listen) = file.listen {
            self.listen_addr = listen;
        }
        if let Some(db_path) = file.db_path {
            self.db_path = db_path;
        }
        if let Some(public_dir) = file.public_dir {
            self.public_dir = public_dir;
        }
        if let Some(origins) = file.cors_origins {
            self.cors_origins = origins;
        }
        if let Some(llm) = file.llm {
            self.llm = llm;
        }
        if let Some(identity) = file.identity {
            self.identity = identity;
        }
        if let Some(limits) = file.limits {
            self.limits = limits;
        }
    }

    /// Overlay environment variables, which win over the file
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(env)
    }

    /// Overlay variables from `lookup`; blank values count as unset
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(port) = var("PORT") {
            let port: u16 = port.parse().with_context(|| format!("invalid PORT {:?}", port))?;
            self.listen_addr.set_port(port);
        }
        if let Some(listen) = var("AIGO_LISTEN") {
            self.listen_addr = listen
                .parse()
                .with_context(|| format!("invalid AIGO_LISTEN {:?}", listen))?;
        }
        if let Some(db_path) = var("AIGO_DB") {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(public_dir) = var("AIGO_PUBLIC_DIR") {
            self.public_dir = PathBuf::from(public_dir);
        }
        if let Some(origins) = var("AIGO_CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(endpoint) = var("OPENAI_BASE_URL") {
            self.llm.endpoint = endpoint;
        }
        if let Some(url) = var("SUPABASE_URL") {
            self.identity.url = Some(url);
        }
        if let Some(key) = var("SUPABASE_ANON_KEY") {
            self.identity.anon_key = Some(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.limits.requests_per_minute, 60);
        assert_eq!(config.limits.ai_requests_per_minute, 30);
        assert_eq!(config.limits.rooms_per_hour, 5);
        assert!(!config.identity.is_configured());
    }

    #[test]
    fn test_file_overlay() -> Result<()> {
        let file = FileConfig::parse(
            r#"
            listen = "127.0.0.1:8080"
            cors_origins = ["https://example.com"]

            [llm]
            model = "gpt-4o-mini"

            [identity]
            url = "https://abc.supabase.co"
            anon_key = "anon"

            [limits]
            rooms_per_hour = 1
            "#,
        )?;

        let mut config = Config::default();
        config.apply_file(file);

        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse::<SocketAddr>()?);
        assert_eq!(config.cors_origins, vec!["https://example.com".to_string()]);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        // Unspecified fields inside a section keep their defaults.
        assert_eq!(config.llm.endpoint, LlmConfig::default().endpoint);
        assert_eq!(config.limits.rooms_per_hour, 1);
        assert_eq!(config.limits.ai_requests_per_minute, 30);
        assert!(config.identity.is_configured());

        Ok(())
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_env_wins_over_file() -> Result<()> {
        let file = FileConfig::parse(
            r#"
            listen = "127.0.0.1:8080"
            db_path = "/file/aigo.db"
            public_dir = "/file/public"

            [llm]
            model = "file-model"
            "#,
        )?;

        let mut config = Config::default();
        config.apply_file(file);
        config.apply_vars(vars(&[
            ("AIGO_DB", "/env/aigo.db"),
            ("AIGO_PUBLIC_DIR", "/env/public"),
            ("PORT", "4000"),
            ("OPENAI_MODEL", "env-model"),
            ("AIGO_CORS_ORIGINS", "https://a.example, ,https://b.example"),
        ]))?;

        assert_eq!(config.db_path, PathBuf::from("/env/aigo.db"));
        assert_eq!(config.public_dir, PathBuf::from("/env/public"));
        assert_eq!(config.listen_addr, "127.0.0.1:4000".parse::<SocketAddr>()?);
        assert_eq!(config.llm.model, "env-model");
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );

        Ok(())
    }

    #[test]
    fn test_blank_env_keeps_file_values() -> Result<()> {
        let mut config = Config::default();
        config.apply_file(FileConfig::parse(r#"db_path = "/file/aigo.db""#)?);
        config.apply_vars(vars(&[("AIGO_DB", "  "), ("OPENAI_API_KEY", "")]))?;

        assert_eq!(config.db_path, PathBuf::from("/file/aigo.db"));
        assert_eq!(config.llm.api_key, None);
        Ok(())
    }

    #[test]
    fn test_bad_port_is_an_error() {
        let mut config = Config::default();
        assert!(config.apply_vars(vars(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(FileConfig::parse("listen = 12").is_err());
    }
}
