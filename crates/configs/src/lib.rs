use std::path::{Path, PathBuf};

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub launcher: LauncherConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8000, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { users_file: default_users_file() }
    }
}

/// Tool bridge (MCP over SSE) settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_bridge_port")]
    pub port: u16,
    /// HTTP API whose operations are republished as tools
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_openapi_path")]
    pub openapi_path: String,
    #[serde(default = "default_sse_path")]
    pub sse_path: String,
    #[serde(default = "default_message_path")]
    pub message_path: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_bridge_port(),
            api_base_url: default_api_base_url(),
            openapi_path: default_openapi_path(),
            sse_path: default_sse_path(),
            message_path: default_message_path(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
    #[serde(default)]
    pub tool_temperature: f32,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Never read from TOML; filled from `GEMINI_API_KEY`
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            bridge_url: default_bridge_url(),
            gemini_base_url: default_gemini_base_url(),
            model: default_model(),
            chat_temperature: default_chat_temperature(),
            tool_temperature: 0.0,
            max_tool_rounds: default_max_tool_rounds(),
            request_timeout_secs: default_request_timeout(),
            gemini_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LauncherConfig {
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self { startup_delay_ms: default_startup_delay(), shutdown_timeout_secs: default_shutdown_timeout() }
    }
}

fn default_users_file() -> PathBuf { PathBuf::from("data/users_data.json") }
fn default_host() -> String { "127.0.0.1".into() }
fn default_bridge_port() -> u16 { 8001 }
fn default_api_base_url() -> String { "http://127.0.0.1:8000".into() }
fn default_openapi_path() -> String { "/openapi.json".into() }
fn default_sse_path() -> String { "/sse".into() }
fn default_message_path() -> String { "/messages/".into() }
fn default_bridge_url() -> String { "http://127.0.0.1:8001/sse".into() }
fn default_gemini_base_url() -> String { "https://generativelanguage.googleapis.com".into() }
fn default_model() -> String { "gemini-2.0-flash".into() }
fn default_chat_temperature() -> f32 { 0.7 }
fn default_max_tool_rounds() -> usize { 5 }
fn default_request_timeout() -> u64 { 30 }
fn default_startup_delay() -> u64 { 3000 }
fn default_shutdown_timeout() -> u64 { 5 }

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`) when present, otherwise start from
    /// defaults; then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if Path::new(&path).exists() { load_from_file(&path)? } else { AppConfig::default() };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Overlay values from the environment. The lookup is injected so tests
    /// don't have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SERVER_HOST") { self.server.host = v; }
        if let Some(p) = lookup("SERVER_PORT").and_then(|v| v.parse().ok()) { self.server.port = p; }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Some(v) = lookup("USERS_DATA_FILE") { self.storage.users_file = PathBuf::from(v); }
        if let Some(v) = lookup("BRIDGE_HOST") { self.bridge.host = v; }
        if let Some(p) = lookup("BRIDGE_PORT").and_then(|v| v.parse().ok()) { self.bridge.port = p; }
        if let Some(v) = lookup("API_BASE_URL") {
            self.bridge.api_base_url = v.clone();
            self.chat.api_base_url = v;
        }
        if let Some(v) = lookup("BRIDGE_URL") { self.chat.bridge_url = v; }
        if let Some(v) = lookup("GEMINI_MODEL") { self.chat.model = v; }
        if let Some(v) = lookup("GEMINI_BASE_URL") { self.chat.gemini_base_url = v; }
        if let Some(v) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.chat.gemini_api_key = Some(v);
        }
        if let Some(ms) = lookup("STARTUP_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.launcher.startup_delay_ms = ms;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        self.bridge.normalize()?;
        self.chat.normalize()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.users_file.as_os_str().is_empty() {
            return Err(anyhow!("storage.users_file must not be empty"));
        }
        Ok(())
    }
}

impl BridgeConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("bridge.port must be in 1..=65535"));
        }
        check_http_url("bridge.api_base_url", &self.api_base_url)?;
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        for (key, path) in [
            ("bridge.openapi_path", &self.openapi_path),
            ("bridge.sse_path", &self.sse_path),
            ("bridge.message_path", &self.message_path),
        ] {
            if !path.starts_with('/') {
                return Err(anyhow!("{key} must start with '/'"));
            }
        }
        if self.sse_path == self.message_path {
            return Err(anyhow!("bridge.sse_path and bridge.message_path must differ"));
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout();
        }
        Ok(())
    }
}

impl ChatConfig {
    fn normalize(&mut self) -> Result<()> {
        check_http_url("chat.api_base_url", &self.api_base_url)?;
        check_http_url("chat.bridge_url", &self.bridge_url)?;
        check_http_url("chat.gemini_base_url", &self.gemini_base_url)?;
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        self.gemini_base_url = self.gemini_base_url.trim_end_matches('/').to_string();
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        for (key, t) in [("chat.chat_temperature", self.chat_temperature), ("chat.tool_temperature", self.tool_temperature)] {
            if !(0.0..=2.0).contains(&t) {
                return Err(anyhow!("{key} must be within 0.0..=2.0"));
            }
        }
        if self.max_tool_rounds == 0 {
            return Err(anyhow!("chat.max_tool_rounds must be >= 1"));
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout();
        }
        Ok(())
    }
}

fn check_http_url(key: &str, url: &str) -> Result<()> {
    let lower = url.to_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(anyhow!("{key} must start with http:// or https://"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_services_at_each_other() {
        let mut cfg = AppConfig::default();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.bridge.port, 8001);
        assert_eq!(cfg.bridge.api_base_url, "http://127.0.0.1:8000");
        assert_eq!(cfg.chat.bridge_url, "http://127.0.0.1:8001/sse");
        assert_eq!(cfg.storage.users_file, PathBuf::from("data/users_data.json"));
        assert_eq!(cfg.chat.model, "gemini-2.0-flash");
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_sections() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [storage]
            users_file = "/tmp/users.json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.storage.users_file, PathBuf::from("/tmp/users.json"));
        assert_eq!(cfg.bridge.sse_path, "/sse");
        assert_eq!(cfg.launcher.startup_delay_ms, 3000);
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SERVER_PORT", "9100"),
            ("API_BASE_URL", "http://api.local:9100/"),
            ("GEMINI_API_KEY", "secret"),
            ("STARTUP_DELAY_MS", "10"),
        ]);
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.bridge.api_base_url, "http://api.local:9100");
        assert_eq!(cfg.chat.api_base_url, "http://api.local:9100");
        assert_eq!(cfg.chat.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.launcher.startup_delay_ms, 10);
    }

    #[test]
    fn rejects_invalid_values() {
        let mut cfg = AppConfig::default();
        cfg.bridge.api_base_url = "ftp://nope".into();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.chat.chat_temperature = 3.5;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.bridge.message_path = "/sse".into();
        assert!(cfg.normalize_and_validate().is_err());
    }
}
