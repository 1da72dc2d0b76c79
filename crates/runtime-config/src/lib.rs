//! Runtime configuration for the scheduler server.
//!
//! The server reads `jdrtables.toml` into these types; every field has a
//! default so an empty or missing file yields a working configuration.
//! Environment overrides are applied by the server binary on top.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "jdrtables.toml";

/// Top-level configuration (persisted as `jdrtables.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub scheduling: SchedulingSettings,
    #[serde(default)]
    pub audit: AuditSettings,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL, only used for log output.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Relational store, the canonical backend.
    #[default]
    #[serde(alias = "sql", alias = "sqlite3")]
    Sqlite,
    /// One JSON array per record kind. Reads legacy flat-file data.
    #[serde(alias = "file", alias = "files")]
    Json,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Json => "json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sql" | "sqlite3" => Some(Self::Sqlite),
            "json" | "file" | "files" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingSettings {
    #[serde(default = "default_min_players")]
    pub default_min_players: u32,
    #[serde(default = "default_max_players")]
    pub default_max_players: u32,
    /// Length given to a session created without `ends_at`.
    #[serde(default = "default_session_hours")]
    pub default_session_hours: u32,
    /// How far `duplicate` moves the copy forward.
    #[serde(default = "default_duplicate_offset_days")]
    pub duplicate_offset_days: u32,
    /// Length assumed for legacy date/time-only sessions on import.
    #[serde(default = "default_session_hours")]
    pub legacy_session_hours: u32,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            default_min_players: default_min_players(),
            default_max_players: default_max_players(),
            default_session_hours: default_session_hours(),
            duplicate_offset_days: default_duplicate_offset_days(),
            legacy_session_hours: default_session_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Persist audit events to the store. When off they are only traced.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_min_players() -> u32 {
    3
}
fn default_max_players() -> u32 {
    5
}
fn default_session_hours() -> u32 {
    4
}
fn default_duplicate_offset_days() -> u32 {
    7
}
