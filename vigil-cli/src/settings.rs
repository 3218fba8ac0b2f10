//! Persistent screener settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const MIN_BUDGET_MS: u64 = 5_000;
const MAX_BUDGET_MS: u64 = 20_000;
const MIN_CHUNK_INTERVAL_MS: u64 = 500;
const MAX_CHUNK_INTERVAL_MS: u64 = 5_000;
const MAX_NAME_ENTRIES: usize = 32;
const MAX_KEYWORD_ENTRIES: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ScreenerSettings {
    /// The user's display name; a caller saying it rings through.
    pub user_name: String,
    /// Family names; any of them spoken rings through.
    pub family_names: Vec<String>,
    /// User-supplied emergency keywords.
    pub custom_keywords: Vec<String>,
    /// Analysis time budget per call, ms.
    pub budget_ms: u64,
    /// Captured chunk duration, ms.
    pub chunk_interval_ms: u64,
    /// Input device name for live capture (loopback or virtual device).
    pub preferred_input_device: Option<String>,
}

impl Default for ScreenerSettings {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            family_names: Vec::new(),
            custom_keywords: Vec::new(),
            budget_ms: 12_000,
            chunk_interval_ms: 2_000,
            preferred_input_device: None,
        }
    }
}

impl ScreenerSettings {
    pub fn normalize(&mut self) {
        self.user_name = self.user_name.trim().to_string();
        self.family_names = normalize_entries(&self.family_names, MAX_NAME_ENTRIES);
        self.custom_keywords = normalize_entries(&self.custom_keywords, MAX_KEYWORD_ENTRIES);
        self.budget_ms = self.budget_ms.clamp(MIN_BUDGET_MS, MAX_BUDGET_MS);
        self.chunk_interval_ms = self
            .chunk_interval_ms
            .clamp(MIN_CHUNK_INTERVAL_MS, MAX_CHUNK_INTERVAL_MS);
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }
}

fn normalize_entries(raw: &[String], limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    for entry in raw {
        let normalized = entry.trim();
        if normalized.is_empty() {
            continue;
        }
        if out
            .iter()
            .any(|e: &String| e.eq_ignore_ascii_case(normalized))
        {
            continue;
        }
        out.push(normalized.to_string());
        if out.len() >= limit {
            break;
        }
    }
    out
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Vigil")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("vigil")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> ScreenerSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<ScreenerSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &ScreenerSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
