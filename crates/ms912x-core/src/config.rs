use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::{self, Mode, DEFAULT_MODES, DEFAULT_REFRESH_HZ, DRIVER_NAME};

/// Top-level tray configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kernel module name, as it appears in lsmod and is passed to `modetest -M`.
    pub driver: String,
    /// Resolutions offered in the menu, e.g. "1920x1080".
    pub modes: Vec<String>,
    pub refresh_hz: u32,
    /// Seconds between driver presence checks.
    pub poll_interval_secs: u64,
    /// Unload the driver when the user picks "Выход".
    pub unload_on_exit: bool,
    pub tools: ToolsConfig,
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: DRIVER_NAME.to_string(),
            modes: DEFAULT_MODES.iter().map(|s| s.to_string()).collect(),
            refresh_hz: DEFAULT_REFRESH_HZ,
            poll_interval_secs: 5,
            unload_on_exit: true,
            tools: ToolsConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// External programs. Bare names are resolved through PATH.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub lsmod: String,
    pub modetest: String,
    pub pkexec: String,
    pub rmmod: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            lsmod: "lsmod".into(),
            modetest: "modetest".into(),
            pkexec: "pkexec".into(),
            rmmod: "rmmod".into(),
        }
    }
}

/// Graphical session modetest has to be pointed at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub display: String,
    pub wayland_display: String,
    pub session_type: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display: ":1".into(),
            wayland_display: "wayland-0".into(),
            session_type: "wayland".into(),
        }
    }
}

impl SessionConfig {
    /// Environment overlay applied on top of the inherited environment.
    pub fn envs(&self) -> Vec<(String, String)> {
        vec![
            ("DISPLAY".into(), self.display.clone()),
            ("WAYLAND_DISPLAY".into(), self.wayland_display.clone()),
            ("XDG_SESSION_TYPE".into(), self.session_type.clone()),
        ]
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Configured modes that parse and that the adapter accepts at
    /// `refresh_hz`. Falls back to the built-in list when nothing survives.
    pub fn menu_modes(&self) -> Vec<Mode> {
        let mut out: Vec<Mode> = Vec::new();
        for raw in &self.modes {
            match raw.parse::<Mode>() {
                Ok(m) if !model::is_supported(m, self.refresh_hz) => {
                    tracing::warn!(
                        "mode {m}@{}Hz is not supported by the adapter, skipping",
                        self.refresh_hz
                    );
                }
                Ok(m) if out.contains(&m) => {}
                Ok(m) => out.push(m),
                Err(e) => tracing::warn!("skipping config mode: {e}"),
            }
        }
        if out.is_empty() {
            tracing::warn!("no usable modes configured, using defaults");
            return model::default_modes();
        }
        out
    }
}

const SYSTEM_CONFIG: &str = "/etc/ms912x-tray/config.toml";

/// One config layer. A missing file is silently skipped; a broken one is
/// skipped with a warning.
fn load_layer(path: &Path) -> Option<toml::Value> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content)
        .map_err(|e| tracing::warn!("failed to parse config at {}: {e}", path.display()))
        .ok()
}

fn load_system() -> Option<toml::Value> {
    load_layer(Path::new(SYSTEM_CONFIG))
}

/// ~/.config/ms912x-tray/config.toml
fn load_user() -> Option<toml::Value> {
    let dir = dirs::config_dir()?;
    load_layer(&dir.join("ms912x-tray").join("config.toml"))
}

/// Recursively merge two TOML values. Tables are merged key-by-key;
/// all other types in `overlay` replace `base`.
fn merge_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

fn load_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("failed to parse config at {}: {}", path.display(), e);
            Config::default()
        }),
        Err(e) => {
            tracing::warn!("failed to read config at {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Load the merged config: system file, then user overrides.
/// If `override_path` is provided, only that file is read.
pub fn load(override_path: Option<&PathBuf>) -> Config {
    if let Some(path) = override_path {
        return load_from_path(path);
    }

    let merged = match (load_system(), load_user()) {
        (Some(s), Some(u)) => Some(merge_values(s, u)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    };

    match merged {
        Some(value) => value.try_into().unwrap_or_else(|e| {
            tracing::warn!("failed to deserialize config: {}", e);
            Config::default()
        }),
        None => Config::default(),
    }
}
