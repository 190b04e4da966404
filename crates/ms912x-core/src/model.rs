use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DRIVER_NAME: &str = "ms912x";

/// Menu entries used when the config provides none (or none survive validation).
pub const DEFAULT_MODES: &[&str] = &["1920x1080", "1280x720", "1024x768", "800x600"];

pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// A resolution as modetest names it, e.g. `1920x1080`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mode {
    pub width: u32,
    pub height: u32,
}

impl Mode {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Argument for `modetest -s`: `<connector>:<w>x<h>-<hz>`.
    pub fn set_arg(&self, connector: &str, refresh_hz: u32) -> String {
        format!("{connector}:{self}-{refresh_hz}")
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::Parse { what: "mode", input: s.to_string() };
        let (w, h) = s.trim().split_once('x').ok_or_else(bad)?;
        let width: u32 = w.parse().map_err(|_| bad())?;
        let height: u32 = h.parse().map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok(Mode { width, height })
    }
}

/// One row of the adapter's hardware mode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedMode {
    pub mode: Mode,
    pub refresh_hz: u32,
    pub code: u16, // firmware mode number
}

const fn row(width: u32, height: u32, refresh_hz: u32, code: u16) -> SupportedMode {
    SupportedMode { mode: Mode::new(width, height), refresh_hz, code }
}

/// Timings the ms912x firmware accepts. Anything else is rejected by the
/// kernel driver at modeset time.
pub const SUPPORTED_MODES: &[SupportedMode] = &[
    row(800, 600, 60, 0x4200),
    row(1024, 768, 60, 0x4700),
    row(1152, 864, 60, 0x4c00),
    row(1280, 720, 60, 0x4f00),
    row(1280, 800, 60, 0x5700),
    row(1280, 960, 60, 0x5b00),
    row(1280, 1024, 60, 0x6000),
    row(1366, 768, 60, 0x6600),
    row(1400, 1050, 60, 0x6700),
    row(1440, 900, 60, 0x6b00),
    row(1680, 1050, 60, 0x7800),
    row(1920, 1080, 60, 0x8100),
    row(720, 480, 60, 0x0200),
    row(720, 576, 50, 0x1100),
    row(640, 480, 60, 0x4000),
    row(1024, 768, 75, 0x4900),
    row(1280, 600, 60, 0x4e00),
    row(1280, 768, 60, 0x5400),
    row(1280, 1024, 75, 0x6100),
    row(1360, 768, 60, 0x6400),
    row(1600, 1200, 60, 0x7300),
    row(800, 600, 75, 0x4400),
    row(1280, 720, 50, 0x1300),
    row(1280, 768, 75, 0x5600),
    row(1920, 1080, 30, 0x2200),
    row(1920, 1080, 50, 0x1f00),
];

pub fn lookup(mode: Mode, refresh_hz: u32) -> Option<&'static SupportedMode> {
    SUPPORTED_MODES
        .iter()
        .find(|m| m.mode == mode && m.refresh_hz == refresh_hz)
}

pub fn is_supported(mode: Mode, refresh_hz: u32) -> bool {
    lookup(mode, refresh_hz).is_some()
}

pub fn default_modes() -> Vec<Mode> {
    DEFAULT_MODES.iter().filter_map(|s| s.parse().ok()).collect()
}
