use std::{path::Path, time::Duration};

use anyhow::Context;

use crate::{indicator::IndicatorTiming, pins::Revision};

/// Which end of the rig this binary runs on
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Fixture,
    Dut,
}

#[derive(Debug, serde::Deserialize)]
pub struct Configuration {
    pub role: Role,
    /// Serial device connected to the other board
    pub uart: String,
    pub baudrate: u32,
    pub log_path: String,
    /// Skips the chip probe when set
    pub revision: Option<Revision>,
    #[serde(default = "Configuration::default_chip_info")]
    pub chip_info: String,
    /// File holding the MAC address reported as device id
    #[serde(default = "Configuration::default_device_id")]
    pub device_id: String,
    #[serde(default = "Configuration::default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "Configuration::default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "Configuration::default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    #[serde(default)]
    pub indicator: IndicatorConfig,
    #[serde(default)]
    pub timing: IndicatorTiming,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub spi_bus: u8,
    /// Color file written instead of the pixel in mock builds
    pub file: String,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self { spi_bus: 0, file: "indicator".into() }
    }
}

impl Configuration {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("Could not parse configuration")
    }

    /// The configured revision, or the probed one if none is configured
    pub fn revision(&self) -> Revision {
        self.revision.unwrap_or_else(|| Revision::probe(&self.chip_info))
    }

    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    fn default_chip_info() -> String {
        "/proc/device-tree/chip_name".into()
    }

    fn default_device_id() -> String {
        "/sys/class/net/eth0/address".into()
    }

    const fn default_settle_ms() -> u64 {
        10
    }

    const fn default_call_timeout_ms() -> u64 {
        1000
    }

    const fn default_stop_timeout_ms() -> u64 {
        3000
    }
}
