//! Application settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use lan_detect::{AddressRange, DetectError, ProbeConfig};
use lan_watch::{AlertOptions, ScanConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DEFAULT_RANGE: &str = "192.168.1.0/24";
const DEFAULT_CONCURRENCY: usize = 32;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1000;
const DEFAULT_NAME_TIMEOUT_MS: u64 = 2000;
const DEFAULT_INTERVAL_MINUTES: u64 = 5;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// CIDR block to sweep
    pub address_range: String,
    /// Probes in flight at once
    pub scan_concurrency: usize,
    /// Reachability probe timeout
    pub probe_timeout_ms: u64,
    /// Reverse name lookup timeout
    pub name_timeout_ms: u64,
    /// Minutes between sweeps in watch mode
    pub scan_interval_minutes: u64,
    /// Known device ledger; defaults to the config directory
    pub ledger_path: Option<PathBuf>,
    /// Announce devices not in the ledger
    pub send_new_device_alerts: bool,
    /// Announce a summary after every sweep
    pub send_scan_results: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address_range: DEFAULT_RANGE.to_string(),
            scan_concurrency: DEFAULT_CONCURRENCY,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            name_timeout_ms: DEFAULT_NAME_TIMEOUT_MS,
            scan_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            ledger_path: None,
            send_new_device_alerts: true,
            send_scan_results: false,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for lanwatch
    /// Uses $XDG_CONFIG_HOME/lanwatch on Linux/macOS, falls back to ~/.config/lanwatch
    pub fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("lanwatch"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("lanwatch"))
    }

    /// Get the default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from `path`, or the default location when `None`.
    ///
    /// Never fails: a missing or unreadable file gives the defaults, and
    /// invalid values are replaced by their defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::settings_path) else {
            warn!("Could not determine settings path, using defaults");
            return Self::default();
        };

        let settings = match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<Settings>(&json) {
                Ok(settings) => {
                    debug!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!("Ignoring invalid settings in {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Could not read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        };

        settings.validated()
    }

    /// Save settings to `path`
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }

    /// Replace out-of-range values with their defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if let Err(e) = self.address_range.parse::<AddressRange>() {
            warn!("{}, using {}", e, defaults.address_range);
            self.address_range = defaults.address_range;
        }
        if self.scan_concurrency == 0 {
            warn!("scan_concurrency must be at least 1, using {}", DEFAULT_CONCURRENCY);
            self.scan_concurrency = DEFAULT_CONCURRENCY;
        }
        if self.probe_timeout_ms == 0 {
            warn!("probe_timeout_ms must be positive, using {}", DEFAULT_PROBE_TIMEOUT_MS);
            self.probe_timeout_ms = DEFAULT_PROBE_TIMEOUT_MS;
        }
        if self.name_timeout_ms == 0 {
            warn!("name_timeout_ms must be positive, using {}", DEFAULT_NAME_TIMEOUT_MS);
            self.name_timeout_ms = DEFAULT_NAME_TIMEOUT_MS;
        }
        if self.scan_interval_minutes == 0 {
            warn!(
                "scan_interval_minutes must be positive, using {}",
                DEFAULT_INTERVAL_MINUTES
            );
            self.scan_interval_minutes = DEFAULT_INTERVAL_MINUTES;
        }

        self
    }

    pub fn range(&self) -> Result<AddressRange, DetectError> {
        self.address_range.parse()
    }

    /// Ledger location: the configured path, else next to the settings file
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path.clone().unwrap_or_else(|| {
            Self::config_dir()
                .map(|dir| dir.join("known_devices.json"))
                .unwrap_or_else(|| PathBuf::from("known_devices.json"))
        })
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            timeout: Duration::from_millis(self.probe_timeout_ms),
            name_timeout: Duration::from_millis(self.name_timeout_ms),
        }
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            concurrency: self.scan_concurrency,
            ..Default::default()
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_minutes * 60)
    }

    pub fn alert_options(&self) -> AlertOptions {
        AlertOptions {
            new_devices: self.send_new_device_alerts,
            scan_results: self.send_scan_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.address_range, "192.168.1.0/24");
        assert_eq!(settings.scan_concurrency, 32);
        assert_eq!(settings.scan_interval(), Duration::from_secs(300));
        assert_eq!(settings.probe_config().timeout, Duration::from_millis(1000));
        assert_eq!(settings.probe_config().name_timeout, Duration::from_millis(2000));
        assert!(settings.alert_options().new_devices);
        assert!(!settings.alert_options().scan_results);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.json")));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "address_range": "10.0.0.0/28", "send_scan_results": true }"#)
            .unwrap();

        let settings = Settings::load(Some(&path));
        assert_eq!(settings.address_range, "10.0.0.0/28");
        assert!(settings.send_scan_results);
        assert_eq!(settings.scan_concurrency, 32);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "address_range": "not a network", "scan_concurrency": 0, "scan_interval_minutes": 0 }"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path));
        assert_eq!(settings.address_range, "192.168.1.0/24");
        assert_eq!(settings.scan_concurrency, 32);
        assert_eq!(settings.scan_interval_minutes, 5);
    }

    #[test]
    fn test_unparseable_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "scan_concurrency: 4").unwrap();
        assert_eq!(Settings::load(Some(&path)), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            scan_concurrency: 8,
            ledger_path: Some(dir.path().join("known.json")),
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(Some(&path)), settings);
        assert_eq!(settings.ledger_path(), dir.path().join("known.json"));
    }
}
