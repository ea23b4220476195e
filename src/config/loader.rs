//! Locating, reading and overriding the TOML configuration.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, PortConfig, StopBits};
use std::iter::once;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "serial-link.toml";
const APP_DIR_NAME: &str = "serial-link";
const CONFIG_PATH_ENV: &str = "SERIAL_LINK_CONFIG";

/// A `SERIAL_LINK_*` variable and the port field it replaces.
struct EnvOverride {
    var: &'static str,
    apply: fn(&mut PortConfig, String) -> Result<(), String>,
}

const ENV_OVERRIDES: &[EnvOverride] = &[
    EnvOverride {
        var: "SERIAL_LINK_PORT",
        apply: set_name,
    },
    EnvOverride {
        var: "SERIAL_LINK_BAUD",
        apply: set_baud,
    },
    EnvOverride {
        var: "SERIAL_LINK_READ_TIMEOUT_MS",
        apply: set_read_timeout,
    },
    EnvOverride {
        var: "SERIAL_LINK_STOP_BITS",
        apply: set_stop_bits,
    },
    EnvOverride {
        var: "SERIAL_LINK_LOG_FILE",
        apply: set_log_file,
    },
];

/// A loaded configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// `None` when no file was found and defaults were used
    pub config_path: Option<PathBuf>,
    pub config: Config,
}

impl ConfigLoader {
    /// Load from the first file [`resolve_config_path`] finds, or from
    /// defaults, then apply environment overrides.
    pub fn load() -> ConfigResult<Self> {
        match resolve_config_path() {
            Some(path) => Self::load_from(path),
            None => {
                let mut config = Config::default();
                apply_env_overrides(&mut config.port)?;
                tracing::debug!("no configuration file, using defaults");
                Ok(Self {
                    config_path: None,
                    config,
                })
            }
        }
    }

    /// Load `path`, then apply environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&text)?;
        apply_env_overrides(&mut config.port)?;
        tracing::debug!(path = %path.display(), "configuration loaded");

        Ok(Self {
            config_path: Some(path.to_path_buf()),
            config,
        })
    }

    /// Defaults plus environment overrides. A malformed override is skipped
    /// with a warning rather than failing.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        if let Err(e) = apply_env_overrides(&mut config.port) {
            tracing::warn!("ignoring environment override: {}", e);
        }
        Self {
            config_path: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}

/// The first existing file among `$SERIAL_LINK_CONFIG`, `./serial-link.toml`
/// and the per-user location from [`get_default_config_path`].
pub fn resolve_config_path() -> Option<PathBuf> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    explicit
        .into_iter()
        .chain(once(PathBuf::from(CONFIG_FILE_NAME)))
        .chain(get_default_config_path())
        .find(|candidate| candidate.is_file())
}

/// `serial-link/serial-link.toml` under `%APPDATA%`, `$XDG_CONFIG_HOME` or
/// `~/.config`.
pub fn get_default_config_path() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(windows)]
fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("APPDATA").map(PathBuf::from)
}

#[cfg(not(windows))]
fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

fn apply_env_overrides(port: &mut PortConfig) -> ConfigResult<()> {
    for entry in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(entry.var) {
            (entry.apply)(port, value).map_err(|message| ConfigError::env_parse(entry.var, message))?;
            tracing::debug!(var = entry.var, "environment override applied");
        }
    }
    Ok(())
}

fn set_name(port: &mut PortConfig, value: String) -> Result<(), String> {
    port.name = value;
    Ok(())
}

fn set_baud(port: &mut PortConfig, value: String) -> Result<(), String> {
    port.baud_rate = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a baud rate", value))?;
    Ok(())
}

fn set_read_timeout(port: &mut PortConfig, value: String) -> Result<(), String> {
    port.read_timeout_ms = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of milliseconds", value))?;
    Ok(())
}

fn set_stop_bits(port: &mut PortConfig, value: String) -> Result<(), String> {
    port.stop_bits = value.parse::<StopBits>()?;
    Ok(())
}

/// An empty value disables the trace log.
fn set_log_file(port: &mut PortConfig, value: String) -> Result<(), String> {
    port.log_file = (!value.is_empty()).then(|| PathBuf::from(value));
    Ok(())
}
