use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Search path for the daemon's config file, first-found wins.
pub const DEFAULT_SEARCH_PATH: [&str; 3] = [
    "/usr/local/etc/landiallerd.conf",
    "/etc/landiallerd.conf",
    "./landiallerd.conf",
];

const DEFAULT_PORT: u16 = 6543;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;
const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Fatal config errors: reported to stderr, the process exits before the
/// listener opens, and tracing is never consulted (it isn't initialised yet).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (searched {searched:?})")]
    NotFound { searched: Vec<PathBuf> },

    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required option '{option}' in section [{section}] of {path}")]
    MissingOption {
        path: PathBuf,
        section: &'static str,
        option: &'static str,
    },

    #[error("invalid integer for '{option}' in section [{section}] of {path}: {value:?}")]
    InvalidInteger {
        path: PathBuf,
        section: &'static str,
        option: &'static str,
        value: String,
    },
}

/// The daemon's fully resolved configuration: the three external commands,
/// the RPC port, and the ambient tunables §4.7 adds on top of the
/// distilled spec's bare `commands`/`general` sections.
#[derive(Debug, Clone)]
pub struct Config {
    pub connect_cmd: String,
    pub disconnect_cmd: String,
    pub is_connected_cmd: String,
    pub port: u16,
    pub sweep_interval: Duration,
    pub client_timeout: Duration,
    pub command_timeout: Duration,
    pub log_level: String,
}

/// `[section] key: value` / `key = value` store, parsed from an INI-style
/// file. This is a deliberately small hand-rolled parser rather than a
/// crate dependency: the format (just sections and flat key/value pairs,
/// `#`/`;` comments) is simple enough that pulling in a config-format
/// crate would be the heavier choice.
struct Ini {
    sections: HashMap<String, HashMap<String, String>>,
}

impl Ini {
    fn parse(contents: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current = String::new();

        for raw_line in contents.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                current = name.trim().to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }
            let Some((key, value)) = split_key_value(line) else {
                continue;
            };
            sections
                .entry(current.clone())
                .or_default()
                .insert(key, value);
        }

        Self { sections }
    }

    fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.sections.get(section)?.get(option).map(String::as_str)
    }
}

fn split_key_value(line: &str) -> Option<(String, String)> {
    let sep = line.find(':').or_else(|| line.find('='))?;
    let (key, value) = line.split_at(sep);
    Some((key.trim().to_string(), value[1..].trim().to_string()))
}

impl Config {
    /// Find the config file, trying `explicit` first if given, otherwise
    /// the documented search path, first-found wins.
    pub fn find_file(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(ConfigError::NotFound {
                searched: vec![path.to_path_buf()],
            });
        }

        let searched: Vec<PathBuf> = DEFAULT_SEARCH_PATH.iter().map(PathBuf::from).collect();
        searched
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or(ConfigError::NotFound { searched })
    }

    /// Load and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Config, ConfigError> {
        let ini = Ini::parse(contents);

        let required = |section: &'static str, option: &'static str| {
            ini.get(section, option)
                .map(str::to_string)
                .ok_or(ConfigError::MissingOption { path: path.to_path_buf(), section, option })
        };

        let connect_cmd = required("commands", "connect")?;
        let disconnect_cmd = required("commands", "disconnect")?;
        let is_connected_cmd = required("commands", "is_connected")?;

        // `general` is the documented section name; `server` is accepted
        // too, matching the distilled spec's "(or `server`)" allowance.
        let general_value = |option: &'static str| {
            ini.get("general", option).or_else(|| ini.get("server", option))
        };

        let port = match general_value("port") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidInteger {
                path: path.to_path_buf(),
                section: "general",
                option: "port",
                value: raw.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let parse_secs = |option: &'static str, default: u64| -> Result<u64, ConfigError> {
            match general_value(option) {
                Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidInteger {
                    path: path.to_path_buf(),
                    section: "general",
                    option,
                    value: raw.to_string(),
                }),
                None => Ok(default),
            }
        };

        let sweep_interval = Duration::from_secs(parse_secs("sweep_interval_secs", DEFAULT_SWEEP_INTERVAL_SECS)?);
        let client_timeout = Duration::from_secs(parse_secs("client_timeout_secs", DEFAULT_CLIENT_TIMEOUT_SECS)?);
        let command_timeout = Duration::from_secs(parse_secs("command_timeout_secs", DEFAULT_COMMAND_TIMEOUT_SECS)?);
        let log_level = general_value("log_level").unwrap_or(DEFAULT_LOG_LEVEL).to_string();

        Ok(Config {
            connect_cmd,
            disconnect_cmd,
            is_connected_cmd,
            port,
            sweep_interval,
            client_timeout,
            command_timeout,
            log_level,
        })
    }
}
