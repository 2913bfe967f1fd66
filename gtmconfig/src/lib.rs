//! # Game Theme Music configuration
//!
//! This crate provides configuration management for the theme music engine:
//! - Loading configuration from YAML files
//! - Merging with the embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - A string-keyed settings store (volume, default mute) persisted in the same file
//!
//! ## Usage
//!
//! ```no_run
//! use gtmconfig::get_config;
//!
//! let config = get_config();
//!
//! let limit = config.get_catalog_search_limit()?;
//! let music_dir = config.get_music_dir()?;
//!
//! config.set_catalog_search_limit(25)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, bail, Context, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{info, warn};

pub mod settings;

pub use settings::AudioSettings;

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("gtm.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load configuration"));
}

const ENV_CONFIG_DIR: &str = "GTM_CONFIG";
const ENV_PREFIX: &str = "GTM_CONFIG__";
const LOCAL_CONFIG_DIR: &str = ".gamethememusic";

const DEFAULT_MUSIC_DIR: &str = "music";
const DEFAULT_THEME_SUFFIX: &str = " Theme Music";
const DEFAULT_CATALOG_LIMIT: usize = 10;
const DEFAULT_LOCAL_LIMIT: usize = 100;
const DEFAULT_NETWORK_COUNT: usize = 10;
const DEFAULT_NETWORK_MAX_DURATION_SECS: u64 = 20 * 60;
const DEFAULT_ITUNES_API_BASE: &str = "https://itunes.apple.com";
const DEFAULT_YTDLP_PATH: &str = "bin/yt-dlp";
const DEFAULT_DISMISS_DELAY_MS: u64 = 1000;
const DEFAULT_SETTLE_WINDOW_MS: u64 = 1000;
const DEFAULT_SETTLE_INTERVAL_MS: u64 = 10;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for millisecond durations with default
macro_rules! impl_millis_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<Duration> {
            let millis = match self.get_value($path) {
                Ok(Value::Number(n)) => n.as_u64().unwrap_or($default),
                _ => $default,
            };
            Ok(Duration::from_millis(millis))
        }

        pub fn $setter(&self, value: Duration) -> Result<()> {
            let n = Number::from(value.as_millis() as u64);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration manager
///
/// Holds the merged YAML tree behind a mutex; every setter writes the
/// whole tree back to `config.yaml`.
///
/// # Examples
///
/// ```no_run
/// use gtmconfig::get_config;
///
/// let config = get_config();
/// let delay = config.get_dismiss_delay()?;
/// println!("Dismiss delay: {:?}", delay);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Picks the configuration directory
    ///
    /// Lookup order: `directory` when not empty, the `GTM_CONFIG` environment
    /// variable, `./.gamethememusic`, then `~/.gamethememusic`. Falls back to
    /// `./.gamethememusic`, which is created.
    pub fn config_dir(directory: &str) -> Result<PathBuf> {
        let dir = if !directory.is_empty() {
            PathBuf::from(directory)
        } else if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Config directory from environment");
            PathBuf::from(env_path)
        } else {
            let home = home_dir().map(|h| h.join(LOCAL_CONFIG_DIR));
            match home {
                Some(home) if !Path::new(LOCAL_CONFIG_DIR).exists() && home.exists() => home,
                _ => PathBuf::from(LOCAL_CONFIG_DIR),
            }
        };

        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }
        Ok(dir)
    }

    /// Loads `config.yaml` from the configuration directory
    ///
    /// The file is merged over the embedded defaults, `GTM_CONFIG__A__B=value`
    /// environment variables are applied on top, and the result is written
    /// back so the file always lists every key.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        let path = config_dir.join("config.yaml");
        info!(config_file = %path.display(), "Using config file");

        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        match fs::read(&path) {
            Ok(data) => {
                let external: Value = serde_yaml::from_slice(&data)
                    .with_context(|| format!("parsing {}", path.display()))?;
                merge_yaml(&mut value, &external);
            }
            Err(_) => info!(config_file = %path.display(), "No config file yet, using defaults"),
        }
        apply_env_overrides(&mut value, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(value),
        };
        config.save()?;
        Ok(config)
    }

    /// Writes the whole tree to `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data.lock().unwrap())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Directory holding `config.yaml`
    pub fn directory(&self) -> &Path {
        &self.config_dir
    }

    /// Sets the value at `path` (e.g. `&["search", "catalog_limit"]`) and saves
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        insert_at(&mut self.data.lock().unwrap(), path, value)?;
        self.save()
    }

    /// Value at `path`, an error when any key is missing
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        lookup(&self.data.lock().unwrap(), path)
            .cloned()
            .ok_or_else(|| anyhow!("no config value at {}", path.join(".")))
    }

    /// Resolves `raw` against the configuration directory unless absolute
    fn resolve(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    impl_string_config!(
        get_music_dir_raw,
        set_music_dir,
        &["library", "music_dir"],
        DEFAULT_MUSIC_DIR
    );

    /// Directory holding downloaded audio, created when missing
    pub fn get_music_dir(&self) -> Result<String> {
        let dir = self.resolve(&self.get_music_dir_raw()?);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!(directory = %dir.display(), "Created music directory");
        }
        Ok(dir.to_string_lossy().to_string())
    }

    /// Path to the yt-dlp executable, resolved against the config directory when relative
    pub fn get_ytdlp_path(&self) -> Result<String> {
        Ok(self.resolve(&self.get_ytdlp_path_raw()?).to_string_lossy().to_string())
    }

    impl_string_config!(
        get_ytdlp_path_raw,
        set_ytdlp_path,
        &["ytdlp", "path"],
        DEFAULT_YTDLP_PATH
    );

    impl_string_config!(
        get_theme_suffix,
        set_theme_suffix,
        &["search", "theme_suffix"],
        DEFAULT_THEME_SUFFIX
    );

    impl_usize_config!(
        get_catalog_search_limit,
        set_catalog_search_limit,
        &["search", "catalog_limit"],
        DEFAULT_CATALOG_LIMIT
    );

    impl_usize_config!(
        get_local_search_limit,
        set_local_search_limit,
        &["search", "local_limit"],
        DEFAULT_LOCAL_LIMIT
    );

    impl_usize_config!(
        get_network_search_count,
        set_network_search_count,
        &["search", "network_count"],
        DEFAULT_NETWORK_COUNT
    );

    /// Longest track accepted from network search, in seconds
    pub fn get_network_max_duration_secs(&self) -> Result<u64> {
        match self.get_value(&["search", "network_max_duration_secs"]) {
            Ok(Value::Number(n)) => Ok(n.as_u64().unwrap_or(DEFAULT_NETWORK_MAX_DURATION_SECS)),
            _ => Ok(DEFAULT_NETWORK_MAX_DURATION_SECS),
        }
    }

    impl_string_config!(
        get_itunes_api_base,
        set_itunes_api_base,
        &["itunes", "api_base"],
        DEFAULT_ITUNES_API_BASE
    );

    impl_millis_config!(
        get_dismiss_delay,
        set_dismiss_delay,
        &["ambient", "dismiss_delay_ms"],
        DEFAULT_DISMISS_DELAY_MS
    );

    impl_millis_config!(
        get_settle_window,
        set_settle_window,
        &["ambient", "settle_window_ms"],
        DEFAULT_SETTLE_WINDOW_MS
    );

    impl_millis_config!(
        get_settle_interval,
        set_settle_interval,
        &["ambient", "settle_interval_ms"],
        DEFAULT_SETTLE_INTERVAL_MS
    );

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );
}

/// Returns the global configuration instance
///
/// The configuration is lazily loaded on first access.
///
/// # Examples
///
/// ```no_run
/// use gtmconfig::get_config;
///
/// let config = get_config();
/// ```
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

fn lookup<'a>(data: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(data, |node, key| node.as_mapping()?.get(*key))
}

fn insert_at(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *data = value;
        return Ok(());
    };

    let mut node = data;
    for key in parents {
        let map = node
            .as_mapping_mut()
            .ok_or_else(|| anyhow!("{} is not a mapping", key))?;
        node = map
            .entry(Value::String(key.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }
    node.as_mapping_mut()
        .ok_or_else(|| anyhow!("parent of {} is not a mapping", last))?
        .insert(Value::String(last.to_string()), value);
    Ok(())
}

/// Applies `GTM_CONFIG__SECTION__KEY=value` variables, keys lower-cased
///
/// Values are parsed as YAML so numbers and booleans keep their type.
fn apply_env_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, raw) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = stripped.split("__").map(str::to_lowercase).collect();
        let path: Vec<&str> = path.iter().map(String::as_str).collect();
        let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw));
        if let Err(e) = insert_at(config, &path, value) {
            warn!(variable = %key, error = %e, "Ignoring config override");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_yaml_keeps_defaults_and_overrides_scalars() {
        let mut default: Value =
            serde_yaml::from_str("search:\n  catalog_limit: 10\n  local_limit: 100\n").unwrap();
        let external: Value = serde_yaml::from_str("search:\n  catalog_limit: 3\n").unwrap();

        merge_yaml(&mut default, &external);

        assert_eq!(
            lookup(&default, &["search", "catalog_limit"]).cloned().unwrap(),
            Value::Number(3.into())
        );
        assert_eq!(
            lookup(&default, &["search", "local_limit"]).cloned().unwrap(),
            Value::Number(100.into())
        );
    }

    #[test]
    fn test_env_overrides_are_typed_and_nested() {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        let vars = vec![
            ("GTM_CONFIG__AMBIENT__DISMISS_DELAY_MS".to_string(), "250".to_string()),
            ("GTM_CONFIG__SETTINGS__DEFAULT_MUTED".to_string(), "true".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];

        apply_env_overrides(&mut value, vars);

        assert_eq!(
            lookup(&value, &["ambient", "dismiss_delay_ms"]).cloned().unwrap(),
            Value::Number(250.into())
        );
        assert_eq!(
            lookup(&value, &["settings", "default_muted"]).cloned().unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_missing_path_is_absent() {
        let value: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(lookup(&value, &["nope", "deeper"]).is_none());
        assert!(lookup(&value, &["search", "catalog_limit", "deeper"]).is_none());
    }

    #[test]
    fn test_insert_creates_intermediate_mappings() {
        let mut value = Value::Mapping(Mapping::new());
        insert_at(&mut value, &["settings", "volume"], Value::Number(1.into())).unwrap();
        assert_eq!(lookup(&value, &["settings", "volume"]), Some(&Value::Number(1.into())));

        // a scalar cannot hold children
        assert!(insert_at(&mut value, &["settings", "volume", "x"], Value::Null).is_err());
    }
}
