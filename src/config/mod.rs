mod settings;

pub use settings::{
    ApiSettings, Config, ExportSettings, DEFAULT_BASE_URL, DEFAULT_EXPORT_PREFIX,
    DEFAULT_OUTPUT_DIR,
};

use crate::error::{IftaError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `api.base_url`
pub const BASE_URL_ENV: &str = "IFTA_API_BASE_URL";

/// Get the config directory path (~/.ifta/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "ifta") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.ifta/
    let home = dirs_home().ok_or_else(|| {
        IftaError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".ifta"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve the export directory; relative paths are taken from the config directory.
pub fn resolve_output_dir(output_dir: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(output_dir);
    if expanded.is_absolute() {
        expanded
    } else {
        cfg_dir.join(expanded)
    }
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(IftaError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(IftaError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    parse_config(&content).map_err(|e| IftaError::ConfigParse { path, source: e })
}

pub fn parse_config(content: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(content)
}

/// Apply `IFTA_API_BASE_URL` on top of whatever the file said.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(url) = std::env::var(BASE_URL_ENV) {
        if !url.trim().is_empty() {
            log::debug!("base url overridden by {BASE_URL_ENV}");
            config.api.base_url = url;
        }
    }
    config
}

/// Create the config directory with a template config.toml
pub fn init_config_dir(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(IftaError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }
    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "http://127.0.0.1:8000/"
# timeout_secs = 30            # optional, requests wait indefinitely when unset
# csrf_token = "..."           # optional, sent as X-CSRFToken on POST requests

[export]
prefix = "Ohalloran"           # report downloads are named <prefix>_YYYY_MM_DD.csv
output_dir = "~/.ifta/downloads"
"#;
