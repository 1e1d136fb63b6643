use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";
pub const DEFAULT_EXPORT_PREFIX: &str = "Ohalloran";
pub const DEFAULT_OUTPUT_DIR: &str = "~/.ifta/downloads";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub api: ApiSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    /// Seconds before a request is abandoned. Absent or 0 waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportSettings {
    pub prefix: String,
    pub output_dir: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            csrf_token: None,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_EXPORT_PREFIX.to_string(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(std::time::Duration::from_secs)
    }
}
