use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: ApiConfig,
    pub destination: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 單一 HTTP API 的連線設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_seconds: Option<u64>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    /// 以 base_url 拼出完整端點，容忍結尾斜線
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub directory: String,
    pub file_prefix: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_prefix: None,
        }
    }
}

impl StoreConfig {
    pub fn file_prefix(&self) -> &str {
        self.file_prefix.as_deref().unwrap_or("nav-")
    }

    /// 每個目標日期一個 SQLite 檔
    pub fn path_for_date(&self, date: &str) -> PathBuf {
        Path::new(&self.directory).join(format!("{}{}.db", self.file_prefix(), date))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSettings {
    /// false 時不寫入目的系統，但仍記錄到本地 store (dry run)
    pub forward: Option<bool>,
    /// 只處理這些來源航程 id
    pub itineraries: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl SyncConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NAV_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn forward_enabled(&self) -> bool {
        self.sync.forward.unwrap_or(true)
    }

    pub fn json_logging(&self) -> bool {
        matches!(self.logging.format.as_deref(), Some("json"))
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_api("source", &self.source)?;
        validate_api("destination", &self.destination)?;

        validation::validate_path("store.directory", &self.store.directory)?;
        validation::validate_non_empty_string("store.file_prefix", self.store.file_prefix())?;

        if let Some(format) = &self.logging.format {
            let valid_formats = ["compact", "json"];
            if !valid_formats.contains(&format.as_str()) {
                return Err(SyncError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.clone(),
                    reason: format!("Valid formats: {}", valid_formats.join(", ")),
                });
            }
        }

        Ok(())
    }
}

fn validate_api(section: &str, api: &ApiConfig) -> Result<()> {
    validation::validate_url(&format!("{}.base_url", section), &api.base_url)?;

    // 未被替換的 ${VAR} 代表環境變數沒設定
    if api.token.starts_with("${") {
        return Err(SyncError::MissingConfigError {
            field: format!("{}.token ({})", section, api.token),
        });
    }
    validation::validate_non_empty_string(&format!("{}.token", section), &api.token)?;

    if let Some(timeout) = api.timeout_seconds {
        validation::validate_positive_number(
            &format!("{}.timeout_seconds", section),
            timeout as usize,
            1,
        )?;
    }
    Ok(())
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
