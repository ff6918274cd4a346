use crate::config::{
    DashboardSettings, LoadSettings, MonitoringSettings, ServerSettings, SourceSettings,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, TelemetryError};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub load: LoadSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        let config = toml::from_str(&processed_content)?;
        Ok(config)
    }

    /// 替換環境變數 (例如 ${FIREBASE_PROJECT}),未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("deployment.name", &self.deployment.name)?;
        self.source.validate()?;
        self.dashboard.validate()?;
        self.load.validate()?;
        self.server.validate()?;

        let unresolved = [
            ("source.database_url", Some(&self.source.database_url)),
            ("source.project_id", self.source.project_id.as_ref()),
            ("source.auth_token", self.source.auth_token.as_ref()),
        ];
        for (field, value) in unresolved {
            if let Some(value) = value {
                if env_var_pattern().is_match(value) {
                    return Err(TelemetryError::InvalidConfigValue {
                        field: field.to_string(),
                        value: value.clone(),
                        reason: "Environment variable is not set".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn source(&self) -> &SourceSettings {
        &self.source
    }

    fn dashboard(&self) -> &DashboardSettings {
        &self.dashboard
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn export_archive(&self) -> bool {
        self.load.export_archive
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
