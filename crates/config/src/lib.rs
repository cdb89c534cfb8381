//! rbac-config - 配置加载库
//!
//! 加载顺序: `{dir}/default.toml` -> `{dir}/{APP_ENV}.toml` -> `APP_` 前缀环境变量
//! (嵌套字段使用 `__` 分隔，例如 `APP_DATABASE__URL`)

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::Secret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 策略引擎配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    /// Casbin 模型文件路径，未配置时使用内置模型
    pub model_path: Option<String>,
}

/// 权限同步配置
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// 全量同步时是否清理不再由 角色-菜单-API 关系推导出的策略
    #[serde(default = "default_true")]
    pub prune: bool,
    /// 重新分配菜单/API 时是否立即撤销不再成立的策略
    #[serde(default)]
    pub prune_on_reassign: bool,
    /// 全量同步后是否根据策略存储重建用户角色镜像表
    #[serde(default = "default_true")]
    pub rebuild_user_roles: bool,
    /// 周期同步间隔（秒），未配置时只运行一次
    pub interval_secs: Option<u64>,
    /// 单次同步超时（秒）
    #[serde(default = "default_sync_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            prune: true,
            prune_on_reassign: false,
            rebuild_user_roles: true,
            interval_secs: None,
            timeout_secs: default_sync_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sync_timeout_secs() -> u64 {
    60
}

fn default_app_env() -> String {
    "development".to_string()
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_app_env());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("APP_").split("__"));

        Self::from_figment(figment)
    }

    /// 从已组装好的 Figment 提取配置
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract()?)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
