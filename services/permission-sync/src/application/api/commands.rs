//! API 相关命令定义

use crate::domain::api::{ApiEndpoint, ApiId, normalize_method};

/// API 可编辑字段
#[derive(Debug, Clone)]
pub struct ApiFields {
    pub path: String,
    pub method: String,
    pub name: String,
    pub group: String,
    pub enabled: bool,
}

impl ApiFields {
    pub fn new(path: impl Into<String>, method: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            name: name.into(),
            group: String::new(),
            enabled: true,
        }
    }

    /// 验证并规范化（方法转大写），返回规范化后的字段
    pub fn normalized(self) -> Result<Self, String> {
        let path = self.path.trim().to_string();
        if !path.starts_with('/') {
            return Err(format!("API path '{}' must start with '/'", path));
        }
        if path.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(format!("API path '{}' contains whitespace or ','", path));
        }
        let method = normalize_method(&self.method)
            .ok_or_else(|| format!("Unsupported HTTP method '{}'", self.method))?;
        if self.name.trim().is_empty() {
            return Err("API name cannot be empty".to_string());
        }

        Ok(Self {
            path,
            method,
            ..self
        })
    }

    pub fn apply_to(self, api: &mut ApiEndpoint) {
        api.path = self.path;
        api.method = self.method;
        api.name = self.name;
        api.group = self.group;
        api.enabled = self.enabled;
    }
}

/// 注册 API 命令
#[derive(Debug, Clone)]
pub struct CreateApiCommand {
    pub fields: ApiFields,
}

/// 更新 API 命令
#[derive(Debug, Clone)]
pub struct UpdateApiCommand {
    pub api_id: ApiId,
    pub fields: ApiFields,
}

/// 删除 API 命令
#[derive(Debug, Clone)]
pub struct DeleteApiCommand {
    pub api_id: ApiId,
}
