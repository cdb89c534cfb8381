//! 角色实体

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// 角色 ID
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
pub struct RoleId(pub i64);

/// 角色实体
///
/// `code` 全局唯一，是策略存储中的主体 (subject)，创建后不可修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub code: String,
    pub enabled: bool,
    pub sort: i32,
}

impl Role {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: RoleId::default(),
            name: name.into(),
            code: code.into(),
            enabled: true,
            sort: 0,
        }
    }

    /// 激活角色
    pub fn activate(&mut self) {
        self.enabled = true;
    }

    /// 停用角色
    pub fn deactivate(&mut self) {
        self.enabled = false;
    }

    /// 更新可变信息
    pub fn update(&mut self, name: String, sort: i32) {
        self.name = name;
        self.sort = sort;
    }
}

/// 角色编码规则: 非空、不含空白和逗号（策略存储按逗号分隔字段）
pub fn validate_role_code(code: &str) -> Result<(), String> {
    if code.is_empty() {
        return Err("role code must not be empty".to_string());
    }
    if code.chars().any(|c| c.is_whitespace() || c == ',') {
        return Err(format!("role code '{}' contains whitespace or ','", code));
    }
    Ok(())
}
