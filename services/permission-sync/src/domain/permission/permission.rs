//! 权限字典条目
//!
//! 每个条目恰好指向一个目标（菜单、按钮或 API），且目标类型与 `permission_type` 一致。
//! API 类型的条目另外记录来源菜单 `source_menu_id`，用于菜单变更时级联清理，
//! 它不属于目标外键，不参与形状校验的"恰好一个"计数。

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::domain::api::{ApiEndpoint, ApiId};
use crate::domain::menu::MenuId;

/// 权限 ID
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
pub struct PermissionId(pub i64);

/// 权限类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionType {
    Menu,
    Button,
    Api,
}

impl PermissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::Menu => "MENU",
            PermissionType::Button => "BUTTON",
            PermissionType::Api => "API",
        }
    }
}

impl std::fmt::Display for PermissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MENU" => Ok(PermissionType::Menu),
            "BUTTON" => Ok(PermissionType::Button),
            "API" => Ok(PermissionType::Api),
            other => Err(format!("unknown permission type '{}'", other)),
        }
    }
}

/// 权限字典条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    /// 全局唯一编码
    pub code: String,
    pub permission_type: PermissionType,
    pub menu_id: Option<MenuId>,
    /// 按钮是 `MenuType::Button` 类型的菜单行
    pub button_id: Option<MenuId>,
    pub api_id: Option<ApiId>,
    /// 仅 API 类型: 产生该条目的菜单
    pub source_menu_id: Option<MenuId>,
    pub enabled: bool,
}

impl Permission {
    pub fn for_menu(code: impl Into<String>, name: impl Into<String>, menu_id: MenuId) -> Self {
        Self {
            id: PermissionId::default(),
            name: name.into(),
            code: code.into(),
            permission_type: PermissionType::Menu,
            menu_id: Some(menu_id),
            button_id: None,
            api_id: None,
            source_menu_id: None,
            enabled: true,
        }
    }

    pub fn for_button(code: impl Into<String>, name: impl Into<String>, button_id: MenuId) -> Self {
        Self {
            permission_type: PermissionType::Button,
            menu_id: None,
            button_id: Some(button_id),
            ..Self::for_menu(code, name, button_id)
        }
    }

    /// 菜单分配 API 时派生的条目，编码为 `{path}:{method}`
    pub fn for_api(api: &ApiEndpoint, source_menu_id: MenuId) -> Self {
        Self {
            id: PermissionId::default(),
            name: api.name.clone(),
            code: api.permission_code(),
            permission_type: PermissionType::Api,
            menu_id: None,
            button_id: None,
            api_id: Some(api.id),
            source_menu_id: Some(source_menu_id),
            enabled: api.enabled,
        }
    }

    /// 校验"恰好一个目标外键且与类型一致"
    pub fn validate_shape(&self) -> Result<(), String> {
        let menu = self.menu_id.is_some_and(|id| id.0 != 0);
        let button = self.button_id.is_some_and(|id| id.0 != 0);
        let api = self.api_id.is_some_and(|id| id.0 != 0);

        let targets = [menu, button, api].iter().filter(|set| **set).count();
        if targets != 1 {
            return Err(format!(
                "permission '{}' must reference exactly one target, found {}",
                self.code, targets
            ));
        }

        let matches = match self.permission_type {
            PermissionType::Menu => menu,
            PermissionType::Button => button,
            PermissionType::Api => api,
        };
        if !matches {
            return Err(format!(
                "permission '{}' of type {} references the wrong target",
                self.code, self.permission_type
            ));
        }

        if self.source_menu_id.is_some() && self.permission_type != PermissionType::Api {
            return Err(format!(
                "permission '{}' of type {} cannot carry a source menu",
                self.code, self.permission_type
            ));
        }

        if self.code.trim().is_empty() {
            return Err("permission code must not be empty".to_string());
        }

        Ok(())
    }

    /// 是否与菜单相关（目标或来源）
    pub fn touches_menu(&self, menu_id: MenuId) -> bool {
        self.menu_id == Some(menu_id)
            || self.button_id == Some(menu_id)
            || self.source_menu_id == Some(menu_id)
    }
}
