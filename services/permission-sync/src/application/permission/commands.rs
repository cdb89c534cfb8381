//! 权限字典命令定义
//!
//! 外键字段沿用存储层约定: 0 表示未设置。

use crate::domain::api::ApiId;
use crate::domain::menu::MenuId;
use crate::domain::permission::{Permission, PermissionId, PermissionType};

/// 权限条目可编辑字段
#[derive(Debug, Clone)]
pub struct PermissionFields {
    pub name: String,
    pub code: String,
    pub permission_type: PermissionType,
    pub menu_id: i64,
    pub button_id: i64,
    pub api_id: i64,
    pub enabled: bool,
}

impl PermissionFields {
    pub fn menu(code: impl Into<String>, name: impl Into<String>, menu_id: MenuId) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            permission_type: PermissionType::Menu,
            menu_id: menu_id.0,
            button_id: 0,
            api_id: 0,
            enabled: true,
        }
    }

    pub fn button(code: impl Into<String>, name: impl Into<String>, button_id: MenuId) -> Self {
        Self {
            permission_type: PermissionType::Button,
            menu_id: 0,
            button_id: button_id.0,
            ..Self::menu(code, name, button_id)
        }
    }

    pub fn apply_to(self, permission: &mut Permission) {
        permission.name = self.name;
        permission.code = self.code.trim().to_string();
        permission.permission_type = self.permission_type;
        permission.menu_id = MenuId::from_raw(self.menu_id);
        permission.button_id = MenuId::from_raw(self.button_id);
        permission.api_id = ApiId::from_raw(self.api_id);
        permission.source_menu_id = None;
        permission.enabled = self.enabled;
    }

    pub fn into_permission(self) -> Permission {
        let mut permission = Permission::for_menu(String::new(), String::new(), MenuId::default());
        self.apply_to(&mut permission);
        permission
    }
}

/// 创建权限条目命令
#[derive(Debug, Clone)]
pub struct CreatePermissionCommand {
    pub fields: PermissionFields,
}

/// 更新权限条目命令
#[derive(Debug, Clone)]
pub struct UpdatePermissionCommand {
    pub permission_id: PermissionId,
    pub fields: PermissionFields,
}

/// 删除权限条目命令
#[derive(Debug, Clone)]
pub struct DeletePermissionCommand {
    pub permission_id: PermissionId,
}
