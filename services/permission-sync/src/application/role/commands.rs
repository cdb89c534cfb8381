//! 角色相关命令定义

use crate::domain::menu::MenuId;
use crate::domain::role::{Role, RoleId, validate_role_code};

/// 创建角色命令
#[derive(Debug, Clone)]
pub struct CreateRoleCommand {
    pub code: String,
    pub name: String,
    pub enabled: bool,
    pub sort: i32,
}

impl CreateRoleCommand {
    /// 验证命令参数
    pub fn validate(&self) -> Result<(), String> {
        validate_role_code(&self.code)?;
        if self.code.len() > 100 {
            return Err("Role code cannot exceed 100 characters".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Role name cannot be empty".to_string());
        }
        if self.name.len() > 200 {
            return Err("Role name cannot exceed 200 characters".to_string());
        }
        Ok(())
    }

    /// 将命令转换为角色实体
    pub fn into_role(self) -> Role {
        let mut role = Role::new(self.code, self.name);
        role.enabled = self.enabled;
        role.sort = self.sort;
        role
    }
}

/// 更新角色命令（编码不可修改）
#[derive(Debug, Clone)]
pub struct UpdateRoleCommand {
    pub role_id: RoleId,
    pub name: String,
    pub enabled: bool,
    pub sort: i32,
}

/// 删除角色命令
#[derive(Debug, Clone)]
pub struct DeleteRoleCommand {
    pub role_id: RoleId,
}

/// 为角色分配菜单命令（整体替换）
#[derive(Debug, Clone)]
pub struct AssignMenusToRoleCommand {
    pub role_id: RoleId,
    pub menu_ids: Vec<MenuId>,
}
