//! 权限字典命令处理器
//!
//! 只处理菜单和按钮类型的条目；API 类型条目由菜单分配 API 时派生维护。

use tracing::info;

use super::commands::*;
use crate::application::stores::Stores;
use crate::domain::menu::MenuType;
use crate::domain::permission::{Permission, PermissionId, PermissionType};
use crate::error::{SyncError, SyncResult};

/// 权限字典命令处理器
pub struct PermissionCommandHandler {
    stores: Stores,
}

impl PermissionCommandHandler {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// 创建权限条目
    pub async fn handle_create(&self, cmd: CreatePermissionCommand) -> SyncResult<Permission> {
        let mut permission = cmd.fields.into_permission();
        self.check_writable(&permission).await?;

        if self.stores.permissions.find_by_code(&permission.code).await?.is_some() {
            return Err(SyncError::DuplicateCode(permission.code));
        }

        permission.id = self.stores.permissions.create(&permission).await?;

        info!(permission_id = %permission.id, code = %permission.code, "Permission created");
        Ok(permission)
    }

    /// 更新权限条目
    pub async fn handle_update(&self, cmd: UpdatePermissionCommand) -> SyncResult<Permission> {
        let mut permission = self.load_public(cmd.permission_id).await?;
        cmd.fields.apply_to(&mut permission);
        self.check_writable(&permission).await?;

        if let Some(holder) = self.stores.permissions.find_by_code(&permission.code).await?
            && holder.id != permission.id
        {
            return Err(SyncError::DuplicateCode(permission.code));
        }

        self.stores.permissions.update(&permission).await?;

        info!(permission_id = %permission.id, code = %permission.code, "Permission updated");
        Ok(permission)
    }

    /// 删除权限条目
    pub async fn handle_delete(&self, cmd: DeletePermissionCommand) -> SyncResult<()> {
        let permission = self.load_public(cmd.permission_id).await?;
        self.stores.permissions.delete(permission.id).await?;

        info!(permission_id = %permission.id, code = %permission.code, "Permission deleted");
        Ok(())
    }

    async fn load_public(&self, id: PermissionId) -> SyncResult<Permission> {
        let permission = self
            .stores
            .permissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| SyncError::not_found("permission", id))?;

        if permission.permission_type == PermissionType::Api {
            return Err(SyncError::InvalidPermissionShape(format!(
                "permission '{}' is derived from menu API assignments",
                permission.code
            )));
        }
        Ok(permission)
    }

    /// 形状校验 + 目标存在性校验
    async fn check_writable(&self, permission: &Permission) -> SyncResult<()> {
        permission
            .validate_shape()
            .map_err(SyncError::InvalidPermissionShape)?;

        match permission.permission_type {
            PermissionType::Api => Err(SyncError::InvalidPermissionShape(
                "API permissions can only be created by assigning APIs to a menu".to_string(),
            )),
            PermissionType::Menu => {
                let Some(menu_id) = permission.menu_id else {
                    return Err(SyncError::InvalidPermissionShape("missing menu".to_string()));
                };
                self.stores
                    .menus
                    .find_by_id(menu_id)
                    .await?
                    .ok_or_else(|| SyncError::not_found("menu", menu_id))?;
                Ok(())
            }
            PermissionType::Button => {
                let Some(button_id) = permission.button_id else {
                    return Err(SyncError::InvalidPermissionShape("missing button".to_string()));
                };
                let button = self
                    .stores
                    .menus
                    .find_by_id(button_id)
                    .await?
                    .ok_or_else(|| SyncError::not_found("button", button_id))?;
                if button.menu_type != MenuType::Button {
                    return Err(SyncError::InvalidPermissionShape(format!(
                        "menu {} is a {}, not a button",
                        button.id, button.menu_type
                    )));
                }
                Ok(())
            }
        }
    }
}
