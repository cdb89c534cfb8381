//! 角色命令处理器

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use super::commands::*;
use crate::application::locks::SyncLocks;
use crate::application::propagation::{PolicyPropagator, PropagationReport};
use crate::application::stores::Stores;
use crate::domain::menu::MenuId;
use crate::domain::role::{Role, RoleId};
use crate::error::{SyncError, SyncResult};

/// 角色命令处理器
pub struct RoleCommandHandler {
    stores: Stores,
    propagator: PolicyPropagator,
    locks: Arc<SyncLocks>,
    prune_on_reassign: bool,
}

impl RoleCommandHandler {
    pub fn new(
        stores: Stores,
        propagator: PolicyPropagator,
        locks: Arc<SyncLocks>,
        prune_on_reassign: bool,
    ) -> Self {
        Self {
            stores,
            propagator,
            locks,
            prune_on_reassign,
        }
    }

    /// 创建角色
    pub async fn handle_create(&self, cmd: CreateRoleCommand) -> SyncResult<Role> {
        cmd.validate().map_err(SyncError::Validation)?;

        // 检查代码是否已存在
        if self.stores.roles.exists_by_code(&cmd.code).await? {
            return Err(SyncError::DuplicateCode(cmd.code));
        }

        let mut role = cmd.into_role();
        role.id = self.stores.roles.create(&role).await?;

        info!(role_id = %role.id, role_code = %role.code, "Role created");
        Ok(role)
    }

    /// 更新角色
    pub async fn handle_update(&self, cmd: UpdateRoleCommand) -> SyncResult<Role> {
        if cmd.name.trim().is_empty() {
            return Err(SyncError::validation("Role name cannot be empty"));
        }

        let _guard = self.locks.roles.lock(cmd.role_id).await;
        let mut role = self.load_role(cmd.role_id).await?;

        role.update(cmd.name, cmd.sort);
        if cmd.enabled {
            role.activate();
        } else {
            role.deactivate();
        }
        self.stores.roles.update(&role).await?;

        info!(role_id = %role.id, role_code = %role.code, "Role updated");
        Ok(role)
    }

    /// 删除角色
    ///
    /// 1. 仍有用户分组引用该角色时拒绝
    /// 2. 删除角色-菜单关联
    /// 3. 删除策略存储中以该角色为主体的规则和以该角色为目标的分组规则
    /// 4. 删除角色记录
    ///
    /// 第 3 步失败时直接返回错误，角色记录保留以便重试。
    pub async fn handle_delete(&self, cmd: DeleteRoleCommand) -> SyncResult<()> {
        let _shared = self.locks.shared().await;
        let _guard = self.locks.roles.lock(cmd.role_id).await;

        let role = self.load_role(cmd.role_id).await?;

        let users = self.propagator.policy().get_users_for_role(&role.code).await?;
        if !users.is_empty() {
            return Err(SyncError::RoleInUse {
                code: role.code,
                users: users.len(),
            });
        }

        self.stores.role_menus.delete_by_role(role.id).await?;

        let policy = self.propagator.policy();
        policy
            .remove_filtered_policy(0, vec![role.code.clone()])
            .await
            .inspect_err(|e| warn!(role_code = %role.code, error = %e, "Failed to remove role policies"))?;
        policy
            .remove_filtered_grouping_policy(1, vec![role.code.clone()])
            .await
            .inspect_err(|e| warn!(role_code = %role.code, error = %e, "Failed to remove role groupings"))?;

        self.stores.roles.delete(role.id).await?;

        info!(role_id = %role.id, role_code = %role.code, "Role deleted");
        Ok(())
    }

    /// 为角色分配菜单（整体替换）
    ///
    /// 关系型写入在一个事务内完成；提交后再为新菜单集合关联的每个 API 添加规则。
    /// 默认不撤回已取消分配的菜单对应的规则，由全量同步的剪枝处理。
    pub async fn handle_assign_menus(&self, cmd: AssignMenusToRoleCommand) -> SyncResult<PropagationReport> {
        let _shared = self.locks.shared().await;
        let _guard = self.locks.roles.lock(cmd.role_id).await;

        let role = self.load_role(cmd.role_id).await?;
        let menu_ids = self.resolve_menus(&role, &cmd.menu_ids).await?;

        self.stores.role_menus.replace_for_role(role.id, &menu_ids).await?;

        let apis = self.propagator.apis_for_menus(&menu_ids).await?;
        let mut report = self
            .propagator
            .grant(apis.iter().map(|api| api.policy_rule(&role.code)))
            .await;

        if self.prune_on_reassign {
            report.merge(self.propagator.prune_role(&role).await?);
        }

        info!(
            role_id = %role.id,
            role_code = %role.code,
            menus = menu_ids.len(),
            rules_added = report.changed,
            "Menus assigned to role"
        );
        report.into_result()
    }

    async fn load_role(&self, id: RoleId) -> SyncResult<Role> {
        self.stores
            .roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| SyncError::not_found("role", id))
    }

    /// 去重并跳过不存在的菜单
    async fn resolve_menus(&self, role: &Role, requested: &[MenuId]) -> SyncResult<Vec<MenuId>> {
        let mut seen = HashSet::new();
        let unique: Vec<MenuId> = requested.iter().copied().filter(|id| seen.insert(*id)).collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let existing: HashSet<MenuId> = self
            .stores
            .menus
            .find_by_ids(&unique)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        Ok(unique
            .into_iter()
            .filter(|id| {
                let found = existing.contains(id);
                if !found {
                    warn!(role_code = %role.code, menu_id = %id, "Menu not found, skipping");
                }
                found
            })
            .collect())
    }
}
