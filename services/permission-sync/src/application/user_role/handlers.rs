//! 用户-角色分组命令处理器
//!
//! 策略存储中的分组规则是授权的唯一依据，关系表 `user_roles` 只是镜像。

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use super::commands::*;
use crate::application::locks::SyncLocks;
use crate::application::stores::Stores;
use crate::domain::policy::{GroupingRule, PolicyStore};
use crate::domain::role::RoleId;
use crate::error::{SyncError, SyncResult};

pub struct UserRoleCommandHandler {
    stores: Stores,
    policy: Arc<dyn PolicyStore>,
    locks: Arc<SyncLocks>,
}

impl UserRoleCommandHandler {
    pub fn new(stores: Stores, policy: Arc<dyn PolicyStore>, locks: Arc<SyncLocks>) -> Self {
        Self {
            stores,
            policy,
            locks,
        }
    }

    /// 整体替换用户的角色: 先写策略存储，再写镜像表
    ///
    /// 目标角色在写分组期间保持加锁，与删除角色的"检查引用 → 删除分组"互斥。
    pub async fn handle_assign(&self, cmd: AssignRolesToUserCommand) -> SyncResult<()> {
        cmd.validate().map_err(SyncError::Validation)?;

        let wanted: BTreeSet<String> = cmd.role_codes.iter().map(|c| c.trim().to_string()).collect();
        let codes: Vec<String> = wanted.iter().cloned().collect();

        let _shared = self.locks.shared().await;
        let ids = self.resolve_roles(&wanted, &codes).await?;
        let _roles = self.locks.lock_roles(ids).await;
        // 加锁前角色可能已被删除
        self.resolve_roles(&wanted, &codes).await?;
        let _guard = self.locks.users.lock(cmd.user_id.clone()).await;

        let current: BTreeSet<String> = self
            .policy
            .get_roles_for_user(&cmd.user_id)
            .await?
            .into_iter()
            .collect();

        for code in current.difference(&wanted) {
            self.policy
                .remove_grouping_policy(&GroupingRule::new(&cmd.user_id, code))
                .await?;
        }
        for code in wanted.difference(&current) {
            self.policy
                .add_grouping_policy(&GroupingRule::new(&cmd.user_id, code))
                .await?;
        }

        self.stores.user_roles.replace_for_user(&cmd.user_id, &codes).await?;

        info!(user_id = %cmd.user_id, roles = codes.len(), "Roles assigned to user");
        Ok(())
    }

    async fn resolve_roles(&self, wanted: &BTreeSet<String>, codes: &[String]) -> SyncResult<Vec<RoleId>> {
        let roles = self.stores.roles.find_by_codes(codes).await?;
        let known: BTreeSet<&str> = roles.iter().map(|r| r.code.as_str()).collect();
        if let Some(missing) = wanted.iter().find(|c| !known.contains(c.as_str())) {
            return Err(SyncError::not_found("role", missing));
        }
        Ok(roles.into_iter().map(|r| r.id).collect())
    }

    /// 从策略存储重建镜像表，只保留指向已知角色的分组；返回写入的条数
    pub async fn handle_rebuild_mirror(&self) -> SyncResult<usize> {
        let roles: BTreeSet<String> = self
            .stores
            .roles
            .list_all()
            .await?
            .into_iter()
            .map(|r| r.code)
            .collect();

        let groupings: Vec<GroupingRule> = self
            .policy
            .get_grouping_policy()
            .await?
            .into_iter()
            .filter(|g| roles.contains(&g.role) && !roles.contains(&g.user))
            .collect();

        self.stores.user_roles.replace_all(&groupings).await?;

        info!(groupings = groupings.len(), "User role mirror rebuilt");
        Ok(groupings.len())
    }
}
