//! 角色查询处理器

use std::sync::Arc;

use super::queries::*;
use crate::application::stores::Stores;
use crate::domain::menu::MenuId;
use crate::domain::policy::{PolicyRule, PolicyStore};
use crate::domain::role::Role;
use crate::error::{SyncError, SyncResult};

/// 角色查询处理器
pub struct RoleQueryHandler {
    stores: Stores,
    policy: Arc<dyn PolicyStore>,
}

impl RoleQueryHandler {
    pub fn new(stores: Stores, policy: Arc<dyn PolicyStore>) -> Self {
        Self { stores, policy }
    }

    /// 获取角色详情
    pub async fn handle_get(&self, query: GetRoleQuery) -> SyncResult<Role> {
        self.stores
            .roles
            .find_by_id(query.role_id)
            .await?
            .ok_or_else(|| SyncError::not_found("role", query.role_id))
    }

    /// 列出全部角色（按 sort、id 排序）
    pub async fn handle_list(&self, _query: ListRolesQuery) -> SyncResult<Vec<Role>> {
        let mut roles = self.stores.roles.list_all().await?;
        roles.sort_by(|a, b| a.sort.cmp(&b.sort).then(a.id.cmp(&b.id)));
        Ok(roles)
    }

    pub async fn handle_menu_ids(&self, query: GetRoleMenuIdsQuery) -> SyncResult<Vec<MenuId>> {
        let role = self.handle_get(GetRoleQuery { role_id: query.role_id }).await?;
        let mut ids = self.stores.role_menus.list_menu_ids(role.id).await?;
        ids.sort();
        Ok(ids)
    }

    /// 策略存储中以角色编码为主体的规则
    pub async fn handle_policies(&self, query: GetRolePoliciesQuery) -> SyncResult<Vec<PolicyRule>> {
        let role = self.handle_get(GetRoleQuery { role_id: query.role_id }).await?;
        let mut rules = self.policy.get_filtered_policy(0, vec![role.code]).await?;
        rules.sort();
        Ok(rules)
    }
}
