//! 菜单查询处理器

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::queries::*;
use crate::application::stores::Stores;
use crate::domain::api::ApiId;
use crate::domain::menu::{Menu, MenuTreeNode, build_tree};
use crate::domain::policy::PolicyStore;
use crate::domain::role::RoleId;
use crate::error::{SyncError, SyncResult};

/// 菜单查询处理器
pub struct MenuQueryHandler {
    stores: Stores,
    policy: Arc<dyn PolicyStore>,
}

impl MenuQueryHandler {
    pub fn new(stores: Stores, policy: Arc<dyn PolicyStore>) -> Self {
        Self { stores, policy }
    }

    /// 获取菜单详情
    pub async fn handle_get(&self, query: GetMenuQuery) -> SyncResult<Menu> {
        self.stores
            .menus
            .find_by_id(query.menu_id)
            .await?
            .ok_or_else(|| SyncError::not_found("menu", query.menu_id))
    }

    /// 管理端菜单树
    pub async fn handle_tree(&self, query: GetMenuTreeQuery) -> SyncResult<Vec<MenuTreeNode>> {
        let mut menus = self.stores.menus.list_all().await?;
        if query.enabled_only {
            menus.retain(|m| m.enabled);
        }
        Ok(build_tree(menus))
    }

    pub async fn handle_api_ids(&self, query: GetMenuApiIdsQuery) -> SyncResult<Vec<ApiId>> {
        self.handle_get(GetMenuQuery {
            menu_id: query.menu_id,
        })
        .await?;
        Ok(self.stores.menu_apis.list_api_ids(query.menu_id).await?)
    }

    /// 用户可见菜单树，没有角色的用户返回空森林
    pub async fn handle_user_tree(&self, query: GetUserMenuTreeQuery) -> SyncResult<Vec<MenuTreeNode>> {
        let menus = self.user_menus(&query.user_id).await?;
        Ok(build_tree(menus))
    }

    /// 用户可见菜单上的前端权限标识（去重、排序）
    ///
    /// 只用于前端决定渲染哪些操作入口，真正的授权判定始终走策略存储。
    pub async fn handle_user_perms(&self, query: GetUserMenuPermsQuery) -> SyncResult<Vec<String>> {
        let perms: BTreeSet<String> = self
            .user_menus(&query.user_id)
            .await?
            .into_iter()
            .filter(Menu::has_perms)
            .map(|m| m.perms.trim().to_string())
            .collect();
        Ok(perms.into_iter().collect())
    }

    /// 用户角色（策略存储）→ 角色菜单 → 去重 → 只保留启用的菜单
    async fn user_menus(&self, user_id: &str) -> SyncResult<Vec<Menu>> {
        let codes = self.policy.get_roles_for_user(user_id).await?;
        if codes.is_empty() {
            debug!(user_id = %user_id, "User has no roles");
            return Ok(Vec::new());
        }

        let role_ids: Vec<RoleId> = self
            .stores
            .roles
            .find_by_codes(&codes)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let menu_ids = self.stores.role_menus.list_menu_ids_for_roles(&role_ids).await?;
        if menu_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut menus = self.stores.menus.find_by_ids(&menu_ids).await?;
        menus.retain(|m| m.enabled);
        Ok(menus)
    }
}
