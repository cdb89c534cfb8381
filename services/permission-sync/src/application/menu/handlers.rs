//! 菜单命令处理器

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use rbac_errors::AppError;
use tracing::{info, warn};

use super::commands::*;
use crate::application::locks::SyncLocks;
use crate::application::permission::derived::{detach_api_permission, upsert_api_permission};
use crate::application::propagation::{PolicyPropagator, PropagationReport};
use crate::application::stores::Stores;
use crate::domain::api::{ApiEndpoint, ApiId};
use crate::domain::menu::{Menu, MenuId, creates_cycle};
use crate::domain::permission::PermissionType;
use crate::domain::policy::PolicyRule;
use crate::domain::role::Role;
use crate::error::{SyncError, SyncResult};

/// 菜单命令处理器
pub struct MenuCommandHandler {
    stores: Stores,
    propagator: PolicyPropagator,
    locks: Arc<SyncLocks>,
    prune_on_reassign: bool,
}

impl MenuCommandHandler {
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

    /// 创建菜单
    pub async fn handle_create(&self, cmd: CreateMenuCommand) -> SyncResult<Menu> {
        cmd.fields.validate().map_err(SyncError::Validation)?;

        let _hierarchy = self.locks.hierarchy().await;
        if let Some(parent_id) = cmd.fields.parent_id.and_then(|p| MenuId::from_raw(p.0)) {
            self.require_parent(parent_id).await?;
        }

        let mut menu = cmd.fields.into_menu();
        menu.id = self.stores.menus.create(&menu).await?;

        info!(menu_id = %menu.id, name = %menu.name, "Menu created");
        Ok(menu)
    }

    /// 更新菜单，改挂父节点时拒绝自引用和成环
    ///
    /// 环检测读取的父子快照在层级锁内一直有效，直到写入完成。
    pub async fn handle_update(&self, cmd: UpdateMenuCommand) -> SyncResult<Menu> {
        cmd.fields.validate().map_err(SyncError::Validation)?;

        let _shared = self.locks.shared().await;
        let _hierarchy = self.locks.hierarchy().await;
        let _guard = self.locks.menus.lock(cmd.menu_id).await;

        let mut menu = self.load_menu(cmd.menu_id).await?;
        let new_parent = cmd.fields.parent_id.and_then(|p| MenuId::from_raw(p.0));

        if let Some(parent_id) = new_parent
            && new_parent != menu.parent_id
        {
            if parent_id == menu.id {
                return Err(SyncError::InvalidMenuHierarchy(format!(
                    "menu {} cannot be its own parent",
                    menu.id
                )));
            }
            self.require_parent(parent_id).await?;

            let parents: HashMap<MenuId, Option<MenuId>> = self
                .stores
                .menus
                .list_all()
                .await?
                .into_iter()
                .map(|m| (m.id, m.parent_id))
                .collect();
            if creates_cycle(&parents, menu.id, parent_id) {
                return Err(SyncError::InvalidMenuHierarchy(format!(
                    "moving menu {} under {} would create a cycle",
                    menu.id, parent_id
                )));
            }
        }

        cmd.fields.apply_to(&mut menu);
        self.stores.menus.update(&menu).await.map_err(|e| match e {
            // 存储层在事务内复核出的环
            AppError::FailedPrecondition(msg) => SyncError::InvalidMenuHierarchy(msg),
            other => other.into(),
        })?;

        info!(menu_id = %menu.id, "Menu updated");
        Ok(menu)
    }

    /// 删除菜单
    ///
    /// 有子节点时拒绝。否则级联删除角色关联、API 关联和相关权限条目，
    /// 最后撤回持有该菜单的角色已不再隐含的规则。
    pub async fn handle_delete(&self, cmd: DeleteMenuCommand) -> SyncResult<PropagationReport> {
        let _shared = self.locks.shared().await;
        let _hierarchy = self.locks.hierarchy().await;
        let _guard = self.locks.menus.lock(cmd.menu_id).await;

        let menu = self.load_menu(cmd.menu_id).await?;

        let children = self.stores.menus.count_children(menu.id).await?;
        if children > 0 {
            return Err(SyncError::MenuHasChildren(menu.id.to_string()));
        }

        let holders = self.holding_roles(menu.id).await?;
        let apis = self.propagator.apis_for_menus(&[menu.id]).await?;

        self.stores.role_menus.delete_by_menu(menu.id).await?;
        self.stores.menu_apis.delete_by_menu(menu.id).await?;

        for permission in self.stores.permissions.list_by_menu(menu.id).await? {
            match (permission.permission_type, permission.api_id) {
                (PermissionType::Api, Some(api_id)) => {
                    detach_api_permission(&self.stores, api_id, menu.id).await?
                }
                _ => self.stores.permissions.delete(permission.id).await?,
            }
        }

        self.stores.menus.delete(menu.id).await?;

        let mut report = PropagationReport::default();
        for role in &holders {
            let candidates = rules_for(role, &apis);
            report.merge(self.propagator.retract_unimplied(role, candidates).await?);
        }

        info!(
            menu_id = %menu.id,
            roles = holders.len(),
            rules_removed = report.changed,
            "Menu deleted"
        );
        report.into_result()
    }

    /// 为菜单分配 API（整体替换）
    ///
    /// 不存在的 API 记录告警后跳过；为每个 API 维护派生权限条目；
    /// 随后向所有已持有该菜单的角色补齐策略规则。
    pub async fn handle_assign_apis(&self, cmd: AssignApisToMenuCommand) -> SyncResult<PropagationReport> {
        let _shared = self.locks.shared().await;
        let _guard = self.locks.menus.lock(cmd.menu_id).await;

        let menu = self.load_menu(cmd.menu_id).await?;
        let apis = self.resolve_apis(menu.id, &cmd.api_ids).await?;
        let api_ids: Vec<ApiId> = apis.iter().map(|a| a.id).collect();

        let previous = self.stores.menu_apis.list_api_ids(menu.id).await?;
        self.stores.menu_apis.replace_for_menu(menu.id, &api_ids).await?;

        for api in &apis {
            upsert_api_permission(&self.stores, api, menu.id).await?;
        }

        let kept: HashSet<ApiId> = api_ids.iter().copied().collect();
        let dropped: Vec<ApiId> = previous.into_iter().filter(|id| !kept.contains(id)).collect();
        for &api_id in &dropped {
            detach_api_permission(&self.stores, api_id, menu.id).await?;
        }

        let holders = self.holding_roles(menu.id).await?;
        let mut report = PropagationReport::default();
        for role in &holders {
            report.merge(self.propagator.grant(rules_for(role, &apis)).await);
        }

        if self.prune_on_reassign && !dropped.is_empty() {
            let dropped_apis = self.stores.apis.find_by_ids(&dropped).await?;
            for role in &holders {
                let candidates = rules_for(role, &dropped_apis);
                report.merge(self.propagator.retract_unimplied(role, candidates).await?);
            }
        }

        info!(
            menu_id = %menu.id,
            apis = apis.len(),
            roles = holders.len(),
            rules_added = report.changed,
            "APIs assigned to menu"
        );
        report.into_result()
    }

    async fn load_menu(&self, id: MenuId) -> SyncResult<Menu> {
        self.stores
            .menus
            .find_by_id(id)
            .await?
            .ok_or_else(|| SyncError::not_found("menu", id))
    }

    async fn require_parent(&self, parent_id: MenuId) -> SyncResult<()> {
        match self.stores.menus.find_by_id(parent_id).await? {
            Some(_) => Ok(()),
            None => Err(SyncError::InvalidMenuHierarchy(format!(
                "parent menu {} does not exist",
                parent_id
            ))),
        }
    }

    /// 按请求顺序解析 API，去重并跳过不存在的 ID
    async fn resolve_apis(&self, menu_id: MenuId, requested: &[ApiId]) -> SyncResult<Vec<ApiEndpoint>> {
        let mut seen = HashSet::new();
        let unique: Vec<ApiId> = requested.iter().copied().filter(|id| seen.insert(*id)).collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: HashMap<ApiId, ApiEndpoint> = self
            .stores
            .apis
            .find_by_ids(&unique)
            .await?
            .into_iter()
            .map(|api| (api.id, api))
            .collect();

        let mut apis = Vec::with_capacity(unique.len());
        for id in unique {
            match found.remove(&id) {
                Some(api) => apis.push(api),
                None => warn!(menu_id = %menu_id, api_id = %id, "API not found, skipping"),
            }
        }
        Ok(apis)
    }

    async fn holding_roles(&self, menu_id: MenuId) -> SyncResult<Vec<Role>> {
        let role_ids = self.stores.role_menus.list_role_ids_for_menu(menu_id).await?;
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.stores.roles.find_by_ids(&role_ids).await?)
    }
}

fn rules_for(role: &Role, apis: &[ApiEndpoint]) -> BTreeSet<PolicyRule> {
    apis.iter().map(|api| api.policy_rule(&role.code)).collect()
}
