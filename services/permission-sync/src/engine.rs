//! 同步引擎门面
//!
//! 把各处理器组装在一起，对外暴露管理端会调用的全部操作。
//! 策略存储以 `Arc<dyn PolicyStore>` 注入，测试可替换为内存实现。

use std::sync::Arc;

use rbac_common::PagedResult;
use rbac_config::SyncConfig;

use crate::application::api::*;
use crate::application::menu::*;
use crate::application::permission::*;
use crate::application::role::*;
use crate::application::user_role::*;
use crate::application::{
    PolicyPropagator, PropagationReport, ResyncHandler, Stores, SyncLocks, SyncOptions, SyncReport,
};
use crate::domain::api::{ApiEndpoint, ApiId};
use crate::domain::menu::{Menu, MenuId, MenuTreeNode};
use crate::domain::permission::{Permission, PermissionId};
use crate::domain::policy::{PolicyRule, PolicyStore};
use crate::domain::role::{Role, RoleId};
use crate::error::SyncResult;

/// 引擎行为开关
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// 重新分配菜单 / API 时立即撤回不再隐含的规则
    pub prune_on_reassign: bool,
}

impl From<&SyncConfig> for EngineOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            prune_on_reassign: config.prune_on_reassign,
        }
    }
}

/// 权限同步引擎
pub struct PermissionSyncEngine {
    options: EngineOptions,
    menus: MenuCommandHandler,
    menu_queries: MenuQueryHandler,
    apis: ApiCommandHandler,
    api_queries: ApiQueryHandler,
    permissions: PermissionCommandHandler,
    permission_queries: PermissionQueryHandler,
    roles: RoleCommandHandler,
    role_queries: RoleQueryHandler,
    user_roles: UserRoleCommandHandler,
    user_role_queries: UserRoleQueryHandler,
    resync: ResyncHandler,
}

impl PermissionSyncEngine {
    pub fn new(stores: Stores, policy: Arc<dyn PolicyStore>, options: EngineOptions) -> Self {
        let locks = Arc::new(SyncLocks::new());
        let propagator = PolicyPropagator::new(stores.clone(), policy.clone());

        Self {
            options,
            menus: MenuCommandHandler::new(
                stores.clone(),
                propagator.clone(),
                locks.clone(),
                options.prune_on_reassign,
            ),
            menu_queries: MenuQueryHandler::new(stores.clone(), policy.clone()),
            apis: ApiCommandHandler::new(stores.clone(), propagator.clone(), locks.clone()),
            api_queries: ApiQueryHandler::new(stores.clone()),
            permissions: PermissionCommandHandler::new(stores.clone()),
            permission_queries: PermissionQueryHandler::new(stores.clone()),
            roles: RoleCommandHandler::new(
                stores.clone(),
                propagator.clone(),
                locks.clone(),
                options.prune_on_reassign,
            ),
            role_queries: RoleQueryHandler::new(stores.clone(), policy.clone()),
            user_roles: UserRoleCommandHandler::new(stores.clone(), policy.clone(), locks.clone()),
            user_role_queries: UserRoleQueryHandler::new(policy),
            resync: ResyncHandler::new(stores, propagator, locks),
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    // ---- 菜单 ----

    pub async fn create_menu(&self, fields: MenuFields) -> SyncResult<Menu> {
        self.menus.handle_create(CreateMenuCommand { fields }).await
    }

    pub async fn update_menu(&self, menu_id: MenuId, fields: MenuFields) -> SyncResult<Menu> {
        self.menus.handle_update(UpdateMenuCommand { menu_id, fields }).await
    }

    pub async fn delete_menu(&self, menu_id: MenuId) -> SyncResult<PropagationReport> {
        self.menus.handle_delete(DeleteMenuCommand { menu_id }).await
    }

    pub async fn get_menu(&self, menu_id: MenuId) -> SyncResult<Menu> {
        self.menu_queries.handle_get(GetMenuQuery { menu_id }).await
    }

    /// 管理端完整菜单树
    pub async fn menu_tree(&self) -> SyncResult<Vec<MenuTreeNode>> {
        self.menu_queries.handle_tree(GetMenuTreeQuery::default()).await
    }

    pub async fn menu_api_ids(&self, menu_id: MenuId) -> SyncResult<Vec<ApiId>> {
        self.menu_queries.handle_api_ids(GetMenuApiIdsQuery { menu_id }).await
    }

    /// 为菜单分配 API（整体替换）
    pub async fn assign_apis_to_menu(&self, menu_id: MenuId, api_ids: Vec<ApiId>) -> SyncResult<PropagationReport> {
        self.menus
            .handle_assign_apis(AssignApisToMenuCommand { menu_id, api_ids })
            .await
    }

    // ---- API 目录 ----

    pub async fn create_api(&self, fields: ApiFields) -> SyncResult<ApiEndpoint> {
        self.apis.handle_create(CreateApiCommand { fields }).await
    }

    pub async fn update_api(&self, api_id: ApiId, fields: ApiFields) -> SyncResult<PropagationReport> {
        self.apis.handle_update(UpdateApiCommand { api_id, fields }).await
    }

    pub async fn delete_api(&self, api_id: ApiId) -> SyncResult<PropagationReport> {
        self.apis.handle_delete(DeleteApiCommand { api_id }).await
    }

    pub async fn get_api(&self, api_id: ApiId) -> SyncResult<ApiEndpoint> {
        self.api_queries.handle_get(GetApiQuery { api_id }).await
    }

    pub async fn list_apis(&self, page: u32, page_size: u32) -> SyncResult<PagedResult<ApiEndpoint>> {
        self.api_queries.handle_list(ListApisQuery { page, page_size }).await
    }

    // ---- 权限字典 ----

    pub async fn create_permission(&self, fields: PermissionFields) -> SyncResult<Permission> {
        self.permissions.handle_create(CreatePermissionCommand { fields }).await
    }

    pub async fn update_permission(
        &self,
        permission_id: PermissionId,
        fields: PermissionFields,
    ) -> SyncResult<Permission> {
        self.permissions
            .handle_update(UpdatePermissionCommand {
                permission_id,
                fields,
            })
            .await
    }

    pub async fn delete_permission(&self, permission_id: PermissionId) -> SyncResult<()> {
        self.permissions
            .handle_delete(DeletePermissionCommand { permission_id })
            .await
    }

    pub async fn get_permission(&self, permission_id: PermissionId) -> SyncResult<Permission> {
        self.permission_queries
            .handle_get(GetPermissionQuery { permission_id })
            .await
    }

    pub async fn get_permission_by_code(&self, code: &str) -> SyncResult<Permission> {
        self.permission_queries
            .handle_get_by_code(GetPermissionByCodeQuery {
                code: code.to_string(),
            })
            .await
    }

    pub async fn list_permissions(&self, page: u32, page_size: u32) -> SyncResult<PagedResult<Permission>> {
        self.permission_queries
            .handle_list(ListPermissionsQuery { page, page_size })
            .await
    }

    // ---- 角色 ----

    pub async fn create_role(&self, cmd: CreateRoleCommand) -> SyncResult<Role> {
        self.roles.handle_create(cmd).await
    }

    pub async fn update_role(&self, cmd: UpdateRoleCommand) -> SyncResult<Role> {
        self.roles.handle_update(cmd).await
    }

    /// 删除角色，仍有用户时返回 `RoleInUse`
    pub async fn delete_role(&self, role_id: RoleId) -> SyncResult<()> {
        self.roles.handle_delete(DeleteRoleCommand { role_id }).await
    }

    pub async fn get_role(&self, role_id: RoleId) -> SyncResult<Role> {
        self.role_queries.handle_get(GetRoleQuery { role_id }).await
    }

    pub async fn list_roles(&self) -> SyncResult<Vec<Role>> {
        self.role_queries.handle_list(ListRolesQuery).await
    }

    pub async fn role_menu_ids(&self, role_id: RoleId) -> SyncResult<Vec<MenuId>> {
        self.role_queries.handle_menu_ids(GetRoleMenuIdsQuery { role_id }).await
    }

    pub async fn role_policies(&self, role_id: RoleId) -> SyncResult<Vec<PolicyRule>> {
        self.role_queries.handle_policies(GetRolePoliciesQuery { role_id }).await
    }

    /// 为角色分配菜单（整体替换）
    pub async fn assign_menus_to_role(&self, role_id: RoleId, menu_ids: Vec<MenuId>) -> SyncResult<PropagationReport> {
        self.roles
            .handle_assign_menus(AssignMenusToRoleCommand { role_id, menu_ids })
            .await
    }

    // ---- 用户-角色 ----

    pub async fn assign_roles_to_user(&self, user_id: &str, role_codes: Vec<String>) -> SyncResult<()> {
        self.user_roles
            .handle_assign(AssignRolesToUserCommand {
                user_id: user_id.to_string(),
                role_codes,
            })
            .await
    }

    pub async fn user_roles(&self, user_id: &str) -> SyncResult<Vec<String>> {
        self.user_role_queries
            .handle_roles(GetUserRolesQuery {
                user_id: user_id.to_string(),
            })
            .await
    }

    /// 从策略存储重建用户-角色镜像表
    pub async fn rebuild_user_role_mirror(&self) -> SyncResult<usize> {
        self.user_roles.handle_rebuild_mirror().await
    }

    // ---- 同步与查询 ----

    /// 全量同步，只补齐缺失的规则，不删除任何规则
    pub async fn sync_menu_api_permissions(&self) -> SyncResult<SyncReport> {
        self.resync(SyncOptions::with_prune(false)).await?.into_result()
    }

    /// 全量同步并剪枝: 删除以角色为主体、不再被任何 RoleMenu × MenuAPI 推导出的规则
    pub async fn prune_stale_policies(&self) -> SyncResult<SyncReport> {
        self.resync(SyncOptions::with_prune(true)).await?.into_result()
    }

    /// 以指定选项全量同步，单条规则失败只计入报告
    pub async fn resync(&self, options: SyncOptions) -> SyncResult<SyncReport> {
        self.resync.handle(options).await
    }

    /// 用户可见菜单树
    pub async fn build_user_tree(&self, user_id: &str) -> SyncResult<Vec<MenuTreeNode>> {
        self.menu_queries
            .handle_user_tree(GetUserMenuTreeQuery {
                user_id: user_id.to_string(),
            })
            .await
    }

    /// 用户的前端权限标识
    pub async fn get_menu_perms_by_user_id(&self, user_id: &str) -> SyncResult<Vec<String>> {
        self.menu_queries
            .handle_user_perms(GetUserMenuPermsQuery {
                user_id: user_id.to_string(),
            })
            .await
    }

    /// 请求时授权判定
    pub async fn check_access(&self, user_id: &str, path: &str, method: &str) -> SyncResult<bool> {
        self.user_role_queries
            .handle_check_access(CheckAccessQuery {
                user_id: user_id.to_string(),
                path: path.to_string(),
                method: method.to_string(),
            })
            .await
    }
}
