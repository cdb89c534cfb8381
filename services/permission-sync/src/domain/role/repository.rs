//! 角色仓储接口

use async_trait::async_trait;
use rbac_errors::AppResult;

use super::role::{Role, RoleId};
use crate::domain::menu::MenuId;
use crate::domain::policy::GroupingRule;

/// 角色仓储接口
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// 创建角色，返回分配的 ID
    async fn create(&self, role: &Role) -> AppResult<RoleId>;

    /// 更新角色（不修改 code）
    async fn update(&self, role: &Role) -> AppResult<()>;

    async fn delete(&self, id: RoleId) -> AppResult<()>;

    async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>>;

    async fn find_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>>;

    /// 按编码批量查找，忽略不存在的编码
    async fn find_by_codes(&self, codes: &[String]) -> AppResult<Vec<Role>>;

    async fn exists_by_code(&self, code: &str) -> AppResult<bool>;

    async fn list_all(&self) -> AppResult<Vec<Role>>;
}

/// 角色-菜单关联仓储接口
#[async_trait]
pub trait RoleMenuRepository: Send + Sync {
    /// 整体替换角色的菜单（同一事务内先删后插）
    async fn replace_for_role(&self, role_id: RoleId, menu_ids: &[MenuId]) -> AppResult<()>;

    async fn list_menu_ids(&self, role_id: RoleId) -> AppResult<Vec<MenuId>>;

    /// 多个角色的菜单并集（已去重）
    async fn list_menu_ids_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<MenuId>>;

    async fn list_role_ids_for_menu(&self, menu_id: MenuId) -> AppResult<Vec<RoleId>>;

    async fn delete_by_role(&self, role_id: RoleId) -> AppResult<()>;

    async fn delete_by_menu(&self, menu_id: MenuId) -> AppResult<()>;
}

/// 用户-角色关联镜像仓储接口
///
/// 授权以策略存储中的分组规则为准，此表仅用于列表展示，可随时从策略存储重建。
#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    /// 整体替换用户的角色编码
    async fn replace_for_user(&self, user_id: &str, role_codes: &[String]) -> AppResult<()>;

    async fn list_role_codes(&self, user_id: &str) -> AppResult<Vec<String>>;

    async fn list_users_for_role(&self, role_code: &str) -> AppResult<Vec<String>>;

    /// 用给定的分组规则整体重建镜像表
    async fn replace_all(&self, groupings: &[GroupingRule]) -> AppResult<()>;
}
