//! 菜单仓储接口

use async_trait::async_trait;
use rbac_errors::AppResult;

use super::menu::{Menu, MenuId};
use crate::domain::api::ApiId;

/// 菜单仓储接口
#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// 创建菜单，返回分配的 ID
    async fn create(&self, menu: &Menu) -> AppResult<MenuId>;

    async fn update(&self, menu: &Menu) -> AppResult<()>;

    async fn delete(&self, id: MenuId) -> AppResult<()>;

    async fn find_by_id(&self, id: MenuId) -> AppResult<Option<Menu>>;

    /// 批量查找，忽略不存在的 ID
    async fn find_by_ids(&self, ids: &[MenuId]) -> AppResult<Vec<Menu>>;

    async fn list_all(&self) -> AppResult<Vec<Menu>>;

    /// 直接子节点数量
    async fn count_children(&self, id: MenuId) -> AppResult<u64>;
}

/// 菜单-API 关联仓储接口
#[async_trait]
pub trait MenuApiRepository: Send + Sync {
    /// 整体替换菜单关联的 API（同一事务内先删后插）
    async fn replace_for_menu(&self, menu_id: MenuId, api_ids: &[ApiId]) -> AppResult<()>;

    async fn list_api_ids(&self, menu_id: MenuId) -> AppResult<Vec<ApiId>>;

    async fn list_menu_ids_for_api(&self, api_id: ApiId) -> AppResult<Vec<MenuId>>;

    async fn delete_by_menu(&self, menu_id: MenuId) -> AppResult<()>;

    async fn delete_by_api(&self, api_id: ApiId) -> AppResult<()>;
}
