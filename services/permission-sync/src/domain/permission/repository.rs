//! 权限字典仓储接口

use async_trait::async_trait;
use rbac_common::Pagination;
use rbac_errors::AppResult;

use super::permission::{Permission, PermissionId};
use crate::domain::api::ApiId;
use crate::domain::menu::MenuId;

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// 创建条目，编码冲突返回 `AppError::Conflict`
    async fn create(&self, permission: &Permission) -> AppResult<PermissionId>;

    async fn update(&self, permission: &Permission) -> AppResult<()>;

    /// 按编码插入或更新（API 派生条目使用）
    async fn upsert_by_code(&self, permission: &Permission) -> AppResult<PermissionId>;

    async fn delete(&self, id: PermissionId) -> AppResult<()>;

    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>>;

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Permission>>;

    async fn find_by_api(&self, api_id: ApiId) -> AppResult<Option<Permission>>;

    /// 目标或来源为该菜单的所有条目
    async fn list_by_menu(&self, menu_id: MenuId) -> AppResult<Vec<Permission>>;

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<Permission>, u64)>;

    async fn delete_by_api(&self, api_id: ApiId) -> AppResult<()>;
}
