//! 权限字典查询处理器

use rbac_common::{PagedResult, Pagination};

use super::queries::*;
use crate::application::stores::Stores;
use crate::domain::permission::Permission;
use crate::error::{SyncError, SyncResult};

pub struct PermissionQueryHandler {
    stores: Stores,
}

impl PermissionQueryHandler {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn handle_get(&self, query: GetPermissionQuery) -> SyncResult<Permission> {
        self.stores
            .permissions
            .find_by_id(query.permission_id)
            .await?
            .ok_or_else(|| SyncError::not_found("permission", query.permission_id))
    }

    pub async fn handle_get_by_code(&self, query: GetPermissionByCodeQuery) -> SyncResult<Permission> {
        self.stores
            .permissions
            .find_by_code(&query.code)
            .await?
            .ok_or_else(|| SyncError::not_found("permission", &query.code))
    }

    pub async fn handle_list(&self, query: ListPermissionsQuery) -> SyncResult<PagedResult<Permission>> {
        let pagination = Pagination::new(query.page, query.page_size);
        let (items, total) = self.stores.permissions.list(&pagination).await?;
        Ok(PagedResult::new(items, total, &pagination))
    }
}
