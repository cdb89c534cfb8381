//! 权限字典查询定义

use crate::domain::permission::PermissionId;

#[derive(Debug, Clone)]
pub struct GetPermissionQuery {
    pub permission_id: PermissionId,
}

#[derive(Debug, Clone)]
pub struct GetPermissionByCodeQuery {
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ListPermissionsQuery {
    pub page: u32,
    pub page_size: u32,
}
