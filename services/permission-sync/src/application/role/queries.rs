//! 角色相关查询定义

use crate::domain::role::RoleId;

/// 获取角色详情查询
#[derive(Debug, Clone)]
pub struct GetRoleQuery {
    pub role_id: RoleId,
}

/// 列出全部角色查询
#[derive(Debug, Clone, Default)]
pub struct ListRolesQuery;

/// 角色已分配菜单查询
#[derive(Debug, Clone)]
pub struct GetRoleMenuIdsQuery {
    pub role_id: RoleId,
}

/// 角色在策略存储中的规则查询
#[derive(Debug, Clone)]
pub struct GetRolePoliciesQuery {
    pub role_id: RoleId,
}
