//! 菜单相关查询定义

use crate::domain::menu::MenuId;

/// 获取菜单详情查询
#[derive(Debug, Clone)]
pub struct GetMenuQuery {
    pub menu_id: MenuId,
}

/// 管理端完整菜单树查询
#[derive(Debug, Clone, Default)]
pub struct GetMenuTreeQuery {
    /// 只保留启用的菜单
    pub enabled_only: bool,
}

/// 菜单关联的 API ID 查询
#[derive(Debug, Clone)]
pub struct GetMenuApiIdsQuery {
    pub menu_id: MenuId,
}

/// 用户可见菜单树查询
#[derive(Debug, Clone)]
pub struct GetUserMenuTreeQuery {
    pub user_id: String,
}

/// 用户前端权限标识查询
#[derive(Debug, Clone)]
pub struct GetUserMenuPermsQuery {
    pub user_id: String,
}
