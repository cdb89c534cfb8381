//! 仓储集合

use std::sync::Arc;

use crate::domain::api::ApiRepository;
use crate::domain::menu::{MenuApiRepository, MenuRepository};
use crate::domain::permission::PermissionRepository;
use crate::domain::role::{RoleMenuRepository, RoleRepository, UserRoleRepository};

/// 引擎依赖的全部关系型仓储
///
/// 克隆只增加引用计数，各处理器各持一份。
#[derive(Clone)]
pub struct Stores {
    pub menus: Arc<dyn MenuRepository>,
    pub menu_apis: Arc<dyn MenuApiRepository>,
    pub apis: Arc<dyn ApiRepository>,
    pub permissions: Arc<dyn PermissionRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub role_menus: Arc<dyn RoleMenuRepository>,
    pub user_roles: Arc<dyn UserRoleRepository>,
}
