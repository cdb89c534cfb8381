//! 持久化层模块
//!
//! 表: `menus`, `apis`, `permissions`, `roles`, `menu_apis`, `role_menus`,
//! `user_roles`, `casbin_rule`。外键列使用 0 表示未设置。

pub mod api_repository;
pub mod casbin_rule_repository;
pub mod error_mapper;
pub mod menu_repository;
pub mod permission_repository;
pub mod role_repository;
pub mod user_role_repository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::application::Stores;

pub use api_repository::PostgresApiRepository;
pub use casbin_rule_repository::PostgresCasbinRuleRepository;
pub use menu_repository::{PostgresMenuApiRepository, PostgresMenuRepository};
pub use permission_repository::PostgresPermissionRepository;
pub use role_repository::{PostgresRoleMenuRepository, PostgresRoleRepository};
pub use user_role_repository::PostgresUserRoleRepository;

/// 用同一个连接池组装全部仓储
pub fn postgres_stores(pool: &PgPool) -> Stores {
    Stores {
        menus: Arc::new(PostgresMenuRepository::new(pool.clone())),
        menu_apis: Arc::new(PostgresMenuApiRepository::new(pool.clone())),
        apis: Arc::new(PostgresApiRepository::new(pool.clone())),
        permissions: Arc::new(PostgresPermissionRepository::new(pool.clone())),
        roles: Arc::new(PostgresRoleRepository::new(pool.clone())),
        role_menus: Arc::new(PostgresRoleMenuRepository::new(pool.clone())),
        user_roles: Arc::new(PostgresUserRoleRepository::new(pool.clone())),
    }
}
