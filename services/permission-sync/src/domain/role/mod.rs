//! 角色领域模块

#![allow(clippy::module_inception)]

pub mod repository;
pub mod role;

pub use repository::{RoleMenuRepository, RoleRepository, UserRoleRepository};
pub use role::{Role, RoleId, validate_role_code};
