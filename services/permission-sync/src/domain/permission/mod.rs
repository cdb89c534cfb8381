//! 权限字典领域模块

#![allow(clippy::module_inception)]

pub mod permission;
pub mod repository;

pub use permission::{Permission, PermissionId, PermissionType};
pub use repository::PermissionRepository;
