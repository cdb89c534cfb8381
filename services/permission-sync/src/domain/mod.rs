//! 领域层: 菜单、API 目录、权限字典、角色，以及策略存储端口

pub mod api;
pub mod menu;
pub mod permission;
pub mod policy;
pub mod role;
