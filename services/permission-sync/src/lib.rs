//! Role / Menu / API 权限同步引擎
//!
//! 维护菜单树、权限字典、角色-菜单分配和策略存储（Casbin 规则）四者的一致性，
//! 并回答"某个用户能看到什么、能做什么"。

pub mod application;
pub mod domain;
pub mod engine;
pub mod error;
pub mod infrastructure;

pub use engine::{EngineOptions, PermissionSyncEngine};
pub use error::{ErrorKind, SyncError, SyncResult};
