//! 应用层模块

pub mod api;
pub mod locks;
pub mod menu;
pub mod permission;
pub mod propagation;
pub mod role;
pub mod stores;
pub mod sync;
pub mod user_role;

pub use api::{ApiCommandHandler, ApiQueryHandler};
pub use locks::{KeyedLocks, SyncLocks};
pub use menu::{MenuCommandHandler, MenuQueryHandler};
pub use permission::{PermissionCommandHandler, PermissionQueryHandler};
pub use propagation::{PolicyPropagator, PropagationReport, describe_metrics};
pub use role::{RoleCommandHandler, RoleQueryHandler};
pub use stores::Stores;
pub use sync::{ResyncHandler, SyncOptions, SyncReport};
pub use user_role::{UserRoleCommandHandler, UserRoleQueryHandler};
