//! 权限字典应用层模块

pub mod commands;
pub(crate) mod derived;
pub mod handlers;
pub mod queries;
pub mod query_handlers;

pub use commands::*;
pub use handlers::PermissionCommandHandler;
pub use queries::*;
pub use query_handlers::PermissionQueryHandler;
