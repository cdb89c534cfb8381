//! 全量同步模块

pub mod handlers;

pub use handlers::{ResyncHandler, SyncOptions, SyncReport};
