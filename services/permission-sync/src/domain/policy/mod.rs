//! 策略存储端口
//!
//! 授权引擎（Casbin 风格）被视为黑盒，通过 [`PolicyStore`] 注入，测试可替换为内存实现。

pub mod rule;
pub mod store;

pub use rule::{GroupingRule, PolicyRule};
pub use store::{PolicyResult, PolicyStore, PolicyStoreError};
