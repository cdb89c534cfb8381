//! Casbin 策略存储

pub mod casbin_store;
pub mod model;
pub mod rule_repository;

pub use casbin_store::CasbinPolicyStore;
pub use model::{MODEL, load_model};
pub use rule_repository::{CasbinRule, CasbinRuleRepository, PolicyType};
