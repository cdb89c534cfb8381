//! 基础设施层模块

pub mod persistence;
pub mod policy;
