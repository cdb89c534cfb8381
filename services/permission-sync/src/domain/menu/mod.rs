//! 菜单领域模块

#![allow(clippy::module_inception)]

pub mod menu;
pub mod repository;
pub mod tree;

pub use menu::{Menu, MenuId, MenuType};
pub use repository::{MenuApiRepository, MenuRepository};
pub use tree::{MenuTreeNode, build_tree, creates_cycle};
