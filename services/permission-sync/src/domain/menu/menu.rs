//! 菜单实体

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// 菜单 ID（0 表示尚未持久化）
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
pub struct MenuId(pub i64);

impl MenuId {
    /// 存储层使用 0 表示根节点 / 未关联
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// `None` 写回存储层时为 0
    pub fn to_raw(id: Option<Self>) -> i64 {
        id.map(|m| m.0).unwrap_or(0)
    }
}

/// 菜单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    /// 目录
    Directory,
    /// 菜单页面
    Menu,
    /// 按钮
    Button,
}

impl MenuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuType::Directory => "directory",
            MenuType::Menu => "menu",
            MenuType::Button => "button",
        }
    }
}

impl std::fmt::Display for MenuType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MenuType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "directory" | "d" => Ok(MenuType::Directory),
            "menu" | "m" => Ok(MenuType::Menu),
            "button" | "b" | "f" => Ok(MenuType::Button),
            other => Err(format!("unknown menu type '{}'", other)),
        }
    }
}

/// 菜单实体
///
/// 子节点只存在于内存中的树视图 ([`super::MenuTreeNode`])，从不持久化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    /// `None` 为根节点
    pub parent_id: Option<MenuId>,
    pub name: String,
    pub path: String,
    pub component: String,
    pub icon: String,
    pub order_num: i32,
    pub menu_type: MenuType,
    pub enabled: bool,
    /// 前端权限标识，例如 `system:user:list`
    pub perms: String,
}

impl Menu {
    pub fn new(name: impl Into<String>, menu_type: MenuType) -> Self {
        Self {
            id: MenuId::default(),
            parent_id: None,
            name: name.into(),
            path: String::new(),
            component: String::new(),
            icon: String::new(),
            order_num: 0,
            menu_type,
            enabled: true,
            perms: String::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: MenuId) -> Self {
        self.parent_id = MenuId::from_raw(parent_id.0);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_order(mut self, order_num: i32) -> Self {
        self.order_num = order_num;
        self
    }

    pub fn with_perms(mut self, perms: impl Into<String>) -> Self {
        self.perms = perms.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_perms(&self) -> bool {
        !self.perms.trim().is_empty()
    }
}
