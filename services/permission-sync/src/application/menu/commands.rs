//! 菜单相关命令定义

use crate::domain::api::ApiId;
use crate::domain::menu::{Menu, MenuId, MenuType};

/// 菜单可编辑字段
#[derive(Debug, Clone)]
pub struct MenuFields {
    /// `None` 为根节点
    pub parent_id: Option<MenuId>,
    pub name: String,
    pub path: String,
    pub component: String,
    pub icon: String,
    pub order_num: i32,
    pub menu_type: MenuType,
    pub enabled: bool,
    pub perms: String,
}

impl MenuFields {
    pub fn new(name: impl Into<String>, menu_type: MenuType) -> Self {
        Self {
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

    /// 验证命令参数
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Menu name cannot be empty".to_string());
        }
        if self.name.len() > 100 {
            return Err("Menu name cannot exceed 100 characters".to_string());
        }
        if self.perms.len() > 200 {
            return Err("Menu perms cannot exceed 200 characters".to_string());
        }
        Ok(())
    }

    /// 把字段写入实体（保留 ID）
    pub fn apply_to(self, menu: &mut Menu) {
        menu.parent_id = self.parent_id.and_then(|p| MenuId::from_raw(p.0));
        menu.name = self.name;
        menu.path = self.path;
        menu.component = self.component;
        menu.icon = self.icon;
        menu.order_num = self.order_num;
        menu.menu_type = self.menu_type;
        menu.enabled = self.enabled;
        menu.perms = self.perms.trim().to_string();
    }

    pub fn into_menu(self) -> Menu {
        let mut menu = Menu::new(String::new(), self.menu_type);
        self.apply_to(&mut menu);
        menu
    }
}

/// 创建菜单命令
#[derive(Debug, Clone)]
pub struct CreateMenuCommand {
    pub fields: MenuFields,
}

/// 更新菜单命令
#[derive(Debug, Clone)]
pub struct UpdateMenuCommand {
    pub menu_id: MenuId,
    pub fields: MenuFields,
}

/// 删除菜单命令
#[derive(Debug, Clone)]
pub struct DeleteMenuCommand {
    pub menu_id: MenuId,
}

/// 为菜单分配 API 命令（整体替换）
#[derive(Debug, Clone)]
pub struct AssignApisToMenuCommand {
    pub menu_id: MenuId,
    pub api_ids: Vec<ApiId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(MenuFields::new("Users", MenuType::Menu).validate().is_ok());
        assert!(MenuFields::new("  ", MenuType::Menu).validate().is_err());
    }

    #[test]
    fn test_into_menu_normalises_parent_and_perms() {
        let mut fields = MenuFields::new("Users", MenuType::Menu);
        fields.parent_id = Some(MenuId(0));
        fields.perms = " system:user:list ".to_string();

        let menu = fields.into_menu();
        assert!(menu.is_root());
        assert_eq!(menu.perms, "system:user:list");
        assert_eq!(menu.name, "Users");
    }
}
