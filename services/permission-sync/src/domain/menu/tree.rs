//! 菜单树组装
//!
//! 把扁平的菜单行组装成森林:
//! - `parent_id == None` 的节点为根
//! - 父节点不在输入集合中的节点直接丢弃（上游可能已按启用状态过滤掉父节点）
//! - 父链成环的节点同样视为孤儿丢弃，保证组装一定终止且每个节点至多出现一次
//! - 兄弟节点按 `order_num` 升序，相同时按 `id` 升序

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use super::menu::{Menu, MenuId};

/// 树节点
#[derive(Debug, Clone, Serialize)]
pub struct MenuTreeNode {
    #[serde(flatten)]
    pub menu: Menu,
    pub children: Vec<MenuTreeNode>,
}

impl MenuTreeNode {
    /// 子树节点总数（含自身）
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(MenuTreeNode::len).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    /// 父链能走到根
    Rooted,
    /// 父链断开或成环
    Detached,
}

/// 组装菜单森林
pub fn build_tree(menus: Vec<Menu>) -> Vec<MenuTreeNode> {
    let mut by_id: HashMap<MenuId, Menu> = HashMap::with_capacity(menus.len());
    for menu in menus {
        by_id.entry(menu.id).or_insert(menu);
    }

    let parents: HashMap<MenuId, Option<MenuId>> =
        by_id.values().map(|m| (m.id, m.parent_id)).collect();

    let mut reach: HashMap<MenuId, Reach> = HashMap::with_capacity(parents.len());
    for &id in parents.keys() {
        resolve_reach(id, &parents, &mut reach);
    }

    let mut children: HashMap<Option<MenuId>, Vec<Menu>> = HashMap::new();
    for (id, menu) in by_id {
        if reach.get(&id) == Some(&Reach::Rooted) {
            children.entry(menu.parent_id).or_default().push(menu);
        } else {
            debug!(menu_id = %id, parent_id = ?menu.parent_id, "Dropping detached menu node");
        }
    }

    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.order_num.cmp(&b.order_num).then(a.id.cmp(&b.id)));
    }

    attach(None, &mut children)
}

fn attach(parent: Option<MenuId>, children: &mut HashMap<Option<MenuId>, Vec<Menu>>) -> Vec<MenuTreeNode> {
    let Some(siblings) = children.remove(&parent) else {
        return Vec::new();
    };

    siblings
        .into_iter()
        .map(|menu| {
            let id = menu.id;
            MenuTreeNode {
                children: attach(Some(id), children),
                menu,
            }
        })
        .collect()
}

/// 沿父链向上走，把路径上的所有节点标记为同一结果
fn resolve_reach(
    start: MenuId,
    parents: &HashMap<MenuId, Option<MenuId>>,
    reach: &mut HashMap<MenuId, Reach>,
) -> Reach {
    let mut path = Vec::new();
    let mut on_path = HashSet::new();
    let mut current = start;

    let outcome = loop {
        if let Some(&known) = reach.get(&current) {
            break known;
        }
        if !on_path.insert(current) {
            // 父链回到了自身
            break Reach::Detached;
        }
        path.push(current);

        match parents.get(&current) {
            Some(None) => break Reach::Rooted,
            Some(Some(parent)) if parents.contains_key(parent) => current = *parent,
            _ => break Reach::Detached,
        }
    };

    for id in path {
        reach.insert(id, outcome);
    }
    outcome
}

/// 判断把 `node` 挂到 `new_parent` 下是否会形成环
///
/// `parents` 为现有菜单的 `id -> parent_id` 映射。已损坏（本身成环）的父链同样返回 true。
pub fn creates_cycle(
    parents: &HashMap<MenuId, Option<MenuId>>,
    node: MenuId,
    new_parent: MenuId,
) -> bool {
    let mut seen = HashSet::new();
    let mut current = Some(new_parent);

    while let Some(id) = current {
        if id == node || !seen.insert(id) {
            return true;
        }
        current = parents.get(&id).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::menu::MenuType;

    fn menu(id: i64, parent: i64, order: i32) -> Menu {
        let mut m = Menu::new(format!("menu-{}", id), MenuType::Menu)
            .with_parent(MenuId(parent))
            .with_order(order);
        m.id = MenuId(id);
        m
    }

    fn ids(nodes: &[MenuTreeNode]) -> Vec<i64> {
        nodes.iter().map(|n| n.menu.id.0).collect()
    }

    fn count(nodes: &[MenuTreeNode]) -> usize {
        nodes.iter().map(MenuTreeNode::len).sum()
    }

    #[test]
    fn test_roots_and_children() {
        let tree = build_tree(vec![
            menu(1, 0, 1),
            menu(2, 1, 1),
            menu(3, 1, 0),
            menu(4, 0, 0),
            menu(5, 3, 0),
        ]);

        assert_eq!(ids(&tree), vec![4, 1]);
        let system = &tree[1];
        assert_eq!(ids(&system.children), vec![3, 2]);
        assert_eq!(ids(&system.children[0].children), vec![5]);
        assert_eq!(count(&tree), 5);
    }

    #[test]
    fn test_sibling_ties_broken_by_id() {
        let tree = build_tree(vec![menu(9, 0, 1), menu(3, 0, 1), menu(5, 0, 0)]);
        assert_eq!(ids(&tree), vec![5, 3, 9]);
    }

    #[test]
    fn test_orphans_are_dropped() {
        // 10 的父节点 99 已被上游过滤掉，11 挂在 10 下面同样不可达
        let tree = build_tree(vec![menu(1, 0, 0), menu(10, 99, 0), menu(11, 10, 0)]);
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(count(&tree), 1);
    }

    #[test]
    fn test_cycle_terminates_without_duplicates() {
        // 2 -> 3 -> 2 成环，4 挂在环上，6 自己指向自己
        let tree = build_tree(vec![
            menu(1, 0, 0),
            menu(2, 3, 0),
            menu(3, 2, 0),
            menu(4, 2, 0),
            menu(5, 1, 0),
            menu(6, 6, 0),
        ]);

        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![5]);
        assert_eq!(count(&tree), 2);
    }

    #[test]
    fn test_duplicate_rows_keep_first() {
        let mut dup = menu(1, 0, 5);
        dup.name = "duplicate".to_string();
        let tree = build_tree(vec![menu(1, 0, 0), dup]);

        assert_eq!(count(&tree), 1);
        assert_eq!(tree[0].menu.name, "menu-1");
    }

    #[test]
    fn test_empty_input() {
        assert!(build_tree(Vec::new()).is_empty());
    }

    #[test]
    fn test_creates_cycle() {
        let parents: HashMap<MenuId, Option<MenuId>> = [
            (MenuId(1), None),
            (MenuId(2), Some(MenuId(1))),
            (MenuId(3), Some(MenuId(2))),
        ]
        .into_iter()
        .collect();

        // 1 挂到自己的孙子 3 下
        assert!(creates_cycle(&parents, MenuId(1), MenuId(3)));
        assert!(creates_cycle(&parents, MenuId(2), MenuId(2)));
        assert!(!creates_cycle(&parents, MenuId(3), MenuId(1)));
        assert!(!creates_cycle(&parents, MenuId(2), MenuId(42)));
    }
}
