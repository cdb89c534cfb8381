//! 策略规则与分组规则

use serde::{Deserialize, Serialize};

/// 策略规则 (subject, object, action)
///
/// API 类型权限传播时 subject 为角色编码，object 为 API 路径，action 为 HTTP 方法。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRule {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl PolicyRule {
    pub fn new(subject: impl Into<String>, object: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        }
    }

    pub fn to_values(&self) -> Vec<String> {
        vec![self.subject.clone(), self.object.clone(), self.action.clone()]
    }

    /// 从引擎返回的字段列表还原，字段不足时返回 `None`
    pub fn from_values(values: &[String]) -> Option<Self> {
        match values {
            [subject, object, action, ..] => Some(Self::new(subject, object, action)),
            _ => None,
        }
    }
}

impl std::fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.object, self.action)
    }
}

/// 分组规则: 用户 (或子角色) 属于角色
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupingRule {
    pub user: String,
    pub role: String,
}

impl GroupingRule {
    pub fn new(user: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            role: role.into(),
        }
    }

    pub fn to_values(&self) -> Vec<String> {
        vec![self.user.clone(), self.role.clone()]
    }

    pub fn from_values(values: &[String]) -> Option<Self> {
        match values {
            [user, role, ..] => Some(Self::new(user, role)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_values() {
        let rule = PolicyRule::new("admin", "/users", "GET");
        assert_eq!(PolicyRule::from_values(&rule.to_values()), Some(rule.clone()));
        assert_eq!(rule.to_string(), "(admin, /users, GET)");
        assert_eq!(PolicyRule::from_values(&["admin".to_string()]), None);
    }

    #[test]
    fn test_grouping_values() {
        let grouping = GroupingRule::new("u-1", "admin");
        assert_eq!(GroupingRule::from_values(&grouping.to_values()), Some(grouping));
        assert_eq!(GroupingRule::from_values(&[]), None);
    }
}
