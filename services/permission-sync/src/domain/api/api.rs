//! API 端点实体

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::domain::policy::PolicyRule;

/// API ID
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
pub struct ApiId(pub i64);

impl ApiId {
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn to_raw(id: Option<Self>) -> i64 {
        id.map(|a| a.0).unwrap_or(0)
    }
}

const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "*"];

/// 规范化 HTTP 方法（大写），不支持的方法返回 `None`
pub fn normalize_method(method: &str) -> Option<String> {
    let upper = method.trim().to_ascii_uppercase();
    METHODS.contains(&upper.as_str()).then_some(upper)
}

/// 受保护的 API 端点
///
/// `(path, method)` 全局唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub id: ApiId,
    pub path: String,
    pub method: String,
    pub name: String,
    pub group: String,
    pub enabled: bool,
}

impl ApiEndpoint {
    pub fn new(path: impl Into<String>, method: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ApiId::default(),
            path: path.into(),
            method: method.into(),
            name: name.into(),
            group: String::new(),
            enabled: true,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// 权限字典中的编码: `{path}:{method}`
    pub fn permission_code(&self) -> String {
        format!("{}:{}", self.path, self.method)
    }

    /// 以 `subject` 为主体的策略规则 (subject, path, method)
    pub fn policy_rule(&self, subject: &str) -> PolicyRule {
        PolicyRule::new(subject, &self.path, &self.method)
    }
}
