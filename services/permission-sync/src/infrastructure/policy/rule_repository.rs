//! `casbin_rule` 表的持久化接口

use async_trait::async_trait;
use rbac_errors::AppResult;

use crate::domain::policy::{GroupingRule, PolicyRule};

/// 规则类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyType {
    /// 策略规则 `p`
    Policy,
    /// 分组规则 `g`
    Grouping,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Policy => "p",
            PolicyType::Grouping => "g",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "p" => Some(PolicyType::Policy),
            "g" => Some(PolicyType::Grouping),
            _ => None,
        }
    }
}

/// `casbin_rule` 表的一行: p 规则 v0..v2 为 sub/obj/act，g 规则 v0/v1 为 user/role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasbinRule {
    pub ptype: PolicyType,
    pub values: Vec<String>,
}

impl CasbinRule {
    pub fn policy(rule: &PolicyRule) -> Self {
        Self {
            ptype: PolicyType::Policy,
            values: rule.to_values(),
        }
    }

    pub fn grouping(rule: &GroupingRule) -> Self {
        Self {
            ptype: PolicyType::Grouping,
            values: rule.to_values(),
        }
    }

    /// 第 `index` 个字段，缺失时为空串
    pub fn field(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Casbin 规则持久化
#[async_trait]
pub trait CasbinRuleRepository: Send + Sync {
    async fn load_all(&self) -> AppResult<Vec<CasbinRule>>;

    async fn insert(&self, rule: &CasbinRule) -> AppResult<()>;

    async fn delete(&self, rule: &CasbinRule) -> AppResult<()>;

    /// 从 `field_index` 开始逐字段匹配删除，空串表示该字段不限
    async fn delete_filtered(
        &self,
        ptype: PolicyType,
        field_index: usize,
        field_values: &[String],
    ) -> AppResult<()>;
}
