//! 策略存储接口

use async_trait::async_trait;
use thiserror::Error;

use super::rule::{GroupingRule, PolicyRule};

/// 策略引擎调用失败
#[derive(Debug, Clone, Error)]
#[error("policy store error: {0}")]
pub struct PolicyStoreError(pub String);

impl PolicyStoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type PolicyResult<T> = Result<T, PolicyStoreError>;

/// 策略存储（授权引擎）
///
/// 实现必须是线程安全的。增删操作天然幂等: 返回值表示是否真正改变了存储，
/// 重复添加已存在的规则或删除不存在的规则返回 `Ok(false)` 而不是错误。
/// 过滤类方法的 `field_index` 与 Casbin 一致，从 0 开始，对应规则字段位置。
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// 请求时授权判定
    async fn enforce(&self, subject: &str, object: &str, action: &str) -> PolicyResult<bool>;

    async fn add_policy(&self, rule: &PolicyRule) -> PolicyResult<bool>;

    async fn remove_policy(&self, rule: &PolicyRule) -> PolicyResult<bool>;

    async fn remove_filtered_policy(&self, field_index: usize, field_values: Vec<String>) -> PolicyResult<bool>;

    async fn add_grouping_policy(&self, rule: &GroupingRule) -> PolicyResult<bool>;

    async fn remove_grouping_policy(&self, rule: &GroupingRule) -> PolicyResult<bool>;

    async fn remove_filtered_grouping_policy(
        &self,
        field_index: usize,
        field_values: Vec<String>,
    ) -> PolicyResult<bool>;

    /// 用户直接所属的角色
    async fn get_roles_for_user(&self, user: &str) -> PolicyResult<Vec<String>>;

    /// 直接属于角色的用户
    async fn get_users_for_role(&self, role: &str) -> PolicyResult<Vec<String>>;

    async fn get_filtered_policy(&self, field_index: usize, field_values: Vec<String>) -> PolicyResult<Vec<PolicyRule>>;

    /// 全部分组规则
    async fn get_grouping_policy(&self) -> PolicyResult<Vec<GroupingRule>>;
}
