//! 基于 `casbin::Enforcer` 的策略存储
//!
//! Enforcer 放在 `RwLock` 后面: 判定和只读查询持读锁，增删持写锁。
//! 配置了规则仓储时每次真正改变内存状态的写操作都会同步写入 `casbin_rule` 表，
//! 落库失败则撤销内存中的改动并返回错误。

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi, RbacApi};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::model::load_model;
use super::rule_repository::{CasbinRule, CasbinRuleRepository, PolicyType};
use crate::domain::policy::{GroupingRule, PolicyResult, PolicyRule, PolicyStore, PolicyStoreError};

fn engine_error(e: casbin::Error) -> PolicyStoreError {
    PolicyStoreError::new(e.to_string())
}

fn persistence_error(e: rbac_errors::AppError) -> PolicyStoreError {
    PolicyStoreError::new(format!("failed to persist casbin rule: {}", e))
}

pub struct CasbinPolicyStore {
    enforcer: RwLock<Enforcer>,
    rules: Option<Arc<dyn CasbinRuleRepository>>,
}

impl CasbinPolicyStore {
    async fn build(model: DefaultModel, rules: Option<Arc<dyn CasbinRuleRepository>>) -> PolicyResult<Self> {
        let enforcer = Enforcer::new(model, MemoryAdapter::default())
            .await
            .map_err(engine_error)?;
        Ok(Self {
            enforcer: RwLock::new(enforcer),
            rules,
        })
    }

    /// 纯内存实现，使用内置模型
    pub async fn in_memory() -> PolicyResult<Self> {
        Self::build(load_model(None).await?, None).await
    }

    /// 从规则仓储加载全部规则，之后的写操作同步落库
    pub async fn with_repository(
        model_path: Option<&str>,
        rules: Arc<dyn CasbinRuleRepository>,
    ) -> PolicyResult<Self> {
        let store = Self::build(load_model(model_path).await?, Some(rules.clone())).await?;

        let persisted = rules.load_all().await.map_err(persistence_error)?;
        // 批量添加遇到重复行会整体放弃，先去重
        let mut policies = BTreeSet::new();
        let mut groupings = BTreeSet::new();
        for rule in persisted {
            match rule.ptype {
                PolicyType::Policy => policies.insert(rule.values),
                PolicyType::Grouping => groupings.insert(rule.values),
            };
        }
        let policies: Vec<Vec<String>> = policies.into_iter().collect();
        let groupings: Vec<Vec<String>> = groupings.into_iter().collect();

        {
            let mut enforcer = store.enforcer.write().await;
            if !policies.is_empty() {
                enforcer.add_policies(policies.clone()).await.map_err(engine_error)?;
            }
            if !groupings.is_empty() {
                enforcer
                    .add_grouping_policies(groupings.clone())
                    .await
                    .map_err(engine_error)?;
            }
        }

        info!(
            policies = policies.len(),
            groupings = groupings.len(),
            "Casbin policy store loaded"
        );
        Ok(store)
    }

    async fn persist_insert(&self, rule: CasbinRule) -> Result<(), PolicyStoreError> {
        match &self.rules {
            Some(repo) => repo.insert(&rule).await.map_err(persistence_error),
            None => Ok(()),
        }
    }

    async fn persist_delete(&self, rule: CasbinRule) -> Result<(), PolicyStoreError> {
        match &self.rules {
            Some(repo) => repo.delete(&rule).await.map_err(persistence_error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PolicyStore for CasbinPolicyStore {
    async fn enforce(&self, subject: &str, object: &str, action: &str) -> PolicyResult<bool> {
        let enforcer = self.enforcer.read().await;
        enforcer.enforce((subject, object, action)).map_err(engine_error)
    }

    async fn add_policy(&self, rule: &PolicyRule) -> PolicyResult<bool> {
        let mut enforcer = self.enforcer.write().await;
        let added = enforcer.add_policy(rule.to_values()).await.map_err(engine_error)?;
        if added && let Err(e) = self.persist_insert(CasbinRule::policy(rule)).await {
            let _ = enforcer.remove_policy(rule.to_values()).await;
            return Err(e);
        }
        Ok(added)
    }

    async fn remove_policy(&self, rule: &PolicyRule) -> PolicyResult<bool> {
        let mut enforcer = self.enforcer.write().await;
        let removed = enforcer.remove_policy(rule.to_values()).await.map_err(engine_error)?;
        if removed && let Err(e) = self.persist_delete(CasbinRule::policy(rule)).await {
            let _ = enforcer.add_policy(rule.to_values()).await;
            return Err(e);
        }
        Ok(removed)
    }

    async fn remove_filtered_policy(&self, field_index: usize, field_values: Vec<String>) -> PolicyResult<bool> {
        let mut enforcer = self.enforcer.write().await;
        if let Some(repo) = &self.rules {
            repo.delete_filtered(PolicyType::Policy, field_index, &field_values)
                .await
                .map_err(persistence_error)?;
        }
        enforcer
            .remove_filtered_policy(field_index, field_values)
            .await
            .map_err(engine_error)
    }

    async fn add_grouping_policy(&self, rule: &GroupingRule) -> PolicyResult<bool> {
        let mut enforcer = self.enforcer.write().await;
        let added = enforcer
            .add_grouping_policy(rule.to_values())
            .await
            .map_err(engine_error)?;
        if added && let Err(e) = self.persist_insert(CasbinRule::grouping(rule)).await {
            let _ = enforcer.remove_grouping_policy(rule.to_values()).await;
            return Err(e);
        }
        Ok(added)
    }

    async fn remove_grouping_policy(&self, rule: &GroupingRule) -> PolicyResult<bool> {
        let mut enforcer = self.enforcer.write().await;
        let removed = enforcer
            .remove_grouping_policy(rule.to_values())
            .await
            .map_err(engine_error)?;
        if removed && let Err(e) = self.persist_delete(CasbinRule::grouping(rule)).await {
            let _ = enforcer.add_grouping_policy(rule.to_values()).await;
            return Err(e);
        }
        Ok(removed)
    }

    async fn remove_filtered_grouping_policy(
        &self,
        field_index: usize,
        field_values: Vec<String>,
    ) -> PolicyResult<bool> {
        let mut enforcer = self.enforcer.write().await;
        if let Some(repo) = &self.rules {
            repo.delete_filtered(PolicyType::Grouping, field_index, &field_values)
                .await
                .map_err(persistence_error)?;
        }
        enforcer
            .remove_filtered_grouping_policy(field_index, field_values)
            .await
            .map_err(engine_error)
    }

    async fn get_roles_for_user(&self, user: &str) -> PolicyResult<Vec<String>> {
        let enforcer = self.enforcer.read().await;
        Ok(enforcer.get_roles_for_user(user, None))
    }

    async fn get_users_for_role(&self, role: &str) -> PolicyResult<Vec<String>> {
        let enforcer = self.enforcer.read().await;
        Ok(enforcer.get_users_for_role(role, None))
    }

    async fn get_filtered_policy(&self, field_index: usize, field_values: Vec<String>) -> PolicyResult<Vec<PolicyRule>> {
        let enforcer = self.enforcer.read().await;
        let rules = enforcer.get_filtered_policy(field_index, field_values);
        Ok(rules
            .iter()
            .filter_map(|values| {
                let rule = PolicyRule::from_values(values);
                if rule.is_none() {
                    warn!(values = ?values, "Ignoring malformed policy rule");
                }
                rule
            })
            .collect())
    }

    async fn get_grouping_policy(&self) -> PolicyResult<Vec<GroupingRule>> {
        let enforcer = self.enforcer.read().await;
        Ok(enforcer
            .get_grouping_policy()
            .iter()
            .filter_map(|values| GroupingRule::from_values(values))
            .collect())
    }
}
