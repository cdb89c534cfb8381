//! 策略规则传播
//!
//! 关系型写入提交之后才写策略存储，两者不在同一事务内。单条规则写入失败只记录并计数，
//! 批次继续执行；调用方通过 [`PropagationReport::into_result`] 把失败上报为
//! `PartiallyApplied`，由全量同步修复。

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use metrics::{Unit, counter, describe_counter, describe_histogram};
use tracing::{debug, warn};

use super::stores::Stores;
use crate::domain::api::ApiEndpoint;
use crate::domain::menu::MenuId;
use crate::domain::policy::{PolicyRule, PolicyStore};
use crate::domain::role::Role;
use crate::error::{SyncError, SyncResult};

/// 一批策略写入的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// 尝试写入的规则数
    pub attempted: usize,
    /// 真正改变了存储的规则数（重复添加 / 删除不存在的规则不计）
    pub changed: usize,
    pub failed: usize,
}

impl PropagationReport {
    pub fn merge(&mut self, other: PropagationReport) {
        self.attempted += other.attempted;
        self.changed += other.changed;
        self.failed += other.failed;
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn into_result(self) -> SyncResult<Self> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(SyncError::PartiallyApplied {
                attempted: self.attempted,
                failed: self.failed,
            })
        }
    }
}

/// 由角色-菜单和菜单-API 关联推导策略规则，并写入策略存储
#[derive(Clone)]
pub struct PolicyPropagator {
    stores: Stores,
    policy: Arc<dyn PolicyStore>,
}

impl PolicyPropagator {
    pub fn new(stores: Stores, policy: Arc<dyn PolicyStore>) -> Self {
        Self { stores, policy }
    }

    pub fn policy(&self) -> &Arc<dyn PolicyStore> {
        &self.policy
    }

    /// 一组菜单关联的全部 API（去重，忽略已不存在的 API）
    pub async fn apis_for_menus(&self, menu_ids: &[MenuId]) -> SyncResult<Vec<ApiEndpoint>> {
        let mut api_ids = Vec::new();
        let mut seen = HashSet::new();
        for &menu_id in menu_ids {
            for api_id in self.stores.menu_apis.list_api_ids(menu_id).await? {
                if seen.insert(api_id) {
                    api_ids.push(api_id);
                }
            }
        }
        if api_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.stores.apis.find_by_ids(&api_ids).await?)
    }

    /// 角色当前应持有的全部规则: RoleMenu × MenuAPI
    pub async fn implied_rules(&self, role: &Role) -> SyncResult<BTreeSet<PolicyRule>> {
        let menu_ids = self.stores.role_menus.list_menu_ids(role.id).await?;
        let apis = self.apis_for_menus(&menu_ids).await?;
        Ok(apis.iter().map(|api| api.policy_rule(&role.code)).collect())
    }

    /// 逐条添加规则，失败只记录
    pub async fn grant<I>(&self, rules: I) -> PropagationReport
    where
        I: IntoIterator<Item = PolicyRule>,
    {
        let mut report = PropagationReport::default();
        for rule in rules {
            report.attempted += 1;
            match self.policy.add_policy(&rule).await {
                Ok(true) => {
                    report.changed += 1;
                    debug!(rule = %rule, "Policy rule added");
                }
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(rule = %rule, error = %e, "Failed to add policy rule");
                }
            }
        }
        record(&report, "policy_rules_added_total");
        report
    }

    /// 逐条删除规则，失败只记录
    pub async fn revoke<I>(&self, rules: I) -> PropagationReport
    where
        I: IntoIterator<Item = PolicyRule>,
    {
        let mut report = PropagationReport::default();
        for rule in rules {
            report.attempted += 1;
            match self.policy.remove_policy(&rule).await {
                Ok(true) => {
                    report.changed += 1;
                    debug!(rule = %rule, "Policy rule removed");
                }
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(rule = %rule, error = %e, "Failed to remove policy rule");
                }
            }
        }
        record(&report, "policy_rules_removed_total");
        report
    }

    /// 从候选规则中撤回角色已不再隐含的那些
    pub async fn retract_unimplied<I>(&self, role: &Role, candidates: I) -> SyncResult<PropagationReport>
    where
        I: IntoIterator<Item = PolicyRule>,
    {
        let implied = self.implied_rules(role).await?;
        let stale: BTreeSet<PolicyRule> = candidates
            .into_iter()
            .filter(|rule| rule.subject == role.code && !implied.contains(rule))
            .collect();
        Ok(self.revoke(stale).await)
    }

    /// 删除角色在策略存储中所有不被关联关系推导出的规则
    pub async fn prune_role(&self, role: &Role) -> SyncResult<PropagationReport> {
        let current = self
            .policy
            .get_filtered_policy(0, vec![role.code.clone()])
            .await?;
        self.retract_unimplied(role, current).await
    }
}

/// 注册同步相关指标的说明，进程启动时调用一次
pub fn describe_metrics() {
    describe_counter!("policy_rules_added_total", "Policy rules added to the policy store");
    describe_counter!("policy_rules_removed_total", "Policy rules removed from the policy store");
    describe_counter!(
        "policy_propagation_failures_total",
        "Policy rule writes that failed and await resync"
    );
    describe_histogram!(
        "policy_resync_duration_ms",
        Unit::Milliseconds,
        "Duration of a full menu/API resync"
    );
}

fn record(report: &PropagationReport, changed_metric: &'static str) {
    if report.changed > 0 {
        counter!(changed_metric).increment(report.changed as u64);
    }
    if report.failed > 0 {
        counter!("policy_propagation_failures_total").increment(report.failed as u64);
    }
}
