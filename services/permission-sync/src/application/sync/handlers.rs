//! 全量同步处理器
//!
//! 遍历每个菜单，由其关联的 API 和持有它的角色重新推导规则并幂等添加。
//! 开启剪枝时，再删除以已知角色编码为主体、但不被任何 RoleMenu × MenuAPI 推导出的规则。
//! 非角色主体（例如直接授予用户的规则）不在剪枝范围内。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::histogram;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::locks::SyncLocks;
use crate::application::propagation::{PolicyPropagator, PropagationReport};
use crate::application::stores::Stores;
use crate::domain::role::{Role, RoleId};
use crate::error::{SyncError, SyncResult};

/// 同步选项
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub prune: bool,
    /// 在菜单之间、角色之间检查
    pub cancel: CancellationToken,
}

impl SyncOptions {
    pub fn with_prune(prune: bool) -> Self {
        Self {
            prune,
            ..Self::default()
        }
    }
}

/// 同步结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub menus_scanned: usize,
    pub roles_scanned: usize,
    /// 重新断言的规则数
    pub rules_asserted: usize,
    /// 其中原本缺失、本次新增的规则数
    pub rules_added: usize,
    pub rules_pruned: usize,
    pub failures: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl SyncReport {
    /// 没有任何新增或删除
    pub fn is_fixed_point(&self) -> bool {
        self.rules_added == 0 && self.rules_pruned == 0
    }

    pub fn into_result(self) -> SyncResult<Self> {
        if self.failures == 0 {
            Ok(self)
        } else {
            Err(SyncError::PartiallyApplied {
                attempted: self.rules_asserted,
                failed: self.failures,
            })
        }
    }
}

/// 全量同步处理器
pub struct ResyncHandler {
    stores: Stores,
    propagator: PolicyPropagator,
    locks: Arc<SyncLocks>,
}

impl ResyncHandler {
    pub fn new(stores: Stores, propagator: PolicyPropagator, locks: Arc<SyncLocks>) -> Self {
        Self {
            stores,
            propagator,
            locks,
        }
    }

    /// 执行一次全量同步，单条规则写入失败计入 `failures` 而不中断
    pub async fn handle(&self, options: SyncOptions) -> SyncResult<SyncReport> {
        // 剪枝和并发的分配操作互斥，否则可能删掉刚写入的规则
        let _exclusive;
        let _shared;
        if options.prune {
            _exclusive = self.locks.exclusive().await;
        } else {
            _shared = self.locks.shared().await;
        }

        let started = Instant::now();
        let mut report = SyncReport::default();

        let roles: HashMap<RoleId, Role> = self
            .stores
            .roles
            .list_all()
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        report.roles_scanned = roles.len();

        let menus = self.stores.menus.list_all().await?;
        for menu in &menus {
            if options.cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            report.menus_scanned += 1;

            let apis = self.propagator.apis_for_menus(&[menu.id]).await?;
            if apis.is_empty() {
                continue;
            }

            let holders = self.stores.role_menus.list_role_ids_for_menu(menu.id).await?;
            let mut menu_report = PropagationReport::default();
            for role in holders.iter().filter_map(|id| roles.get(id)) {
                let rules = apis.iter().map(|api| api.policy_rule(&role.code));
                menu_report.merge(self.propagator.grant(rules).await);
            }

            debug!(
                menu_id = %menu.id,
                apis = apis.len(),
                roles = holders.len(),
                rules_added = menu_report.changed,
                "Menu resynced"
            );
            report.rules_asserted += menu_report.attempted;
            report.rules_added += menu_report.changed;
            report.failures += menu_report.failed;
        }

        if options.prune {
            for role in roles.values() {
                if options.cancel.is_cancelled() {
                    return Err(SyncError::Cancelled);
                }
                let pruned = self.propagator.prune_role(role).await?;
                report.rules_pruned += pruned.changed;
                report.failures += pruned.failed;
            }
        }

        report.duration = started.elapsed();
        histogram!("policy_resync_duration_ms").record(report.duration.as_secs_f64() * 1000.0);

        info!(
            menus = report.menus_scanned,
            roles = report.roles_scanned,
            rules_asserted = report.rules_asserted,
            rules_added = report.rules_added,
            rules_pruned = report.rules_pruned,
            failures = report.failures,
            duration_ms = report.duration.as_millis() as u64,
            prune = options.prune,
            "Resync finished"
        );
        Ok(report)
    }
}
