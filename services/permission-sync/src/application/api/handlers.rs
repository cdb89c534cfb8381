//! API 命令处理器

use std::sync::Arc;

use tracing::info;

use super::commands::*;
use crate::application::locks::SyncLocks;
use crate::application::propagation::{PolicyPropagator, PropagationReport};
use crate::application::stores::Stores;
use crate::domain::api::{ApiEndpoint, ApiId};
use crate::domain::policy::PolicyRule;
use crate::error::{SyncError, SyncResult};

/// API 命令处理器
pub struct ApiCommandHandler {
    stores: Stores,
    propagator: PolicyPropagator,
    locks: Arc<SyncLocks>,
}

impl ApiCommandHandler {
    pub fn new(stores: Stores, propagator: PolicyPropagator, locks: Arc<SyncLocks>) -> Self {
        Self {
            stores,
            propagator,
            locks,
        }
    }

    /// 注册 API，`(path, method)` 全局唯一
    pub async fn handle_create(&self, cmd: CreateApiCommand) -> SyncResult<ApiEndpoint> {
        let fields = cmd.fields.normalized().map_err(SyncError::Validation)?;
        self.ensure_unique(&fields.path, &fields.method, None).await?;

        let mut api = ApiEndpoint::new(String::new(), String::new(), String::new());
        fields.apply_to(&mut api);
        api.id = self.stores.apis.create(&api).await?;

        info!(api_id = %api.id, path = %api.path, method = %api.method, "API registered");
        Ok(api)
    }

    /// 更新 API
    ///
    /// 路径或方法变化时把策略存储中 `(sub, 旧路径, 旧方法)` 的规则改写为新值，
    /// 并同步更新派生权限条目的编码。
    pub async fn handle_update(&self, cmd: UpdateApiCommand) -> SyncResult<PropagationReport> {
        let fields = cmd.fields.normalized().map_err(SyncError::Validation)?;

        let _shared = self.locks.shared().await;

        let mut api = self.load_api(cmd.api_id).await?;
        let old = api.clone();
        let moved = fields.path != old.path || fields.method != old.method;

        if moved {
            self.ensure_unique(&fields.path, &fields.method, Some(api.id)).await?;
        }
        fields.apply_to(&mut api);

        let derived = self.stores.permissions.find_by_api(api.id).await?;
        if let Some(ref permission) = derived
            && moved
            && let Some(holder) = self.stores.permissions.find_by_code(&api.permission_code()).await?
            && holder.id != permission.id
        {
            return Err(SyncError::DuplicateCode(api.permission_code()));
        }

        self.stores.apis.update(&api).await?;

        if let Some(mut permission) = derived {
            permission.code = api.permission_code();
            permission.name = api.name.clone();
            permission.enabled = api.enabled;
            self.stores.permissions.update(&permission).await?;
        }

        let mut report = PropagationReport::default();
        let mut rewritten_count = 0;
        if moved {
            let existing = self
                .propagator
                .policy()
                .get_filtered_policy(1, vec![old.path.clone(), old.method.clone()])
                .await?;
            let rewritten: Vec<PolicyRule> = existing
                .iter()
                .map(|rule| api.policy_rule(&rule.subject))
                .collect();
            rewritten_count = rewritten.len();

            report.merge(self.propagator.revoke(existing).await);
            report.merge(self.propagator.grant(rewritten).await);
        }

        info!(
            api_id = %api.id,
            path = %api.path,
            method = %api.method,
            rules_rewritten = rewritten_count,
            "API updated"
        );
        report.into_result()
    }

    /// 删除 API，级联删除菜单关联、派生权限条目和所有引用它的策略规则
    pub async fn handle_delete(&self, cmd: DeleteApiCommand) -> SyncResult<PropagationReport> {
        let _shared = self.locks.shared().await;

        let api = self.load_api(cmd.api_id).await?;

        self.stores.menu_apis.delete_by_api(api.id).await?;
        self.stores.permissions.delete_by_api(api.id).await?;
        self.stores.apis.delete(api.id).await?;

        let rules = self
            .propagator
            .policy()
            .get_filtered_policy(1, vec![api.path.clone(), api.method.clone()])
            .await?;
        let report = self.propagator.revoke(rules).await;

        info!(
            api_id = %api.id,
            path = %api.path,
            method = %api.method,
            rules_removed = report.changed,
            "API deleted"
        );
        report.into_result()
    }

    async fn load_api(&self, id: ApiId) -> SyncResult<ApiEndpoint> {
        self.stores
            .apis
            .find_by_id(id)
            .await?
            .ok_or_else(|| SyncError::not_found("api", id))
    }

    async fn ensure_unique(&self, path: &str, method: &str, except: Option<ApiId>) -> SyncResult<()> {
        match self.stores.apis.find_by_path_method(path, method).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(SyncError::DuplicateCode(format!("{}:{}", path, method)))
            }
            _ => Ok(()),
        }
    }
}
