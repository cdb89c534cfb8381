//! 用户-角色分组查询处理器

use std::sync::Arc;

use tracing::debug;

use super::queries::*;
use crate::domain::api::normalize_method;
use crate::domain::policy::PolicyStore;
use crate::error::{SyncError, SyncResult};

pub struct UserRoleQueryHandler {
    policy: Arc<dyn PolicyStore>,
}

impl UserRoleQueryHandler {
    pub fn new(policy: Arc<dyn PolicyStore>) -> Self {
        Self { policy }
    }

    /// 以策略存储为准
    pub async fn handle_roles(&self, query: GetUserRolesQuery) -> SyncResult<Vec<String>> {
        let mut roles = self.policy.get_roles_for_user(&query.user_id).await?;
        roles.sort();
        Ok(roles)
    }

    pub async fn handle_check_access(&self, query: CheckAccessQuery) -> SyncResult<bool> {
        let method = normalize_method(&query.method)
            .ok_or_else(|| SyncError::validation(format!("Unsupported HTTP method '{}'", query.method)))?;

        let allowed = self.policy.enforce(&query.user_id, &query.path, &method).await?;
        debug!(
            user_id = %query.user_id,
            path = %query.path,
            method = %method,
            allowed,
            "Access checked"
        );
        Ok(allowed)
    }
}
