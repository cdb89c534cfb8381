//! PostgreSQL 用户-角色镜像仓储实现

use async_trait::async_trait;
use rbac_adapter_postgres::{IsolationLevel, TransactionManager};
use rbac_errors::AppResult;
use sqlx::PgPool;

use super::error_mapper::map_sqlx_error;
use crate::domain::policy::GroupingRule;
use crate::domain::role::UserRoleRepository;

pub struct PostgresUserRoleRepository {
    tx_manager: TransactionManager,
}

impl PostgresUserRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tx_manager: TransactionManager::new(pool),
        }
    }
}

#[async_trait]
impl UserRoleRepository for PostgresUserRoleRepository {
    async fn replace_for_user(&self, user_id: &str, role_codes: &[String]) -> AppResult<()> {
        let mut tx = self.tx_manager.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !role_codes.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_code)
                SELECT $1, UNNEST($2::TEXT[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(role_codes)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        TransactionManager::commit(tx).await
    }

    async fn list_role_codes(&self, user_id: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar("SELECT role_code FROM user_roles WHERE user_id = $1 ORDER BY role_code")
            .bind(user_id)
            .fetch_all(self.tx_manager.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_users_for_role(&self, role_code: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar("SELECT user_id FROM user_roles WHERE role_code = $1 ORDER BY user_id")
            .bind(role_code)
            .fetch_all(self.tx_manager.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn replace_all(&self, groupings: &[GroupingRule]) -> AppResult<()> {
        let users: Vec<&str> = groupings.iter().map(|g| g.user.as_str()).collect();
        let roles: Vec<&str> = groupings.iter().map(|g| g.role.as_str()).collect();

        // 整表替换，与并发的 replace_for_user 串行化
        let mut tx = self
            .tx_manager
            .begin_with_isolation(IsolationLevel::Serializable)
            .await?;

        sqlx::query("DELETE FROM user_roles")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !groupings.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_code)
                SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&users)
            .bind(&roles)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        TransactionManager::commit(tx).await
    }
}
