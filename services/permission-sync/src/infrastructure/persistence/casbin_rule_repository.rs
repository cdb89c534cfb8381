//! PostgreSQL `casbin_rule` 仓储实现
//!
//! 表结构: `id, ptype, v0, v1, v2`，未使用的字段存空串。

use async_trait::async_trait;
use rbac_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::warn;

use super::error_mapper::map_sqlx_error;
use crate::infrastructure::policy::{CasbinRule, CasbinRuleRepository, PolicyType};

const FIELDS: usize = 3;

pub struct PostgresCasbinRuleRepository {
    pool: PgPool,
}

impl PostgresCasbinRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CasbinRuleRepository for PostgresCasbinRuleRepository {
    async fn load_all(&self) -> AppResult<Vec<CasbinRule>> {
        let rows = sqlx::query_as::<_, CasbinRuleRow>("SELECT ptype, v0, v1, v2 FROM casbin_rule ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().filter_map(CasbinRuleRow::into_rule).collect())
    }

    async fn insert(&self, rule: &CasbinRule) -> AppResult<()> {
        sqlx::query("INSERT INTO casbin_rule (ptype, v0, v1, v2) VALUES ($1, $2, $3, $4)")
            .bind(rule.ptype.as_str())
            .bind(rule.field(0))
            .bind(rule.field(1))
            .bind(rule.field(2))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, rule: &CasbinRule) -> AppResult<()> {
        sqlx::query("DELETE FROM casbin_rule WHERE ptype = $1 AND v0 = $2 AND v1 = $3 AND v2 = $4")
            .bind(rule.ptype.as_str())
            .bind(rule.field(0))
            .bind(rule.field(1))
            .bind(rule.field(2))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_filtered(
        &self,
        ptype: PolicyType,
        field_index: usize,
        field_values: &[String],
    ) -> AppResult<()> {
        if field_index + field_values.len() > FIELDS {
            return Err(AppError::validation(format!(
                "casbin_rule filter out of range: index {} with {} values",
                field_index,
                field_values.len()
            )));
        }

        let mut sql = String::from("DELETE FROM casbin_rule WHERE ptype = $1");
        let mut binds = Vec::new();
        for (offset, value) in field_values.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            binds.push(value.as_str());
            sql.push_str(&format!(" AND v{} = ${}", field_index + offset, binds.len() + 1));
        }

        let mut query = sqlx::query(&sql).bind(ptype.as_str());
        for value in binds {
            query = query.bind(value);
        }
        query.execute(&self.pool).await.map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CasbinRuleRow {
    ptype: String,
    v0: String,
    v1: String,
    v2: String,
}

impl CasbinRuleRow {
    fn into_rule(self) -> Option<CasbinRule> {
        let Some(ptype) = PolicyType::parse(&self.ptype) else {
            warn!(ptype = %self.ptype, "Skipping casbin_rule row with unknown ptype");
            return None;
        };

        let values = match ptype {
            PolicyType::Policy => vec![self.v0, self.v1, self.v2],
            PolicyType::Grouping => vec![self.v0, self.v1],
        };
        Some(CasbinRule { ptype, values })
    }
}
