//! PostgreSQL API 目录仓储实现

use async_trait::async_trait;
use rbac_common::Pagination;
use rbac_errors::AppResult;
use sqlx::PgPool;

use super::error_mapper::map_sqlx_error;
use crate::domain::api::{ApiEndpoint, ApiId, ApiRepository};

pub struct PostgresApiRepository {
    pool: PgPool,
}

impl PostgresApiRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiRepository for PostgresApiRepository {
    async fn create(&self, api: &ApiEndpoint) -> AppResult<ApiId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO apis (path, method, name, api_group, enabled)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&api.path)
        .bind(&api.method)
        .bind(&api.name)
        .bind(&api.group)
        .bind(api.enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(ApiId(id))
    }

    async fn update(&self, api: &ApiEndpoint) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE apis
            SET path = $2, method = $3, name = $4, api_group = $5, enabled = $6
            WHERE id = $1
            "#,
        )
        .bind(api.id.0)
        .bind(&api.path)
        .bind(&api.method)
        .bind(&api.name)
        .bind(&api.group)
        .bind(api.enabled)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: ApiId) -> AppResult<()> {
        sqlx::query("DELETE FROM apis WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: ApiId) -> AppResult<Option<ApiEndpoint>> {
        let row = sqlx::query_as::<_, ApiRow>(
            "SELECT id, path, method, name, api_group, enabled FROM apis WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ApiEndpoint::from))
    }

    async fn find_by_ids(&self, ids: &[ApiId]) -> AppResult<Vec<ApiEndpoint>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query_as::<_, ApiRow>(
            "SELECT id, path, method, name, api_group, enabled FROM apis WHERE id = ANY($1) ORDER BY id",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ApiEndpoint::from).collect())
    }

    async fn find_by_path_method(&self, path: &str, method: &str) -> AppResult<Option<ApiEndpoint>> {
        let row = sqlx::query_as::<_, ApiRow>(
            "SELECT id, path, method, name, api_group, enabled FROM apis WHERE path = $1 AND method = $2",
        )
        .bind(path)
        .bind(method)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ApiEndpoint::from))
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<ApiEndpoint>, u64)> {
        let rows = sqlx::query_as::<_, ApiRow>(
            r#"
            SELECT id, path, method, name, api_group, enabled
            FROM apis
            ORDER BY api_group, path, method
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.page_size as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM apis")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok((rows.into_iter().map(ApiEndpoint::from).collect(), total.max(0) as u64))
    }
}

#[derive(sqlx::FromRow)]
struct ApiRow {
    id: i64,
    path: String,
    method: String,
    name: String,
    api_group: String,
    enabled: bool,
}

impl From<ApiRow> for ApiEndpoint {
    fn from(row: ApiRow) -> Self {
        Self {
            id: ApiId(row.id),
            path: row.path,
            method: row.method,
            name: row.name,
            group: row.api_group,
            enabled: row.enabled,
        }
    }
}
