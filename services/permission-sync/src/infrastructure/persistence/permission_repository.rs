//! PostgreSQL 权限字典仓储实现
//!
//! 外键列使用 0 表示未设置。

use async_trait::async_trait;
use rbac_common::Pagination;
use rbac_errors::AppResult;
use sqlx::PgPool;

use super::error_mapper::{map_sqlx_error, parse_column};
use crate::domain::api::ApiId;
use crate::domain::menu::MenuId;
use crate::domain::permission::{Permission, PermissionId, PermissionRepository};

const PERMISSION_COLUMNS: &str =
    "id, name, code, permission_type, menu_id, button_id, api_id, source_menu_id, enabled";

pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: i64) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {} FROM permissions WHERE {} = $1",
            PERMISSION_COLUMNS, clause
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(PermissionRow::into_permission).transpose()
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn create(&self, permission: &Permission) -> AppResult<PermissionId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO permissions (name, code, permission_type, menu_id, button_id, api_id, source_menu_id, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&permission.name)
        .bind(&permission.code)
        .bind(permission.permission_type.as_str())
        .bind(MenuId::to_raw(permission.menu_id))
        .bind(MenuId::to_raw(permission.button_id))
        .bind(ApiId::to_raw(permission.api_id))
        .bind(MenuId::to_raw(permission.source_menu_id))
        .bind(permission.enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(PermissionId(id))
    }

    async fn update(&self, permission: &Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE permissions
            SET name = $2, code = $3, permission_type = $4, menu_id = $5, button_id = $6,
                api_id = $7, source_menu_id = $8, enabled = $9
            WHERE id = $1
            "#,
        )
        .bind(permission.id.0)
        .bind(&permission.name)
        .bind(&permission.code)
        .bind(permission.permission_type.as_str())
        .bind(MenuId::to_raw(permission.menu_id))
        .bind(MenuId::to_raw(permission.button_id))
        .bind(ApiId::to_raw(permission.api_id))
        .bind(MenuId::to_raw(permission.source_menu_id))
        .bind(permission.enabled)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn upsert_by_code(&self, permission: &Permission) -> AppResult<PermissionId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO permissions (name, code, permission_type, menu_id, button_id, api_id, source_menu_id, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (code) DO UPDATE
            SET name = EXCLUDED.name,
                permission_type = EXCLUDED.permission_type,
                menu_id = EXCLUDED.menu_id,
                button_id = EXCLUDED.button_id,
                api_id = EXCLUDED.api_id,
                source_menu_id = EXCLUDED.source_menu_id,
                enabled = EXCLUDED.enabled
            RETURNING id
            "#,
        )
        .bind(&permission.name)
        .bind(&permission.code)
        .bind(permission.permission_type.as_str())
        .bind(MenuId::to_raw(permission.menu_id))
        .bind(MenuId::to_raw(permission.button_id))
        .bind(ApiId::to_raw(permission.api_id))
        .bind(MenuId::to_raw(permission.source_menu_id))
        .bind(permission.enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(PermissionId(id))
    }

    async fn delete(&self, id: PermissionId) -> AppResult<()> {
        sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        self.fetch_one_where("id", id.0).await
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {} FROM permissions WHERE code = $1",
            PERMISSION_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(PermissionRow::into_permission).transpose()
    }

    async fn find_by_api(&self, api_id: ApiId) -> AppResult<Option<Permission>> {
        self.fetch_one_where("api_id", api_id.0).await
    }

    async fn list_by_menu(&self, menu_id: MenuId) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            SELECT {} FROM permissions
            WHERE menu_id = $1 OR button_id = $1 OR source_menu_id = $1
            ORDER BY id
            "#,
            PERMISSION_COLUMNS
        ))
        .bind(menu_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<Permission>, u64)> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {} FROM permissions ORDER BY permission_type, code LIMIT $1 OFFSET $2",
            PERMISSION_COLUMNS
        ))
        .bind(pagination.page_size as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = rows
            .into_iter()
            .map(PermissionRow::into_permission)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((items, total.max(0) as u64))
    }

    async fn delete_by_api(&self, api_id: ApiId) -> AppResult<()> {
        sqlx::query("DELETE FROM permissions WHERE api_id = $1")
            .bind(api_id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PermissionRow {
    id: i64,
    name: String,
    code: String,
    permission_type: String,
    menu_id: i64,
    button_id: i64,
    api_id: i64,
    source_menu_id: i64,
    enabled: bool,
}

impl PermissionRow {
    fn into_permission(self) -> AppResult<Permission> {
        Ok(Permission {
            id: PermissionId(self.id),
            name: self.name,
            code: self.code,
            permission_type: parse_column("permission_type", &self.permission_type)?,
            menu_id: MenuId::from_raw(self.menu_id),
            button_id: MenuId::from_raw(self.button_id),
            api_id: ApiId::from_raw(self.api_id),
            source_menu_id: MenuId::from_raw(self.source_menu_id),
            enabled: self.enabled,
        })
    }
}
