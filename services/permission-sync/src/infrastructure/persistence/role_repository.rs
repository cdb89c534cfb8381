//! PostgreSQL 角色仓储实现

use async_trait::async_trait;
use rbac_adapter_postgres::TransactionManager;
use rbac_errors::AppResult;
use sqlx::PgPool;

use super::error_mapper::map_sqlx_error;
use crate::domain::menu::MenuId;
use crate::domain::role::{Role, RoleId, RoleMenuRepository, RoleRepository};

pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn create(&self, role: &Role) -> AppResult<RoleId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO roles (name, code, enabled, sort)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&role.name)
        .bind(&role.code)
        .bind(role.enabled)
        .bind(role.sort)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(RoleId(id))
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        sqlx::query("UPDATE roles SET name = $2, enabled = $3, sort = $4 WHERE id = $1")
            .bind(role.id.0)
            .bind(&role.name)
            .bind(role.enabled)
            .bind(role.sort)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: RoleId) -> AppResult<()> {
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT id, name, code, enabled, sort FROM roles WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Role::from))
    }

    async fn find_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, code, enabled, sort FROM roles WHERE id = ANY($1) ORDER BY sort, id",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn find_by_codes(&self, codes: &[String]) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, code, enabled, sort FROM roles WHERE code = ANY($1) ORDER BY sort, id",
        )
        .bind(codes)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn exists_by_code(&self, code: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(exists)
    }

    async fn list_all(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>("SELECT id, name, code, enabled, sort FROM roles ORDER BY sort, id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Role::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    code: String,
    enabled: bool,
    sort: i32,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId(row.id),
            name: row.name,
            code: row.code,
            enabled: row.enabled,
            sort: row.sort,
        }
    }
}

/// PostgreSQL 角色-菜单关联仓储实现
pub struct PostgresRoleMenuRepository {
    tx_manager: TransactionManager,
}

impl PostgresRoleMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tx_manager: TransactionManager::new(pool),
        }
    }
}

#[async_trait]
impl RoleMenuRepository for PostgresRoleMenuRepository {
    async fn replace_for_role(&self, role_id: RoleId, menu_ids: &[MenuId]) -> AppResult<()> {
        let mut tx = self.tx_manager.begin().await?;

        // 锁住角色行，两个并发替换不会交错执行删除和插入
        sqlx::query("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
            .bind(role_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(role_id.0)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !menu_ids.is_empty() {
            let raw: Vec<i64> = menu_ids.iter().map(|id| id.0).collect();
            sqlx::query(
                r#"
                INSERT INTO role_menus (role_id, menu_id)
                SELECT $1, UNNEST($2::BIGINT[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role_id.0)
            .bind(&raw)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        TransactionManager::commit(tx).await
    }

    async fn list_menu_ids(&self, role_id: RoleId) -> AppResult<Vec<MenuId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT menu_id FROM role_menus WHERE role_id = $1 ORDER BY menu_id")
                .bind(role_id.0)
                .fetch_all(self.tx_manager.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(ids.into_iter().map(MenuId).collect())
    }

    async fn list_menu_ids_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<MenuId>> {
        let raw: Vec<i64> = role_ids.iter().map(|id| id.0).collect();
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT menu_id FROM role_menus WHERE role_id = ANY($1) ORDER BY menu_id",
        )
        .bind(&raw)
        .fetch_all(self.tx_manager.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ids.into_iter().map(MenuId).collect())
    }

    async fn list_role_ids_for_menu(&self, menu_id: MenuId) -> AppResult<Vec<RoleId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT role_id FROM role_menus WHERE menu_id = $1 ORDER BY role_id")
                .bind(menu_id.0)
                .fetch_all(self.tx_manager.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(ids.into_iter().map(RoleId).collect())
    }

    async fn delete_by_role(&self, role_id: RoleId) -> AppResult<()> {
        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(role_id.0)
            .execute(self.tx_manager.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_by_menu(&self, menu_id: MenuId) -> AppResult<()> {
        sqlx::query("DELETE FROM role_menus WHERE menu_id = $1")
            .bind(menu_id.0)
            .execute(self.tx_manager.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
