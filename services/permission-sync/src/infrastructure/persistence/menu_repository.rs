//! PostgreSQL 菜单仓储实现

use async_trait::async_trait;
use rbac_adapter_postgres::TransactionManager;
use rbac_errors::{AppError, AppResult};
use sqlx::PgPool;

use super::error_mapper::{map_sqlx_error, parse_column};
use crate::domain::api::ApiId;
use crate::domain::menu::{Menu, MenuApiRepository, MenuId, MenuRepository};

const MENU_COLUMNS: &str =
    "id, parent_id, name, path, component, icon, order_num, menu_type, enabled, perms";

/// 菜单层级变更使用的事务级咨询锁键
const MENU_HIERARCHY_LOCK: i64 = 0x6d65_6e75;

pub struct PostgresMenuRepository {
    pool: PgPool,
    tx_manager: TransactionManager,
}

impl PostgresMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tx_manager: TransactionManager::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl MenuRepository for PostgresMenuRepository {
    async fn create(&self, menu: &Menu) -> AppResult<MenuId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO menus (parent_id, name, path, component, icon, order_num, menu_type, enabled, perms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(MenuId::to_raw(menu.parent_id))
        .bind(&menu.name)
        .bind(&menu.path)
        .bind(&menu.component)
        .bind(&menu.icon)
        .bind(menu.order_num)
        .bind(menu.menu_type.as_str())
        .bind(menu.enabled)
        .bind(&menu.perms)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(MenuId(id))
    }

    async fn update(&self, menu: &Menu) -> AppResult<()> {
        let mut tx = self.tx_manager.begin().await?;

        // 多个进程同时改挂时，由咨询锁串行化，并在锁内重新检查祖先链
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MENU_HIERARCHY_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if let Some(parent_id) = menu.parent_id {
            let cycle: bool = sqlx::query_scalar(
                r#"
                WITH RECURSIVE ancestors(id, parent_id) AS (
                    SELECT id, parent_id FROM menus WHERE id = $1
                    UNION
                    SELECT m.id, m.parent_id FROM menus m
                    JOIN ancestors a ON m.id = a.parent_id
                )
                SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)
                "#,
            )
            .bind(parent_id.0)
            .bind(menu.id.0)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            if cycle {
                return Err(AppError::failed_precondition(format!(
                    "moving menu {} under {} would create a cycle",
                    menu.id, parent_id
                )));
            }
        }

        sqlx::query(
            r#"
            UPDATE menus
            SET parent_id = $2, name = $3, path = $4, component = $5, icon = $6,
                order_num = $7, menu_type = $8, enabled = $9, perms = $10
            WHERE id = $1
            "#,
        )
        .bind(menu.id.0)
        .bind(MenuId::to_raw(menu.parent_id))
        .bind(&menu.name)
        .bind(&menu.path)
        .bind(&menu.component)
        .bind(&menu.icon)
        .bind(menu.order_num)
        .bind(menu.menu_type.as_str())
        .bind(menu.enabled)
        .bind(&menu.perms)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        TransactionManager::commit(tx).await
    }

    async fn delete(&self, id: MenuId) -> AppResult<()> {
        sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: MenuId) -> AppResult<Option<Menu>> {
        let row = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus WHERE id = $1",
            MENU_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(MenuRow::into_menu).transpose()
    }

    async fn find_by_ids(&self, ids: &[MenuId]) -> AppResult<Vec<Menu>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus WHERE id = ANY($1) ORDER BY order_num, id",
            MENU_COLUMNS
        ))
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(MenuRow::into_menu).collect()
    }

    async fn list_all(&self) -> AppResult<Vec<Menu>> {
        let rows = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus ORDER BY order_num, id",
            MENU_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(MenuRow::into_menu).collect()
    }

    async fn count_children(&self, id: MenuId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menus WHERE parent_id = $1")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count.max(0) as u64)
    }
}

#[derive(sqlx::FromRow)]
struct MenuRow {
    id: i64,
    parent_id: i64,
    name: String,
    path: String,
    component: String,
    icon: String,
    order_num: i32,
    menu_type: String,
    enabled: bool,
    perms: String,
}

impl MenuRow {
    fn into_menu(self) -> AppResult<Menu> {
        Ok(Menu {
            id: MenuId(self.id),
            parent_id: MenuId::from_raw(self.parent_id),
            name: self.name,
            path: self.path,
            component: self.component,
            icon: self.icon,
            order_num: self.order_num,
            menu_type: parse_column("menu_type", &self.menu_type)?,
            enabled: self.enabled,
            perms: self.perms,
        })
    }
}

/// PostgreSQL 菜单-API 关联仓储实现
pub struct PostgresMenuApiRepository {
    tx_manager: TransactionManager,
}

impl PostgresMenuApiRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tx_manager: TransactionManager::new(pool),
        }
    }
}

#[async_trait]
impl MenuApiRepository for PostgresMenuApiRepository {
    async fn replace_for_menu(&self, menu_id: MenuId, api_ids: &[ApiId]) -> AppResult<()> {
        let mut tx = self.tx_manager.begin().await?;

        // 锁住菜单行，串行化同一菜单的并发替换
        sqlx::query("SELECT id FROM menus WHERE id = $1 FOR UPDATE")
            .bind(menu_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM menu_apis WHERE menu_id = $1")
            .bind(menu_id.0)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !api_ids.is_empty() {
            let raw: Vec<i64> = api_ids.iter().map(|id| id.0).collect();
            sqlx::query(
                r#"
                INSERT INTO menu_apis (menu_id, api_id)
                SELECT $1, UNNEST($2::BIGINT[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(menu_id.0)
            .bind(&raw)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        TransactionManager::commit(tx).await
    }

    async fn list_api_ids(&self, menu_id: MenuId) -> AppResult<Vec<ApiId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT api_id FROM menu_apis WHERE menu_id = $1 ORDER BY api_id")
                .bind(menu_id.0)
                .fetch_all(self.tx_manager.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(ids.into_iter().map(ApiId).collect())
    }

    async fn list_menu_ids_for_api(&self, api_id: ApiId) -> AppResult<Vec<MenuId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT menu_id FROM menu_apis WHERE api_id = $1 ORDER BY menu_id")
                .bind(api_id.0)
                .fetch_all(self.tx_manager.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(ids.into_iter().map(MenuId).collect())
    }

    async fn delete_by_menu(&self, menu_id: MenuId) -> AppResult<()> {
        sqlx::query("DELETE FROM menu_apis WHERE menu_id = $1")
            .bind(menu_id.0)
            .execute(self.tx_manager.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_by_api(&self, api_id: ApiId) -> AppResult<()> {
        sqlx::query("DELETE FROM menu_apis WHERE api_id = $1")
            .bind(api_id.0)
            .execute(self.tx_manager.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
