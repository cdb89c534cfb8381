//! PostgreSQL 事务管理

use rbac_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

/// 事务隔离级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    /// 读已提交（PostgreSQL 默认）
    #[default]
    ReadCommitted,
    /// 可串行化
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }

    /// 生成 SET TRANSACTION 语句
    pub fn to_set_sql(&self) -> String {
        format!("SET TRANSACTION ISOLATION LEVEL {}", self.as_sql())
    }
}

/// 事务管理器
///
/// 关联表的"整体替换"写入（先删后插）必须在同一事务内完成。
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
}

impl TransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 开始事务（默认隔离级别）
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))
    }

    /// 开始指定隔离级别的事务
    pub async fn begin_with_isolation(
        &self,
        level: IsolationLevel,
    ) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.begin().await?;

        if level != IsolationLevel::ReadCommitted {
            sqlx::query(&level.to_set_sql())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::database(format!("Failed to set isolation level: {}", e))
                })?;
            debug!(isolation = level.as_sql(), "Transaction isolation set");
        }

        Ok(tx)
    }

    /// 提交事务
    pub async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))
    }
}
