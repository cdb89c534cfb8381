//! 数据库错误映射工具
//!
//! 提供统一的 SQLx 错误到 AppError 的转换

use rbac_errors::AppError;

/// 将 SQLx 错误转换为 AppError，区分不同错误类型
pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    // PostgreSQL 约束违规代码
                    "23505" => AppError::conflict(format!(
                        "Duplicate entry violates unique constraint{}",
                        db_err
                            .constraint()
                            .map(|c| format!(" '{}'", c))
                            .unwrap_or_default()
                    )),
                    "23503" => AppError::validation("Foreign key constraint violation"),
                    "23514" => AppError::validation("Check constraint violation"),
                    "23502" => AppError::validation("Not null constraint violation"),
                    "22001" => AppError::validation("String data too long"),
                    "40001" => AppError::database("Serialization failure, retry the transaction"),
                    _ => AppError::database(format!("Database error ({}): {}", code, db_err)),
                }
            } else {
                AppError::database(db_err.to_string())
            }
        }
        sqlx::Error::PoolTimedOut => AppError::internal("Database connection pool timeout"),
        sqlx::Error::PoolClosed => AppError::internal("Database connection pool is closed"),
        sqlx::Error::Protocol(msg) => AppError::internal(format!("Database protocol error: {}", msg)),
        _ => AppError::database(e.to_string()),
    }
}

/// 解析存储层的枚举文本列
pub(crate) fn parse_column<T>(column: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse()
        .map_err(|e| AppError::database(format!("Invalid value in column {}: {}", column, e)))
}
