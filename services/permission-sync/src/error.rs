//! 同步引擎错误类型

use rbac_errors::AppError;
use thiserror::Error;

use crate::domain::policy::PolicyStoreError;

/// 错误分类
///
/// 调用方据此区分"请求被直接拒绝"和"已部分生效、可安全重试"。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidPermissionShape,
    DuplicateCode,
    RoleInUse,
    InvalidMenuHierarchy,
    MenuHasChildren,
    Validation,
    PolicyStoreFailure,
    PersistenceFailure,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidPermissionShape => "invalid_permission_shape",
            ErrorKind::DuplicateCode => "duplicate_code",
            ErrorKind::RoleInUse => "role_in_use",
            ErrorKind::InvalidMenuHierarchy => "invalid_menu_hierarchy",
            ErrorKind::MenuHasChildren => "menu_has_children",
            ErrorKind::Validation => "validation",
            ErrorKind::PolicyStoreFailure => "policy_store_failure",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid permission shape: {0}")]
    InvalidPermissionShape(String),

    #[error("Duplicate code: {0}")]
    DuplicateCode(String),

    #[error("Role '{code}' is still assigned to {users} user(s)")]
    RoleInUse { code: String, users: usize },

    #[error("Invalid menu hierarchy: {0}")]
    InvalidMenuHierarchy(String),

    #[error("Menu {0} has children")]
    MenuHasChildren(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    PolicyStore(#[from] PolicyStoreError),

    /// 关系型数据已提交，但部分策略规则写入失败
    #[error("Partially applied: {failed} of {attempted} policy writes failed")]
    PartiallyApplied { attempted: usize, failed: usize },

    #[error("Persistence failure: {0}")]
    Persistence(AppError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SyncError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotFound { .. } => ErrorKind::NotFound,
            SyncError::InvalidPermissionShape(_) => ErrorKind::InvalidPermissionShape,
            SyncError::DuplicateCode(_) => ErrorKind::DuplicateCode,
            SyncError::RoleInUse { .. } => ErrorKind::RoleInUse,
            SyncError::InvalidMenuHierarchy(_) => ErrorKind::InvalidMenuHierarchy,
            SyncError::MenuHasChildren(_) => ErrorKind::MenuHasChildren,
            SyncError::Validation(_) => ErrorKind::Validation,
            SyncError::PolicyStore(_) | SyncError::PartiallyApplied { .. } => {
                ErrorKind::PolicyStoreFailure
            }
            SyncError::Persistence(_) => ErrorKind::PersistenceFailure,
            SyncError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// 请求被直接拒绝，未产生任何写入
    pub fn is_rejected(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::InvalidPermissionShape
                | ErrorKind::DuplicateCode
                | ErrorKind::RoleInUse
                | ErrorKind::InvalidMenuHierarchy
                | ErrorKind::MenuHasChildren
                | ErrorKind::Validation
        )
    }

    /// 部分生效，重试或全量同步可以修复
    pub fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            SyncError::PolicyStore(_) | SyncError::PartiallyApplied { .. } | SyncError::Cancelled
        )
    }
}

impl From<AppError> for SyncError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Conflict(msg) => SyncError::DuplicateCode(msg),
            other => SyncError::Persistence(other),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::NotFound { .. } => AppError::NotFound(error.to_string()),
            SyncError::InvalidPermissionShape(_)
            | SyncError::InvalidMenuHierarchy(_)
            | SyncError::Validation(_) => AppError::Validation(error.to_string()),
            SyncError::DuplicateCode(_) => AppError::Conflict(error.to_string()),
            SyncError::RoleInUse { .. } | SyncError::MenuHasChildren(_) => {
                AppError::FailedPrecondition(error.to_string())
            }
            SyncError::PolicyStore(_) | SyncError::PartiallyApplied { .. } => {
                AppError::ExternalService(error.to_string())
            }
            SyncError::Persistence(inner) => inner,
            SyncError::Cancelled => AppError::Internal(error.to_string()),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
