//! API 仓储接口

use async_trait::async_trait;
use rbac_common::Pagination;
use rbac_errors::AppResult;

use super::api::{ApiEndpoint, ApiId};

#[async_trait]
pub trait ApiRepository: Send + Sync {
    /// 创建 API，返回分配的 ID
    async fn create(&self, api: &ApiEndpoint) -> AppResult<ApiId>;

    async fn update(&self, api: &ApiEndpoint) -> AppResult<()>;

    async fn delete(&self, id: ApiId) -> AppResult<()>;

    async fn find_by_id(&self, id: ApiId) -> AppResult<Option<ApiEndpoint>>;

    /// 批量查找，忽略不存在的 ID
    async fn find_by_ids(&self, ids: &[ApiId]) -> AppResult<Vec<ApiEndpoint>>;

    async fn find_by_path_method(&self, path: &str, method: &str) -> AppResult<Option<ApiEndpoint>>;

    /// 分页列出，返回 (当前页, 总数)
    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<ApiEndpoint>, u64)>;
}
