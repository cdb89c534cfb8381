//! API 查询处理器

use rbac_common::{PagedResult, Pagination};

use super::queries::*;
use crate::application::stores::Stores;
use crate::domain::api::ApiEndpoint;
use crate::error::{SyncError, SyncResult};

pub struct ApiQueryHandler {
    stores: Stores,
}

impl ApiQueryHandler {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn handle_get(&self, query: GetApiQuery) -> SyncResult<ApiEndpoint> {
        self.stores
            .apis
            .find_by_id(query.api_id)
            .await?
            .ok_or_else(|| SyncError::not_found("api", query.api_id))
    }

    pub async fn handle_list(&self, query: ListApisQuery) -> SyncResult<PagedResult<ApiEndpoint>> {
        let pagination = Pagination::new(query.page, query.page_size);
        let (items, total) = self.stores.apis.list(&pagination).await?;
        Ok(PagedResult::new(items, total, &pagination))
    }
}
