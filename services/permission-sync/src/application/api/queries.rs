//! API 相关查询定义

use crate::domain::api::ApiId;

#[derive(Debug, Clone)]
pub struct GetApiQuery {
    pub api_id: ApiId,
}

#[derive(Debug, Clone)]
pub struct ListApisQuery {
    pub page: u32,
    pub page_size: u32,
}
