//! 用户-角色分组查询定义

/// 用户直接所属的角色编码查询
#[derive(Debug, Clone)]
pub struct GetUserRolesQuery {
    pub user_id: String,
}

/// 请求时授权判定
#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub user_id: String,
    pub path: String,
    pub method: String,
}
