//! 用户-角色分组命令定义

/// 为用户分配角色命令（整体替换）
#[derive(Debug, Clone)]
pub struct AssignRolesToUserCommand {
    pub user_id: String,
    pub role_codes: Vec<String>,
}

impl AssignRolesToUserCommand {
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("User ID cannot be empty".to_string());
        }
        if self.user_id.contains(',') {
            return Err("User ID cannot contain ','".to_string());
        }
        Ok(())
    }
}
