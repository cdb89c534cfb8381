//! Casbin 模型
//!
//! 请求 / 规则均为 (sub, obj, act)；`g = _, _` 表示用户（或子角色）属于角色；
//! 路径用 `keyMatch2` 匹配，支持 `/users/:id` 形式的路径参数。

use casbin::DefaultModel;

use crate::domain::policy::{PolicyResult, PolicyStoreError};

pub const MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && keyMatch2(r.obj, p.obj) && r.act == p.act
"#;

/// 加载模型，未指定路径时使用内置模型
pub async fn load_model(path: Option<&str>) -> PolicyResult<DefaultModel> {
    match path {
        Some(path) => DefaultModel::from_file(path)
            .await
            .map_err(|e| PolicyStoreError::new(format!("failed to load casbin model {}: {}", path, e))),
        None => DefaultModel::from_str(MODEL)
            .await
            .map_err(|e| PolicyStoreError::new(format!("invalid embedded casbin model: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casbin::Model;

    #[test]
    fn test_model_string() {
        assert!(MODEL.contains("keyMatch2"));
        assert!(MODEL.contains("g = _, _"));
    }

    #[tokio::test]
    async fn test_embedded_model_builds() {
        let model = load_model(None).await.unwrap();
        let data = model.get_model();
        assert!(data.contains_key("r"));
        assert!(data.contains_key("p"));
        assert!(data.contains_key("g"));
    }

    #[tokio::test]
    async fn test_missing_model_file() {
        let Err(err) = load_model(Some("/nonexistent/model.conf")).await else {
            panic!("loading a missing model file should fail");
        };
        assert!(err.to_string().contains("/nonexistent/model.conf"));
    }
}
