//! API 类型权限条目的派生维护
//!
//! 这类条目只在菜单分配 API 时产生，不走公开的创建入口。

use tracing::{debug, warn};

use crate::application::stores::Stores;
use crate::domain::api::{ApiEndpoint, ApiId};
use crate::domain::menu::MenuId;
use crate::domain::permission::{Permission, PermissionType};
use crate::error::SyncResult;

/// 为 `source_menu` 插入或更新 API 的权限条目
///
/// 编码已被菜单 / 按钮条目占用时跳过并返回 `false`。
pub(crate) async fn upsert_api_permission(
    stores: &Stores,
    api: &ApiEndpoint,
    source_menu: MenuId,
) -> SyncResult<bool> {
    let derived = Permission::for_api(api, source_menu);

    if let Some(existing) = stores.permissions.find_by_code(&derived.code).await?
        && existing.permission_type != PermissionType::Api
    {
        warn!(
            code = %derived.code,
            permission_id = %existing.id,
            "Permission code already used by a non-API entry, skipping"
        );
        return Ok(false);
    }

    // 同一 API 的旧条目编码可能已过期（API 路径被改过）
    if let Some(stale) = stores.permissions.find_by_api(api.id).await?
        && stale.code != derived.code
    {
        stores.permissions.delete(stale.id).await?;
    }

    stores.permissions.upsert_by_code(&derived).await?;
    Ok(true)
}

/// 菜单不再关联某个 API 时处理它的权限条目
///
/// 仍有其他菜单关联该 API 时把来源改指向其中 ID 最小的菜单，否则删除条目。
pub(crate) async fn detach_api_permission(
    stores: &Stores,
    api_id: ApiId,
    from_menu: MenuId,
) -> SyncResult<()> {
    let Some(mut permission) = stores.permissions.find_by_api(api_id).await? else {
        return Ok(());
    };
    if permission.source_menu_id != Some(from_menu) {
        return Ok(());
    }

    let next = stores
        .menu_apis
        .list_menu_ids_for_api(api_id)
        .await?
        .into_iter()
        .filter(|id| *id != from_menu)
        .min();

    match next {
        Some(menu_id) => {
            permission.source_menu_id = Some(menu_id);
            stores.permissions.update(&permission).await?;
            debug!(api_id = %api_id, menu_id = %menu_id, "API permission re-pointed");
        }
        None => {
            stores.permissions.delete(permission.id).await?;
            debug!(api_id = %api_id, code = %permission.code, "API permission removed");
        }
    }
    Ok(())
}
