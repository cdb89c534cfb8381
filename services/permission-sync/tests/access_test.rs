//! 用户角色、用户视图和角色生命周期测试

mod support;

use std::time::Duration;

use permission_sync::application::SyncOptions;
use permission_sync::application::menu::MenuFields;
use permission_sync::application::role::{CreateRoleCommand, UpdateRoleCommand};
use permission_sync::domain::menu::{MenuId, MenuType};
use permission_sync::domain::policy::{GroupingRule, PolicyStore};
use permission_sync::{ErrorKind, SyncError};
use support::{Harness, rule};
use tokio_util::sync::CancellationToken;

// ============ User Role Tests ============

#[tokio::test]
async fn test_assign_roles_replaces_previous_set() {
    let h = Harness::new().await;
    h.role("admin").await;
    h.role("auditor").await;
    h.role("editor").await;

    h.engine
        .assign_roles_to_user("alice", vec!["admin".to_string(), "auditor".to_string()])
        .await
        .unwrap();
    h.engine
        .assign_roles_to_user("alice", vec!["auditor".to_string(), "editor".to_string()])
        .await
        .unwrap();

    assert_eq!(
        h.engine.user_roles("alice").await.unwrap(),
        vec!["auditor".to_string(), "editor".to_string()]
    );
    assert_eq!(
        h.db.user_role_rows(),
        vec![
            ("alice".to_string(), "auditor".to_string()),
            ("alice".to_string(), "editor".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_assign_unknown_role_changes_nothing() {
    let h = Harness::new().await;
    h.role("admin").await;
    h.engine
        .assign_roles_to_user("alice", vec!["admin".to_string()])
        .await
        .unwrap();

    let err = h
        .engine
        .assign_roles_to_user("alice", vec!["ghost".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound { entity: "role", .. }));
    assert_eq!(h.engine.user_roles("alice").await.unwrap(), vec!["admin".to_string()]);
}

#[tokio::test]
async fn test_empty_role_list_clears_user() {
    let h = Harness::new().await;
    h.role("admin").await;
    h.engine
        .assign_roles_to_user("alice", vec!["admin".to_string()])
        .await
        .unwrap();

    h.engine.assign_roles_to_user("alice", vec![]).await.unwrap();
    assert!(h.engine.user_roles("alice").await.unwrap().is_empty());
    assert!(h.db.user_role_rows().is_empty());
}

#[tokio::test]
async fn test_rebuild_mirror_follows_policy_store() {
    let h = Harness::new().await;
    h.role("admin").await;
    h.role("auditor").await;
    h.engine
        .assign_roles_to_user("alice", vec!["admin".to_string()])
        .await
        .unwrap();

    // 绕过引擎直接写策略存储: 一条用户分组、一条角色继承、一条指向未知角色
    h.policy.add_grouping_policy(&GroupingRule::new("bob", "auditor")).await.unwrap();
    h.policy.add_grouping_policy(&GroupingRule::new("admin", "auditor")).await.unwrap();
    h.policy.add_grouping_policy(&GroupingRule::new("carol", "ghost")).await.unwrap();

    let written = h.engine.rebuild_user_role_mirror().await.unwrap();
    assert_eq!(written, 2);
    assert_eq!(
        h.db.user_role_rows(),
        vec![
            ("alice".to_string(), "admin".to_string()),
            ("bob".to_string(), "auditor".to_string()),
        ]
    );
}

// ============ User View Tests ============

#[tokio::test]
async fn test_user_tree_and_perms_are_union_of_roles() {
    let h = Harness::new().await;
    let admin = h.role("admin").await;
    let auditor = h.role("auditor").await;

    let system = h.menu("System", None).await;
    let mut users = MenuFields::new("Users", MenuType::Menu);
    users.parent_id = Some(system.id);
    users.perms = "system:user:list".to_string();
    let users = h.engine.create_menu(users).await.unwrap();
    let mut logs = MenuFields::new("Logs", MenuType::Menu);
    logs.parent_id = Some(system.id);
    logs.perms = " system:log:list ".to_string();
    logs.order_num = 1;
    let logs = h.engine.create_menu(logs).await.unwrap();
    let mut hidden = MenuFields::new("Hidden", MenuType::Menu);
    hidden.perms = "system:hidden".to_string();
    hidden.enabled = false;
    let hidden = h.engine.create_menu(hidden).await.unwrap();

    h.engine
        .assign_menus_to_role(admin.id, vec![system.id, users.id, hidden.id])
        .await
        .unwrap();
    h.engine
        .assign_menus_to_role(auditor.id, vec![system.id, logs.id])
        .await
        .unwrap();
    h.engine
        .assign_roles_to_user("alice", vec!["admin".to_string(), "auditor".to_string()])
        .await
        .unwrap();

    let tree = h.engine.build_user_tree("alice").await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].menu.id, system.id);
    let children: Vec<MenuId> = tree[0].children.iter().map(|n| n.menu.id).collect();
    assert_eq!(children, vec![users.id, logs.id]);

    let perms = h.engine.get_menu_perms_by_user_id("alice").await.unwrap();
    assert_eq!(perms, vec!["system:log:list".to_string(), "system:user:list".to_string()]);
}

#[tokio::test]
async fn test_user_without_roles_sees_nothing() {
    let h = Harness::new().await;
    h.menu_with_perms("Users", "system:user:list").await;

    assert!(h.engine.build_user_tree("nobody").await.unwrap().is_empty());
    assert!(h.engine.get_menu_perms_by_user_id("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_check_access_rejects_unknown_method() {
    let h = Harness::new().await;
    let err = h.engine.check_access("alice", "/users", "FETCH").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// ============ Role Lifecycle Tests ============

#[tokio::test]
async fn test_create_role_validates_code() {
    let h = Harness::new().await;
    h.role("admin").await;

    let duplicate = CreateRoleCommand {
        code: "admin".to_string(),
        name: "Again".to_string(),
        enabled: true,
        sort: 0,
    };
    let err = h.engine.create_role(duplicate).await.unwrap_err();
    assert!(matches!(err, SyncError::DuplicateCode(_)));

    let spaced = CreateRoleCommand {
        code: "super admin".to_string(),
        name: "Super".to_string(),
        enabled: true,
        sort: 0,
    };
    let err = h.engine.create_role(spaced).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
}

#[tokio::test]
async fn test_update_role_keeps_code_and_rules() {
    let h = Harness::new().await;
    let admin = h.role("admin").await;
    let menu = h.menu("Users", None).await;
    let api = h.api("/users", "GET").await;
    h.engine.assign_apis_to_menu(menu.id, vec![api.id]).await.unwrap();
    h.engine.assign_menus_to_role(admin.id, vec![menu.id]).await.unwrap();

    let updated = h
        .engine
        .update_role(UpdateRoleCommand {
            role_id: admin.id,
            name: "Administrators".to_string(),
            enabled: false,
            sort: 9,
        })
        .await
        .unwrap();
    assert_eq!(updated.code, "admin");
    assert!(!updated.enabled);
    assert_eq!(h.rules_for(&admin).await, vec![rule("admin", "/users", "GET")]);
}

#[tokio::test]
async fn test_list_roles_sorted() {
    let h = Harness::new().await;
    for (code, sort) in [("c", 2), ("a", 1), ("b", 1)] {
        h.engine
            .create_role(CreateRoleCommand {
                code: code.to_string(),
                name: code.to_string(),
                enabled: true,
                sort,
            })
            .await
            .unwrap();
    }

    let codes: Vec<String> = h
        .engine
        .list_roles()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.code)
        .collect();
    // sort 相同按创建顺序
    assert_eq!(codes, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_delete_role_in_use_is_rejected() {
    let h = Harness::new().await;
    let admin = h.role("admin").await;
    let menu = h.menu("Users", None).await;
    let list = h.api("/users", "GET").await;
    let create = h.api("/users", "POST").await;
    h.engine
        .assign_apis_to_menu(menu.id, vec![list.id, create.id])
        .await
        .unwrap();
    h.engine.assign_menus_to_role(admin.id, vec![menu.id]).await.unwrap();
    h.engine
        .assign_roles_to_user("alice", vec!["admin".to_string()])
        .await
        .unwrap();

    let menus_before = h.engine.role_menu_ids(admin.id).await.unwrap();
    let rules_before = h.rules_for(&admin).await;
    assert_eq!(rules_before.len(), 2);

    let err = h.engine.delete_role(admin.id).await.unwrap_err();
    assert!(matches!(err, SyncError::RoleInUse { users: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::RoleInUse);
    assert!(err.is_rejected());

    // 角色、菜单关联、规则和用户分组全部保持原样
    assert!(h.engine.get_role(admin.id).await.is_ok());
    assert_eq!(h.engine.role_menu_ids(admin.id).await.unwrap(), menus_before);
    assert_eq!(h.rules_for(&admin).await, rules_before);
    assert_eq!(h.engine.user_roles("alice").await.unwrap(), vec!["admin".to_string()]);
    assert_eq!(h.db.user_role_rows(), vec![("alice".to_string(), "admin".to_string())]);
    assert!(h.engine.check_access("alice", "/users", "POST").await.unwrap());
}

#[tokio::test]
async fn test_assign_during_role_delete_waits_for_delete() {
    let h = Harness::new().await;
    let admin = h.role("admin").await;
    let gate = h.policy.pause_next_users_lookup();

    let delete = h.engine.delete_role(admin.id);
    let assign = async {
        // 删除已确认无人引用，停在删除分组之前
        gate.reached.notified().await;
        let assign = h.engine.assign_roles_to_user("alice", vec!["admin".to_string()]);
        tokio::pin!(assign);
        let early = tokio::time::timeout(Duration::from_millis(50), &mut assign).await;
        assert!(early.is_err(), "assignment must wait for the role lock");
        gate.release.notify_one();
        assign.await
    };

    let (deleted, assigned) = tokio::join!(delete, assign);
    deleted.unwrap();
    assert!(matches!(assigned, Err(SyncError::NotFound { entity: "role", .. })));
    assert!(h.engine.user_roles("alice").await.unwrap().is_empty());
    assert!(h.db.user_role_rows().is_empty());
}

#[tokio::test]
async fn test_delete_role_removes_links_and_rules() {
    let h = Harness::new().await;
    let admin = h.role("admin").await;
    let menu = h.menu("Users", None).await;
    let api = h.api("/users", "GET").await;
    h.engine.assign_apis_to_menu(menu.id, vec![api.id]).await.unwrap();
    h.engine.assign_menus_to_role(admin.id, vec![menu.id]).await.unwrap();
    h.engine
        .assign_roles_to_user("bob", vec!["admin".to_string()])
        .await
        .unwrap();
    h.engine.delete_role(admin.id).await.unwrap_err();

    h.engine.assign_roles_to_user("bob", vec![]).await.unwrap();
    h.engine.delete_role(admin.id).await.unwrap();

    assert!(matches!(
        h.engine.get_role(admin.id).await,
        Err(SyncError::NotFound { .. })
    ));
    assert!(h.db.role_menu_links().is_empty());
    assert!(h.policy.get_filtered_policy(0, vec!["admin".to_string()]).await.unwrap().is_empty());
    assert!(!h.engine.check_access("bob", "/users", "GET").await.unwrap());

    // 同编码重建的角色不会继承旧规则
    let recreated = h.role("admin").await;
    assert!(h.rules_for(&recreated).await.is_empty());
}

#[tokio::test]
async fn test_delete_role_keeps_row_when_policy_store_fails() {
    let h = Harness::new().await;
    let admin = h.role("admin").await;

    h.policy.set_failing(true);
    let err = h.engine.delete_role(admin.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyStoreFailure);
    assert!(h.engine.get_role(admin.id).await.is_ok());

    h.policy.set_failing(false);
    h.engine.delete_role(admin.id).await.unwrap();
}

// ============ Resync Tests ============

#[tokio::test]
async fn test_resync_reaches_fixed_point() {
    let h = Harness::new().await;
    let admin = h.role("admin").await;
    let menu = h.menu("Users", None).await;
    let api = h.api("/users", "GET").await;
    h.engine.assign_apis_to_menu(menu.id, vec![api.id]).await.unwrap();
    h.engine.assign_menus_to_role(admin.id, vec![menu.id]).await.unwrap();

    // 外部删掉一条应有的规则，再塞一条不应有的
    h.policy.remove_policy(&rule("admin", "/users", "GET")).await.unwrap();
    h.policy.add_policy(&rule("admin", "/secrets", "GET")).await.unwrap();
    h.policy.add_policy(&rule("alice", "/secrets", "GET")).await.unwrap();

    let first = h.engine.prune_stale_policies().await.unwrap();
    assert_eq!(first.menus_scanned, 1);
    assert_eq!(first.roles_scanned, 1);
    assert_eq!(first.rules_added, 1);
    assert_eq!(first.rules_pruned, 1);

    let second = h.engine.prune_stale_policies().await.unwrap();
    assert!(second.is_fixed_point());

    assert_eq!(h.rules_for(&admin).await, vec![rule("admin", "/users", "GET")]);
    // 非角色主体不在剪枝范围内
    assert!(h.policy.enforce("alice", "/secrets", "GET").await.unwrap());
}

#[tokio::test]
async fn test_resync_without_prune_keeps_extra_rules() {
    let h = Harness::new().await;
    let admin = h.role("admin").await;
    h.policy.add_policy(&rule("admin", "/secrets", "GET")).await.unwrap();

    let report = h.engine.resync(SyncOptions::with_prune(false)).await.unwrap();
    assert_eq!(report.rules_pruned, 0);
    assert_eq!(h.rules_for(&admin).await, vec![rule("admin", "/secrets", "GET")]);

    let report = h.engine.sync_menu_api_permissions().await.unwrap();
    assert_eq!(report.rules_pruned, 0);
    assert_eq!(h.rules_for(&admin).await, vec![rule("admin", "/secrets", "GET")]);
}

#[tokio::test]
async fn test_cancelled_resync_stops() {
    let h = Harness::new().await;
    h.menu("Users", None).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h
        .engine
        .resync(SyncOptions { prune: true, cancel })
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));
    assert!(err.is_retry_safe());
}
