//! 集成测试共享的内存仓储和策略存储

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;
use permission_sync::application::Stores;
use permission_sync::application::api::ApiFields;
use permission_sync::application::menu::MenuFields;
use permission_sync::application::role::CreateRoleCommand;
use permission_sync::domain::api::{ApiEndpoint, ApiId, ApiRepository};
use permission_sync::domain::menu::{Menu, MenuApiRepository, MenuId, MenuRepository, MenuType};
use permission_sync::domain::permission::{Permission, PermissionId, PermissionRepository};
use permission_sync::domain::policy::{GroupingRule, PolicyResult, PolicyRule, PolicyStore, PolicyStoreError};
use permission_sync::domain::role::{Role, RoleId, RoleMenuRepository, RoleRepository, UserRoleRepository};
use permission_sync::infrastructure::policy::CasbinPolicyStore;
use permission_sync::{EngineOptions, PermissionSyncEngine};
use rbac_common::Pagination;
use rbac_errors::{AppError, AppResult};

#[derive(Default)]
struct State {
    next_id: i64,
    menus: BTreeMap<MenuId, Menu>,
    apis: BTreeMap<ApiId, ApiEndpoint>,
    permissions: BTreeMap<PermissionId, Permission>,
    roles: BTreeMap<RoleId, Role>,
    menu_apis: BTreeSet<(MenuId, ApiId)>,
    role_menus: BTreeSet<(RoleId, MenuId)>,
    user_roles: BTreeSet<(String, String)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// 一个结构体同时实现全部仓储接口，行为对齐 Postgres 实现的唯一约束
#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<State>,
}

impl MemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// 绕过处理器直接写入一条权限条目（模拟外部写入）
    pub fn insert_permission(&self, mut permission: Permission) -> PermissionId {
        let mut state = self.state();
        permission.id = PermissionId(state.next_id());
        let id = permission.id;
        state.permissions.insert(id, permission);
        id
    }

    pub fn permissions(&self) -> Vec<Permission> {
        self.state().permissions.values().cloned().collect()
    }

    pub fn menu_api_links(&self) -> Vec<(MenuId, ApiId)> {
        self.state().menu_apis.iter().copied().collect()
    }

    pub fn role_menu_links(&self) -> Vec<(RoleId, MenuId)> {
        self.state().role_menus.iter().copied().collect()
    }

    pub fn user_role_rows(&self) -> Vec<(String, String)> {
        self.state().user_roles.iter().cloned().collect()
    }
}

pub fn stores(db: &Arc<MemoryDb>) -> Stores {
    Stores {
        menus: db.clone(),
        menu_apis: db.clone(),
        apis: db.clone(),
        permissions: db.clone(),
        roles: db.clone(),
        role_menus: db.clone(),
        user_roles: db.clone(),
    }
}

fn page<T: Clone>(items: Vec<T>, pagination: &Pagination) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let slice = items
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.page_size as usize)
        .collect();
    (slice, total)
}

#[async_trait]
impl MenuRepository for MemoryDb {
    async fn create(&self, menu: &Menu) -> AppResult<MenuId> {
        let mut state = self.state();
        let id = MenuId(state.next_id());
        let mut menu = menu.clone();
        menu.id = id;
        state.menus.insert(id, menu);
        Ok(id)
    }

    async fn update(&self, menu: &Menu) -> AppResult<()> {
        let mut state = self.state();
        match state.menus.get_mut(&menu.id) {
            Some(existing) => {
                *existing = menu.clone();
                Ok(())
            }
            None => Err(AppError::not_found(format!("menu {}", menu.id))),
        }
    }

    async fn delete(&self, id: MenuId) -> AppResult<()> {
        self.state().menus.remove(&id);
        Ok(())
    }

    async fn find_by_id(&self, id: MenuId) -> AppResult<Option<Menu>> {
        Ok(self.state().menus.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[MenuId]) -> AppResult<Vec<Menu>> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.menus.get(id).cloned()).collect())
    }

    async fn list_all(&self) -> AppResult<Vec<Menu>> {
        Ok(self.state().menus.values().cloned().collect())
    }

    async fn count_children(&self, id: MenuId) -> AppResult<u64> {
        Ok(self
            .state()
            .menus
            .values()
            .filter(|m| m.parent_id == Some(id))
            .count() as u64)
    }
}

#[async_trait]
impl MenuApiRepository for MemoryDb {
    async fn replace_for_menu(&self, menu_id: MenuId, api_ids: &[ApiId]) -> AppResult<()> {
        let mut state = self.state();
        state.menu_apis.retain(|(m, _)| *m != menu_id);
        for &api_id in api_ids {
            state.menu_apis.insert((menu_id, api_id));
        }
        Ok(())
    }

    async fn list_api_ids(&self, menu_id: MenuId) -> AppResult<Vec<ApiId>> {
        Ok(self
            .state()
            .menu_apis
            .iter()
            .filter(|(m, _)| *m == menu_id)
            .map(|(_, a)| *a)
            .collect())
    }

    async fn list_menu_ids_for_api(&self, api_id: ApiId) -> AppResult<Vec<MenuId>> {
        Ok(self
            .state()
            .menu_apis
            .iter()
            .filter(|(_, a)| *a == api_id)
            .map(|(m, _)| *m)
            .collect())
    }

    async fn delete_by_menu(&self, menu_id: MenuId) -> AppResult<()> {
        self.state().menu_apis.retain(|(m, _)| *m != menu_id);
        Ok(())
    }

    async fn delete_by_api(&self, api_id: ApiId) -> AppResult<()> {
        self.state().menu_apis.retain(|(_, a)| *a != api_id);
        Ok(())
    }
}

#[async_trait]
impl ApiRepository for MemoryDb {
    async fn create(&self, api: &ApiEndpoint) -> AppResult<ApiId> {
        let mut state = self.state();
        if state
            .apis
            .values()
            .any(|a| a.path == api.path && a.method == api.method)
        {
            return Err(AppError::conflict("apis_path_method_key"));
        }
        let id = ApiId(state.next_id());
        let mut api = api.clone();
        api.id = id;
        state.apis.insert(id, api);
        Ok(id)
    }

    async fn update(&self, api: &ApiEndpoint) -> AppResult<()> {
        let mut state = self.state();
        if state
            .apis
            .values()
            .any(|a| a.id != api.id && a.path == api.path && a.method == api.method)
        {
            return Err(AppError::conflict("apis_path_method_key"));
        }
        state.apis.insert(api.id, api.clone());
        Ok(())
    }

    async fn delete(&self, id: ApiId) -> AppResult<()> {
        self.state().apis.remove(&id);
        Ok(())
    }

    async fn find_by_id(&self, id: ApiId) -> AppResult<Option<ApiEndpoint>> {
        Ok(self.state().apis.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[ApiId]) -> AppResult<Vec<ApiEndpoint>> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.apis.get(id).cloned()).collect())
    }

    async fn find_by_path_method(&self, path: &str, method: &str) -> AppResult<Option<ApiEndpoint>> {
        Ok(self
            .state()
            .apis
            .values()
            .find(|a| a.path == path && a.method == method)
            .cloned())
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<ApiEndpoint>, u64)> {
        Ok(page(self.state().apis.values().cloned().collect(), pagination))
    }
}

#[async_trait]
impl PermissionRepository for MemoryDb {
    async fn create(&self, permission: &Permission) -> AppResult<PermissionId> {
        let mut state = self.state();
        if state.permissions.values().any(|p| p.code == permission.code) {
            return Err(AppError::conflict("permissions_code_key"));
        }
        let id = PermissionId(state.next_id());
        let mut permission = permission.clone();
        permission.id = id;
        state.permissions.insert(id, permission);
        Ok(id)
    }

    async fn update(&self, permission: &Permission) -> AppResult<()> {
        let mut state = self.state();
        if state
            .permissions
            .values()
            .any(|p| p.id != permission.id && p.code == permission.code)
        {
            return Err(AppError::conflict("permissions_code_key"));
        }
        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn upsert_by_code(&self, permission: &Permission) -> AppResult<PermissionId> {
        let mut state = self.state();
        let existing = state
            .permissions
            .values()
            .find(|p| p.code == permission.code)
            .map(|p| p.id);
        let id = match existing {
            Some(id) => id,
            None => PermissionId(state.next_id()),
        };
        let mut permission = permission.clone();
        permission.id = id;
        state.permissions.insert(id, permission);
        Ok(id)
    }

    async fn delete(&self, id: PermissionId) -> AppResult<()> {
        self.state().permissions.remove(&id);
        Ok(())
    }

    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.state().permissions.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .state()
            .permissions
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn find_by_api(&self, api_id: ApiId) -> AppResult<Option<Permission>> {
        Ok(self
            .state()
            .permissions
            .values()
            .find(|p| p.api_id == Some(api_id))
            .cloned())
    }

    async fn list_by_menu(&self, menu_id: MenuId) -> AppResult<Vec<Permission>> {
        Ok(self
            .state()
            .permissions
            .values()
            .filter(|p| p.touches_menu(menu_id))
            .cloned()
            .collect())
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<Permission>, u64)> {
        Ok(page(self.state().permissions.values().cloned().collect(), pagination))
    }

    async fn delete_by_api(&self, api_id: ApiId) -> AppResult<()> {
        self.state().permissions.retain(|_, p| p.api_id != Some(api_id));
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryDb {
    async fn create(&self, role: &Role) -> AppResult<RoleId> {
        let mut state = self.state();
        if state.roles.values().any(|r| r.code == role.code) {
            return Err(AppError::conflict("roles_code_key"));
        }
        let id = RoleId(state.next_id());
        let mut role = role.clone();
        role.id = id;
        state.roles.insert(id, role);
        Ok(id)
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        let mut state = self.state();
        if let Some(existing) = state.roles.get_mut(&role.id) {
            existing.name = role.name.clone();
            existing.enabled = role.enabled;
            existing.sort = role.sort;
        }
        Ok(())
    }

    async fn delete(&self, id: RoleId) -> AppResult<()> {
        self.state().roles.remove(&id);
        Ok(())
    }

    async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state().roles.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.roles.get(id).cloned()).collect())
    }

    async fn find_by_codes(&self, codes: &[String]) -> AppResult<Vec<Role>> {
        let wanted: HashSet<&String> = codes.iter().collect();
        Ok(self
            .state()
            .roles
            .values()
            .filter(|r| wanted.contains(&r.code))
            .cloned()
            .collect())
    }

    async fn exists_by_code(&self, code: &str) -> AppResult<bool> {
        Ok(self.state().roles.values().any(|r| r.code == code))
    }

    async fn list_all(&self) -> AppResult<Vec<Role>> {
        Ok(self.state().roles.values().cloned().collect())
    }
}

#[async_trait]
impl RoleMenuRepository for MemoryDb {
    async fn replace_for_role(&self, role_id: RoleId, menu_ids: &[MenuId]) -> AppResult<()> {
        let mut state = self.state();
        state.role_menus.retain(|(r, _)| *r != role_id);
        for &menu_id in menu_ids {
            state.role_menus.insert((role_id, menu_id));
        }
        Ok(())
    }

    async fn list_menu_ids(&self, role_id: RoleId) -> AppResult<Vec<MenuId>> {
        Ok(self
            .state()
            .role_menus
            .iter()
            .filter(|(r, _)| *r == role_id)
            .map(|(_, m)| *m)
            .collect())
    }

    async fn list_menu_ids_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<MenuId>> {
        let wanted: HashSet<&RoleId> = role_ids.iter().collect();
        let menus: BTreeSet<MenuId> = self
            .state()
            .role_menus
            .iter()
            .filter(|(r, _)| wanted.contains(r))
            .map(|(_, m)| *m)
            .collect();
        Ok(menus.into_iter().collect())
    }

    async fn list_role_ids_for_menu(&self, menu_id: MenuId) -> AppResult<Vec<RoleId>> {
        Ok(self
            .state()
            .role_menus
            .iter()
            .filter(|(_, m)| *m == menu_id)
            .map(|(r, _)| *r)
            .collect())
    }

    async fn delete_by_role(&self, role_id: RoleId) -> AppResult<()> {
        self.state().role_menus.retain(|(r, _)| *r != role_id);
        Ok(())
    }

    async fn delete_by_menu(&self, menu_id: MenuId) -> AppResult<()> {
        self.state().role_menus.retain(|(_, m)| *m != menu_id);
        Ok(())
    }
}

#[async_trait]
impl UserRoleRepository for MemoryDb {
    async fn replace_for_user(&self, user_id: &str, role_codes: &[String]) -> AppResult<()> {
        let mut state = self.state();
        state.user_roles.retain(|(u, _)| u != user_id);
        for code in role_codes {
            state.user_roles.insert((user_id.to_string(), code.clone()));
        }
        Ok(())
    }

    async fn list_role_codes(&self, user_id: &str) -> AppResult<Vec<String>> {
        Ok(self
            .state()
            .user_roles
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn list_users_for_role(&self, role_code: &str) -> AppResult<Vec<String>> {
        Ok(self
            .state()
            .user_roles
            .iter()
            .filter(|(_, r)| r == role_code)
            .map(|(u, _)| u.clone())
            .collect())
    }

    async fn replace_all(&self, groupings: &[GroupingRule]) -> AppResult<()> {
        let mut state = self.state();
        state.user_roles = groupings
            .iter()
            .map(|g| (g.user.clone(), g.role.clone()))
            .collect();
        Ok(())
    }
}

/// 让下一次查询在返回结果前停住，直到测试放行
#[derive(Clone, Default)]
pub struct LookupGate {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// 包装真实的内存策略存储，可按开关让写操作失败
pub struct FlakyPolicyStore {
    inner: CasbinPolicyStore,
    fail_writes: AtomicBool,
    users_gate: Mutex<Option<LookupGate>>,
}

impl FlakyPolicyStore {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: CasbinPolicyStore::in_memory().await.unwrap(),
            fail_writes: AtomicBool::new(false),
            users_gate: Mutex::new(None),
        })
    }

    /// 下一次 `get_users_for_role` 拿到结果后停住
    pub fn pause_next_users_lookup(&self) -> LookupGate {
        let gate = LookupGate::default();
        *self.users_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> PolicyResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(PolicyStoreError::new("policy store unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PolicyStore for FlakyPolicyStore {
    async fn enforce(&self, subject: &str, object: &str, action: &str) -> PolicyResult<bool> {
        self.inner.enforce(subject, object, action).await
    }

    async fn add_policy(&self, rule: &PolicyRule) -> PolicyResult<bool> {
        self.check()?;
        self.inner.add_policy(rule).await
    }

    async fn remove_policy(&self, rule: &PolicyRule) -> PolicyResult<bool> {
        self.check()?;
        self.inner.remove_policy(rule).await
    }

    async fn remove_filtered_policy(&self, field_index: usize, field_values: Vec<String>) -> PolicyResult<bool> {
        self.check()?;
        self.inner.remove_filtered_policy(field_index, field_values).await
    }

    async fn add_grouping_policy(&self, rule: &GroupingRule) -> PolicyResult<bool> {
        self.check()?;
        self.inner.add_grouping_policy(rule).await
    }

    async fn remove_grouping_policy(&self, rule: &GroupingRule) -> PolicyResult<bool> {
        self.check()?;
        self.inner.remove_grouping_policy(rule).await
    }

    async fn remove_filtered_grouping_policy(
        &self,
        field_index: usize,
        field_values: Vec<String>,
    ) -> PolicyResult<bool> {
        self.check()?;
        self.inner
            .remove_filtered_grouping_policy(field_index, field_values)
            .await
    }

    async fn get_roles_for_user(&self, user: &str) -> PolicyResult<Vec<String>> {
        self.inner.get_roles_for_user(user).await
    }

    async fn get_users_for_role(&self, role: &str) -> PolicyResult<Vec<String>> {
        let users = self.inner.get_users_for_role(role).await;
        let gate = self.users_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        users
    }

    async fn get_filtered_policy(&self, field_index: usize, field_values: Vec<String>) -> PolicyResult<Vec<PolicyRule>> {
        self.inner.get_filtered_policy(field_index, field_values).await
    }

    async fn get_grouping_policy(&self) -> PolicyResult<Vec<GroupingRule>> {
        self.inner.get_grouping_policy().await
    }
}

/// 读取菜单快照后让出执行权，使并发的层级变更有机会交错
pub struct YieldingMenus {
    db: Arc<MemoryDb>,
}

#[async_trait]
impl MenuRepository for YieldingMenus {
    async fn create(&self, menu: &Menu) -> AppResult<MenuId> {
        MenuRepository::create(self.db.as_ref(), menu).await
    }

    async fn update(&self, menu: &Menu) -> AppResult<()> {
        MenuRepository::update(self.db.as_ref(), menu).await
    }

    async fn delete(&self, id: MenuId) -> AppResult<()> {
        MenuRepository::delete(self.db.as_ref(), id).await
    }

    async fn find_by_id(&self, id: MenuId) -> AppResult<Option<Menu>> {
        MenuRepository::find_by_id(self.db.as_ref(), id).await
    }

    async fn find_by_ids(&self, ids: &[MenuId]) -> AppResult<Vec<Menu>> {
        MenuRepository::find_by_ids(self.db.as_ref(), ids).await
    }

    async fn list_all(&self) -> AppResult<Vec<Menu>> {
        let menus = MenuRepository::list_all(self.db.as_ref()).await;
        tokio::task::yield_now().await;
        menus
    }

    async fn count_children(&self, id: MenuId) -> AppResult<u64> {
        MenuRepository::count_children(self.db.as_ref(), id).await
    }
}

/// 测试装置: 内存仓储 + 可控策略存储 + 引擎
pub struct Harness {
    pub db: Arc<MemoryDb>,
    pub policy: Arc<FlakyPolicyStore>,
    pub engine: PermissionSyncEngine,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_options(EngineOptions::default()).await
    }

    pub async fn with_options(options: EngineOptions) -> Self {
        let db = MemoryDb::new();
        let policy = FlakyPolicyStore::new().await;
        let engine = PermissionSyncEngine::new(stores(&db), policy.clone(), options);
        Self { db, policy, engine }
    }

    /// 菜单仓储在读取全量快照后让出执行权
    pub async fn with_yielding_menus() -> Self {
        let db = MemoryDb::new();
        let policy = FlakyPolicyStore::new().await;
        let mut stores = stores(&db);
        stores.menus = Arc::new(YieldingMenus { db: db.clone() });
        let engine = PermissionSyncEngine::new(stores, policy.clone(), EngineOptions::default());
        Self { db, policy, engine }
    }

    pub async fn menu(&self, name: &str, parent: Option<MenuId>) -> Menu {
        let mut fields = MenuFields::new(name, MenuType::Menu);
        fields.parent_id = parent;
        self.engine.create_menu(fields).await.unwrap()
    }

    pub async fn menu_with_perms(&self, name: &str, perms: &str) -> Menu {
        let mut fields = MenuFields::new(name, MenuType::Menu);
        fields.perms = perms.to_string();
        self.engine.create_menu(fields).await.unwrap()
    }

    pub async fn api(&self, path: &str, method: &str) -> ApiEndpoint {
        self.engine
            .create_api(ApiFields::new(path, method, format!("{} {}", method, path)))
            .await
            .unwrap()
    }

    pub async fn role(&self, code: &str) -> Role {
        self.engine
            .create_role(CreateRoleCommand {
                code: code.to_string(),
                name: code.to_uppercase(),
                enabled: true,
                sort: 0,
            })
            .await
            .unwrap()
    }

    pub async fn rules_for(&self, role: &Role) -> Vec<PolicyRule> {
        self.engine.role_policies(role.id).await.unwrap()
    }
}

pub fn rule(subject: &str, object: &str, action: &str) -> PolicyRule {
    PolicyRule::new(subject, object, action)
}
