//! 进程内按键加锁
//!
//! "整体替换"类写操作（菜单 API、角色菜单、用户角色）按所属对象串行化；
//! 全量同步在剪枝时需要独占，其他写操作持有共享锁。
//! 菜单父子关系的变更（创建、改挂、删除）经由同一把层级锁串行化。
//!
//! 加锁顺序: `shared` → `hierarchy` → 菜单 → 角色（按 ID 升序）→ 用户。

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{MutexGuard, OwnedMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::menu::MenuId;
use crate::domain::role::RoleId;

/// 按键分配的异步互斥锁，空闲条目在下一次加锁时回收
pub struct KeyedLocks<K> {
    inner: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // 只有表本身引用的条目没有持有者也没有等待者
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(key).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// 当前登记的键数量
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 引擎共享的锁集合
#[derive(Default)]
pub struct SyncLocks {
    pub roles: KeyedLocks<RoleId>,
    pub menus: KeyedLocks<MenuId>,
    pub users: KeyedLocks<String>,
    resync: RwLock<()>,
    hierarchy: tokio::sync::Mutex<()>,
}

impl SyncLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 普通写操作
    pub async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.resync.read().await
    }

    /// 带剪枝的全量同步
    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.resync.write().await
    }

    /// 菜单层级变更，覆盖环检测到写入的整个区间
    pub async fn hierarchy(&self) -> MutexGuard<'_, ()> {
        self.hierarchy.lock().await
    }

    /// 依次锁住多个角色，按 ID 升序加锁避免死锁
    pub async fn lock_roles(&self, ids: impl IntoIterator<Item = RoleId>) -> Vec<OwnedMutexGuard<()>> {
        let mut ids: Vec<RoleId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.roles.lock(id).await);
        }
        guards
    }
}
