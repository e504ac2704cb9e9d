use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::types::Task;
use crate::error::{TaskError, TaskResult};

pub const DEFAULT_SHARDS: usize = 16;

/// Storage seam used by the lifecycle manager.
///
/// Every method takes and returns owned values, so no caller ever holds a
/// reference into the stored records.
pub trait TaskRepository: Send + Sync {
    fn create(&self, task: &Task) -> TaskResult<()>;
    fn update(&self, task: &Task) -> TaskResult<()>;
    fn get(&self, id: &str) -> TaskResult<Task>;
    fn delete(&self, id: &str) -> TaskResult<()>;
    fn list(&self) -> Vec<Task>;
}

#[derive(Default)]
struct Shard {
    tasks: RwLock<HashMap<String, Task>>,
}

impl Shard {
    // A panic can't happen while a shard lock is held, so a poisoned lock
    // still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Task>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Task>> {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory task store split into independently locked shards.
pub struct TaskStore {
    shards: Vec<Shard>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(count: usize) -> Self {
        let count = count.max(1);
        Self {
            shards: (0..count).map(|_| Shard::default()).collect(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard(&self, id: &str) -> &Shard {
        let idx = fnv1a(id.as_bytes()) as usize % self.shards.len();
        &self.shards[idx]
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRepository for TaskStore {
    fn create(&self, task: &Task) -> TaskResult<()> {
        let mut map = self.shard(&task.id).write();
        if map.contains_key(&task.id) {
            return Err(TaskError::already_exists(&task.id));
        }
        map.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn update(&self, task: &Task) -> TaskResult<()> {
        let mut map = self.shard(&task.id).write();
        match map.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(TaskError::not_found(&task.id)),
        }
    }

    fn get(&self, id: &str) -> TaskResult<Task> {
        let map = self.shard(id).read();
        map.get(id).cloned().ok_or_else(|| TaskError::not_found(id))
    }

    fn delete(&self, id: &str) -> TaskResult<()> {
        let mut map = self.shard(id).write();
        map.remove(id)
            .map(|_| ())
            .ok_or_else(|| TaskError::not_found(id))
    }

    /// Snapshot of every shard, each read under its own lock. Not atomic
    /// across shards.
    fn list(&self) -> Vec<Task> {
        let mut items = Vec::new();
        for shard in &self.shards {
            let map = shard.read();
            items.extend(map.values().cloned());
        }
        items
    }
}

/// 32-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn task(id: &str) -> Task {
        Task::new_pending(id, Utc::now())
    }

    #[test]
    fn create_then_get_returns_copy() {
        let store = TaskStore::new();
        let original = task("a");
        store.create(&original).unwrap();

        let mut fetched = store.get("a").unwrap();
        assert_eq!(fetched, original);

        fetched.status = TaskStatus::Failed;
        assert_eq!(store.get("a").unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let store = TaskStore::new();
        store.create(&task("dup")).unwrap();
        assert_eq!(
            store.create(&task("dup")),
            Err(TaskError::already_exists("dup"))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_requires_existing_record() {
        let store = TaskStore::new();
        assert_eq!(store.update(&task("ghost")), Err(TaskError::not_found("ghost")));

        let mut t = task("b");
        store.create(&t).unwrap();
        t.mark_running(Utc::now()).unwrap();
        store.update(&t).unwrap();

        // the caller's copy stays detached from the stored one
        t.status = TaskStatus::Failed;
        assert_eq!(store.get("b").unwrap().status, TaskStatus::Running);
    }

    #[test]
    fn delete_removes_once() {
        let store = TaskStore::new();
        store.create(&task("c")).unwrap();
        store.delete("c").unwrap();
        assert!(store.get("c").unwrap_err().is_not_found());
        assert!(store.delete("c").unwrap_err().is_not_found());
        assert!(store.delete("never").unwrap_err().is_not_found());
    }

    #[test]
    fn list_spans_all_shards() {
        let store = TaskStore::with_shards(4);
        for i in 0..50 {
            store.create(&task(&format!("task-{}", i))).unwrap();
        }
        let ids: HashSet<String> = store.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 50);
        assert!(ids.contains("task-0"));
        assert!(ids.contains("task-49"));
    }

    #[test]
    fn zero_shards_falls_back_to_one() {
        let store = TaskStore::with_shards(0);
        assert_eq!(store.shard_count(), 1);
        store.create(&task("x")).unwrap();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn fnv_matches_reference_values() {
        assert_eq!(fnv1a(b""), 0x811c_9dc5);
        assert_eq!(fnv1a(b"a"), 0xe40c_292c);
    }

    #[test]
    fn concurrent_create_update_delete_leaves_store_empty() {
        const WORKERS: usize = 8;
        const PER_WORKER: usize = 500;

        let store = Arc::new(TaskStore::new());
        let run = |phase: fn(&TaskStore, &str)| {
            let handles: Vec<_> = (0..WORKERS)
                .map(|w| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..PER_WORKER {
                            phase(&store, &format!("task-{}-{}", w, i));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        };

        run(|store, id| store.create(&task(id)).unwrap());
        assert_eq!(store.list().len(), WORKERS * PER_WORKER);

        run(|store, id| {
            let mut t = store.get(id).unwrap();
            t.mark_running(Utc::now()).unwrap();
            t.mark_finished(TaskStatus::Completed, "OK", Utc::now()).unwrap();
            store.update(&t).unwrap();
        });
        assert!(store
            .list()
            .iter()
            .all(|t| t.status == TaskStatus::Completed));

        run(|store, id| store.delete(id).unwrap());
        assert!(store.is_empty());
        assert!(store.list().is_empty());
    }
}
