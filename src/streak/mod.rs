use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Persists a user's best streak. The write is conditional so the
/// compare-and-set happens at the store, not in application code.
#[async_trait]
pub trait StreakStore: Send + Sync {
    /// Raises `best_streak` to `candidate` only if the stored value is
    /// lower. Returns whether the row changed.
    async fn raise_best_streak(&self, user_id: Uuid, candidate: i64) -> anyhow::Result<bool>;
}

pub struct PgStreakStore {
    db: PgPool,
}

impl PgStreakStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StreakStore for PgStreakStore {
    async fn raise_best_streak(&self, user_id: Uuid, candidate: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET best_streak = $2
            WHERE id = $1 AND best_streak < $2
            "#,
        )
        .bind(user_id)
        .bind(candidate)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// Running in-diet streak bookkeeping, keyed by user id so concurrent
/// users never observe each other's counters.
#[derive(Clone)]
pub struct StreakTracker {
    store: Arc<dyn StreakStore>,
    runs: Arc<DashMap<Uuid, Arc<Mutex<i64>>>>,
}

impl StreakTracker {
    pub fn new(store: Arc<dyn StreakStore>) -> Self {
        Self {
            store,
            runs: Arc::new(DashMap::new()),
        }
    }

    fn cell(&self, user_id: Uuid) -> Arc<Mutex<i64>> {
        self.runs
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(0)))
            .clone()
    }

    /// Records one meal-write event for `user_id` and returns the new
    /// running count. The per-user lock is held across the store write so
    /// events for the same user serialize; other users proceed in parallel.
    pub async fn record(&self, user_id: Uuid, on_diet: bool) -> anyhow::Result<i64> {
        let cell = self.cell(user_id);
        let mut run = cell.lock().await;
        if on_diet {
            *run += 1;
            if self.store.raise_best_streak(user_id, *run).await? {
                debug!(user_id = %user_id, streak = *run, "best streak raised");
            }
        } else {
            *run = 0;
        }
        Ok(*run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeStore {
        best: std::sync::Mutex<HashMap<Uuid, i64>>,
    }

    impl FakeStore {
        fn best_of(&self, user_id: Uuid) -> i64 {
            self.best.lock().unwrap().get(&user_id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl StreakStore for FakeStore {
        async fn raise_best_streak(&self, user_id: Uuid, candidate: i64) -> anyhow::Result<bool> {
            let mut best = self.best.lock().unwrap();
            let entry = best.entry(user_id).or_insert(0);
            if candidate > *entry {
                *entry = candidate;
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    fn tracker() -> (StreakTracker, Arc<FakeStore>) {
        let store = Arc::new(FakeStore::default());
        (StreakTracker::new(store.clone()), store)
    }

    #[tokio::test]
    async fn first_in_diet_meal_sets_best_to_one() {
        let (tracker, store) = tracker();
        let user = Uuid::new_v4();
        let run = tracker.record(user, true).await.unwrap();
        assert_eq!(run, 1);
        assert_eq!(store.best_of(user), 1);
    }

    #[tokio::test]
    async fn broken_run_restarts_the_counter() {
        let (tracker, store) = tracker();
        let user = Uuid::new_v4();
        let mut runs = Vec::new();
        for on_diet in [true, true, false, true] {
            runs.push(tracker.record(user, on_diet).await.unwrap());
        }
        assert_eq!(runs, vec![1, 2, 0, 1]);
        assert_eq!(store.best_of(user), 2);
    }

    #[tokio::test]
    async fn best_streak_never_decreases() {
        let (tracker, store) = tracker();
        let user = Uuid::new_v4();
        for on_diet in [true, true, true] {
            tracker.record(user, on_diet).await.unwrap();
        }
        assert_eq!(store.best_of(user), 3);
        // A later, shorter run must not lower the persisted best.
        for on_diet in [false, true] {
            tracker.record(user, on_diet).await.unwrap();
        }
        assert_eq!(store.best_of(user), 3);
    }

    #[tokio::test]
    async fn users_keep_independent_streaks() {
        let (tracker, store) = tracker();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        // Interleaved writes; with a process-global counter bob's reset
        // would corrupt alice's run.
        tracker.record(alice, true).await.unwrap();
        tracker.record(bob, true).await.unwrap();
        tracker.record(alice, true).await.unwrap();
        tracker.record(bob, false).await.unwrap();
        tracker.record(alice, true).await.unwrap();
        tracker.record(bob, true).await.unwrap();
        assert_eq!(store.best_of(alice), 3);
        assert_eq!(store.best_of(bob), 1);
    }

    #[tokio::test]
    async fn concurrent_records_for_one_user_serialize() {
        let (tracker, store) = tracker();
        let user = Uuid::new_v4();
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let tracker = tracker.clone();
            tasks.push(tokio::spawn(async move {
                tracker.record(user, true).await.unwrap()
            }));
        }
        let mut runs = Vec::new();
        for task in tasks {
            runs.push(task.await.unwrap());
        }
        runs.sort_unstable();
        assert_eq!(runs, (1..=16).collect::<Vec<i64>>());
        assert_eq!(store.best_of(user), 16);
    }
}
