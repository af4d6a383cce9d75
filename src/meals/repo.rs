use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Ledger outcomes. A meal that does not exist and a meal owned by a
/// different user are deliberately indistinguishable.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("meal not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
    #[error("streak bookkeeping failed: {0}")]
    Streak(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub calories: f64,
    pub on_diet: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct DietCounts {
    pub on_diet: i64,
    pub off_diet: i64,
}

/// Durable meal storage scoped to an owning user. Every query checks
/// ownership and existence together, so a foreign meal id behaves exactly
/// like a missing one.
#[async_trait]
pub trait MealStore: Send + Sync {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Meal>, LedgerError>;

    async fn get_owned(&self, user_id: Uuid, meal_id: Uuid) -> Result<Meal, LedgerError>;

    async fn insert(
        &self,
        user_id: Uuid,
        name: &str,
        calories: f64,
        on_diet: bool,
    ) -> Result<Meal, LedgerError>;

    /// Applies the new field values all-or-nothing and returns the before
    /// and after snapshots. NotFound performs no mutation.
    async fn update_owned(
        &self,
        user_id: Uuid,
        meal_id: Uuid,
        name: &str,
        calories: f64,
        on_diet: bool,
    ) -> Result<(Meal, Meal), LedgerError>;

    async fn delete_owned(&self, user_id: Uuid, meal_id: Uuid) -> Result<Meal, LedgerError>;

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, LedgerError>;

    async fn diet_counts(&self, user_id: Uuid) -> Result<DietCounts, LedgerError>;
}

pub struct PgMealStore {
    db: PgPool,
}

impl PgMealStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealStore for PgMealStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Meal>, LedgerError> {
        let rows = sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, user_id, name, calories, on_diet, created_at, updated_at
            FROM meals
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get_owned(&self, user_id: Uuid, meal_id: Uuid) -> Result<Meal, LedgerError> {
        sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, user_id, name, calories, on_diet, created_at, updated_at
            FROM meals
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(meal_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(LedgerError::NotFound)
    }

    async fn insert(
        &self,
        user_id: Uuid,
        name: &str,
        calories: f64,
        on_diet: bool,
    ) -> Result<Meal, LedgerError> {
        let meal = sqlx::query_as::<_, Meal>(
            r#"
            INSERT INTO meals (id, user_id, name, calories, on_diet)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, name, calories, on_diet, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .bind(calories)
        .bind(on_diet)
        .fetch_one(&self.db)
        .await?;
        Ok(meal)
    }

    /// The before snapshot is locked with `FOR UPDATE` inside the same
    /// transaction as the write, so a concurrent delete cannot slip between
    /// the ownership check and the update.
    async fn update_owned(
        &self,
        user_id: Uuid,
        meal_id: Uuid,
        name: &str,
        calories: f64,
        on_diet: bool,
    ) -> Result<(Meal, Meal), LedgerError> {
        let mut tx = self.db.begin().await?;

        let before = sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, user_id, name, calories, on_diet, created_at, updated_at
            FROM meals
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(meal_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::NotFound)?;

        let after = sqlx::query_as::<_, Meal>(
            r#"
            UPDATE meals
            SET name = $3, calories = $4, on_diet = $5, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, calories, on_diet, created_at, updated_at
            "#,
        )
        .bind(meal_id)
        .bind(user_id)
        .bind(name)
        .bind(calories)
        .bind(on_diet)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((before, after))
    }

    async fn delete_owned(&self, user_id: Uuid, meal_id: Uuid) -> Result<Meal, LedgerError> {
        sqlx::query_as::<_, Meal>(
            r#"
            DELETE FROM meals
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, calories, on_diet, created_at, updated_at
            "#,
        )
        .bind(meal_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(LedgerError::NotFound)
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, LedgerError> {
        let res = sqlx::query(
            r#"
            DELETE FROM meals WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected())
    }

    async fn diet_counts(&self, user_id: Uuid) -> Result<DietCounts, LedgerError> {
        let counts = sqlx::query_as::<_, DietCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE on_diet)     AS on_diet,
                COUNT(*) FILTER (WHERE NOT on_diet) AS off_diet
            FROM meals
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(counts)
    }
}
