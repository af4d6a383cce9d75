use uuid::Uuid;

use crate::meals::dto::MealBody;
use crate::meals::repo::{LedgerError, Meal, MealStore};
use crate::state::AppState;

/// Persists a new meal, then feeds its diet flag into the streak tracker.
/// The stored meal is unaffected by streak bookkeeping.
pub async fn create_meal(
    state: &AppState,
    user_id: Uuid,
    body: &MealBody,
) -> Result<Meal, LedgerError> {
    let meal = state
        .meals
        .insert(user_id, &body.name, body.calories, body.on_diet)
        .await?;
    state
        .streaks
        .record(user_id, body.on_diet)
        .await
        .map_err(LedgerError::Streak)?;
    Ok(meal)
}

/// Updates an owned meal all-or-nothing, returning the before and after
/// snapshots. The streak records only after the store commit, so NotFound
/// or a rolled-back write leaves the running counter untouched; on success
/// the new diet flag participates in the streak exactly like a create.
pub async fn update_meal(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    body: &MealBody,
) -> Result<(Meal, Meal), LedgerError> {
    let (before, after) = state
        .meals
        .update_owned(user_id, meal_id, &body.name, body.calories, body.on_diet)
        .await?;
    state
        .streaks
        .record(user_id, body.on_diet)
        .await
        .map_err(LedgerError::Streak)?;
    Ok((before, after))
}
