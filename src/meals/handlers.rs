use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{auth::session::CurrentUser, state::AppState};

use super::dto::{
    DeletedMealResponse, MealBody, MealDetailsResponse, MealListResponse, MealOwner,
    PurgedMealsResponse, SummaryResponse, UpdatedMealResponse,
};
use super::repo::{LedgerError, Meal, MealStore};
use super::service::{create_meal, update_meal};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/summary", get(summary))
        .route("/meals/:id", get(get_meal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create).delete(delete_all))
        .route("/meals/:id", put(update).delete(delete_one))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_meals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MealListResponse>, (StatusCode, String)> {
    let meals = state.meals.list(user.id).await.map_err(ledger_err)?;
    Ok(Json(MealListResponse {
        user: MealOwner::from(&user),
        meals,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_meal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealDetailsResponse>, (StatusCode, String)> {
    let meal = state
        .meals
        .get_owned(user.id, id)
        .await
        .map_err(ledger_err)?;
    Ok(Json(MealDetailsResponse {
        user: MealOwner::from(&user),
        meal,
    }))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<MealBody>,
) -> Result<(StatusCode, HeaderMap, Json<Meal>), (StatusCode, String)> {
    let meal = create_meal(&state, user.id, &body).await.map_err(ledger_err)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/meals/{}", meal.id)
            .parse()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "bad location".to_string()))?,
    );

    info!(meal_id = %meal.id, on_diet = meal.on_diet, "meal created");
    Ok((StatusCode::CREATED, headers, Json(meal)))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MealBody>,
) -> Result<Json<UpdatedMealResponse>, (StatusCode, String)> {
    let (before, after) = update_meal(&state, user.id, id, &body)
        .await
        .map_err(ledger_err)?;
    info!(meal_id = %id, on_diet = after.on_diet, "meal updated");
    Ok(Json(UpdatedMealResponse {
        user: MealOwner::from(&user),
        before,
        after,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_one(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedMealResponse>, (StatusCode, String)> {
    let meal = state
        .meals
        .delete_owned(user.id, id)
        .await
        .map_err(ledger_err)?;
    info!(meal_id = %id, "meal deleted");
    Ok(Json(DeletedMealResponse {
        user: MealOwner::from(&user),
        message: "Deleted meal".into(),
        meal,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_all(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PurgedMealsResponse>, (StatusCode, String)> {
    let deleted = state.meals.delete_all(user.id).await.map_err(ledger_err)?;
    info!(deleted, "meals purged");
    Ok(Json(PurgedMealsResponse { deleted }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SummaryResponse>, (StatusCode, String)> {
    let counts = state
        .meals
        .diet_counts(user.id)
        .await
        .map_err(ledger_err)?;
    Ok(Json(SummaryResponse::new(counts, user.best_streak)))
}

fn ledger_err(e: LedgerError) -> (StatusCode, String) {
    match e {
        LedgerError::NotFound => (StatusCode::NOT_FOUND, "Meal not found".into()),
        other => {
            error!(error = %other, "ledger operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let (status, _) = ledger_err(LedgerError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failures_map_to_500() {
        let (status, _) = ledger_err(LedgerError::Store(sqlx::Error::PoolClosed));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
