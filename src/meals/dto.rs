use serde::{Deserialize, Serialize};

use crate::auth::repo::User;
use crate::meals::repo::{DietCounts, Meal};

/// Request body shared by create and update. Field presence and types are
/// enforced here by deserialization; the ledger assumes valid input.
#[derive(Debug, Deserialize)]
pub struct MealBody {
    pub name: String,
    pub calories: f64,
    pub on_diet: bool,
}

/// Owner block embedded in meal responses.
#[derive(Debug, Serialize)]
pub struct MealOwner {
    pub name: String,
    pub email: String,
}

impl From<&User> for MealOwner {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealListResponse {
    pub user: MealOwner,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Serialize)]
pub struct MealDetailsResponse {
    pub user: MealOwner,
    pub meal: Meal,
}

#[derive(Debug, Serialize)]
pub struct UpdatedMealResponse {
    pub user: MealOwner,
    pub before: Meal,
    pub after: Meal,
}

#[derive(Debug, Serialize)]
pub struct DeletedMealResponse {
    pub user: MealOwner,
    pub message: String,
    pub meal: Meal,
}

#[derive(Debug, Serialize)]
pub struct PurgedMealsResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub total: i64,
    pub on_diet: i64,
    pub off_diet: i64,
    pub best_streak: i64,
}

impl SummaryResponse {
    /// `total` is derived from the two counts, so the summary invariant
    /// holds by construction.
    pub fn new(counts: DietCounts, best_streak: i64) -> Self {
        Self {
            total: counts.on_diet + counts.off_diet,
            on_diet: counts.on_diet,
            off_diet: counts.off_diet,
            best_streak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_total_is_sum_of_counts() {
        let summary = SummaryResponse::new(
            DietCounts {
                on_diet: 7,
                off_diet: 3,
            },
            4,
        );
        assert_eq!(summary.total, 10);
        assert_eq!(summary.on_diet + summary.off_diet, summary.total);
        assert_eq!(summary.best_streak, 4);
    }

    #[test]
    fn empty_history_summarizes_to_zeroes() {
        let summary = SummaryResponse::new(
            DietCounts {
                on_diet: 0,
                off_diet: 0,
            },
            0,
        );
        assert_eq!(summary.total, 0);
        assert_eq!(summary.best_streak, 0);
    }
}
