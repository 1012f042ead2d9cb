use crate::domain::model::{DiningHall, DishId, HallId, MealPeriod, Menu, Rating, UserId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Menus for a given calendar day, restricted to a set of meal-period tags.
/// Every returned menu carries its dishes with current average ratings.
#[async_trait]
pub trait MenuSource: Send + Sync {
    async fn menus_for_date(
        &self,
        day: u32,
        month: u32,
        year: i32,
        meal_periods: &[MealPeriod],
    ) -> Result<Vec<Menu>>;
}

#[async_trait]
pub trait RatingSource: Send + Sync {
    /// A user's ratings, restricted to the given dishes.
    async fn ratings_for_user(
        &self,
        user_id: UserId,
        dish_ids: &HashSet<DishId>,
    ) -> Result<Vec<Rating>>;
}

#[async_trait]
pub trait HallDirectory: Send + Sync {
    async fn hall_by_id(&self, hall_id: HallId) -> Result<Option<DiningHall>>;
}
