pub mod meal_period;
pub mod recommender;
pub mod scoring;

pub use crate::domain::model::{DiningHall, Dish, MealPeriod, Menu, MenuDate, Rating};
pub use crate::domain::ports::{HallDirectory, MenuSource, RatingSource};
pub use crate::utils::error::Result;
