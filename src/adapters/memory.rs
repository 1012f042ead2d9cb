use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adapters::snapshot::Snapshot;
use crate::domain::model::{
    DiningHall, Dish, DishId, HallId, MealPeriod, Menu, MenuDate, MenuId, Rating, UserId,
};
use crate::domain::ports::{HallDirectory, MenuSource, RatingSource};
use crate::utils::error::{RecError, Result};

const SOURCE_NAME: &str = "memory";

/// A stored menu references its dishes by ID so averages are always read fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub id: MenuId,
    pub hall_id: HallId,
    pub date: MenuDate,
    #[serde(default)]
    pub dish_ids: Vec<DishId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRating {
    pub dish_id: DishId,
    pub score: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A search hit with the name of the hall serving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishMatch {
    #[serde(flatten)]
    pub dish: Dish,
    pub hall: String,
}

#[derive(Debug, Default)]
struct StoreState {
    halls: BTreeMap<HallId, DiningHall>,
    dishes: BTreeMap<DishId, Dish>,
    menus: BTreeMap<MenuId, MenuRecord>,
    ratings: Vec<Rating>,
    last_loaded: Option<MenuDate>,
}

impl StoreState {
    fn next_hall_id(&self) -> HallId {
        self.halls.keys().next_back().map_or(1, |id| id + 1)
    }

    fn next_dish_id(&self) -> DishId {
        self.dishes.keys().next_back().map_or(1, |id| id + 1)
    }

    fn next_menu_id(&self) -> MenuId {
        self.menus.keys().next_back().map_or(1, |id| id + 1)
    }

    fn next_rating_id(&self) -> u64 {
        self.ratings.iter().map(|r| r.id).max().map_or(1, |id| id + 1)
    }

    fn resolve_menu(&self, record: &MenuRecord) -> Result<Menu> {
        let dishes = record
            .dish_ids
            .iter()
            .map(|dish_id| {
                self.dishes.get(dish_id).cloned().ok_or_else(|| {
                    RecError::upstream(
                        SOURCE_NAME,
                        format!("menu {} references unknown dish {}", record.id, dish_id),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Menu {
            id: record.id,
            hall_id: record.hall_id,
            date: record.date,
            dishes,
        })
    }

    /// Returns whether the stored average changed. A NaN average always counts as changed.
    fn recalculate_dish(&mut self, dish_id: DishId) -> bool {
        let (sum, count) = self
            .ratings
            .iter()
            .filter(|r| r.dish_id == dish_id)
            .fold((0.0, 0usize), |(sum, count), r| (sum + f64::from(r.score), count + 1));
        let average = if count == 0 { 0.0 } else { sum / count as f64 };

        match self.dishes.get_mut(&dish_id) {
            Some(dish) if dish.average_rating != average => {
                dish.average_rating = average;
                true
            }
            _ => false,
        }
    }

    fn ensure_dish(&self, dish_id: DishId) -> Result<()> {
        if self.dishes.contains_key(&dish_id) {
            Ok(())
        } else {
            Err(RecError::NotFound {
                entity: "Dish".to_string(),
                id: dish_id,
            })
        }
    }

    fn insert_rating(
        &mut self,
        user_id: UserId,
        dish_id: DishId,
        score: u8,
        comment: Option<String>,
    ) -> Rating {
        let rating = Rating {
            id: self.next_rating_id(),
            user_id,
            dish_id,
            score,
            comment,
            created_at: chrono::Utc::now(),
        };
        self.ratings.push(rating.clone());
        self.recalculate_dish(dish_id);
        rating
    }
}

fn check_score(score: i64) -> Result<u8> {
    u8::try_from(score)
        .ok()
        .filter(|s| *s <= 5)
        .ok_or(RecError::InvalidRating { score })
}

/// Shared, in-process store backing every port. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut state = StoreState::default();

        for hall in snapshot.halls {
            state.halls.insert(hall.id, hall);
        }
        for dish in snapshot.dishes {
            if !state.halls.contains_key(&dish.hall_id) {
                return Err(RecError::NotFound {
                    entity: "Hall".to_string(),
                    id: dish.hall_id,
                });
            }
            state.dishes.insert(dish.id, dish);
        }
        for menu in snapshot.menus {
            if !state.halls.contains_key(&menu.hall_id) {
                return Err(RecError::NotFound {
                    entity: "Hall".to_string(),
                    id: menu.hall_id,
                });
            }
            if let Some(missing) = menu.dish_ids.iter().find(|id| !state.dishes.contains_key(*id)) {
                return Err(RecError::NotFound {
                    entity: "Dish".to_string(),
                    id: *missing,
                });
            }
            state.menus.insert(menu.id, menu);
        }
        for rating in snapshot.ratings {
            check_score(i64::from(rating.score))?;
            state.ensure_dish(rating.dish_id)?;
            state.ratings.push(rating);
        }
        state.last_loaded = snapshot.last_loaded;

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        Snapshot {
            halls: state.halls.values().cloned().collect(),
            dishes: state.dishes.values().cloned().collect(),
            menus: state.menus.values().cloned().collect(),
            ratings: state.ratings.clone(),
            last_loaded: state.last_loaded,
        }
    }

    pub async fn get_or_create_hall(&self, name: &str) -> DiningHall {
        let mut state = self.state.write().await;
        if let Some(hall) = state.halls.values().find(|h| h.name == name) {
            return hall.clone();
        }

        let hall = DiningHall {
            id: state.next_hall_id(),
            name: name.to_string(),
            location: None,
        };
        state.halls.insert(hall.id, hall.clone());
        hall
    }

    /// Dishes are unique per (hall, name). An existing dish only gets its
    /// last-seen date refreshed.
    pub async fn get_or_create_dish(
        &self,
        name: &str,
        hall_id: HallId,
        location: &str,
        seen: MenuDate,
    ) -> Result<Dish> {
        let mut state = self.state.write().await;
        if !state.halls.contains_key(&hall_id) {
            return Err(RecError::NotFound {
                entity: "Hall".to_string(),
                id: hall_id,
            });
        }

        if let Some(dish) = state
            .dishes
            .values_mut()
            .find(|d| d.hall_id == hall_id && d.name == name)
        {
            dish.last_seen_date = Some(seen);
            return Ok(dish.clone());
        }

        let dish = Dish {
            id: state.next_dish_id(),
            hall_id,
            name: name.to_string(),
            description: None,
            average_rating: 0.0,
            tags: vec![],
            location: Some(location.to_string()),
            last_seen_date: Some(seen),
        };
        state.dishes.insert(dish.id, dish.clone());
        Ok(dish)
    }

    /// Adds a menu, or merges the dishes into the hall's existing menu for the same date and period.
    pub async fn add_menu(
        &self,
        hall_id: HallId,
        date: MenuDate,
        dish_ids: &[DishId],
    ) -> Result<MenuRecord> {
        let mut state = self.state.write().await;
        if !state.halls.contains_key(&hall_id) {
            return Err(RecError::NotFound {
                entity: "Hall".to_string(),
                id: hall_id,
            });
        }
        if let Some(missing) = dish_ids.iter().find(|id| !state.dishes.contains_key(*id)) {
            return Err(RecError::NotFound {
                entity: "Dish".to_string(),
                id: *missing,
            });
        }

        if let Some(existing) = state
            .menus
            .values_mut()
            .find(|m| m.hall_id == hall_id && m.date == date)
        {
            for dish_id in dish_ids {
                if !existing.dish_ids.contains(dish_id) {
                    existing.dish_ids.push(*dish_id);
                }
            }
            return Ok(existing.clone());
        }

        let record = MenuRecord {
            id: state.next_menu_id(),
            hall_id,
            date,
            dish_ids: dish_ids.to_vec(),
        };
        state.menus.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn menu_by_hall_and_date(&self, hall_id: HallId, date: MenuDate) -> Result<Option<Menu>> {
        let state = self.state.read().await;
        state
            .menus
            .values()
            .find(|m| m.hall_id == hall_id && m.date == date)
            .map(|record| state.resolve_menu(record))
            .transpose()
    }

    pub async fn dish_by_id(&self, dish_id: DishId) -> Option<Dish> {
        self.state.read().await.dishes.get(&dish_id).cloned()
    }

    /// Records a rating and refreshes the dish's average to the exact mean of all its ratings.
    pub async fn create_rating(
        &self,
        user_id: UserId,
        dish_id: DishId,
        score: i64,
        comment: Option<String>,
    ) -> Result<Rating> {
        let score = check_score(score)?;
        let mut state = self.state.write().await;
        state.ensure_dish(dish_id)?;

        let rating = state.insert_rating(user_id, dish_id, score, comment);
        tracing::debug!("User {} rated dish {} with {}", user_id, dish_id, score);
        Ok(rating)
    }

    /// All-or-nothing: every rating is validated before any is stored, and the
    /// whole batch lands under one write lock.
    pub async fn create_multiple_ratings(
        &self,
        user_id: UserId,
        ratings: Vec<NewRating>,
    ) -> Result<Vec<Rating>> {
        let mut state = self.state.write().await;
        let scores = ratings
            .iter()
            .map(|new| {
                state.ensure_dish(new.dish_id)?;
                check_score(new.score)
            })
            .collect::<Result<Vec<u8>>>()?;

        let stored: Vec<Rating> = ratings
            .into_iter()
            .zip(scores)
            .map(|(new, score)| state.insert_rating(user_id, new.dish_id, score, new.comment))
            .collect();

        tracing::debug!("User {} submitted {} ratings", user_id, stored.len());
        Ok(stored)
    }

    /// Recomputes every dish average from the stored ratings and returns how many changed.
    pub async fn recalculate_all_ratings(&self) -> usize {
        let mut state = self.state.write().await;
        let dish_ids: Vec<DishId> = state.dishes.keys().copied().collect();
        dish_ids
            .into_iter()
            .filter(|dish_id| state.recalculate_dish(*dish_id))
            .count()
    }

    /// Case-insensitive match of `keyword` at the start of any word in a dish name.
    pub async fn search_dishes(&self, keyword: &str, limit: usize) -> Result<Vec<DishMatch>> {
        let pattern = Regex::new(&format!(r"(?i)\b{}", regex::escape(keyword.trim())))
            .map_err(|e| RecError::upstream(SOURCE_NAME, e.to_string()))?;

        let state = self.state.read().await;
        Ok(state
            .dishes
            .values()
            .filter(|dish| pattern.is_match(&dish.name))
            .take(limit)
            .map(|dish| DishMatch {
                dish: dish.clone(),
                hall: state
                    .halls
                    .get(&dish.hall_id)
                    .map(|hall| hall.name.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }

    pub async fn ratings_by_user(&self, user_id: UserId) -> Vec<Rating> {
        let state = self.state.read().await;
        state
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn ratings_by_dish(&self, dish_id: DishId) -> Vec<Rating> {
        let state = self.state.read().await;
        state
            .ratings
            .iter()
            .filter(|r| r.dish_id == dish_id)
            .cloned()
            .collect()
    }

    pub async fn has_loaded(&self, date: &MenuDate) -> bool {
        self.state
            .read()
            .await
            .last_loaded
            .is_some_and(|last| last.is_equal_or_after(date))
    }

    /// Moves the ingest marker forward; never backwards.
    pub async fn set_last_loaded(&self, date: MenuDate) {
        let mut state = self.state.write().await;
        match state.last_loaded {
            Some(last) if last.is_equal_or_after(&date) => {}
            _ => state.last_loaded = Some(date),
        }
    }
}

#[async_trait]
impl MenuSource for InMemoryStore {
    async fn menus_for_date(
        &self,
        day: u32,
        month: u32,
        year: i32,
        meal_periods: &[MealPeriod],
    ) -> Result<Vec<Menu>> {
        let state = self.state.read().await;
        state
            .menus
            .values()
            .filter(|m| m.date.same_day(day, month, year))
            .filter(|m| {
                m.date
                    .meal_period
                    .is_some_and(|period| meal_periods.contains(&period))
            })
            .map(|record| state.resolve_menu(record))
            .collect()
    }
}

#[async_trait]
impl RatingSource for InMemoryStore {
    async fn ratings_for_user(
        &self,
        user_id: UserId,
        dish_ids: &HashSet<DishId>,
    ) -> Result<Vec<Rating>> {
        let state = self.state.read().await;
        Ok(state
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id && dish_ids.contains(&r.dish_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HallDirectory for InMemoryStore {
    async fn hall_by_id(&self, hall_id: HallId) -> Result<Option<DiningHall>> {
        Ok(self.state.read().await.halls.get(&hall_id).cloned())
    }
}
