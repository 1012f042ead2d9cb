//! Pure scoring and ranking over fetched menus and ratings.
//!
//! A hall's score blends the requesting user's own ratings of the dishes on
//! its menu with the crowd's average ratings of those dishes. Dishes nobody has
//! rated (average 0) carry no consensus signal and are left out of the mean.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::recommender::HallRecommendation;
use crate::domain::model::{Dish, DishId, Menu, Rating};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreBasis {
    #[serde(rename = "consensus")]
    Consensus,
    #[serde(rename = "user,consensus")]
    UserAndConsensus,
}

impl ScoreBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBasis::Consensus => "consensus",
            ScoreBasis::UserAndConsensus => "user,consensus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringParams {
    pub user_weight: f64,
    pub consensus_weight: f64,
    pub top_halls: usize,
    pub top_dishes: usize,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            user_weight: 2.0,
            consensus_weight: 1.0,
            top_halls: 3,
            top_dishes: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuScore {
    pub consensus: f64,
    pub user_mean: Option<f64>,
    pub user_count: usize,
    pub score: f64,
    pub basis: ScoreBasis,
}

/// Non-finite averages come from a broken aggregate upstream; treat them as unrated.
pub fn normalize_rating(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Mean average rating over the dishes that have any ratings at all; 0 if none do.
pub fn consensus_score(dishes: &[Dish]) -> f64 {
    let (sum, count) = dishes
        .iter()
        .map(|dish| normalize_rating(dish.average_rating))
        .filter(|rating| *rating != 0.0)
        .fold((0.0, 0usize), |(sum, count), rating| (sum + rating, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// One score per dish. When a user rated the same dish more than once the
/// most recent rating is the one that counts.
pub fn user_scores_by_dish(ratings: &[Rating]) -> HashMap<DishId, f64> {
    let mut latest: HashMap<DishId, &Rating> = HashMap::with_capacity(ratings.len());

    for rating in ratings {
        match latest.get(&rating.dish_id) {
            Some(existing) if existing.created_at > rating.created_at => {}
            _ => {
                latest.insert(rating.dish_id, rating);
            }
        }
    }

    latest
        .into_iter()
        .map(|(dish_id, rating)| (dish_id, f64::from(rating.score)))
        .collect()
}

/// The user's mean score over the dishes on this menu, with how many dishes contributed.
pub fn user_mean(dishes: &[Dish], user_scores: &HashMap<DishId, f64>) -> Option<(f64, usize)> {
    let (sum, count) = dishes
        .iter()
        .filter_map(|dish| user_scores.get(&dish.id))
        .fold((0.0, 0usize), |(sum, count), score| (sum + score, count + 1));

    if count == 0 {
        None
    } else {
        Some((sum / count as f64, count))
    }
}

/// Returns `None` for an empty menu, which cannot be scored.
pub fn score_menu(
    menu: &Menu,
    user_scores: &HashMap<DishId, f64>,
    params: &ScoringParams,
) -> Option<MenuScore> {
    if menu.dishes.is_empty() {
        return None;
    }

    let consensus = consensus_score(&menu.dishes);

    let score = match user_mean(&menu.dishes, user_scores) {
        None => MenuScore {
            consensus,
            user_mean: None,
            user_count: 0,
            score: consensus,
            basis: ScoreBasis::Consensus,
        },
        Some((mean, count)) => {
            let total_weight = params.user_weight + params.consensus_weight;
            MenuScore {
                consensus,
                user_mean: Some(mean),
                user_count: count,
                score: (params.user_weight * mean + params.consensus_weight * consensus)
                    / total_weight,
                basis: ScoreBasis::UserAndConsensus,
            }
        }
    };

    Some(score)
}

/// Highest-rated dishes first; equal ratings put the higher (newer) dish ID first.
pub fn top_dishes(dishes: &[Dish], limit: usize) -> Vec<Dish> {
    let mut sorted: Vec<Dish> = dishes
        .iter()
        .cloned()
        .map(|mut dish| {
            dish.average_rating = normalize_rating(dish.average_rating);
            dish
        })
        .collect();

    sorted.sort_by(|a, b| {
        b.average_rating
            .total_cmp(&a.average_rating)
            .then_with(|| b.id.cmp(&a.id))
    });
    sorted.truncate(limit);
    sorted
}

fn compare_halls(a: &HallRecommendation, b: &HallRecommendation) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.hall.id.cmp(&b.hall.id))
}

/// Best score first, equal scores by ascending hall ID, then truncated to `limit`.
pub fn rank_halls(mut results: Vec<HallRecommendation>, limit: usize) -> Vec<HallRecommendation> {
    results.sort_by(compare_halls);
    results.truncate(limit);
    results
}
