use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::core::meal_period::allowed_meal_periods;
use crate::core::scoring::{
    rank_halls, score_menu, top_dishes, user_scores_by_dish, MenuScore, ScoreBasis, ScoringParams,
};
use crate::domain::model::{parse_user_id, DiningHall, Dish, DishId, HallId, Menu, UserId};
use crate::domain::ports::{HallDirectory, MenuSource, RatingSource};
use crate::utils::error::Result;

pub const NO_HALLS_SERVING_MESSAGE: &str = "No halls are serving meals at this time.";
pub const NO_SUITABLE_HALL_MESSAGE: &str = "No suitable recommendation found.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HallRecommendation {
    pub hall: DiningHall,
    pub score: f64,
    pub basis: ScoreBasis,
    pub top_dishes: Vec<Dish>,
}

/// Outcome of one recommendation request. The two empty variants are normal
/// results, not failures.
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    Halls(Vec<HallRecommendation>),
    /// No menu matched today's date and the active meal periods.
    NoHallsServing,
    /// Menus matched, but none of them could be scored.
    NoSuitableHall,
}

impl Recommendation {
    pub fn halls(&self) -> &[HallRecommendation] {
        match self {
            Recommendation::Halls(halls) => halls,
            _ => &[],
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            Recommendation::Halls(_) => None,
            Recommendation::NoHallsServing => Some(NO_HALLS_SERVING_MESSAGE),
            Recommendation::NoSuitableHall => Some(NO_SUITABLE_HALL_MESSAGE),
        }
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Recommendation::Halls(halls) => map.serialize_entry("halls", halls)?,
            other => map.serialize_entry("message", &other.message())?,
        }
        map.end()
    }
}

/// Ranks the halls serving right now for a single user.
///
/// Stateless: every call fetches its own snapshot from the three collaborators
/// and never writes back, so one instance can serve concurrent requests.
pub struct HallRecommender<M, R, H>
where
    M: MenuSource,
    R: RatingSource,
    H: HallDirectory,
{
    menus: M,
    ratings: R,
    halls: H,
    params: ScoringParams,
}

impl<M, R, H> HallRecommender<M, R, H>
where
    M: MenuSource,
    R: RatingSource,
    H: HallDirectory,
{
    pub fn new(menus: M, ratings: R, halls: H) -> Self {
        Self::with_params(menus, ratings, halls, ScoringParams::default())
    }

    pub fn with_params(menus: M, ratings: R, halls: H, params: ScoringParams) -> Self {
        Self {
            menus,
            ratings,
            halls,
            params,
        }
    }

    /// Same as [`recommend`](Self::recommend), taking the user identity as raw text.
    pub async fn recommend_for<Tz: TimeZone>(
        &self,
        raw_user_id: &str,
        now: &DateTime<Tz>,
    ) -> Result<Recommendation> {
        let user_id = parse_user_id(raw_user_id)?;
        self.recommend(user_id, now).await
    }

    /// `now` must already be in the dining halls' local time zone.
    pub async fn recommend<Tz: TimeZone>(
        &self,
        user_id: UserId,
        now: &DateTime<Tz>,
    ) -> Result<Recommendation> {
        let periods = allowed_meal_periods(now.hour());
        debug!(
            "User {} at {:02}:{:02}, serving periods: {:?}",
            user_id,
            now.hour(),
            now.minute(),
            periods
        );

        let menus = self
            .menus
            .menus_for_date(now.day(), now.month(), now.year(), &periods)
            .await?;

        if menus.is_empty() {
            info!("No menus for {}/{}/{} {:?}", now.month(), now.day(), now.year(), periods);
            return Ok(Recommendation::NoHallsServing);
        }
        debug!("Fetched {} candidate menus", menus.len());

        let dish_ids: HashSet<DishId> = menus
            .iter()
            .flat_map(|menu| menu.dishes.iter().map(|dish| dish.id))
            .collect();

        let user_scores = if dish_ids.is_empty() {
            HashMap::new()
        } else {
            let ratings = self.ratings.ratings_for_user(user_id, &dish_ids).await?;
            debug!("User {} has {} ratings on today's dishes", user_id, ratings.len());
            user_scores_by_dish(&ratings)
        };

        let mut best_per_hall: Vec<(HallId, &Menu, MenuScore)> =
            best_menu_per_hall(&menus, &user_scores, &self.params)
                .into_iter()
                .map(|(hall_id, (menu, score))| (hall_id, menu, score))
                .collect();
        best_per_hall.sort_by_key(|(hall_id, _, _)| *hall_id);

        let mut results = Vec::with_capacity(best_per_hall.len());
        for (hall_id, menu, score) in best_per_hall {
            let hall = match self.halls.hall_by_id(hall_id).await? {
                Some(hall) => hall,
                None => {
                    warn!("Menu {} references missing hall {}, skipping", menu.id, hall_id);
                    continue;
                }
            };

            debug!(
                "Hall {} ({}): score {:.3} basis {} (consensus {:.3}, {} user-rated dishes)",
                hall.id,
                hall.name,
                score.score,
                score.basis.as_str(),
                score.consensus,
                score.user_count
            );

            results.push(HallRecommendation {
                hall,
                score: score.score,
                basis: score.basis,
                top_dishes: top_dishes(&menu.dishes, self.params.top_dishes),
            });
        }

        if results.is_empty() {
            info!("No scorable hall among {} menus", menus.len());
            return Ok(Recommendation::NoSuitableHall);
        }

        Ok(Recommendation::Halls(rank_halls(
            results,
            self.params.top_halls,
        )))
    }
}

/// A hall can post more than one matching menu (e.g. DINNER and LUNCH_DINNER);
/// keep the highest-scoring one, lower menu ID on ties.
fn best_menu_per_hall<'a>(
    menus: &'a [Menu],
    user_scores: &HashMap<DishId, f64>,
    params: &ScoringParams,
) -> HashMap<HallId, (&'a Menu, MenuScore)> {
    let mut best: HashMap<HallId, (&'a Menu, MenuScore)> = HashMap::new();

    for menu in menus {
        let Some(score) = score_menu(menu, user_scores, params) else {
            debug!("Menu {} has no dishes, skipping", menu.id);
            continue;
        };

        let replace = match best.get(&menu.hall_id) {
            None => true,
            Some((current, current_score)) => {
                score.score > current_score.score
                    || (score.score == current_score.score && menu.id < current.id)
            }
        };
        if replace {
            best.insert(menu.hall_id, (menu, score));
        }
    }

    best
}
