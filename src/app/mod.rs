//! Wiring between configuration, the snapshot store and the recommender.

pub mod output;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

use crate::adapters::ingest::{ingest_menu_data, parse_menu_data, IngestReport};
use crate::adapters::memory::{DishMatch, InMemoryStore, NewRating};
use crate::adapters::snapshot::{is_remote, load_snapshot, write_snapshot_file};
use crate::config::toml_config::RecommenderConfig;
use crate::core::recommender::{HallRecommender, Recommendation};
use crate::domain::model::{
    parse_user_id, DishId, HallId, MealPeriod, Menu, MenuDate, Rating, UserId,
};
use crate::utils::error::{RecError, Result};

pub const DISH_SEARCH_LIMIT: usize = 10;

pub async fn open_store(config: &RecommenderConfig) -> Result<InMemoryStore> {
    let snapshot = load_snapshot(&config.data.source).await?;
    InMemoryStore::from_snapshot(snapshot)
}

/// Writable commands start from an empty store when the snapshot file does not exist yet.
async fn open_writable_store(config: &RecommenderConfig) -> Result<InMemoryStore> {
    let source = &config.data.source;
    if is_remote(source) {
        return Err(RecError::ConfigValidationError {
            field: "data.source".to_string(),
            message: "must be a local file to record changes".to_string(),
        });
    }

    if Path::new(source).exists() {
        open_store(config).await
    } else {
        tracing::info!("📁 {} does not exist yet, starting empty", source);
        Ok(InMemoryStore::new())
    }
}

async fn save_store(config: &RecommenderConfig, store: &InMemoryStore) -> Result<()> {
    write_snapshot_file(&config.data.source, &store.snapshot().await).await
}

/// The current time in the halls' zone, or the `at` override converted into it.
pub fn resolve_now(config: &RecommenderConfig, at: Option<&str>) -> Result<DateTime<Tz>> {
    let tz = config.time_zone()?;

    match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| parsed.with_timezone(&tz))
            .map_err(|e| RecError::InvalidConfigValueError {
                field: "at".to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(Utc::now().with_timezone(&tz)),
    }
}

pub async fn recommend<Z: TimeZone>(
    store: &InMemoryStore,
    config: &RecommenderConfig,
    user_id: UserId,
    now: &DateTime<Z>,
) -> Result<Recommendation> {
    let recommender = HallRecommender::with_params(
        store.clone(),
        store.clone(),
        store.clone(),
        config.scoring_params(),
    );
    recommender.recommend(user_id, now).await
}

/// Runs a recommendation and renders it in the configured output format.
pub async fn run_recommend(
    config: &RecommenderConfig,
    raw_user_id: &str,
    at: Option<&str>,
) -> Result<String> {
    let user_id = parse_user_id(raw_user_id)?;
    let now = resolve_now(config, at)?;
    let store = open_store(config).await?;

    let recommendation = recommend(&store, config, user_id, &now).await?;
    if let Some(message) = recommendation.message() {
        tracing::info!("ℹ️ {}", message);
    } else {
        tracing::info!(
            "✅ {} halls recommended for user {}",
            recommendation.halls().len(),
            user_id
        );
    }

    output::render(&recommendation, &config.output.format)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| RecError::InvalidConfigValueError {
        field: "date".to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

pub async fn run_ingest(
    config: &RecommenderConfig,
    menus_path: &str,
    date: Option<&str>,
) -> Result<IngestReport> {
    let date = match date {
        Some(raw) => parse_date(raw)?,
        None => resolve_now(config, None)?.date_naive(),
    };

    let store = open_writable_store(config).await?;
    let content = tokio::fs::read_to_string(menus_path).await?;
    let data = parse_menu_data(&content)?;

    let report = ingest_menu_data(&store, &data, date.day(), date.month(), date.year()).await?;
    if !report.already_loaded {
        save_store(config, &store).await?;
    }
    Ok(report)
}

pub async fn run_rate(
    config: &RecommenderConfig,
    raw_user_id: &str,
    dish_id: DishId,
    score: i64,
    comment: Option<String>,
) -> Result<Rating> {
    let user_id = parse_user_id(raw_user_id)?;
    let store = open_writable_store(config).await?;

    let rating = store.create_rating(user_id, dish_id, score, comment).await?;
    save_store(config, &store).await?;
    if let Some(dish) = store.dish_by_id(dish_id).await {
        tracing::info!("⭐ {} now averages {:.2}", dish.name, dish.average_rating);
    }
    Ok(rating)
}

/// Body of a batch rating file: `{"ratings": [{"dish_id": 1, "score": 4}]}`.
#[derive(Debug, Deserialize)]
pub struct RatingBatch {
    pub ratings: Vec<NewRating>,
}

/// Records every rating in the file for one user, or none of them.
pub async fn run_rate_batch(
    config: &RecommenderConfig,
    raw_user_id: &str,
    batch_path: &str,
) -> Result<Vec<Rating>> {
    let user_id = parse_user_id(raw_user_id)?;
    let content = tokio::fs::read_to_string(batch_path).await?;
    let batch: RatingBatch = serde_json::from_str(&content)?;
    let store = open_writable_store(config).await?;

    let stored = store.create_multiple_ratings(user_id, batch.ratings).await?;
    save_store(config, &store).await?;
    tracing::info!("✅ Submitted {} ratings for user {}", stored.len(), user_id);
    Ok(stored)
}

/// The menu a hall filed for one date and meal period.
pub async fn run_menu(
    config: &RecommenderConfig,
    hall_id: HallId,
    date: &str,
    meal_period: Option<&str>,
) -> Result<Option<Menu>> {
    let date = parse_date(date)?;
    let meal_period = meal_period.map(str::parse::<MealPeriod>).transpose()?;
    let store = open_store(config).await?;

    let menu_date = MenuDate::new(date.day(), date.month(), date.year(), meal_period);
    store.menu_by_hall_and_date(hall_id, menu_date).await
}

/// Ratings left by one user, or ratings left on one dish. Exactly one must be given.
pub async fn run_ratings(
    config: &RecommenderConfig,
    raw_user_id: Option<&str>,
    dish_id: Option<DishId>,
) -> Result<Vec<Rating>> {
    let query = match (raw_user_id, dish_id) {
        (Some(raw), None) => RatingsQuery::User(parse_user_id(raw)?),
        (None, Some(dish_id)) => RatingsQuery::Dish(dish_id),
        (None, None) => {
            return Err(RecError::MissingConfigError {
                field: "user or dish".to_string(),
            })
        }
        (Some(_), Some(_)) => {
            return Err(RecError::ConfigValidationError {
                field: "ratings".to_string(),
                message: "give either a user or a dish, not both".to_string(),
            })
        }
    };

    let store = open_store(config).await?;
    Ok(match query {
        RatingsQuery::User(user_id) => store.ratings_by_user(user_id).await,
        RatingsQuery::Dish(dish_id) => store.ratings_by_dish(dish_id).await,
    })
}

enum RatingsQuery {
    User(UserId),
    Dish(DishId),
}

/// Dishes whose name has a word starting with `keyword`.
pub async fn run_search_dishes(config: &RecommenderConfig, keyword: &str) -> Result<Vec<DishMatch>> {
    if keyword.trim().is_empty() {
        return Err(RecError::InvalidConfigValueError {
            field: "search".to_string(),
            value: keyword.to_string(),
            reason: "keyword cannot be empty".to_string(),
        });
    }

    let store = open_store(config).await?;
    store.search_dishes(keyword, DISH_SEARCH_LIMIT).await
}

/// Recomputes every dish average from the stored ratings; saves only when something changed.
pub async fn run_repair(config: &RecommenderConfig) -> Result<usize> {
    let store = open_writable_store(config).await?;
    let changed = store.recalculate_all_ratings().await;

    if changed > 0 {
        save_store(config, &store).await?;
        tracing::info!("🔧 Repaired the average of {} dishes", changed);
    } else {
        tracing::info!("✅ All dish averages already match their ratings");
    }
    Ok(changed)
}
