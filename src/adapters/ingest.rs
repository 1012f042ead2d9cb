//! Loads scraper output into the store.
//!
//! The scraper emits `hall-slug -> PERIOD -> station -> [item name]`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::adapters::memory::InMemoryStore;
use crate::core::meal_period::{hall_display_name, meal_period_for_hall};
use crate::domain::model::{DishId, MealPeriod, MenuDate};
use crate::utils::error::Result;

pub type MenuData = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub halls: usize,
    pub menus: usize,
    pub dishes: usize,
    pub skipped_periods: Vec<String>,
    pub already_loaded: bool,
}

pub fn parse_menu_data(json: &str) -> Result<MenuData> {
    Ok(serde_json::from_str(json)?)
}

/// Ingests one day of scraped menus. A day counts as loaded once its dinner
/// menus are in, so ingesting the same day twice is a no-op.
pub async fn ingest_menu_data(
    store: &InMemoryStore,
    data: &MenuData,
    day: u32,
    month: u32,
    year: i32,
) -> Result<IngestReport> {
    let marker = MenuDate::new(day, month, year, Some(MealPeriod::Dinner));
    if store.has_loaded(&marker).await {
        tracing::info!("⏭️ Menus for {}/{}/{} already loaded", month, day, year);
        return Ok(IngestReport {
            already_loaded: true,
            ..IngestReport::default()
        });
    }

    let mut report = IngestReport::default();

    for (slug, periods) in data {
        let name = hall_display_name(slug).unwrap_or(slug.as_str());
        let hall = store.get_or_create_hall(name).await;
        report.halls += 1;

        for (raw_period, stations) in periods {
            let scraped = match raw_period.parse::<MealPeriod>() {
                Ok(period) => period,
                Err(_) => {
                    tracing::warn!("Unknown meal period '{}' for {}, skipping", raw_period, slug);
                    report.skipped_periods.push(format!("{}/{}", slug, raw_period));
                    continue;
                }
            };
            let period = meal_period_for_hall(slug, scraped);
            let date = MenuDate::new(day, month, year, Some(period));

            let mut dish_ids: Vec<DishId> = Vec::new();
            for (station, items) in stations {
                for item in items {
                    let dish = store.get_or_create_dish(item, hall.id, station, date).await?;
                    if !dish_ids.contains(&dish.id) {
                        dish_ids.push(dish.id);
                    }
                }
            }
            report.dishes += dish_ids.len();

            let menu = store.add_menu(hall.id, date, &dish_ids).await?;
            report.menus += 1;
            tracing::debug!(
                "Inserted {} menu {} ({}) with {} dishes",
                hall.name,
                menu.id,
                period,
                dish_ids.len()
            );
        }
    }

    store.set_last_loaded(marker).await;
    tracing::info!(
        "✅ Ingested {} menus across {} halls for {}/{}/{}",
        report.menus,
        report.halls,
        month,
        day,
        year
    );
    Ok(report)
}
