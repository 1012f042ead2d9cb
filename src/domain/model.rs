use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::{RecError, Result};

pub type UserId = u64;
pub type DishId = u64;
pub type HallId = u64;
pub type MenuId = u64;

/// Named serving window, or one of the aggregate tags some halls file their menus under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealPeriod {
    Breakfast,
    Lunch,
    Dinner,
    LateNight,
    AllDay,
    LunchDinner,
    None,
}

impl MealPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealPeriod::Breakfast => "BREAKFAST",
            MealPeriod::Lunch => "LUNCH",
            MealPeriod::Dinner => "DINNER",
            MealPeriod::LateNight => "LATE_NIGHT",
            MealPeriod::AllDay => "ALL_DAY",
            MealPeriod::LunchDinner => "LUNCH_DINNER",
            MealPeriod::None => "NONE",
        }
    }

    /// Ordering used by the ingest tracker. Only the three daily periods are ranked.
    pub fn rank(period: Option<MealPeriod>) -> u8 {
        match period {
            Some(MealPeriod::Breakfast) => 1,
            Some(MealPeriod::Lunch) => 2,
            Some(MealPeriod::Dinner) => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for MealPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealPeriod {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BREAKFAST" => Ok(MealPeriod::Breakfast),
            "LUNCH" => Ok(MealPeriod::Lunch),
            "DINNER" => Ok(MealPeriod::Dinner),
            "LATE_NIGHT" => Ok(MealPeriod::LateNight),
            "ALL_DAY" => Ok(MealPeriod::AllDay),
            "LUNCH_DINNER" => Ok(MealPeriod::LunchDinner),
            "NONE" | "" => Ok(MealPeriod::None),
            other => Err(RecError::InvalidConfigValueError {
                field: "meal_period".to_string(),
                value: other.to_string(),
                reason: "Unknown meal period".to_string(),
            }),
        }
    }
}

/// Calendar day plus an optional meal-period tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuDate {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_period: Option<MealPeriod>,
}

impl MenuDate {
    pub fn new(day: u32, month: u32, year: i32, meal_period: Option<MealPeriod>) -> Self {
        Self {
            day,
            month,
            year,
            meal_period,
        }
    }

    pub fn same_day(&self, day: u32, month: u32, year: i32) -> bool {
        self.day == day && self.month == month && self.year == year
    }

    /// True when `self` is on a later day than `other`, or the same day at an
    /// equal or later meal period.
    pub fn is_equal_or_after(&self, other: &MenuDate) -> bool {
        if self.year != other.year {
            return self.year > other.year;
        }
        if self.month != other.month {
            return self.month > other.month;
        }
        if self.day != other.day {
            return self.day > other.day;
        }
        MealPeriod::rank(self.meal_period) >= MealPeriod::rank(other.meal_period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningHall {
    pub id: HallId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: DishId,
    pub hall_id: HallId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Running mean of every rating for this dish; 0 means nobody has rated it.
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_date: Option<MenuDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub hall_id: HallId,
    pub date: MenuDate,
    pub dishes: Vec<Dish>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default)]
    pub id: u64,
    pub user_id: UserId,
    pub dish_id: DishId,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Parses the caller-supplied user identity.
pub fn parse_user_id(raw: &str) -> Result<UserId> {
    raw.trim()
        .parse::<UserId>()
        .map_err(|_| RecError::InvalidUserId {
            value: raw.to_string(),
        })
}
