//! Maps a local wall-clock hour to the meal periods currently being served.
//!
//! All bounds are exclusive on both ends: 07:xx and 10:xx are not breakfast,
//! 15:xx and 16:xx are not lunch, and so on.

use crate::domain::model::MealPeriod;

/// Halls that post one unchanging menu for the whole day.
const ALL_DAY_HALLS: &[&str] = &["bruin-cafe"];

/// Halls that merge lunch and dinner into a single menu.
const LUNCH_DINNER_HALLS: &[&str] = &["epicuria-at-ackerman", "rendezvous", "the-drey"];

const HALL_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("de-neve-dining", "De Neve"),
    ("bruin-cafe", "Bruin Cafe"),
    ("bruin-plate", "Bruin Plate"),
    ("cafe-1919", "Cafe 1919"),
    ("epicuria-at-covel", "Epicuria"),
    ("epicuria-at-ackerman", "Epic at Ackerman"),
    ("rendezvous", "Rendezvous"),
    ("the-drey", "The Drey"),
    ("spice-kitchen", "Spice Kitchen at Bruin Bowl"),
];

pub fn actual_meal_period(hour: u32) -> MealPeriod {
    if hour > 7 && hour < 10 {
        MealPeriod::Breakfast
    } else if hour > 11 && hour < 15 {
        MealPeriod::Lunch
    } else if hour > 17 && hour < 21 {
        MealPeriod::Dinner
    } else if hour < 2 || hour > 21 {
        MealPeriod::LateNight
    } else {
        MealPeriod::None
    }
}

/// The primary period first, followed by the aggregate tags that also count as serving.
pub fn allowed_meal_periods(hour: u32) -> Vec<MealPeriod> {
    let primary = actual_meal_period(hour);
    let mut periods = vec![primary];

    if primary != MealPeriod::None && primary != MealPeriod::LateNight {
        periods.push(MealPeriod::AllDay);
    }
    if primary == MealPeriod::Lunch || primary == MealPeriod::Dinner {
        periods.push(MealPeriod::LunchDinner);
    }

    periods
}

/// The tag a hall's scraped menu is filed under.
pub fn meal_period_for_hall(hall_slug: &str, scraped: MealPeriod) -> MealPeriod {
    if ALL_DAY_HALLS.contains(&hall_slug) {
        MealPeriod::AllDay
    } else if LUNCH_DINNER_HALLS.contains(&hall_slug) {
        MealPeriod::LunchDinner
    } else {
        scraped
    }
}

pub fn hall_display_name(hall_slug: &str) -> Option<&'static str> {
    HALL_DISPLAY_NAMES
        .iter()
        .find(|(slug, _)| *slug == hall_slug)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakfast_bounds_are_exclusive() {
        assert_eq!(actual_meal_period(7), MealPeriod::None);
        assert_eq!(actual_meal_period(8), MealPeriod::Breakfast);
        assert_eq!(actual_meal_period(9), MealPeriod::Breakfast);
        assert_eq!(actual_meal_period(10), MealPeriod::None);
    }

    #[test]
    fn test_full_day_mapping() {
        let expected = [
            (0, MealPeriod::LateNight),
            (1, MealPeriod::LateNight),
            (2, MealPeriod::None),
            (3, MealPeriod::None),
            (4, MealPeriod::None),
            (5, MealPeriod::None),
            (6, MealPeriod::None),
            (7, MealPeriod::None),
            (8, MealPeriod::Breakfast),
            (9, MealPeriod::Breakfast),
            (10, MealPeriod::None),
            (11, MealPeriod::None),
            (12, MealPeriod::Lunch),
            (13, MealPeriod::Lunch),
            (14, MealPeriod::Lunch),
            (15, MealPeriod::None),
            (16, MealPeriod::None),
            (17, MealPeriod::None),
            (18, MealPeriod::Dinner),
            (19, MealPeriod::Dinner),
            (20, MealPeriod::Dinner),
            (21, MealPeriod::None),
            (22, MealPeriod::LateNight),
            (23, MealPeriod::LateNight),
        ];

        for (hour, period) in expected {
            assert_eq!(actual_meal_period(hour), period, "hour {}", hour);
        }
    }

    #[test]
    fn test_allowed_periods_expansion() {
        assert_eq!(
            allowed_meal_periods(9),
            vec![MealPeriod::Breakfast, MealPeriod::AllDay]
        );
        assert_eq!(
            allowed_meal_periods(13),
            vec![MealPeriod::Lunch, MealPeriod::AllDay, MealPeriod::LunchDinner]
        );
        assert_eq!(
            allowed_meal_periods(19),
            vec![MealPeriod::Dinner, MealPeriod::AllDay, MealPeriod::LunchDinner]
        );
        assert_eq!(allowed_meal_periods(23), vec![MealPeriod::LateNight]);
        assert_eq!(allowed_meal_periods(16), vec![MealPeriod::None]);
    }

    #[test]
    fn test_meal_period_for_hall() {
        assert_eq!(
            meal_period_for_hall("bruin-cafe", MealPeriod::Breakfast),
            MealPeriod::AllDay
        );
        assert_eq!(
            meal_period_for_hall("rendezvous", MealPeriod::Dinner),
            MealPeriod::LunchDinner
        );
        assert_eq!(
            meal_period_for_hall("de-neve-dining", MealPeriod::Lunch),
            MealPeriod::Lunch
        );
    }

    #[test]
    fn test_hall_display_name() {
        assert_eq!(hall_display_name("the-drey"), Some("The Drey"));
        assert_eq!(hall_display_name("unknown-hall"), None);
    }
}
