use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;
use dining_rec::core::meal_period::allowed_meal_periods;
use dining_rec::domain::model::{DiningHall, Dish, DishId, HallId, MealPeriod, Menu, MenuDate, Rating, UserId};
use dining_rec::domain::ports::{HallDirectory, MenuSource, RatingSource};
use dining_rec::{HallRecommender, RecError, Recommendation, Result, ScoreBasis, ScoringParams};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Plain in-memory fake of all three collaborators.
#[derive(Clone, Default)]
struct FakeData {
    menus: Vec<Menu>,
    ratings: Vec<Rating>,
    halls: Vec<DiningHall>,
    rating_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl MenuSource for FakeData {
    async fn menus_for_date(
        &self,
        day: u32,
        month: u32,
        year: i32,
        meal_periods: &[MealPeriod],
    ) -> Result<Vec<Menu>> {
        Ok(self
            .menus
            .iter()
            .filter(|m| m.date.same_day(day, month, year))
            .filter(|m| m.date.meal_period.is_some_and(|p| meal_periods.contains(&p)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RatingSource for FakeData {
    async fn ratings_for_user(
        &self,
        user_id: UserId,
        dish_ids: &HashSet<DishId>,
    ) -> Result<Vec<Rating>> {
        self.rating_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id && dish_ids.contains(&r.dish_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HallDirectory for FakeData {
    async fn hall_by_id(&self, hall_id: HallId) -> Result<Option<DiningHall>> {
        Ok(self.halls.iter().find(|h| h.id == hall_id).cloned())
    }
}

struct FailingRatings;

#[async_trait]
impl RatingSource for FailingRatings {
    async fn ratings_for_user(&self, _: UserId, _: &HashSet<DishId>) -> Result<Vec<Rating>> {
        Err(RecError::upstream("ratings", "connection refused"))
    }
}

fn pacific(hour: u32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::west_opt(7 * 3600).unwrap();
    offset.with_ymd_and_hms(2025, 5, 14, hour, 30, 0).unwrap()
}

fn hall(id: HallId) -> DiningHall {
    DiningHall {
        id,
        name: format!("Hall {}", id),
        location: None,
    }
}

fn dish(id: DishId, hall_id: HallId, average_rating: f64) -> Dish {
    Dish {
        id,
        hall_id,
        name: format!("Dish {}", id),
        description: None,
        average_rating,
        tags: vec![],
        location: None,
        last_seen_date: None,
    }
}

fn menu(id: u64, hall_id: HallId, period: MealPeriod, dishes: Vec<Dish>) -> Menu {
    Menu {
        id,
        hall_id,
        date: MenuDate::new(14, 5, 2025, Some(period)),
        dishes,
    }
}

fn rating(user_id: UserId, dish_id: DishId, score: u8) -> Rating {
    Rating {
        id: 0,
        user_id,
        dish_id,
        score,
        comment: None,
        created_at: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
    }
}

fn recommender(data: FakeData) -> HallRecommender<FakeData, FakeData, FakeData> {
    HallRecommender::new(data.clone(), data.clone(), data)
}

#[tokio::test]
async fn test_blended_score_scenario() {
    let data = FakeData {
        menus: vec![menu(
            1,
            1,
            MealPeriod::Lunch,
            vec![dish(1, 1, 4.0), dish(2, 1, 0.0)],
        )],
        ratings: vec![rating(7, 1, 5)],
        halls: vec![hall(1)],
        ..FakeData::default()
    };

    let result = recommender(data).recommend(7, &pacific(12)).await.unwrap();
    let halls = result.halls();

    assert_eq!(halls.len(), 1);
    assert!((halls[0].score - 14.0 / 3.0).abs() < 1e-9);
    assert_eq!(halls[0].basis, ScoreBasis::UserAndConsensus);
    assert_eq!(
        halls[0].top_dishes.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[tokio::test]
async fn test_consensus_only_for_user_without_history() {
    let data = FakeData {
        menus: vec![menu(
            1,
            1,
            MealPeriod::Dinner,
            vec![dish(1, 1, 3.0), dish(2, 1, 5.0)],
        )],
        ratings: vec![rating(8, 1, 1)],
        halls: vec![hall(1)],
        ..FakeData::default()
    };

    let result = recommender(data).recommend(7, &pacific(19)).await.unwrap();

    assert_eq!(result.halls()[0].score, 4.0);
    assert_eq!(result.halls()[0].basis, ScoreBasis::Consensus);
}

#[tokio::test]
async fn test_ranking_tie_break_and_truncation() {
    // scores [9, 8, 8, 7, 6] for hall IDs [3, 1, 2, 5, 4]; one dish each rated at score/2
    let layout = [(3, 4.5), (1, 4.0), (2, 4.0), (5, 3.5), (4, 3.0)];
    let menus = layout
        .iter()
        .enumerate()
        .map(|(i, (hall_id, avg))| {
            menu(
                i as u64 + 1,
                *hall_id,
                MealPeriod::Breakfast,
                vec![dish(100 + *hall_id, *hall_id, *avg)],
            )
        })
        .collect();

    let data = FakeData {
        menus,
        halls: (1..=5).map(hall).collect(),
        ..FakeData::default()
    };

    let result = recommender(data).recommend(1, &pacific(8)).await.unwrap();
    let ids: Vec<HallId> = result.halls().iter().map(|h| h.hall.id).collect();

    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn test_no_menus_is_no_halls_serving() {
    let data = FakeData {
        menus: vec![menu(1, 1, MealPeriod::Breakfast, vec![dish(1, 1, 4.0)])],
        halls: vec![hall(1)],
        ..FakeData::default()
    };

    // 16:30 resolves to NONE, nothing is tagged NONE
    let result = recommender(data.clone()).recommend(1, &pacific(16)).await.unwrap();

    assert_eq!(result, Recommendation::NoHallsServing);
    assert_eq!(
        result.message(),
        Some("No halls are serving meals at this time.")
    );
    assert_eq!(data.rating_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_only_empty_menus_is_no_suitable_hall() {
    let data = FakeData {
        menus: vec![menu(1, 1, MealPeriod::Lunch, vec![])],
        halls: vec![hall(1)],
        ..FakeData::default()
    };

    let result = recommender(data.clone()).recommend(1, &pacific(13)).await.unwrap();

    assert_eq!(result, Recommendation::NoSuitableHall);
    assert_eq!(result.message(), Some("No suitable recommendation found."));
    assert_eq!(data.rating_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_menu_with_missing_hall_is_skipped() {
    let data = FakeData {
        menus: vec![
            menu(1, 1, MealPeriod::Lunch, vec![dish(1, 1, 4.0)]),
            menu(2, 99, MealPeriod::Lunch, vec![dish(2, 99, 5.0)]),
        ],
        halls: vec![hall(1)],
        ..FakeData::default()
    };

    let result = recommender(data).recommend(1, &pacific(13)).await.unwrap();
    assert_eq!(result.halls().len(), 1);
    assert_eq!(result.halls()[0].hall.id, 1);
}

#[tokio::test]
async fn test_aggregate_periods_are_included() {
    let data = FakeData {
        menus: vec![
            menu(1, 1, MealPeriod::AllDay, vec![dish(1, 1, 3.0)]),
            menu(2, 2, MealPeriod::LunchDinner, vec![dish(2, 2, 4.0)]),
            menu(3, 3, MealPeriod::Breakfast, vec![dish(3, 3, 5.0)]),
        ],
        halls: (1..=3).map(hall).collect(),
        ..FakeData::default()
    };
    let recommender = recommender(data);

    let dinner = recommender.recommend(1, &pacific(19)).await.unwrap();
    let ids: Vec<HallId> = dinner.halls().iter().map(|h| h.hall.id).collect();
    assert_eq!(ids, vec![2, 1]);

    // late night only matches LATE_NIGHT menus
    let late = recommender.recommend(1, &pacific(23)).await.unwrap();
    assert_eq!(late, Recommendation::NoHallsServing);
}

#[tokio::test]
async fn test_date_is_taken_in_given_zone() {
    let data = FakeData {
        menus: vec![menu(1, 1, MealPeriod::Dinner, vec![dish(1, 1, 4.0)])],
        halls: vec![hall(1)],
        ..FakeData::default()
    };

    // 2025-05-15T02:30Z is 19:30 on the 14th in Pacific time
    let utc = Utc.with_ymd_and_hms(2025, 5, 15, 2, 30, 0).unwrap();
    let local = utc.with_timezone(&FixedOffset::west_opt(7 * 3600).unwrap());

    let result = recommender(data.clone()).recommend(1, &local).await.unwrap();
    assert_eq!(result.halls().len(), 1);

    let as_utc = recommender(data).recommend(1, &utc).await.unwrap();
    assert_eq!(as_utc, Recommendation::NoHallsServing);
}

#[tokio::test]
async fn test_upstream_failure_propagates() {
    let data = FakeData {
        menus: vec![menu(1, 1, MealPeriod::Lunch, vec![dish(1, 1, 4.0)])],
        halls: vec![hall(1)],
        ..FakeData::default()
    };
    let recommender = HallRecommender::new(data.clone(), FailingRatings, data);

    let result = recommender.recommend(1, &pacific(13)).await;

    match result {
        Err(RecError::UpstreamError { source_name, message }) => {
            assert_eq!(source_name, "ratings");
            assert_eq!(message, "connection refused");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_user_id_is_input_error() {
    let recommender = recommender(FakeData::default());
    let result = recommender.recommend_for("not-a-user", &pacific(13)).await;
    assert!(matches!(result, Err(RecError::InvalidUserId { .. })));
}

#[tokio::test]
async fn test_repeated_calls_are_identical() {
    let data = FakeData {
        menus: vec![
            menu(1, 2, MealPeriod::Lunch, vec![dish(1, 2, 4.0), dish(2, 2, 4.0)]),
            menu(2, 1, MealPeriod::Lunch, vec![dish(3, 1, 4.0)]),
            menu(3, 3, MealPeriod::AllDay, vec![dish(4, 3, f64::NAN), dish(5, 3, 2.0)]),
        ],
        ratings: vec![rating(1, 5, 5)],
        halls: (1..=3).map(hall).collect(),
        ..FakeData::default()
    };
    let recommender = recommender(data);

    let first = recommender.recommend(1, &pacific(13)).await.unwrap();
    let second = recommender.recommend(1, &pacific(13)).await.unwrap();

    assert_eq!(first, second);
    let ids: Vec<HallId> = first.halls().iter().map(|h| h.hall.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(first.halls().iter().all(|h| h.score.is_finite()));
}

#[tokio::test]
async fn test_custom_params_limit_output() {
    let data = FakeData {
        menus: vec![
            menu(1, 1, MealPeriod::Lunch, vec![dish(1, 1, 4.0), dish(2, 1, 3.0)]),
            menu(2, 2, MealPeriod::Lunch, vec![dish(3, 2, 2.0)]),
        ],
        ratings: vec![rating(1, 2, 1)],
        halls: vec![hall(1), hall(2)],
        ..FakeData::default()
    };
    let params = ScoringParams {
        user_weight: 1.0,
        consensus_weight: 1.0,
        top_halls: 1,
        top_dishes: 1,
    };
    let recommender = HallRecommender::with_params(data.clone(), data.clone(), data, params);

    let result = recommender.recommend(1, &pacific(13)).await.unwrap();
    let top = &result.halls()[0];

    assert_eq!(result.halls().len(), 1);
    assert_eq!(top.hall.id, 1);
    assert!((top.score - 2.25).abs() < 1e-9);
    assert_eq!(top.top_dishes.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_recommender_serves_concurrent_requests() {
    let data = FakeData {
        menus: vec![
            menu(1, 1, MealPeriod::Lunch, vec![dish(1, 1, 4.0), dish(2, 1, 3.0)]),
            menu(2, 2, MealPeriod::LunchDinner, vec![dish(3, 2, 4.5)]),
            menu(3, 3, MealPeriod::AllDay, vec![dish(4, 3, 2.0)]),
        ],
        ratings: vec![rating(1, 1, 5), rating(2, 3, 1)],
        halls: (1..=3).map(hall).collect(),
        ..FakeData::default()
    };
    let calls = data.rating_calls.clone();
    let shared = Arc::new(recommender(data));
    let noon = Los_Angeles.with_ymd_and_hms(2025, 5, 14, 12, 30, 0).unwrap();

    let expected = shared.recommend(1, &noon).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let recommender = Arc::clone(&shared);
            tokio::spawn(async move { recommender.recommend(1, &noon).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result, expected);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 9);

    // another user's request in flight does not change this user's result
    let (mine, theirs) = tokio::join!(shared.recommend(1, &noon), shared.recommend(2, &noon));
    assert_eq!(mine.unwrap(), expected);
    assert_ne!(theirs.unwrap(), expected);
}

#[tokio::test]
async fn test_named_zone_tracks_standard_time() {
    let data = FakeData {
        menus: vec![Menu {
            id: 1,
            hall_id: 1,
            date: MenuDate::new(15, 1, 2025, Some(MealPeriod::Breakfast)),
            dishes: vec![dish(1, 1, 4.0)],
        }],
        halls: vec![hall(1)],
        ..FakeData::default()
    };
    let recommender = recommender(data);

    // 15:30Z in January is 07:30 PST, half an hour before breakfast
    let early = Utc.with_ymd_and_hms(2025, 1, 15, 15, 30, 0).unwrap();
    let result = recommender
        .recommend(1, &early.with_timezone(&Los_Angeles))
        .await
        .unwrap();
    assert_eq!(result, Recommendation::NoHallsServing);

    let breakfast = Utc.with_ymd_and_hms(2025, 1, 15, 16, 30, 0).unwrap();
    let result = recommender
        .recommend(1, &breakfast.with_timezone(&Los_Angeles))
        .await
        .unwrap();
    assert_eq!(result.halls().len(), 1);
}

#[test]
fn test_allowed_periods_boundaries() {
    for hour in [2, 3, 4, 5, 6, 7, 10, 15, 16, 21] {
        assert_eq!(allowed_meal_periods(hour), vec![MealPeriod::None], "hour {}", hour);
    }
}
