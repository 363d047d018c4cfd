use chrono::{DateTime, Duration, TimeZone, Utc};
use gasoracle::application::ml::{Forecaster, RandomForestLearner};
use gasoracle::application::{ForecastService, TrainingPolicy};
use gasoracle::domain::errors::ForecastError;
use gasoracle::domain::repositories::PriceStore;
use gasoracle::domain::types::{Forecast, UnavailableReason};
use gasoracle::infrastructure::{Database, SqlitePriceStore};
use std::sync::Arc;

const HISTORY: [f64; 10] = [10.0, 11.0, 9.0, 12.0, 13.0, 14.0, 12.0, 11.0, 15.0, 16.0];

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

async fn seeded_store(prices: &[f64]) -> Arc<SqlitePriceStore> {
    let database = Database::in_memory().await.expect("in-memory database");
    let store = Arc::new(SqlitePriceStore::new(database));
    for (i, &price) in prices.iter().enumerate() {
        store
            .append_at(start() + Duration::minutes(30 * i as i64), price)
            .await
            .expect("append");
    }
    store
}

fn service(store: Arc<SqlitePriceStore>) -> ForecastService {
    let forecaster = Arc::new(Forecaster::new(
        Arc::new(RandomForestLearner::default()),
        30,
    ));
    ForecastService::new(store, forecaster, TrainingPolicy::default())
}

#[tokio::test]
async fn test_end_to_end_train_and_forecast() {
    let store = seeded_store(&HISTORY).await;
    let service = service(store);

    let result = service.train().await.expect("train");
    assert!(result.trained);
    assert_eq!(result.sample_count, 10);
    assert_eq!(result.row_count, 5);

    let forecast = service.predict_next(3).await.expect("forecast");
    let points = forecast.points().expect("forecast should be available");
    assert_eq!(points.len(), 3);

    let anchor = start() + Duration::minutes(30 * 9);
    let offsets: Vec<i64> = points
        .iter()
        .map(|p| (p.timestamp - anchor).num_minutes())
        .collect();
    assert_eq!(offsets, vec![30, 60, 90]);

    for point in points {
        assert!(point.price.is_finite());
        // A tree ensemble only averages observed targets
        assert!((9.0..=16.0).contains(&point.price), "price {}", point.price);
    }
}

#[tokio::test]
async fn test_forecast_is_not_written_back() {
    let store = seeded_store(&HISTORY).await;
    let service = service(store.clone());

    service.train().await.unwrap();
    service.predict_next(6).await.unwrap();

    assert_eq!(store.count().await.unwrap(), HISTORY.len());
    let latest = store.recent(1).await.unwrap();
    assert_eq!(latest[0].price, 16.0);
}

#[tokio::test]
async fn test_same_history_gives_same_forecast() {
    let first = service(seeded_store(&HISTORY).await);
    let second = service(seeded_store(&HISTORY).await);

    first.train().await.unwrap();
    second.train().await.unwrap();

    let a = first.predict_next(4).await.unwrap();
    let b = second.predict_next(4).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_unavailable_until_min_samples() {
    let store = seeded_store(&HISTORY[..5]).await;
    let service = service(store);

    let result = service.train().await.unwrap();
    assert!(!result.trained);
    assert_eq!(
        service.predict_next(3).await.unwrap(),
        Forecast::Unavailable(UnavailableReason::NoModel)
    );

    // The sixth sample crosses the threshold and the next retrain publishes a model
    service.record(12.0).await.unwrap();
    let retrained = service.retrain_if_due().await.unwrap().expect("retrain due");
    assert!(retrained.trained);
    assert_eq!(retrained.row_count, 1);
    assert!(service.predict_next(3).await.unwrap().is_available());
}

#[tokio::test]
async fn test_zero_steps_is_rejected() {
    let service = service(seeded_store(&HISTORY).await);
    service.train().await.unwrap();

    let err = service.predict_next(0).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ForecastError>(),
        Some(ForecastError::InvalidSteps)
    ));
}

#[tokio::test]
async fn test_backfill_out_of_order_is_rejected() {
    let store = seeded_store(&HISTORY).await;

    let err = store.append_at(start(), 20.0).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ForecastError>(),
        Some(ForecastError::InvalidOrder { .. })
    ));
    assert_eq!(store.count().await.unwrap(), HISTORY.len());
}
