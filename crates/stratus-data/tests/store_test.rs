//! Integration tests for the on-disk store.

use chrono::{Duration, TimeZone, Utc};
use stratus_data::{
    ForecastRecord, ForecastSource, Location, ObservationRecord, RecordSource, SqliteStore,
    Variable, Vendor,
};

#[test]
fn test_records_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stratus.db");
    let issue = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let location = Location::new(52.37, 4.89);

    {
        let store = SqliteStore::open(&path).unwrap();
        let forecasts: Vec<_> = (1..=6)
            .map(|h| {
                ForecastRecord::normalized(
                    ForecastSource::Vendor(Vendor::OpenWeather),
                    location,
                    Variable::Temperature2m,
                    issue,
                    issue + Duration::hours(h),
                    290.0,
                    "K",
                )
                .unwrap()
            })
            .collect();
        store.insert_forecasts(&forecasts).unwrap();

        let obs = ObservationRecord::normalized(
            "06240",
            location,
            Variable::Temperature2m,
            issue + Duration::hours(1),
            17.0,
            "C",
            "meteostat",
        )
        .unwrap();
        store.insert_observations(&[obs]).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let forecasts = store.forecasts(Variable::Temperature2m).unwrap();
    assert_eq!(forecasts.len(), 6);
    assert!(
        forecasts
            .iter()
            .all(|f| (f.value() - 16.85).abs() < 1e-9 && f.horizon_hours() >= 1)
    );
    assert_eq!(store.observations(Variable::Temperature2m).unwrap().len(), 1);
}

#[test]
fn test_exactly_one_champion_after_any_swap_sequence() {
    let store = SqliteStore::in_memory().unwrap();
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let name = "wind_speed_10m_h12";

    let mut expected = None;
    for i in 0..5 {
        let run = format!("run-{i}");
        // Every other attempt uses a stale expectation and must be a no-op
        if i % 2 == 1 {
            let stale = store.swap_champion(name, None, &run, at).unwrap();
            assert!(stale.is_none());
        } else {
            let champion = store.swap_champion(name, expected, &run, at).unwrap().unwrap();
            expected = Some(champion.id);
        }

        let champions: Vec<_> = store
            .get_models(name)
            .unwrap()
            .into_iter()
            .filter(|m| m.is_champion)
            .collect();
        assert_eq!(champions.len(), 1);
    }

    assert_eq!(
        store.get_champion(name).unwrap().unwrap().run_identifier,
        "run-4"
    );
}
