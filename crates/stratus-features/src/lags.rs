//! Observation series and lagged-observation features.
//!
//! Observations are grouped per location and sorted by time; several
//! observations sharing a `(location, obs_time)` are averaged. A lag of `L`
//! hours at valid time `T` is the observation taken exactly at `T - L`.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use stratus_data::{Location, ObservationRecord};

/// Deduplicated observations, one time-sorted series per location.
#[derive(Debug, Clone, Default)]
pub struct ObservationSeries {
    by_location: BTreeMap<Location, Vec<(DateTime<Utc>, f64)>>,
}

impl ObservationSeries {
    /// Build from raw observation records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ObservationRecord>) -> Self {
        let mut raw: BTreeMap<Location, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
        for r in records {
            raw.entry(r.location).or_default().push((r.obs_time, r.value));
        }

        let by_location = raw
            .into_iter()
            .map(|(location, mut points)| {
                points.sort_by(|a, b| a.0.cmp(&b.0));
                (location, dedup_mean(points))
            })
            .collect();

        Self { by_location }
    }

    /// Time-sorted series for one location (empty when unobserved).
    pub fn at(&self, location: &Location) -> &[(DateTime<Utc>, f64)] {
        self.by_location.get(location).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether there are no observations at all.
    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }

    /// Observation `lag_hours` before `valid_time`, if one was taken exactly then.
    pub fn lagged(
        &self,
        location: &Location,
        valid_time: DateTime<Utc>,
        lag_hours: u32,
    ) -> Option<f64> {
        let target = valid_time - Duration::hours(i64::from(lag_hours));
        let series = self.at(location);
        series
            .binary_search_by(|(t, _)| t.cmp(&target))
            .ok()
            .map(|i| series[i].1)
    }

    /// All configured lags for one key, aligned with `lag_hours`.
    pub fn lag_features(
        &self,
        location: &Location,
        valid_time: DateTime<Utc>,
        lag_hours: &[u32],
    ) -> Vec<Option<f64>> {
        lag_hours
            .iter()
            .map(|&l| self.lagged(location, valid_time, l))
            .collect()
    }
}

/// Collapse equal timestamps of a sorted series into their mean.
fn dedup_mean(points: Vec<(DateTime<Utc>, f64)>) -> Vec<(DateTime<Utc>, f64)> {
    let mut out: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(points.len());
    let mut count = 0usize;
    for (time, value) in points {
        match out.last_mut() {
            Some(last) if last.0 == time => {
                count += 1;
                last.1 += (value - last.1) / count as f64;
            }
            _ => {
                out.push((time, value));
                count = 1;
            }
        }
    }
    out
}
