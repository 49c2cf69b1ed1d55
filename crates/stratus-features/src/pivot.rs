//! Vendor pivot.
//!
//! Turns long-form vendor forecasts into one row per `(location,
//! valid_time)` with one optional value per vendor. Several records for the
//! same `(location, valid_time, vendor)` (e.g. successive issues) are
//! averaged.

use crate::row::VendorValues;
use chrono::{DateTime, Utc};
use stratus_data::{ForecastRecord, Location, Vendor};

/// One pivoted row.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    /// Row location
    pub location: Location,
    /// Valid time
    pub valid_time: DateTime<Utc>,
    /// Averaged vendor values
    pub vendors: VendorValues,
}

/// Pivot vendor forecasts. Records from non-vendor sources are ignored.
///
/// Output is sorted by `(location, valid_time)`.
pub fn pivot_vendors<'a>(forecasts: impl IntoIterator<Item = &'a ForecastRecord>) -> Vec<PivotRow> {
    let mut entries: Vec<(Location, DateTime<Utc>, Vendor, f64)> = forecasts
        .into_iter()
        .filter_map(|f| {
            f.source()
                .vendor()
                .map(|v| (f.location(), f.valid_time(), v, f.value()))
        })
        .collect();

    entries.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut rows: Vec<PivotRow> = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let (location, valid_time, _, _) = entries[i];
        let mut vendors = VendorValues::default();

        while i < entries.len() && entries[i].0 == location && entries[i].1 == valid_time {
            let vendor = entries[i].2;
            let mut sum = 0.0;
            let mut count = 0usize;
            while i < entries.len()
                && entries[i].0 == location
                && entries[i].1 == valid_time
                && entries[i].2 == vendor
            {
                sum += entries[i].3;
                count += 1;
                i += 1;
            }
            vendors.set(vendor, Some(sum / count as f64));
        }

        rows.push(PivotRow {
            location,
            valid_time,
            vendors,
        });
    }

    rows
}
