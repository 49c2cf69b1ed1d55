//! Tolerance join for training labels.
//!
//! For each key time the nearest observation is chosen with a single merge
//! pass over two time-sorted sequences. A match is accepted only when
//! `|obs_time - valid_time| <= tolerance`. When the observation just before
//! and the one just after are equally far away, the earlier one wins.
//!
//! This is the training-label policy. Verification joins on exact time
//! equality instead (see `stratus-verify`); the two are kept separate on
//! purpose.

use chrono::{DateTime, Duration, Utc};

fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a >= b { a - b } else { b - a }
}

/// Nearest-in-time values for sorted `keys` from sorted `observations`.
///
/// Both slices must be sorted ascending by time; the output is aligned with
/// `keys`.
pub fn nearest_within(
    keys: &[DateTime<Utc>],
    observations: &[(DateTime<Utc>, f64)],
    tolerance: Duration,
) -> Vec<Option<f64>> {
    let mut labels = Vec::with_capacity(keys.len());
    // Index of the first observation strictly after the current key
    let mut next = 0;

    for &key in keys {
        while next < observations.len() && observations[next].0 <= key {
            next += 1;
        }

        let before = next.checked_sub(1).map(|i| observations[i]);
        let after = observations.get(next).copied();

        let nearest = match (before, after) {
            (Some(b), Some(a)) => {
                if distance(a.0, key) < distance(key, b.0) {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        };

        labels.push(
            nearest
                .filter(|(t, _)| distance(*t, key) <= tolerance)
                .map(|(_, v)| v),
        );
    }

    labels
}
