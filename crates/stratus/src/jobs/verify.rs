//! Verification job.

use crate::error::Result;
use stratus_data::SqliteStore;
use stratus_verify::{VerificationSummary, verify_store};

/// Score every forecast source against observations and persist the errors.
///
/// Only new or changed groups are written, so an up-to-date store yields an
/// empty summary rather than a failure.
pub fn run_verification(store: &SqliteStore) -> Result<VerificationSummary> {
    Ok(verify_store(store)?)
}
