//! Read access to stored forecast and observation records.

use crate::error::Result;
use crate::records::{ForecastRecord, ObservationRecord};
use crate::variable::Variable;

/// Read seam over the forecast and observation tables.
pub trait RecordSource {
    /// All forecast records for a variable.
    fn forecasts(&self, variable: Variable) -> Result<Vec<ForecastRecord>>;

    /// All observation records for a variable.
    fn observations(&self, variable: Variable) -> Result<Vec<ObservationRecord>>;
}

/// In-memory record set.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    forecasts: Vec<ForecastRecord>,
    observations: Vec<ObservationRecord>,
}

impl RecordSet {
    /// Create an empty record set.
    pub const fn new() -> Self {
        Self {
            forecasts: Vec::new(),
            observations: Vec::new(),
        }
    }

    /// Add a forecast record.
    pub fn push_forecast(&mut self, record: ForecastRecord) {
        self.forecasts.push(record);
    }

    /// Add an observation record.
    pub fn push_observation(&mut self, record: ObservationRecord) {
        self.observations.push(record);
    }

    /// Add many forecast records.
    pub fn extend_forecasts(&mut self, records: impl IntoIterator<Item = ForecastRecord>) {
        self.forecasts.extend(records);
    }

    /// Add many observation records.
    pub fn extend_observations(&mut self, records: impl IntoIterator<Item = ObservationRecord>) {
        self.observations.extend(records);
    }
}

impl RecordSource for RecordSet {
    fn forecasts(&self, variable: Variable) -> Result<Vec<ForecastRecord>> {
        Ok(self
            .forecasts
            .iter()
            .filter(|f| f.variable() == variable)
            .cloned()
            .collect())
    }

    fn observations(&self, variable: Variable) -> Result<Vec<ObservationRecord>> {
        Ok(self
            .observations
            .iter()
            .filter(|o| o.variable == variable)
            .cloned()
            .collect())
    }
}
