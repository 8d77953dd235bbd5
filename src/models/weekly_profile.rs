use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use serde_json::Value;

use super::recalibrating::Calibrate;
use crate::frame::{Frame, format_duration};
use crate::protocol::AdapterError;

/// Slot of the week: (days from Monday, seconds from midnight).
type Slot = (u32, u32);

fn slot(ts: &NaiveDateTime) -> Slot {
    (ts.weekday().num_days_from_monday(), ts.num_seconds_from_midnight())
}

/// Mean target value per weekday and time of day over a trailing window.
#[derive(Debug, Clone)]
pub struct WeeklyProfile {
    calibration_window: TimeDelta,
}

impl WeeklyProfile {
    pub fn new(calibration_window: TimeDelta) -> Self {
        Self { calibration_window }
    }
}

/// Per-slot means plus the window mean for slots never observed.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedProfile {
    slots: HashMap<Slot, f64>,
    fallback: f64,
    observations: usize,
}

impl FittedProfile {
    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn value_at(&self, ts: &NaiveDateTime) -> f64 {
        self.slots.get(&slot(ts)).copied().unwrap_or(self.fallback)
    }
}

impl Calibrate for WeeklyProfile {
    type Fitted = FittedProfile;

    fn name(&self) -> String {
        format!("WeeklyProfile.{}", format_duration(self.calibration_window))
    }

    fn params(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([(
            "calibration_window".to_string(),
            Value::String(format_duration(self.calibration_window)),
        )])
    }

    fn fit(&self, history: &Frame, _past_covariates: Option<&Frame>) -> Result<FittedProfile, AdapterError> {
        let end = history
            .last_timestamp()
            .ok_or_else(|| AdapterError::InsufficientHistory("history is empty".into()))?;
        let mut window = history.after(end - self.calibration_window);
        window.interpolate_linear();
        let target = window.target()?;

        let mut sums: HashMap<Slot, (f64, usize)> = HashMap::new();
        let (mut total, mut observations) = (0.0, 0usize);
        for (ts, value) in window.index().iter().zip(target) {
            if !value.is_finite() {
                continue;
            }
            let entry = sums.entry(slot(ts)).or_default();
            entry.0 += value;
            entry.1 += 1;
            total += value;
            observations += 1;
        }
        if observations == 0 {
            return Err(AdapterError::InsufficientHistory(format!(
                "no finite values in the last {}",
                format_duration(self.calibration_window)
            )));
        }

        Ok(FittedProfile {
            slots: sums
                .into_iter()
                .map(|(key, (sum, count))| (key, sum / count as f64))
                .collect(),
            fallback: total / observations as f64,
            observations,
        })
    }

    fn predict(
        &self,
        fitted: &FittedProfile,
        _history: &Frame,
        index: &[NaiveDateTime],
        _future_covariates: Option<&Frame>,
    ) -> Result<Vec<f64>, AdapterError> {
        Ok(index.iter().map(|ts| fitted.value_at(ts)).collect())
    }
}
