use std::collections::BTreeMap;

use chrono::TimeDelta;
use serde_json::Value;
use tracing::debug;

use crate::frame::{FORECAST_COLUMN, Frame, format_duration, nan_mean};
use crate::protocol::{AdapterError, AuthorInfo, ForecastRequest, Forecaster, ForecasterType, ModelInfo};

/// Repeats the last observed season over the horizon.
///
/// Interior gaps in the history are interpolated first; gaps at either end
/// are replaced by the history mean.
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    season: TimeDelta,
    authors: Vec<AuthorInfo>,
}

impl SeasonalNaive {
    pub fn new(season: TimeDelta) -> Self {
        Self {
            season,
            authors: Vec::new(),
        }
    }

    pub fn with_author(mut self, author: AuthorInfo) -> Self {
        self.authors.push(author);
        self
    }
}

impl Forecaster for SeasonalNaive {
    fn info(&self) -> ModelInfo {
        let season = format_duration(self.season);
        ModelInfo {
            name: format!("SeasonalNaive.{season}"),
            authors: self.authors.clone(),
            forecaster_type: ForecasterType::Point,
            params: BTreeMap::from([("season".to_string(), Value::String(season))]),
        }
    }

    fn forecast(&mut self, request: &ForecastRequest) -> Result<Frame, AdapterError> {
        let index = request.forecast_index()?;
        let mut history = request.history().clone();
        let lag = history.periods_in_duration(self.season)?.max(1);

        let mean = nan_mean(history.target()?)
            .ok_or_else(|| AdapterError::InsufficientHistory("history has no finite values".into()))?;
        history.interpolate_linear();
        let name = history.target_name()?.to_string();
        let filled = history.fill_nan(&name, mean)?;
        let target = history.target()?;
        if target.len() < lag {
            return Err(AdapterError::InsufficientHistory(format!(
                "season of {} needs {lag} observations, got {}",
                format_duration(self.season),
                target.len()
            )));
        }

        let last_season = &target[target.len() - lag..];
        let yhat: Vec<f64> = last_season
            .iter()
            .copied()
            .cycle()
            .take(request.horizon())
            .collect();
        debug!(lag, filled, horizon = request.horizon(), "seasonal naive forecast");
        Ok(Frame::new(index)?.with_column(FORECAST_COLUMN, yhat)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn hourly(values: Vec<f64>) -> Frame {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        let index = (0..values.len())
            .map(|h| start + TimeDelta::hours(h as i64))
            .collect();
        Frame::new(index)
            .and_then(|f| f.with_column("y", values))
            .expect("valid frame")
    }

    #[test]
    fn repeats_last_day() {
        let values: Vec<f64> = (0..48).map(f64::from).collect();
        let request = ForecastRequest::new(30, hourly(values)).expect("valid request");
        let mut model = SeasonalNaive::new(TimeDelta::days(1));
        let forecast = model.forecast(&request).expect("forecasts");
        let yhat = forecast.column(FORECAST_COLUMN).expect("yhat");
        assert_eq!(yhat.len(), 30);
        assert_eq!(yhat[0], 24.0);
        assert_eq!(yhat[23], 47.0);
        assert_eq!(yhat[24], 24.0);
        assert_eq!(forecast.index(), request.forecast_index().expect("index").as_slice());
    }

    #[test]
    fn fills_missing_values_with_mean() {
        let request =
            ForecastRequest::new(2, hourly(vec![1.0, 3.0, f64::NAN])).expect("valid request");
        let mut model = SeasonalNaive::new(TimeDelta::hours(2));
        let forecast = model.forecast(&request).expect("forecasts");
        assert_eq!(forecast.column(FORECAST_COLUMN), Some(&[3.0, 2.0][..]));
    }

    #[test]
    fn interpolates_interior_gaps() {
        let request = ForecastRequest::new(4, hourly(vec![1.0, f64::NAN, 3.0, 4.0]))
            .expect("valid request");
        let mut model = SeasonalNaive::new(TimeDelta::hours(4));
        let forecast = model.forecast(&request).expect("forecasts");
        assert_eq!(forecast.column(FORECAST_COLUMN), Some(&[1.0, 2.0, 3.0, 4.0][..]));
    }

    #[test]
    fn short_history_is_rejected() {
        let request = ForecastRequest::new(2, hourly(vec![1.0; 5])).expect("valid request");
        let mut model = SeasonalNaive::new(TimeDelta::days(1));
        assert!(matches!(
            model.forecast(&request),
            Err(AdapterError::InsufficientHistory(_))
        ));
    }

    #[test]
    fn info_describes_season() {
        let info = SeasonalNaive::new(TimeDelta::days(7)).info();
        assert_eq!(info.name, "SeasonalNaive.7D");
        assert_eq!(info.params["season"], "7D");
    }
}
