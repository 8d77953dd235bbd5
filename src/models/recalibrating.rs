use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};
use serde_json::Value;
use tracing::{debug, info};

use crate::frame::{FORECAST_COLUMN, Frame, format_duration};
use crate::protocol::{AdapterError, AuthorInfo, ForecastRequest, Forecaster, ForecasterType, ModelInfo};

/// A model that is fitted on history and then predicts from the fit.
pub trait Calibrate: Send {
    /// Fitted parameters.
    type Fitted: Send;

    /// Model name used in [`ModelInfo`].
    fn name(&self) -> String;

    /// Hyperparameters reported in [`ModelInfo::params`].
    fn params(&self) -> BTreeMap<String, Value>;

    /// Fits on `history`. `past_covariates` only holds columns that are also
    /// known for the forecast horizon.
    fn fit(
        &self,
        history: &Frame,
        past_covariates: Option<&Frame>,
    ) -> Result<Self::Fitted, AdapterError>;

    /// Predicts one value per timestamp of `index`.
    fn predict(
        &self,
        fitted: &Self::Fitted,
        history: &Frame,
        index: &[NaiveDateTime],
        future_covariates: Option<&Frame>,
    ) -> Result<Vec<f64>, AdapterError>;
}

struct Calibration<F> {
    at: NaiveDateTime,
    fitted: F,
}

/// Wraps a [`Calibrate`] model and refits it only when the history has
/// advanced by more than `period` since the last fit.
///
/// A failed fit leaves the previous calibration in place.
pub struct Recalibrating<C: Calibrate> {
    calibrator: C,
    period: TimeDelta,
    authors: Vec<AuthorInfo>,
    state: Option<Calibration<C::Fitted>>,
}

impl<C: Calibrate> Recalibrating<C> {
    pub fn new(calibrator: C, period: TimeDelta) -> Self {
        Self {
            calibrator,
            period,
            authors: Vec::new(),
            state: None,
        }
    }

    pub fn with_author(mut self, author: AuthorInfo) -> Self {
        self.authors.push(author);
        self
    }

    /// End of the history the current fit was made on.
    pub fn last_recalibrated(&self) -> Option<NaiveDateTime> {
        self.state.as_ref().map(|c| c.at)
    }

    pub fn fitted(&self) -> Option<&C::Fitted> {
        self.state.as_ref().map(|c| &c.fitted)
    }

    /// Whether a history ending at `history_end` triggers a refit.
    pub fn needs_recalibration(&self, history_end: NaiveDateTime) -> bool {
        match &self.state {
            None => true,
            Some(calibration) => history_end - calibration.at > self.period,
        }
    }
}

impl<C: Calibrate> Forecaster for Recalibrating<C> {
    fn info(&self) -> ModelInfo {
        let mut params = self.calibrator.params();
        params.insert(
            "recalibration_period".to_string(),
            Value::String(format_duration(self.period)),
        );
        ModelInfo {
            name: format!(
                "{}.Recalibrated{}",
                self.calibrator.name(),
                format_duration(self.period)
            ),
            authors: self.authors.clone(),
            forecaster_type: ForecasterType::Point,
            params,
        }
    }

    fn forecast(&mut self, request: &ForecastRequest) -> Result<Frame, AdapterError> {
        let history = request.history();
        let history_end = history
            .last_timestamp()
            .ok_or_else(|| AdapterError::InsufficientHistory("history is empty".into()))?;

        let shared = request.shared_covariates();
        let names: Vec<&str> = shared.iter().map(String::as_str).collect();
        let (past, future) = if names.is_empty() {
            (None, None)
        } else {
            (
                request.past_covariates().map(|f| f.select(&names)).transpose()?,
                request.future_covariates().map(|f| f.select(&names)).transpose()?,
            )
        };

        if self.needs_recalibration(history_end) {
            info!(
                model = %self.calibrator.name(),
                history_end = %history_end,
                previous = ?self.last_recalibrated(),
                "recalibrating"
            );
            let fitted = self.calibrator.fit(history, past.as_ref())?;
            self.state = Some(Calibration {
                at: history_end,
                fitted,
            });
        } else {
            debug!(history_end = %history_end, "reusing calibration");
        }

        let calibration = self
            .state
            .as_ref()
            .ok_or_else(|| AdapterError::Failed("model is not calibrated".into()))?;
        let index = request.forecast_index()?;
        let yhat = self
            .calibrator
            .predict(&calibration.fitted, history, &index, future.as_ref())?;
        Ok(Frame::new(index)?.with_column(FORECAST_COLUMN, yhat)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use super::*;

    /// Predicts the history mean; counts fits and can be told to fail.
    struct MeanModel {
        fits: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Calibrate for MeanModel {
        type Fitted = (f64, Vec<String>);

        fn name(&self) -> String {
            "Mean".into()
        }

        fn params(&self) -> BTreeMap<String, Value> {
            BTreeMap::new()
        }

        fn fit(&self, history: &Frame, past: Option<&Frame>) -> Result<Self::Fitted, AdapterError> {
            if self.fail {
                return Err(AdapterError::Failed("solver diverged".into()));
            }
            self.fits.fetch_add(1, Ordering::SeqCst);
            let mean = history.column_mean("y")?;
            let covariates = past
                .map(|f| f.column_names().map(str::to_string).collect())
                .unwrap_or_default();
            Ok((mean, covariates))
        }

        fn predict(
            &self,
            fitted: &Self::Fitted,
            _history: &Frame,
            index: &[NaiveDateTime],
            _future: Option<&Frame>,
        ) -> Result<Vec<f64>, AdapterError> {
            Ok(vec![fitted.0; index.len()])
        }
    }

    fn frame(days: i64, columns: &[&str]) -> Frame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        let n = (days * 24) as usize;
        let index = (0..n).map(|h| start + TimeDelta::hours(h as i64)).collect();
        columns
            .iter()
            .try_fold(Frame::new(index).expect("ordered"), |f, name| {
                f.with_column(*name, (0..n).map(|v| v as f64).collect())
            })
            .expect("valid frame")
    }

    fn model(fail: bool) -> (Recalibrating<MeanModel>, Arc<AtomicUsize>) {
        let fits = Arc::new(AtomicUsize::new(0));
        let model = MeanModel {
            fits: Arc::clone(&fits),
            fail,
        };
        (Recalibrating::new(model, TimeDelta::days(7)), fits)
    }

    #[test]
    fn fits_once_within_period() {
        let (mut model, fits) = model(false);
        for days in [14, 15, 21] {
            let request = ForecastRequest::new(24, frame(days, &["y"])).expect("valid");
            model.forecast(&request).expect("forecasts");
        }
        assert_eq!(fits.load(Ordering::SeqCst), 1);

        let request = ForecastRequest::new(24, frame(22, &["y"])).expect("valid");
        model.forecast(&request).expect("forecasts");
        assert_eq!(fits.load(Ordering::SeqCst), 2);
        assert_eq!(
            model.last_recalibrated(),
            frame(22, &["y"]).last_timestamp()
        );
    }

    #[test]
    fn failed_fit_keeps_state_empty() {
        let (mut model, _) = model(true);
        let request = ForecastRequest::new(24, frame(14, &["y"])).expect("valid");
        assert!(matches!(model.forecast(&request), Err(AdapterError::Failed(_))));
        assert_eq!(model.last_recalibrated(), None);
        assert!(model.fitted().is_none());
    }

    #[test]
    fn only_shared_covariates_reach_the_fit() {
        let (mut model, _) = model(false);
        let request = ForecastRequest::new(24, frame(14, &["y"]))
            .expect("valid")
            .with_past_covariates(frame(14, &["temp", "wind"]))
            .with_future_covariates(frame(15, &["wind"]));
        model.forecast(&request).expect("forecasts");
        assert_eq!(model.fitted().map(|f| f.1.clone()), Some(vec!["wind".to_string()]));
    }

    #[test]
    fn info_names_recalibration_period() {
        let (model, _) = model(false);
        let info = model.info();
        assert_eq!(info.name, "Mean.Recalibrated7D");
        assert_eq!(info.params["recalibration_period"], "7D");
    }
}
