//! Reference forecasters served by the `serve` command.
//!
//! These are baselines that make the server runnable out of the box and
//! exercise the adapter contract, including stateful recalibration.

mod recalibrating;
mod seasonal_naive;
mod weekly_profile;

pub use recalibrating::{Calibrate, Recalibrating};
pub use seasonal_naive::SeasonalNaive;
pub use weekly_profile::{FittedProfile, WeeklyProfile};

use crate::config::{ConfigError, ModelConfig};
use crate::protocol::{AuthorInfo, Forecaster};

/// Builds the model described by `config`.
///
/// # Errors
///
/// Returns a `ConfigError` for an unknown kind or a malformed duration.
pub fn from_config(config: &ModelConfig) -> Result<Box<dyn Forecaster>, ConfigError> {
    let author = AuthorInfo {
        name: config.author_name.clone(),
        email: config.author_email.clone(),
    };
    match config.kind.as_str() {
        "seasonal_naive" => Ok(Box::new(
            SeasonalNaive::new(config.season()?).with_author(author),
        )),
        "weekly_profile" => Ok(Box::new(
            Recalibrating::new(
                WeeklyProfile::new(config.calibration_window()?),
                config.recalibration_period()?,
            )
            .with_author(author),
        )),
        other => Err(ConfigError {
            field: "model.kind".into(),
            message: format!(
                "must be one of {}, got \"{other}\"",
                ModelConfig::KINDS.join(", ")
            ),
        }),
    }
}
