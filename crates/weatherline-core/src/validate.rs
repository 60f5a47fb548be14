//! Plausibility checks applied to every observation before it is stored.

use crate::{Error, Result, config::ValidationConfig, observation::NewObservation};

/// Rejects physically implausible observations.
#[derive(Debug, Clone)]
pub struct Validator {
  min_temp_c: f64,
  max_temp_c: f64,
}

impl Validator {
  pub fn new(config: &ValidationConfig) -> Self {
    Self { min_temp_c: config.min_temp_c, max_temp_c: config.max_temp_c }
  }

  /// A missing temperature is not a reason to drop the reading.
  pub fn validate(&self, observation: &NewObservation) -> Result<()> {
    if let Some(t) = observation.temperature_c
      && !(self.min_temp_c..=self.max_temp_c).contains(&t)
    {
      return Err(Error::ValidationFailed(format!(
        "temperature {t:.2}°C for {} is outside [{}, {}]",
        observation.location, self.min_temp_c, self.max_temp_c
      )));
    }
    Ok(())
  }
}

impl Default for Validator {
  fn default() -> Self { Self::new(&ValidationConfig::default()) }
}
