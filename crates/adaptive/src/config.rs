//! Filter configuration snapshot.
//!
//! A [`FilterConfig`] is replaced wholesale between frames, never edited
//! field by field while a frame is in flight.

use std::fs;
use std::path::Path;

use downsampler_filters::{MAX_MEASUREMENT_RANGE, MIN_CELL_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{DownsamplerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Radius around the sensor beyond which points are discarded.
    /// `200.0` disables the range filter.
    pub measurement_range: f64,

    /// Search for a cell size that lands the output in
    /// `[min_points, max_points]` instead of using `cell_size` directly.
    pub dynamic_mode: bool,

    /// Cell edge used in static mode, and the seed for dynamic search.
    pub cell_size: f64,

    /// Increment applied per search iteration in dynamic mode.
    pub cell_size_step: f64,

    pub min_cell_size: f64,
    pub max_cell_size: f64,

    pub min_points: usize,
    pub max_points: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            measurement_range: MAX_MEASUREMENT_RANGE,
            dynamic_mode: false,
            cell_size: 2.0,
            cell_size_step: 0.2,
            min_cell_size: 0.2,
            max_cell_size: 3.0,
            min_points: 1500,
            max_points: 2500,
        }
    }
}

impl FilterConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Cell size for a single static-mode reduction.
    pub fn static_cell_size(&self) -> f64 {
        self.cell_size.max(MIN_CELL_SIZE)
    }

    /// Lower and upper search bounds, each clamped to the reducer's
    /// resolution floor independently.
    ///
    /// A lower bound above the upper bound is left as is; the controller
    /// resolves it by letting the upper bound win.
    pub fn cell_size_bounds(&self) -> (f64, f64) {
        (
            self.min_cell_size.max(MIN_CELL_SIZE),
            self.max_cell_size.max(MIN_CELL_SIZE),
        )
    }

    /// Lists every invariant this snapshot violates.
    ///
    /// Violations never block processing: the controller clamps instead.
    /// The list exists so hosts can log what was clamped.
    pub fn validate(&self) -> Vec<DownsamplerError> {
        let mut problems = Vec::new();
        let mut complain = |msg: String| problems.push(DownsamplerError::Config(msg));

        if !(self.measurement_range >= 0.0) {
            complain(format!(
                "measurement_range {} must be non-negative",
                self.measurement_range
            ));
        }
        for (name, value) in [
            ("cell_size", self.cell_size),
            ("min_cell_size", self.min_cell_size),
            ("max_cell_size", self.max_cell_size),
        ] {
            if !(value >= MIN_CELL_SIZE) {
                complain(format!("{name} {value} is below {MIN_CELL_SIZE}"));
            }
        }
        if self.min_cell_size > self.max_cell_size {
            complain(format!(
                "min_cell_size {} exceeds max_cell_size {}",
                self.min_cell_size, self.max_cell_size
            ));
        }
        if self.dynamic_mode && !(self.cell_size_step > 0.0 && self.cell_size_step.is_finite()) {
            complain(format!(
                "cell_size_step {} must be positive for dynamic mode",
                self.cell_size_step
            ));
        }
        if self.min_points > self.max_points {
            complain(format!(
                "min_points {} exceeds max_points {}",
                self.min_points, self.max_points
            ));
        }

        problems
    }
}
