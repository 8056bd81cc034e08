use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Number of trailing samples treated as the steady-state plateau of a run.
pub const TAIL_WINDOW: usize = 200;

/// Number of leading samples averaged to estimate the initial level of a response curve.
pub const START_WINDOW: usize = 10;

/// Fraction of the total change reached after one time constant of a first-order system,
/// `1 - 1/e` to three places.
pub const CROSSING_FRACTION: f64 = 0.632;

/// Fraction of the total change a first-order system reaches at the settling checkpoint.
pub const SETTLING_FRACTION: f64 = 0.95;

/// Multiple of the time constant at which the settling checkpoint is taken.
pub const SETTLING_MULTIPLE: f64 = 3.0;

/// Coverage factor applied to the standard deviation to form the expanded uncertainty.
pub const COVERAGE_FACTOR: f64 = 2.0;

/// Decimal places kept when statistics are reported or persisted.
pub const DISPLAY_PRECISION: u32 = 2;

/// Thresholds used throughout the reduction
///
/// Every field can be omitted from the on-disk representation, in which case the
/// corresponding constant above is used.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub tail_window: usize,
    pub start_window: usize,
    pub crossing_fraction: f64,
    pub settling_fraction: f64,
    pub settling_multiple: f64,
    pub coverage_factor: f64,
    pub display_precision: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tail_window: TAIL_WINDOW,
            start_window: START_WINDOW,
            crossing_fraction: CROSSING_FRACTION,
            settling_fraction: SETTLING_FRACTION,
            settling_multiple: SETTLING_MULTIPLE,
            coverage_factor: COVERAGE_FACTOR,
            display_precision: DISPLAY_PRECISION,
        }
    }
}

impl Config {
    /// Read a configuration from a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML for this structure.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse a configuration from a TOML string
    ///
    /// # Errors
    /// Returns an error if the string is not valid TOML for this structure.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
