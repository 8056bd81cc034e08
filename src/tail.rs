use ndarray::{s, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::math::{mean, round_to, sample_standard_deviation};
use crate::{Error, Result};

/// Descriptive statistics over the steady-state tail of a series
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct TailStatistics {
    /// Number of valid values in the window, missing values are not counted
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, `NaN` when `count < 2`
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl TailStatistics {
    /// Whether enough values were present for the standard deviation to be defined
    pub const fn has_dispersion(&self) -> bool {
        self.count >= 2
    }

    /// A copy with every statistic rounded to `places` decimals, for reporting
    #[must_use]
    pub fn rounded(&self, places: u32) -> Self {
        Self {
            count: self.count,
            mean: round_to(self.mean, places),
            std: round_to(self.std, places),
            min: round_to(self.min, places),
            max: round_to(self.max, places),
        }
    }
}

/// The trailing `window` elements of `series`, or all of it when shorter
pub fn tail_window(series: ArrayView1<'_, f64>, window: usize) -> ArrayView1<'_, f64> {
    let start = series.len().saturating_sub(window);
    series.slice_move(s![start..])
}

/// Compute [`TailStatistics`] over the last `window` values of `series`
///
/// Missing (`NaN`) values inside the window are skipped. The input is not modified and the
/// result depends only on the arguments.
///
/// # Errors
/// Returns [`Error::InvalidInput`] if the window holds no valid value.
pub fn tail_statistics(series: ArrayView1<'_, f64>, window: usize) -> Result<TailStatistics> {
    let values = tail_window(series, window)
        .iter()
        .copied()
        .filter(|value| !value.is_nan())
        .collect::<Vec<_>>();

    let mean = mean(&values).ok_or_else(|| {
        Error::InvalidInput(format!(
            "no valid values in a tail window of {} samples",
            window.min(series.len())
        ))
    })?;

    Ok(TailStatistics {
        count: values.len(),
        mean,
        std: sample_standard_deviation(&values).unwrap_or(f64::NAN),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}
