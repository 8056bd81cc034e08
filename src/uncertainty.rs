use serde::Serialize;

use crate::calibration::{fit_linear, CalibrationFit};
use crate::classify::MeasurementType;
use crate::config::Config;
use crate::math::{mean, sample_standard_deviation};
use crate::run::{Channel, Run};
use crate::summary::{SteadyState, SummaryStore};
use crate::tail::tail_window;
use crate::{Error, Result};

/// Mean and spread of a set of repeated measurements
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct UncertaintyEstimate {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, with divisor `n - 1`
    pub standard_deviation: f64,
    pub coverage_factor: f64,
    /// `coverage_factor * standard_deviation`
    pub expanded_uncertainty: f64,
}

/// Expanded uncertainty of `values` at `coverage_factor`
///
/// The computation does not care where the values come from: samples within one run give
/// repeatability, steady-state means of separate runs give reproducibility.
///
/// # Errors
/// - [`Error::InsufficientData`] if fewer than two values are given
/// - [`Error::InvalidInput`] if any value is not finite
pub fn expanded_uncertainty(values: &[f64], coverage_factor: f64) -> Result<UncertaintyEstimate> {
    if values.iter().any(|value| !value.is_finite()) {
        return Err(Error::InvalidInput(
            "uncertainty requires finite values".into(),
        ));
    }
    let (Some(mean), Some(standard_deviation)) = (mean(values), sample_standard_deviation(values))
    else {
        return Err(Error::insufficient(2, values.len()));
    };

    Ok(UncertaintyEstimate {
        count: values.len(),
        mean,
        standard_deviation,
        coverage_factor,
        expanded_uncertainty: coverage_factor * standard_deviation,
    })
}

/// Repeatability of the steady-state gas resistance (kilo-Ohm) within one run
///
/// Uses the valid values among the last `config.tail_window` samples.
///
/// # Errors
/// Returns [`Error::InsufficientData`] if fewer than two valid tail values exist.
pub fn repeatability(run: &Run, config: &Config) -> Result<UncertaintyEstimate> {
    let gas_kohm = run.channel(Channel::GasResistance);
    let tail = tail_window(gas_kohm.view(), config.tail_window)
        .iter()
        .copied()
        .filter(|value| !value.is_nan())
        .collect::<Vec<_>>();

    let estimate = expanded_uncertainty(&tail, config.coverage_factor)?;
    log::info!(
        "repeatability over {} tail samples: mean {:.3} kOhm, U(k={}) {:.3} kOhm",
        estimate.count,
        estimate.mean,
        estimate.coverage_factor,
        estimate.expanded_uncertainty
    );
    Ok(estimate)
}

/// Spread of steady-state gas resistance across runs at different ambient conditions
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reproducibility {
    /// Identifiers of the contributing runs, in store order
    pub runs: Vec<String>,
    /// Uncertainty of the per-run gas resistance means
    pub estimate: UncertaintyEstimate,
    /// Gas resistance mean against temperature mean, absent when the runs do not span at
    /// least two distinct temperatures
    pub temperature_fit: Option<CalibrationFit>,
}

/// Reproducibility over the reproducibility runs held in `store`
///
/// # Errors
/// Fails with [`Error::InsufficientData`] unless at least two reproducibility runs are
/// present, and with [`Error::InvalidInput`] if a gas resistance mean is not finite.
pub fn reproducibility<R: SteadyState>(
    store: &SummaryStore<R>,
    config: &Config,
) -> Result<Reproducibility> {
    let rows = store
        .of_type(MeasurementType::Reproducibility)
        .collect::<Vec<_>>();

    let gas_kohm = rows
        .iter()
        .map(|row| row.mean(Channel::GasResistance))
        .collect::<Vec<_>>();
    let estimate = expanded_uncertainty(&gas_kohm, config.coverage_factor)?;

    let points = rows
        .iter()
        .map(|row| (row.mean(Channel::Temperature), row.mean(Channel::GasResistance)))
        .collect::<Vec<_>>();
    let temperature_fit = fit_linear(&points)
        .map_err(|e| log::warn!("reproducibility: no temperature fit, {e}"))
        .ok();

    log::info!(
        "reproducibility over {} runs: U(k={}) {:.3} kOhm",
        estimate.count,
        estimate.coverage_factor,
        estimate.expanded_uncertainty
    );
    Ok(Reproducibility {
        runs: rows.iter().map(|row| row.identifier().to_owned()).collect(),
        estimate,
        temperature_fit,
    })
}
