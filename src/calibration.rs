use itertools::Itertools;
use ndarray::Array1;
use serde::Serialize;

use crate::classify::MeasurementType;
use crate::math::sample_standard_deviation;
use crate::run::Channel;
use crate::summary::{SteadyState, SummaryStore};
use crate::{Error, Result};

/// One calibration point alongside its position on the fitted line
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FitPoint {
    pub stimulus: f64,
    pub measured: f64,
    pub fitted: f64,
    /// `measured - fitted`
    pub residual: f64,
}

/// Least-squares straight line `response = slope * stimulus + intercept`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationFit {
    pub slope: f64,
    pub intercept: f64,
    /// The input points, in input order
    pub points: Vec<FitPoint>,
    /// Sample standard deviation of the residuals, the linearity figure of merit
    pub residual_standard_deviation: f64,
}

impl CalibrationFit {
    /// Magnitude of the response change per unit stimulus
    pub fn sensitivity(&self) -> f64 {
        self.slope.abs()
    }

    pub fn evaluate(&self, stimulus: f64) -> f64 {
        self.slope.mul_add(stimulus, self.intercept)
    }

    pub fn residuals(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|point| point.residual)
    }
}

/// Fit a first-degree polynomial to `(stimulus, response)` pairs
///
/// Two points give an exact fit with vanishing residuals, which is accepted.
///
/// # Errors
/// - [`Error::InsufficientData`] if fewer than two points, or fewer than two distinct
///   stimulus values, are given, or the stimulus spread vanishes in floating point
/// - [`Error::InvalidInput`] if any value, or the resulting slope, is not finite
pub fn fit_linear(points: &[(f64, f64)]) -> Result<CalibrationFit> {
    if points.len() < 2 {
        return Err(Error::insufficient(2, points.len()));
    }
    if points
        .iter()
        .any(|(stimulus, response)| !stimulus.is_finite() || !response.is_finite())
    {
        return Err(Error::InvalidInput(
            "calibration points must be finite".into(),
        ));
    }

    // Adding zero folds -0.0 into 0.0 so both signs count as one stimulus
    let distinct = points
        .iter()
        .map(|(stimulus, _)| (stimulus + 0.0).to_bits())
        .unique()
        .count();
    if distinct < 2 {
        return Err(Error::insufficient(2, distinct));
    }

    let x: Array1<f64> = points.iter().map(|(stimulus, _)| *stimulus).collect();
    let y: Array1<f64> = points.iter().map(|(_, response)| *response).collect();
    let (Some(x_mean), Some(y_mean)) = (x.mean(), y.mean()) else {
        return Err(Error::insufficient(2, 0));
    };

    // Centred sums keep the normal equations well conditioned for large offsets
    let dx = &x - x_mean;
    let dy = &y - y_mean;
    let sxx = dx.dot(&dx);
    if sxx == 0.0 {
        return Err(Error::insufficient(2, 1));
    }
    let slope = dx.dot(&dy) / sxx;
    if !slope.is_finite() {
        return Err(Error::InvalidInput(format!(
            "calibration slope is not finite ({slope})"
        )));
    }
    let intercept = slope.mul_add(-x_mean, y_mean);

    let fitted = x.mapv(|x| slope.mul_add(x, intercept));
    let residuals = &y - &fitted;
    let residual_standard_deviation = sample_standard_deviation(&residuals.to_vec())
        .ok_or_else(|| Error::insufficient(2, residuals.len()))?;

    let points = x
        .iter()
        .zip(&y)
        .zip(fitted.iter().zip(&residuals))
        .map(|((&stimulus, &measured), (&fitted, &residual))| FitPoint {
            stimulus,
            measured,
            fitted,
            residual,
        })
        .collect();

    Ok(CalibrationFit {
        slope,
        intercept,
        points,
        residual_standard_deviation,
    })
}

/// Fit steady-state gas resistance against stimulus over the sensitivity runs in `store`
///
/// `stimulus` supplies the applied stimulus for a row, usually parsed from its identifier
/// with [`concentration_from_identifier`]. Rows are used in insertion order.
///
/// # Errors
/// - [`Error::InvalidInput`] if `stimulus` has no value for one of the selected rows
/// - the errors of [`fit_linear`]
pub fn sensitivity_linearity<R, F>(store: &SummaryStore<R>, stimulus: F) -> Result<CalibrationFit>
where
    R: SteadyState,
    F: Fn(&R) -> Option<f64>,
{
    let points = store
        .of_type(MeasurementType::SensitivityLinearity)
        .map(|row| {
            stimulus(row)
                .map(|stimulus| (stimulus, row.mean(Channel::GasResistance)))
                .ok_or_else(|| {
                    Error::InvalidInput(format!("no stimulus known for {}", row.identifier()))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let fit = fit_linear(&points)?;
    log::info!(
        "sensitivity {:.2} kOhm per unit, residual std {:.3} kOhm over {} runs",
        fit.sensitivity(),
        fit.residual_standard_deviation,
        points.len()
    );
    Ok(fit)
}

/// The concentration encoded in an identifier as `<number>pct`, e.g. `repeat_1pct.csv`
///
/// # Examples
///
/// ```
/// use gas_characterisation::calibration::concentration_from_identifier;
///
/// assert_eq!(concentration_from_identifier("sens_2.5pct.csv"), Some(2.5));
/// assert_eq!(concentration_from_identifier("baseline.csv"), None);
/// ```
pub fn concentration_from_identifier(identifier: &str) -> Option<f64> {
    let identifier = identifier.to_lowercase();
    identifier.match_indices("pct").find_map(|(end, _)| {
        let head = &identifier[..end];
        let prefix = head.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
        head[prefix.len()..].parse().ok()
    })
}
