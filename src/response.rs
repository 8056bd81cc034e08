use ndarray::{s, ArrayView1};
use serde::Serialize;

use crate::config::Config;
use crate::math::{mean, nearest_index};
use crate::{Error, Result};

/// Check of a first-order response at a multiple of its time constant
///
/// For an ideal first-order system the response has covered 95% of its span after three
/// time constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SettlingCheckpoint {
    /// `settling_multiple * tau`, in seconds
    pub target_time_s: f64,
    /// Index of the sample nearest in time to `target_time_s`
    pub index: usize,
    pub time_s: f64,
    pub value: f64,
    /// Level an ideal first-order system reaches at the checkpoint
    pub theoretical_level: f64,
    /// How far the actual response has progressed, in percent of the total span
    pub percent_of_span: f64,
}

/// Time constant and levels of a transient response
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResponseCharacterisation {
    /// Mean of the leading samples, `R0`
    pub initial_level: f64,
    /// Mean of the trailing samples, `R∞`
    pub final_level: f64,
    /// `R0 + crossing_fraction * (R∞ - R0)`
    pub target_level: f64,
    pub crossing_index: usize,
    pub crossing_time_s: f64,
    pub crossing_value: f64,
    /// `false` when the series never crossed `target_level` and the closest sample was used
    pub crossed: bool,
    /// Time constant in seconds: the elapsed log time of the crossing sample, not the time
    /// since the onset of the transient
    pub tau_s: f64,
    pub checkpoint: SettlingCheckpoint,
}

impl ResponseCharacterisation {
    /// Total change of the response, `R∞ - R0`
    pub fn span(&self) -> f64 {
        self.final_level - self.initial_level
    }

    pub fn is_rising(&self) -> bool {
        self.final_level >= self.initial_level
    }
}

/// Estimate the first-order time constant of a transient response
///
/// The initial level is the mean of the first `config.start_window` values and the final
/// level the mean of the last `config.tail_window`. The time constant is the time of the
/// first sample at or beyond `config.crossing_fraction` of the span, in the direction of the
/// change. If no sample gets there the sample closest to that level is used instead. Ties in
/// either search resolve to the earliest sample.
///
/// `time_s` must be non-decreasing. No smoothing or outlier rejection is applied.
///
/// # Errors
/// - [`Error::InvalidInput`] if the series are empty, of different lengths, or hold
///   non-finite values
/// - [`Error::DegenerateResponse`] if the initial and final levels coincide
pub fn analyse_response(
    time_s: ArrayView1<'_, f64>,
    values: ArrayView1<'_, f64>,
    config: &Config,
) -> Result<ResponseCharacterisation> {
    if values.is_empty() {
        return Err(Error::InvalidInput("response series is empty".into()));
    }
    if time_s.len() != values.len() {
        return Err(Error::InvalidInput(format!(
            "time and response series differ in length ({} and {})",
            time_s.len(),
            values.len()
        )));
    }
    if time_s.iter().chain(values.iter()).any(|x| !x.is_finite()) {
        return Err(Error::InvalidInput(
            "response series holds non-finite values".into(),
        ));
    }

    let n = values.len();
    let n_start = config.start_window.clamp(1, n);
    let n_tail = config.tail_window.clamp(1, n);

    let leading = values.slice(s![..n_start]).to_vec();
    let trailing = values.slice(s![n - n_tail..]).to_vec();
    let (Some(initial_level), Some(final_level)) = (mean(&leading), mean(&trailing)) else {
        return Err(Error::InvalidInput("response series is empty".into()));
    };

    let span = final_level - initial_level;
    if span == 0.0 {
        return Err(Error::DegenerateResponse {
            level: initial_level,
        });
    }

    let target_level = initial_level + config.crossing_fraction * span;
    let crossing = if span > 0.0 {
        values.iter().position(|&value| value >= target_level)
    } else {
        values.iter().position(|&value| value <= target_level)
    };
    let crossed = crossing.is_some();
    let crossing_index = match crossing {
        Some(index) => index,
        None => {
            log::debug!("response never crossed {target_level}, using the closest sample");
            nearest_index(values.iter().copied(), target_level)
                .ok_or_else(|| Error::InvalidInput("response series is empty".into()))?
        }
    };

    let tau_s = time_s[crossing_index];

    let target_time_s = config.settling_multiple * tau_s;
    let index = nearest_index(time_s.iter().copied(), target_time_s)
        .ok_or_else(|| Error::InvalidInput("time series is empty".into()))?;
    let value = values[index];
    let checkpoint = SettlingCheckpoint {
        target_time_s,
        index,
        time_s: time_s[index],
        value,
        theoretical_level: initial_level + config.settling_fraction * span,
        percent_of_span: (value - initial_level) / span * 100.0,
    };

    Ok(ResponseCharacterisation {
        initial_level,
        final_level,
        target_level,
        crossing_index,
        crossing_time_s: tau_s,
        crossing_value: values[crossing_index],
        crossed,
        tau_s,
        checkpoint,
    })
}

#[cfg(test)]
mod test {
    use ndarray::{arr1, Array1};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Normal;
    use ndarray_rand::RandomExt;
    use rand_isaac::Isaac64Rng;

    use super::analyse_response;
    use crate::config::Config;
    use crate::{Error, Result};

    /// `R(t) = R∞ + (R0 - R∞) exp(-t / tau)` sampled every `dt` seconds
    #[allow(clippy::cast_precision_loss)]
    fn first_order(
        initial: f64,
        plateau: f64,
        tau: f64,
        dt: f64,
        num_samples: usize,
    ) -> (Array1<f64>, Array1<f64>) {
        let time = (0..num_samples)
            .map(|k| k as f64 * dt)
            .collect::<Array1<f64>>();
        let values = time.mapv(|t| plateau + (initial - plateau) * (-t / tau).exp());
        (time, values)
    }

    #[test]
    fn time_constant_of_an_analytic_rise_is_recovered() -> Result<()> {
        let dt = 0.1;
        let (time, values) = first_order(10.0, 30.0, 20.0, dt, 4000);
        let config = Config {
            start_window: 1,
            ..Config::default()
        };

        let response = analyse_response(time.view(), values.view(), &config)?;

        assert!(response.crossed);
        assert!(response.is_rising());
        assert!((response.tau_s - 20.0).abs() <= dt);
        approx::assert_relative_eq!(response.initial_level, 10.0);
        approx::assert_relative_eq!(response.final_level, 30.0, max_relative = 1e-6);
        Ok(())
    }

    #[test]
    fn time_constant_of_an_analytic_decay_is_recovered() -> Result<()> {
        let dt = 0.05;
        let (time, values) = first_order(40.0, 15.0, 7.5, dt, 6000);
        let config = Config {
            start_window: 1,
            ..Config::default()
        };

        let response = analyse_response(time.view(), values.view(), &config)?;

        assert!(response.crossed);
        assert!(!response.is_rising());
        assert!((response.tau_s - 7.5).abs() <= dt);
        assert!(response.crossing_value <= response.target_level);
        Ok(())
    }

    #[test]
    fn default_start_window_delays_the_estimate_slightly() -> Result<()> {
        // Averaging the first ten samples of a curve which is already moving biases the
        // initial level towards the plateau
        let (time, values) = first_order(10.0, 30.0, 20.0, 0.1, 4000);
        let response = analyse_response(time.view(), values.view(), &Config::default())?;

        assert!(response.initial_level > 10.0);
        assert!(response.tau_s >= 20.0);
        assert!(response.tau_s - 20.0 < 1.0);
        Ok(())
    }

    #[test]
    fn checkpoint_reports_progress_at_three_time_constants() -> Result<()> {
        let (time, values) = first_order(10.0, 30.0, 20.0, 0.1, 4000);
        let config = Config {
            start_window: 1,
            ..Config::default()
        };

        let response = analyse_response(time.view(), values.view(), &config)?;
        let checkpoint = response.checkpoint;

        approx::assert_relative_eq!(checkpoint.target_time_s, 3.0 * response.tau_s);
        assert!((checkpoint.time_s - checkpoint.target_time_s).abs() <= 0.05 + 1e-9);
        approx::assert_relative_eq!(checkpoint.theoretical_level, 29.0, max_relative = 1e-6);
        // 1 - exp(-3) of the span has been covered
        approx::assert_relative_eq!(checkpoint.percent_of_span, 95.0, epsilon = 0.2);
        Ok(())
    }

    #[test]
    fn rising_crossing_picks_the_first_sample_at_the_target() -> Result<()> {
        let time = arr1(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let values = arr1(&[0.0, 5.0, 6.0, 6.0, 10.0, 10.0]);
        let config = Config {
            start_window: 1,
            tail_window: 3,
            ..Config::default()
        };

        // Final level 26 / 3, target 5.477; 6.0 reaches it first at index 2
        let response = analyse_response(time.view(), values.view(), &config)?;
        assert!(response.crossed);
        assert_eq!(response.crossing_index, 2);
        approx::assert_relative_eq!(response.tau_s, 2.0);
        approx::assert_relative_eq!(response.crossing_value, 6.0);
        Ok(())
    }

    #[test]
    fn falling_crossing_picks_the_first_sample_at_the_target() -> Result<()> {
        let time = arr1(&[0.0, 1.0, 2.0, 3.0]);
        let values = arr1(&[10.0, 9.0, 9.5, 9.5]);
        let config = Config {
            start_window: 1,
            tail_window: 4,
            ..Config::default()
        };

        // R0 = 10, R∞ = 9.5, target = 9.684
        let response = analyse_response(time.view(), values.view(), &config)?;
        assert!(response.crossed);
        assert!(!response.is_rising());
        assert_eq!(response.crossing_index, 1);
        approx::assert_relative_eq!(response.span(), -0.5);
        Ok(())
    }

    #[test]
    fn falls_back_to_the_closest_sample_when_the_target_is_never_reached() -> Result<()> {
        let time = arr1(&[0.0, 1.0, 2.0, 3.0]);
        let values = arr1(&[0.0, 0.5, 1.0, 0.8]);
        let config = Config {
            start_window: 1,
            tail_window: 2,
            crossing_fraction: 1.5,
            ..Config::default()
        };

        // R∞ = 0.9, target = 1.35 lies beyond every sample
        let response = analyse_response(time.view(), values.view(), &config)?;
        assert!(!response.crossed);
        assert_eq!(response.crossing_index, 2);
        approx::assert_relative_eq!(response.tau_s, 2.0);
        Ok(())
    }

    #[test]
    fn closest_sample_fallback_prefers_the_first_tie() -> Result<()> {
        let time = arr1(&[0.0, 1.0, 2.0, 3.0]);
        let values = arr1(&[0.0, 1.0, 1.0, 1.0]);
        let config = Config {
            start_window: 1,
            tail_window: 3,
            crossing_fraction: 1.5,
            ..Config::default()
        };

        let response = analyse_response(time.view(), values.view(), &config)?;
        assert!(!response.crossed);
        assert_eq!(response.crossing_index, 1);
        approx::assert_relative_eq!(response.tau_s, 1.0);
        // 3 tau = 3.0 s is sampled exactly
        assert_eq!(response.checkpoint.index, 3);
        Ok(())
    }

    #[test]
    fn flat_response_is_degenerate() {
        let time = arr1(&[0.0, 1.0, 2.0]);
        let values = arr1(&[5.0, 5.0, 5.0]);

        let result = analyse_response(time.view(), values.view(), &Config::default());
        assert!(matches!(result, Err(Error::DegenerateResponse { level }) if level == 5.0));
    }

    #[test]
    fn invalid_series_are_rejected() {
        let empty: Array1<f64> = Array1::zeros(0);
        assert!(matches!(
            analyse_response(empty.view(), empty.view(), &Config::default()),
            Err(Error::InvalidInput(_))
        ));

        let time = arr1(&[0.0, 1.0]);
        let values = arr1(&[1.0]);
        assert!(matches!(
            analyse_response(time.view(), values.view(), &Config::default()),
            Err(Error::InvalidInput(_))
        ));

        let values = arr1(&[1.0, f64::NAN]);
        assert!(matches!(
            analyse_response(time.view(), values.view(), &Config::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn single_sample_is_degenerate_not_out_of_bounds() {
        let time = arr1(&[0.0]);
        let values = arr1(&[3.0]);
        assert!(matches!(
            analyse_response(time.view(), values.view(), &Config::default()),
            Err(Error::DegenerateResponse { .. })
        ));
    }

    #[test]
    fn noisy_rise_still_lands_near_the_time_constant() -> Result<()> {
        let seed = 40;
        let mut rng = Isaac64Rng::seed_from_u64(seed);
        let (time, clean) = first_order(25.0, 60.0, 30.0, 0.5, 1200);
        let noise = Array1::random_using(clean.len(), Normal::new(0.0, 0.1).unwrap(), &mut rng);
        let values = clean + noise;

        let response = analyse_response(time.view(), values.view(), &Config::default())?;

        assert!((response.tau_s - 30.0).abs() < 5.0);
        Ok(())
    }
}
