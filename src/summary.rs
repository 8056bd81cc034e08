use std::fs::{self, OpenOptions};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::{classify, MeasurementType};
use crate::run::{Channel, Run};
use crate::tail::{tail_statistics, TailStatistics};
use crate::Result;

/// Steady-state view of one analysed run, as consumed by the cross-run analyses
pub trait SteadyState {
    fn identifier(&self) -> &str;
    fn measurement_type(&self) -> MeasurementType;
    /// Tail mean of `channel`, gas resistance in kilo-Ohm
    fn mean(&self, channel: Channel) -> f64;
}

/// Tail statistics of every channel of one run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryRow {
    pub identifier: String,
    pub measurement_type: MeasurementType,
    pub temperature: TailStatistics,
    pub humidity: TailStatistics,
    pub pressure: TailStatistics,
    pub gas_kohm: TailStatistics,
}

impl SummaryRow {
    /// Classify `run` by its `identifier` and reduce each channel over the last `window`
    /// samples
    ///
    /// # Errors
    /// Returns an error if the tail window of any channel holds no valid value.
    pub fn from_run(identifier: &str, run: &Run, window: usize) -> Result<Self> {
        let statistics = |channel| tail_statistics(run.channel(channel).view(), window);

        Ok(Self {
            identifier: identifier.to_owned(),
            measurement_type: classify(identifier),
            temperature: statistics(Channel::Temperature)?,
            humidity: statistics(Channel::Humidity)?,
            pressure: statistics(Channel::Pressure)?,
            gas_kohm: statistics(Channel::GasResistance)?,
        })
    }

    pub const fn statistics(&self, channel: Channel) -> &TailStatistics {
        match channel {
            Channel::Temperature => &self.temperature,
            Channel::Humidity => &self.humidity,
            Channel::Pressure => &self.pressure,
            Channel::GasResistance => &self.gas_kohm,
        }
    }

    /// The persisted form of this row, means and deviations rounded to `places` decimals
    pub fn to_record(&self, places: u32) -> SummaryRecord {
        let rounded = |channel| self.statistics(channel).rounded(places);
        let (temperature, humidity, pressure, gas_kohm) = (
            rounded(Channel::Temperature),
            rounded(Channel::Humidity),
            rounded(Channel::Pressure),
            rounded(Channel::GasResistance),
        );

        SummaryRecord {
            file: self.identifier.clone(),
            measurement_type: self.measurement_type,
            temperature_mean: temperature.mean,
            temperature_std: temperature.std,
            humidity_mean: humidity.mean,
            humidity_std: humidity.std,
            pressure_mean: pressure.mean,
            pressure_std: pressure.std,
            gas_kohm_mean: gas_kohm.mean,
            gas_kohm_std: gas_kohm.std,
        }
    }
}

impl SteadyState for SummaryRow {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn measurement_type(&self) -> MeasurementType {
        self.measurement_type
    }

    fn mean(&self, channel: Channel) -> f64 {
        self.statistics(channel).mean
    }
}

/// One line of the persisted summary file
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SummaryRecord {
    pub file: String,
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    #[serde(rename = "T_mean")]
    pub temperature_mean: f64,
    #[serde(rename = "T_std")]
    pub temperature_std: f64,
    #[serde(rename = "RH_mean")]
    pub humidity_mean: f64,
    #[serde(rename = "RH_std")]
    pub humidity_std: f64,
    #[serde(rename = "P_mean")]
    pub pressure_mean: f64,
    #[serde(rename = "P_std")]
    pub pressure_std: f64,
    #[serde(rename = "Rgas_kohm_mean")]
    pub gas_kohm_mean: f64,
    #[serde(rename = "Rgas_kohm_std")]
    pub gas_kohm_std: f64,
}

impl SteadyState for SummaryRecord {
    fn identifier(&self) -> &str {
        &self.file
    }

    fn measurement_type(&self) -> MeasurementType {
        self.measurement_type
    }

    fn mean(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature_mean,
            Channel::Humidity => self.humidity_mean,
            Channel::Pressure => self.pressure_mean,
            Channel::GasResistance => self.gas_kohm_mean,
        }
    }
}

/// Append-only collection of per-run summaries
///
/// Rows keep their insertion order and are never modified once appended. Appending the
/// same identifier twice keeps both rows.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryStore<R = SummaryRow> {
    rows: Vec<R>,
}

impl<R> Default for SummaryStore<R> {
    fn default() -> Self {
        Self { rows: vec![] }
    }
}

impl<R> SummaryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, row: R) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R: SteadyState> SummaryStore<R> {
    /// Rows of one measurement type, in insertion order
    pub fn of_type(&self, measurement_type: MeasurementType) -> impl Iterator<Item = &R> + '_ {
        self.rows
            .iter()
            .filter(move |row| row.measurement_type() == measurement_type)
    }
}

impl SummaryStore<SummaryRecord> {
    /// Read a summary file written by [`append_to_file`]
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a line does not hold a summary record.
    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .from_path(path)?;

        let rows = rdr
            .deserialize()
            .collect::<::std::result::Result<Vec<SummaryRecord>, _>>()?;
        Ok(Self { rows })
    }
}

/// Append `row` to the summary file at `path`, rounding statistics to `places` decimals
///
/// The header is only written when the file is created (or empty), so repeated calls
/// accumulate one line per analysed run.
///
/// # Errors
/// Returns an error if the file cannot be opened or written.
pub fn append_to_file(path: &Path, row: &SummaryRow, places: u32) -> Result<()> {
    let write_header = fs::metadata(path).map_or(true, |metadata| metadata.len() == 0);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(write_header)
        .from_writer(file);
    wtr.serialize(row.to_record(places))?;
    wtr.flush()?;

    log::info!("appended stats for {} to {}", row.identifier, path.display());
    Ok(())
}
