use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use ndarray::Array1;

use crate::{Error, Result};

/// Column names of a sensor log, in the order used when the log has no header row
pub const COLUMNS: [&str; 5] = [
    "timestamp_ms",
    "temperature_C",
    "humidity_pct",
    "pressure_hPa",
    "gas_ohm",
];

/// A single reading from the sensor
///
/// Fields which could not be parsed hold `f64::NAN`, the missing marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Milliseconds since the start of the run
    pub timestamp_ms: f64,
    pub temperature_c: f64,
    /// Relative humidity in percent
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    /// Gas resistance in Ohm
    pub gas_ohm: f64,
}

/// The measured quantities of a [`Sample`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Humidity,
    Pressure,
    /// Gas resistance, reported in kilo-Ohm
    GasResistance,
}

impl Channel {
    pub const ALL: [Self; 4] = [
        Self::Temperature,
        Self::Humidity,
        Self::Pressure,
        Self::GasResistance,
    ];

    /// The value of this channel in `sample`, in reporting units
    pub fn value(self, sample: &Sample) -> f64 {
        match self {
            Self::Temperature => sample.temperature_c,
            Self::Humidity => sample.humidity_pct,
            Self::Pressure => sample.pressure_hpa,
            Self::GasResistance => sample.gas_ohm / 1000.0,
        }
    }
}

/// An ordered sequence of samples from one log
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Run {
    samples: Vec<Sample>,
}

impl From<Vec<Sample>> for Run {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

impl Run {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Elapsed time of each sample in seconds
    pub fn time_s(&self) -> Array1<f64> {
        self.samples
            .iter()
            .map(|sample| sample.timestamp_ms / 1000.0)
            .collect()
    }

    pub fn channel(&self, channel: Channel) -> Array1<f64> {
        self.samples
            .iter()
            .map(|sample| channel.value(sample))
            .collect()
    }

    /// Read a run from a semicolon delimited log on disk
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, or under the conditions described in
    /// [`Run::from_reader`].
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a run from a semicolon delimited log
    ///
    /// When the first record names at least one of [`COLUMNS`] it is the header, which may
    /// list the columns in any order or carry additional ones. Otherwise the log is
    /// headerless, with columns in the order of [`COLUMNS`], and the first record is data.
    ///
    /// Fields which are not valid numbers are stored as `NaN` rather than failing the run.
    ///
    /// # Errors
    /// - [`Error::MissingField`] if the header lacks one of [`COLUMNS`], or a row is too
    ///   short to hold every column
    /// - [`Error::InvalidInput`] if the log holds no data rows
    /// - [`Error::Csv`] if the underlying reader fails
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = rdr.records();
        let Some(first) = records.next().transpose()? else {
            return Err(Error::InvalidInput("log contains no samples".into()));
        };

        let is_header = first.iter().any(|field| COLUMNS.contains(&field));
        let (layout, mut samples) = if is_header {
            (Layout::from_header(&first)?, vec![])
        } else {
            let layout = Layout::positional();
            let sample = layout.sample(&first)?;
            (layout, vec![sample])
        };

        for record in records {
            samples.push(layout.sample(&record?)?);
        }

        if samples.is_empty() {
            return Err(Error::InvalidInput("log contains no samples".into()));
        }

        log::debug!("read {} samples", samples.len());
        Ok(Self { samples })
    }
}

/// Position of each column of [`COLUMNS`] within a record
struct Layout([usize; 5]);

impl Layout {
    const fn positional() -> Self {
        Self([0, 1, 2, 3, 4])
    }

    fn from_header(header: &StringRecord) -> Result<Self> {
        let mut indices = [0; 5];
        for (index, column) in indices.iter_mut().zip(COLUMNS) {
            *index = header
                .iter()
                .position(|name| name == column)
                .ok_or_else(|| Error::MissingField {
                    field: column,
                    line: header.position().map(csv::Position::line),
                })?;
        }
        Ok(Self(indices))
    }

    fn sample(&self, record: &StringRecord) -> Result<Sample> {
        let field = |ii: usize| -> Result<f64> {
            record
                .get(self.0[ii])
                .map(|raw| raw.parse().unwrap_or(f64::NAN))
                .ok_or_else(|| Error::MissingField {
                    field: COLUMNS[ii],
                    line: record.position().map(csv::Position::line),
                })
        };

        Ok(Sample {
            timestamp_ms: field(0)?,
            temperature_c: field(1)?,
            humidity_pct: field(2)?,
            pressure_hpa: field(3)?,
            gas_ohm: field(4)?,
        })
    }
}
