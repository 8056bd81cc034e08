use std::path::{Path, PathBuf};

use ndarray::{aview1, Array1};

use crate::classify::MeasurementType;
use crate::config::Config;
use crate::response::{analyse_response, ResponseCharacterisation};
use crate::run::{Channel, Run};
use crate::summary::{append_to_file, SummaryRow, SummaryStore};
use crate::uncertainty::{repeatability, UncertaintyEstimate};
use crate::Result;

/// Everything derived from a single run
///
/// The time and gas series are kept so that a plotting front-end can draw the run next to
/// the derived scalars.
#[derive(Debug)]
pub struct RunReport {
    pub identifier: String,
    pub measurement_type: MeasurementType,
    pub time_s: Array1<f64>,
    pub gas_kohm: Array1<f64>,
    pub summary: SummaryRow,
    /// Transient characterisation, only attempted for baseline runs
    pub response: Option<Result<ResponseCharacterisation>>,
    /// Tail repeatability, only attempted for repeatability runs
    pub repeatability: Option<Result<UncertaintyEstimate>>,
}

/// Reduce one run
///
/// A failure of the type-specific reductions is recorded in the report rather than failing
/// the run, so the summary row is still produced.
///
/// # Errors
/// Returns an error if the tail statistics of any channel cannot be computed.
pub fn analyse_run(identifier: &str, run: &Run, config: &Config) -> Result<RunReport> {
    let summary = SummaryRow::from_run(identifier, run, config.tail_window)?;
    let measurement_type = summary.measurement_type;
    log::info!("{identifier}: measurement type {measurement_type}");
    log::info!(
        "{identifier}: using last {} samples for stats (tail)",
        summary.gas_kohm.count
    );

    let time_s = run.time_s();
    let gas_kohm = run.channel(Channel::GasResistance);

    let response = (measurement_type == MeasurementType::Baseline).then(|| {
        let (time, values): (Vec<f64>, Vec<f64>) = time_s
            .iter()
            .zip(&gas_kohm)
            .filter(|(time, value)| time.is_finite() && value.is_finite())
            .map(|(&time, &value)| (time, value))
            .unzip();
        let response = analyse_response(aview1(&time), aview1(&values), config);
        match &response {
            Ok(response) => log::info!(
                "{identifier}: tau {:.1} s, {:.1} % of span at {:.1} s",
                response.tau_s,
                response.checkpoint.percent_of_span,
                response.checkpoint.time_s
            ),
            Err(e) => log::warn!("{identifier}: no time constant, {e}"),
        }
        response
    });

    let repeatability = (measurement_type == MeasurementType::Repeatability)
        .then(|| repeatability(run, config));

    Ok(RunReport {
        identifier: identifier.to_owned(),
        measurement_type,
        time_s,
        gas_kohm,
        summary,
        response,
        repeatability,
    })
}

/// The result of processing one log in a batch
#[derive(Debug)]
pub struct RunOutcome {
    pub path: PathBuf,
    pub result: Result<RunReport>,
}

/// Process logs one after another, appending a summary row for each successful run
///
/// Each log is read, reduced, persisted to `summary_path` (when given) and only then
/// appended to `store`. A failing log is reported in its outcome and leaves both the store
/// and the summary file untouched, so the remaining logs are still processed.
pub fn analyse_files<P: AsRef<Path>>(
    paths: &[P],
    store: &mut SummaryStore,
    summary_path: Option<&Path>,
    config: &Config,
) -> Vec<RunOutcome> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            log::info!("processing {}", path.display());
            let result = analyse_path(path, summary_path, config);
            match &result {
                Ok(report) => store.append(report.summary.clone()),
                Err(e) => log::warn!("skipping {}: {e}", path.display()),
            }
            RunOutcome {
                path: path.to_owned(),
                result,
            }
        })
        .collect()
}

fn analyse_path(path: &Path, summary_path: Option<&Path>, config: &Config) -> Result<RunReport> {
    let identifier = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
        .into_owned();
    let run = Run::from_path(path)?;
    let report = analyse_run(&identifier, &run, config)?;
    if let Some(summary_path) = summary_path {
        append_to_file(summary_path, &report.summary, config.display_precision)?;
    }
    Ok(report)
}
