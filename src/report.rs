//! CSV export of aggregated results.
//!
//! Every output file holds rows of one serializable report type. Files are registered with a
//! [`ReportWriter`] under the output directory and rows are sent to them by type.
use std::any::TypeId;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use log::info;
use serde_derive::Serialize;

use crate::age_group::{AgeBands, AgeGroup};
use crate::aggregate::AggregateResult;
use crate::analysis::{compare_confidence, confidence_series, infected_exposed_ratio};
use crate::error::ModelError;
use crate::hashing::HashMap;
use crate::numeric::ratio_or_zero;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! create_report_trait {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::csv::Error> {
                writer.serialize(self)
            }
        }
    };
}

// Checks that the path is valid. Creates the file and all parent directories if
// they do not exist.
fn generate_validate_filepath(path: &Path) -> Result<File, ModelError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(ModelError::ReportError(
            "Report output files must be CSVs at this time".to_string(),
        )),
    }
}

/// Owns one CSV writer per registered report type.
pub struct ReportWriter {
    output_dir: PathBuf,
    file_writers: HashMap<TypeId, Writer<File>>,
}

impl ReportWriter {
    #[must_use]
    pub fn new(output_dir: &Path) -> Self {
        ReportWriter {
            output_dir: output_dir.to_path_buf(),
            file_writers: HashMap::default(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates `file_name` under the output directory and directs rows of type `T` to it.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ReportError` if the file is not a CSV and `ModelError::IoError`
    /// if it cannot be created.
    pub fn add_report<T: Report>(&mut self, file_name: &str) -> Result<(), ModelError> {
        let file = generate_validate_filepath(&self.output_dir.join(file_name))?;
        self.file_writers
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    /// Writes a row to the file registered for the report's type.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ReportError` if no file was registered for the type and
    /// `ModelError::CSVError` if the row cannot be written.
    pub fn send_report<T: Report>(&mut self, report: T) -> Result<(), ModelError> {
        let writer = self
            .file_writers
            .get_mut(&report.type_id())
            .ok_or_else(|| {
                ModelError::ReportError("No writer found for the report type".to_string())
            })?;
        report.serialize(writer)?;
        Ok(())
    }

    /// Flushes every open file.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::IoError` if a file cannot be flushed.
    pub fn flush(&mut self) -> Result<(), ModelError> {
        for writer in self.file_writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Label used for rows covering the whole population rather than one age band.
pub const ALL_AGES: &str = "all";

/// The oldest band's confidence-interval width is compared against the band holding this age.
pub const CONFIDENCE_REFERENCE_AGE: u32 = 15;

#[derive(Serialize)]
struct CompartmentReport {
    time: usize,
    susceptible: f64,
    exposed: f64,
    infectious: f64,
    recovered: f64,
    dead: f64,
    infected_exposed_ratio: f64,
}
create_report_trait!(CompartmentReport);

#[derive(Serialize)]
struct AgeCompartmentReport {
    time: usize,
    age_band: String,
    susceptible: f64,
    exposed: f64,
    infectious: f64,
    recovered: f64,
    dead: f64,
}
create_report_trait!(AgeCompartmentReport);

#[derive(Serialize)]
struct ViralLoadReport {
    time: usize,
    age_band: String,
    mean_viral_load: f64,
}
create_report_trait!(ViralLoadReport);

#[derive(Serialize)]
struct ReplicateViralLoadReport {
    replicate: usize,
    time: usize,
    age_band: String,
    mean_viral_load: f64,
}
create_report_trait!(ReplicateViralLoadReport);

#[derive(Serialize)]
struct ProfileReport {
    age_band: String,
    position: usize,
    viral_load: f64,
}
create_report_trait!(ProfileReport);

#[derive(Serialize)]
struct AgeSummaryReport {
    age_band: String,
    people: usize,
    deaths: usize,
    mortality: f64,
    max_viral_load: f64,
    area_under_curve: f64,
}
create_report_trait!(AgeSummaryReport);

#[derive(Serialize)]
struct ConfidenceReport {
    time: usize,
    age_band: String,
    mean: f64,
    variance: f64,
    std_dev: f64,
    ci_half_width: f64,
}
create_report_trait!(ConfidenceReport);

#[derive(Serialize)]
struct ConfidenceRatioReport {
    time: usize,
    age_band: String,
    reference_band: String,
    ratio: f64,
    slope: f64,
}
create_report_trait!(ConfidenceRatioReport);

#[derive(Serialize)]
struct AgentViralLoadReport {
    agent: usize,
    time: usize,
    viral_load: f64,
}
create_report_trait!(AgentViralLoadReport);

/// Writes every report for `result` into `output_dir`, creating it if needed.
///
/// Viral-load rows are timestamped from 1, the end of the first step; compartment rows
/// from 0, the initial population. `confidence_ratio.csv` holds the oldest band's 90% CI
/// half-width over that of the band containing [`CONFIDENCE_REFERENCE_AGE`], with its slope.
/// It has no rows when those are the same band.
///
/// # Errors
///
/// Returns the first I/O or CSV error, or `ModelError::InvariantViolation` if the per-replicate
/// series of a band are ragged.
#[allow(clippy::too_many_lines)]
pub fn write_reports(
    result: &AggregateResult,
    age_bands: &AgeBands,
    output_dir: &Path,
) -> Result<(), ModelError> {
    let labels = age_bands.labels();
    let mut reports = ReportWriter::new(output_dir);
    reports.add_report::<CompartmentReport>("compartments.csv")?;
    reports.add_report::<AgeCompartmentReport>("compartments_by_age.csv")?;
    reports.add_report::<ViralLoadReport>("viral_load_by_age.csv")?;
    reports.add_report::<ReplicateViralLoadReport>("replicate_viral_load_by_age.csv")?;
    reports.add_report::<ProfileReport>("viral_load_profiles.csv")?;
    reports.add_report::<AgeSummaryReport>("age_summary.csv")?;
    reports.add_report::<ConfidenceReport>("confidence_by_age.csv")?;
    reports.add_report::<ConfidenceRatioReport>("confidence_ratio.csv")?;
    reports.add_report::<AgentViralLoadReport>("agent_viral_loads.csv")?;

    let ratios = infected_exposed_ratio(&result.compartment_counts);
    for (time, (counts, ratio)) in result.compartment_counts.iter().zip(ratios).enumerate() {
        let [susceptible, exposed, infectious, recovered, dead] = *counts;
        reports.send_report(CompartmentReport {
            time,
            susceptible,
            exposed,
            infectious,
            recovered,
            dead,
            infected_exposed_ratio: ratio,
        })?;
    }

    for (label, series) in labels.iter().zip(&result.compartment_counts_by_age) {
        for (time, counts) in series.iter().enumerate() {
            let [susceptible, exposed, infectious, recovered, dead] = *counts;
            reports.send_report(AgeCompartmentReport {
                time,
                age_band: label.clone(),
                susceptible,
                exposed,
                infectious,
                recovered,
                dead,
            })?;
        }
    }

    for (time, mean_viral_load) in result.mean_viral_load.iter().enumerate() {
        reports.send_report(ViralLoadReport {
            time: time + 1,
            age_band: ALL_AGES.to_string(),
            mean_viral_load: *mean_viral_load,
        })?;
    }
    for (label, curve) in labels.iter().zip(&result.mean_viral_load_by_age) {
        for (time, mean_viral_load) in curve.iter().enumerate() {
            reports.send_report(ViralLoadReport {
                time: time + 1,
                age_band: label.clone(),
                mean_viral_load: *mean_viral_load,
            })?;
        }
    }

    let mut confidence_by_age = Vec::with_capacity(labels.len());
    for (label, curves) in labels.iter().zip(&result.replicate_viral_load_by_age) {
        for (replicate, curve) in curves.iter().enumerate() {
            for (time, mean_viral_load) in curve.iter().enumerate() {
                reports.send_report(ReplicateViralLoadReport {
                    replicate,
                    time: time + 1,
                    age_band: label.clone(),
                    mean_viral_load: *mean_viral_load,
                })?;
            }
        }

        let confidence = confidence_series(curves)?;
        for time in 0..confidence.len() {
            reports.send_report(ConfidenceReport {
                time: time + 1,
                age_band: label.clone(),
                mean: confidence.mean[time],
                variance: confidence.variance[time],
                std_dev: confidence.std_dev[time],
                ci_half_width: confidence.ci_half_width[time],
            })?;
        }
        confidence_by_age.push(confidence);
    }

    let oldest = labels.len().saturating_sub(1);
    if let Ok(AgeGroup(reference)) = age_bands.classify(CONFIDENCE_REFERENCE_AGE) {
        if reference != oldest {
            let comparison =
                compare_confidence(&confidence_by_age[oldest], &confidence_by_age[reference]);
            let rows = comparison.ratio.iter().zip(&comparison.slope);
            for (time, (ratio, slope)) in rows.enumerate() {
                reports.send_report(ConfidenceRatioReport {
                    time: time + 1,
                    age_band: labels[oldest].clone(),
                    reference_band: labels[reference].clone(),
                    ratio: *ratio,
                    slope: *slope,
                })?;
            }
        }
    }

    for (label, profile) in labels.iter().zip(&result.viral_load_profiles) {
        for (position, viral_load) in profile.iter().enumerate() {
            reports.send_report(ProfileReport {
                age_band: label.clone(),
                position,
                viral_load: *viral_load,
            })?;
        }
    }

    for (band, label) in labels.iter().enumerate() {
        let people = result.people_by_age[band];
        let deaths = result.deaths_by_age[band];
        #[allow(clippy::cast_precision_loss)]
        let mortality = ratio_or_zero(deaths as f64, people as f64);
        reports.send_report(AgeSummaryReport {
            age_band: label.clone(),
            people,
            deaths,
            mortality,
            max_viral_load: result.max_viral_load_by_age[band],
            area_under_curve: result.area_under_curve_by_age[band],
        })?;
    }

    for (agent, loads) in result.agent_viral_loads.iter().enumerate() {
        for (time, viral_load) in loads.iter().enumerate() {
            reports.send_report(AgentViralLoadReport {
                agent,
                time: time + 1,
                viral_load: *viral_load,
            })?;
        }
    }

    reports.flush()?;
    info!("wrote reports to {}", output_dir.display());
    Ok(())
}
