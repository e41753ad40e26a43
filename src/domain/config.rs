//! Analysis configuration.
//!
//! Every constant the analysis depends on (contrast levels, table column names,
//! parameter bounds, solver budget, subject special cases, behavioral windows)
//! lives in one [`AnalysisConfig`] value that is passed to each operation.
//!
//! Defaults reproduce the study settings. A JSON file may override any subset
//! of fields; missing fields keep their defaults.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Group, ParamBounds, STUDY_CONTRASTS, SolverOptions};
use crate::error::AppError;

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV: &str = "VSS_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub table: TableConfig,
    pub fit: FitSettings,
    pub export: ExportConfig,
    pub subjects: SubjectTable,
    pub behavior: BehaviorConfig,
    pub segmentation: SegmentationConfig,
    pub spectrum: SpectrumConfig,
    pub peak: PeakSettings,
}

/// Layout of the per-subject amplitude table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub subject_column: String,
    pub baseline_column: String,
    /// One column per contrast level, same order as `contrasts`.
    pub condition_columns: Vec<String>,
    pub contrasts: Vec<f64>,
    /// Multiplier applied to amplitudes and baseline on ingest (T -> pT).
    pub amplitude_scale: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            subject_column: "subj".to_string(),
            baseline_column: "Base".to_string(),
            condition_columns: ["C5%", "C10%", "C20%", "C40%", "C80%"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            contrasts: STUDY_CONTRASTS.to_vec(),
            amplitude_scale: 1e12,
        }
    }
}

/// Initial guess, bounds and solver budget of the contrast response fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    pub initial_semisaturation: f64,
    pub initial_saturation_exponent: f64,
    pub bounds: ParamBounds,
    pub solver: SolverOptions,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            initial_semisaturation: 0.3,
            initial_saturation_exponent: 1.0,
            bounds: ParamBounds::default(),
            solver: SolverOptions::default(),
        }
    }
}

/// Naming of outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Prefix of the results columns (`{prefix}_semi`, `{prefix}_Rmax`, ...).
    pub column_prefix: String,
    /// Label of the data source, used in figure titles and curve files.
    pub source_label: String,
    pub grid_min: f64,
    pub grid_max: f64,
    pub grid_points: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            column_prefix: "AbN1".to_string(),
            source_label: "Appelbaum_Nmax_1".to_string(),
            grid_min: 0.05,
            grid_max: 0.8,
            grid_points: 100,
        }
    }
}

/// Per-subject data-cleaning corrections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectCorrection {
    /// Clean-trial indices strictly greater than this cutoff are shifted down by one.
    pub index_shift_after: Option<usize>,
    /// Number of leading classified trials to drop from the behavior table.
    pub skip_leading_events: usize,
}

/// Subject special cases, keyed by subject id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectTable {
    pub excluded: Vec<String>,
    pub groups: BTreeMap<String, Group>,
    pub corrections: BTreeMap<String, SubjectCorrection>,
}

impl SubjectTable {
    pub fn is_excluded(&self, subject: &str) -> bool {
        self.excluded.iter().any(|s| s == subject)
    }

    pub fn group_of(&self, subject: &str) -> Option<Group> {
        self.groups.get(subject).copied()
    }

    pub fn correction(&self, subject: &str) -> SubjectCorrection {
        self.corrections.get(subject).copied().unwrap_or_default()
    }
}

/// Behavior log vocabulary and response windows (milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub response_window_ms: f64,
    pub extended_window_ms: f64,
    /// Codes that start a stimulus block.
    pub stimulus_prefix: String,
    /// Codes that terminate a stimulus block.
    pub block_end_codes: Vec<String>,
    pub disappear_code: String,
    pub response_code: String,
    pub late_code: String,
    /// File name of a subject's log; `{subject}` is substituted.
    pub log_file_pattern: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            response_window_ms: 1700.0,
            extended_window_ms: 10_000.0,
            stimulus_prefix: "gr_".to_string(),
            block_end_codes: vec!["fix".to_string(), "anim".to_string()],
            disappear_code: "disappear".to_string(),
            response_code: "16".to_string(),
            late_code: "late".to_string(),
            log_file_pattern: "{subject}-Gratings_visual_snow.log".to_string(),
        }
    }
}

impl BehaviorConfig {
    pub fn log_file_name(&self, subject: &str) -> String {
        self.log_file_pattern.replace("{subject}", subject)
    }
}

/// Trial epoch segmentation constants.
///
/// Gap, trial and epoch lengths are compared against raw sample indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub condition_codes: Vec<u32>,
    pub trigger_delay_ms: f64,
    pub trial_gap: i64,
    pub skip_initial: usize,
    pub epoch_step: usize,
    pub trial_length: i64,
    pub epoch_length: i64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            condition_codes: vec![1, 2, 3, 4, 5],
            trigger_delay_ms: 50.0,
            trial_gap: 1000,
            skip_initial: 5,
            epoch_step: 7,
            trial_length: 10_000,
            epoch_length: 2000,
        }
    }
}

/// Harmonic bins and sensor selection for the Appelbaum metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub harmonic_bins: Vec<usize>,
    /// Bin offsets (relative to each harmonic) averaged as the noise baseline.
    pub flank_offsets: Vec<isize>,
    pub n_max_sensors: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            harmonic_bins: vec![17, 37, 57, 77, 117, 157],
            flank_offsets: vec![-3, -2, 2, 3],
            n_max_sensors: 1,
        }
    }
}

/// Solver budget of the Gaussian peak fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakSettings {
    pub solver: SolverOptions,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            solver: SolverOptions {
                max_iterations: 2000,
                ..SolverOptions::default()
            },
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON configuration file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::new(2, format!("Failed to open config '{}': {e}", path.display()))
        })?;
        let config: AnalysisConfig = serde_json::from_reader(file)
            .map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))?;
        Ok(config)
    }

    /// Resolve the configuration: explicit path, then `VSS_CONFIG`, then defaults.
    ///
    /// `.env` is loaded first so `VSS_CONFIG` may live there.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let path: Option<PathBuf> = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let config = match path {
            Some(path) => {
                info!(path = %path.display(), "loading analysis config");
                Self::from_file(&path)?
            }
            None => {
                debug!("no config file given; using study defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let table = &self.table;
        if table.contrasts.is_empty() {
            return Err(AppError::new(2, "Config: no contrast levels."));
        }
        if table.contrasts.len() != table.condition_columns.len() {
            return Err(AppError::new(
                2,
                format!(
                    "Config: {} contrasts but {} condition columns.",
                    table.contrasts.len(),
                    table.condition_columns.len()
                ),
            ));
        }
        if table.contrasts.iter().any(|c| !(c.is_finite() && *c > 0.0)) {
            return Err(AppError::new(2, "Config: contrasts must be finite and > 0."));
        }
        if table.contrasts.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::new(2, "Config: contrasts must be strictly increasing."));
        }
        if !(table.amplitude_scale.is_finite() && table.amplitude_scale > 0.0) {
            return Err(AppError::new(2, "Config: amplitude_scale must be finite and > 0."));
        }

        self.fit
            .bounds
            .validate()
            .map_err(|e| AppError::new(2, format!("Config: {e}")))?;
        if self.fit.solver.max_iterations == 0 || self.peak.solver.max_iterations == 0 {
            return Err(AppError::new(2, "Config: solver max_iterations must be > 0."));
        }

        let export = &self.export;
        if !(export.grid_min > 0.0 && export.grid_max > export.grid_min) || export.grid_points < 2 {
            return Err(AppError::new(
                2,
                "Config: curve grid needs 0 < grid_min < grid_max and at least 2 points.",
            ));
        }
        if export.column_prefix.trim().is_empty() {
            return Err(AppError::new(2, "Config: column_prefix must not be empty."));
        }

        let seg = &self.segmentation;
        if seg.epoch_step == 0 {
            return Err(AppError::new(2, "Config: epoch_step must be > 0."));
        }
        if seg.trial_length <= seg.epoch_length {
            return Err(AppError::new(2, "Config: trial_length must exceed epoch_length."));
        }

        let spectrum = &self.spectrum;
        if spectrum.n_max_sensors == 0 || spectrum.harmonic_bins.is_empty() || spectrum.flank_offsets.is_empty() {
            return Err(AppError::new(
                2,
                "Config: spectrum needs harmonic bins, flank offsets and n_max_sensors > 0.",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_match_study() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.table.contrasts, STUDY_CONTRASTS.to_vec());
        assert_eq!(config.table.condition_columns[4], "C80%");
        assert_eq!(config.fit.initial_semisaturation, 0.3);
        assert_eq!(config.peak.solver.max_iterations, 2000);
        assert_eq!(config.behavior.log_file_name("S001"), "S001-Gratings_visual_snow.log");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "export": { "column_prefix": "AbN3" },
            "subjects": {
                "excluded": ["S016"],
                "groups": { "S101": "patient" },
                "corrections": { "S036": { "index_shift_after": 109 } }
            }
        }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.export.column_prefix, "AbN3");
        assert_eq!(config.export.grid_points, 100);
        assert!(config.subjects.is_excluded("S016"));
        assert!(!config.subjects.is_excluded("S017"));
        assert_eq!(config.subjects.group_of("S101"), Some(Group::Patient));
        assert_eq!(config.subjects.correction("S036").index_shift_after, Some(109));
        assert_eq!(config.subjects.correction("S999"), SubjectCorrection::default());
    }

    #[test]
    fn mismatched_columns_fail_validation() {
        let mut config = AnalysisConfig::default();
        config.table.contrasts.pop();
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unsorted_contrasts_fail_validation() {
        let mut config = AnalysisConfig::default();
        config.table.contrasts.swap(0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_flanks_fail_validation() {
        let mut config = AnalysisConfig::default();
        config.spectrum.flank_offsets.clear();
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);
    }

    #[test]
    fn resolve_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "table": { "amplitude_scale": 1.0 } }"#).unwrap();

        let config = AnalysisConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.table.amplitude_scale, 1.0);
    }
}
