//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Contrast levels of the study, in presentation order (C5% .. C80%).
pub const STUDY_CONTRASTS: [f64; 5] = [0.05, 0.10, 0.20, 0.40, 0.80];

/// Number of free parameters in the Naka-Rushton model.
pub const NAKA_RUSHTON_PARAMS: usize = 4;

/// Parameters of the Naka-Rushton contrast response function.
///
/// Slice order (used by the solver) is
/// `[semisaturation, max_amplitude, saturation_exponent, baseline]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Contrast at which the response reaches half of `max_amplitude`.
    pub semisaturation: f64,
    pub max_amplitude: f64,
    /// Shape/steepness exponent `n` in `c^(2n)`.
    pub saturation_exponent: f64,
    pub baseline: f64,
}

impl ModelParameters {
    pub fn to_array(self) -> [f64; NAKA_RUSHTON_PARAMS] {
        [
            self.semisaturation,
            self.max_amplitude,
            self.saturation_exponent,
            self.baseline,
        ]
    }

    /// Build from solver order.
    ///
    /// # Panics
    /// Panics if `p` has fewer than four elements.
    pub fn from_slice(p: &[f64]) -> Self {
        Self {
            semisaturation: p[0],
            max_amplitude: p[1],
            saturation_exponent: p[2],
            baseline: p[3],
        }
    }
}

/// Closed interval for one parameter. `max = None` means unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
}

impl Bound {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max: Some(max) }
    }

    pub const fn at_least(min: f64) -> Self {
        Self { min, max: None }
    }

    pub fn upper(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }
}

/// Per-parameter bounds for the contrast response fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamBounds {
    pub semisaturation: Bound,
    pub max_amplitude: Bound,
    pub saturation_exponent: Bound,
    pub baseline: Bound,
}

impl Default for ParamBounds {
    fn default() -> Self {
        Self {
            semisaturation: Bound::new(0.0, 50.0),
            max_amplitude: Bound::at_least(0.0),
            saturation_exponent: Bound::new(0.0, 5.0),
            baseline: Bound::at_least(0.0),
        }
    }
}

impl ParamBounds {
    pub fn lower(&self) -> [f64; NAKA_RUSHTON_PARAMS] {
        [
            self.semisaturation.min,
            self.max_amplitude.min,
            self.saturation_exponent.min,
            self.baseline.min,
        ]
    }

    pub fn upper(&self) -> [f64; NAKA_RUSHTON_PARAMS] {
        [
            self.semisaturation.upper(),
            self.max_amplitude.upper(),
            self.saturation_exponent.upper(),
            self.baseline.upper(),
        ]
    }

    pub fn validate(&self) -> Result<(), FitError> {
        let names = ["semisaturation", "max_amplitude", "saturation_exponent", "baseline"];
        for ((name, lo), hi) in names.iter().zip(self.lower()).zip(self.upper()) {
            if !lo.is_finite() || hi.is_nan() || lo > hi {
                return Err(FitError::invalid(format!(
                    "bounds for {name} are invalid: [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }
}

/// Iteration budget and tolerances for the bounded Levenberg–Marquardt solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Relative reduction of the sum of squares below which we stop.
    pub ftol: f64,
    /// Relative parameter step below which we stop.
    pub xtol: f64,
    /// Cosine between the residuals and any free Jacobian column below which we stop.
    pub gtol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
        }
    }
}

/// Goodness-of-fit diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Residual sum of squares.
    pub rss: f64,
    /// Total sum of squares around the mean of the observations.
    pub tss: f64,
    /// `1 - rss / tss`. Not clamped: negative when the model is worse than the mean.
    pub r_squared: f64,
    pub n: usize,
    pub iterations: usize,
}

/// Fitted Naka-Rushton parameters and their quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: ModelParameters,
    pub quality: FitQuality,
}

/// One subject's response amplitudes, one per configured contrast.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    pub subject: String,
    /// Externally estimated baseline (used as the initial guess for `baseline`).
    pub baseline: f64,
    pub responses: Vec<f64>,
}

/// A successful per-subject fit.
#[derive(Debug, Clone)]
pub struct SubjectFit {
    pub record: SubjectRecord,
    pub result: FitResult,
}

/// A per-subject failure; the batch carries on without it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: FitError,
}

impl std::fmt::Display for SubjectFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.error)
    }
}

pub type SubjectOutcome = Result<SubjectFit, SubjectFailure>;

/// Study group of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Healthy controls.
    Control,
    /// Visual Snow Syndrome patients.
    Patient,
}

impl Group {
    /// Numeric code used in the behavioral tables (0 = control, 1 = patient).
    pub fn code(self) -> u8 {
        match self {
            Group::Control => 0,
            Group::Patient => 1,
        }
    }
}

/// Gaussian peak fitted to a power spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakFit {
    pub amplitude: f64,
    /// Peak frequency (Hz).
    pub center: f64,
    pub sigma: f64,
    pub rss: f64,
    pub iterations: usize,
}

/// A stimulus trigger: sample index and condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub sample: i64,
    pub code: u32,
}

/// Power spectral density of one condition: sensors × frequency bins.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdMatrix {
    pub sensors: Vec<String>,
    pub freqs: Vec<f64>,
    /// `power[sensor][bin]`.
    pub power: Vec<Vec<f64>>,
}

impl PsdMatrix {
    pub fn n_bins(&self) -> usize {
        self.freqs.len()
    }
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub subject: String,
    /// Label of the amplitude table the fit came from (e.g. `Appelbaum_Nmax_1`).
    pub source: String,
    pub params: ModelParameters,
    pub fit_quality: FitQuality,
    pub observed: CurveGrid,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub contrast: Vec<f64>,
    pub response: Vec<f64>,
}
