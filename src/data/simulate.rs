//! Synthetic amplitude tables.
//!
//! Each subject gets Naka-Rushton parameters drawn uniformly from study-like
//! ranges, and its responses are the model at the configured contrasts plus
//! Gaussian noise proportional to the subject's maximum amplitude. The RNG is
//! seeded, so a given seed always yields the same table.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ModelParameters, SubjectRecord};
use crate::error::AppError;
use crate::fit::evaluate_curve;

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub subjects: usize,
    pub seed: u64,
    /// Noise standard deviation as a fraction of `max_amplitude`.
    pub noise: f64,
    /// Subject ids are `{prefix}{index:03}`.
    pub id_prefix: String,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            subjects: 10,
            seed: 42,
            noise: 0.05,
            id_prefix: "S".to_string(),
        }
    }
}

/// A generated subject: the record (fitting units) and the parameters behind it.
#[derive(Debug, Clone)]
pub struct SimulatedSubject {
    pub record: SubjectRecord,
    pub truth: ModelParameters,
}

pub fn simulate_subjects(opts: &SimulationOptions, contrasts: &[f64]) -> Result<Vec<SimulatedSubject>, AppError> {
    if !(opts.noise.is_finite() && opts.noise >= 0.0) {
        return Err(AppError::new(2, "Noise level must be finite and >= 0."));
    }
    if contrasts.is_empty() {
        return Err(AppError::new(2, "No contrast levels to simulate."));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut out = Vec::with_capacity(opts.subjects);
    for i in 0..opts.subjects {
        let truth = ModelParameters {
            semisaturation: rng.gen_range(0.08..=0.4),
            max_amplitude: rng.gen_range(2.0..=10.0),
            saturation_exponent: rng.gen_range(0.6..=1.0),
            baseline: rng.gen_range(0.3..=1.5),
        };
        let sd = opts.noise * truth.max_amplitude;
        let responses = evaluate_curve(&truth, contrasts)
            .into_iter()
            .map(|r| r + sd * normal.sample(&mut rng))
            .collect();

        out.push(SimulatedSubject {
            record: SubjectRecord {
                subject: format!("{}{:03}", opts.id_prefix, i + 1),
                baseline: truth.baseline,
                responses,
            },
            truth,
        });
    }
    Ok(out)
}

/// Divide a record by the ingest scale so it can be written as a raw table.
pub fn to_table_units(record: &SubjectRecord, amplitude_scale: f64) -> SubjectRecord {
    SubjectRecord {
        subject: record.subject.clone(),
        baseline: record.baseline / amplitude_scale,
        responses: record.responses.iter().map(|r| r / amplitude_scale).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::STUDY_CONTRASTS;

    #[test]
    fn same_seed_same_table() {
        let opts = SimulationOptions::default();
        let a = simulate_subjects(&opts, &STUDY_CONTRASTS).unwrap();
        let b = simulate_subjects(&opts, &STUDY_CONTRASTS).unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(a[0].record, b[0].record);
        assert_eq!(a[9].record.subject, "S010");
    }

    #[test]
    fn zero_noise_is_the_model() {
        let opts = SimulationOptions {
            noise: 0.0,
            subjects: 3,
            ..SimulationOptions::default()
        };
        for s in simulate_subjects(&opts, &STUDY_CONTRASTS).unwrap() {
            assert_eq!(s.record.responses, evaluate_curve(&s.truth, &STUDY_CONTRASTS));
        }
    }

    #[test]
    fn table_units_undo_scale() {
        let r = SubjectRecord {
            subject: "S001".to_string(),
            baseline: 2.0,
            responses: vec![4.0],
        };
        let t = to_table_units(&r, 1e12);
        assert!((t.baseline - 2e-12).abs() < 1e-24);
    }
}
