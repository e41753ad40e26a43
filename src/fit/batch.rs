//! Per-subject batch fitting.
//!
//! Subjects are independent, so they are fitted in parallel. A failing
//! subject never aborts the batch: it becomes a [`SubjectFailure`] in its
//! input position.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{AnalysisConfig, SubjectFailure, SubjectFit, SubjectOutcome, SubjectRecord};
use crate::fit::crf::{fit_with_options, initial_guess};

/// Fit every non-excluded record; output order follows input order.
pub fn fit_subjects(records: &[SubjectRecord], config: &AnalysisConfig) -> Vec<SubjectOutcome> {
    let included: Vec<&SubjectRecord> = records
        .iter()
        .filter(|r| {
            let excluded = config.subjects.is_excluded(&r.subject);
            if excluded {
                warn!(subject = %r.subject, "subject excluded by configuration");
            }
            !excluded
        })
        .collect();

    included
        .par_iter()
        .map(|record| fit_subject(record, config))
        .collect()
}

/// Fit one subject against the configured contrasts.
pub fn fit_subject(record: &SubjectRecord, config: &AnalysisConfig) -> SubjectOutcome {
    let settings = &config.fit;
    let initial = initial_guess(&record.responses, record.baseline, settings);

    match fit_with_options(
        &config.table.contrasts,
        &record.responses,
        &initial,
        &settings.bounds,
        &settings.solver,
    ) {
        Ok(result) => {
            info!(
                subject = %record.subject,
                r_squared = result.quality.r_squared,
                iterations = result.quality.iterations,
                "subject fitted"
            );
            Ok(SubjectFit {
                record: record.clone(),
                result,
            })
        }
        Err(error) => {
            warn!(subject = %record.subject, %error, "subject fit failed");
            Err(SubjectFailure {
                subject: record.subject.clone(),
                error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SimulationOptions, simulate_subjects};
    use crate::domain::{ModelParameters, STUDY_CONTRASTS};
    use crate::error::FitError;
    use crate::fit::crf::evaluate_curve;

    fn record(subject: &str, responses: Vec<f64>, baseline: f64) -> SubjectRecord {
        SubjectRecord {
            subject: subject.to_string(),
            baseline,
            responses,
        }
    }

    #[test]
    fn failures_are_isolated_and_order_is_kept() {
        let truth = ModelParameters {
            semisaturation: 0.15,
            max_amplitude: 1.2,
            saturation_exponent: 1.0,
            baseline: 0.1,
        };
        let records = vec![
            record("001", vec![0.1, 0.3, 0.6, 0.9, 1.0], 0.05),
            record("002", vec![1.0, 2.0, 3.0], 0.0),
            record("003", evaluate_curve(&truth, &STUDY_CONTRASTS), 0.1),
        ];

        let out = fit_subjects(&records, &AnalysisConfig::default());
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap().record.subject, "001");
        let failure = out[1].as_ref().unwrap_err();
        assert_eq!(failure.subject, "002");
        assert!(matches!(failure.error, FitError::InvalidInput(_)));
        assert!(out[2].as_ref().unwrap().result.quality.r_squared > 0.999_999);
    }

    #[test]
    fn excluded_subjects_are_skipped() {
        let mut config = AnalysisConfig::default();
        config.subjects.excluded.push("002".to_string());
        let records = vec![
            record("001", vec![0.1, 0.3, 0.6, 0.9, 1.0], 0.05),
            record("002", vec![0.1, 0.3, 0.6, 0.9, 1.0], 0.05),
        ];
        let out = fit_subjects(&records, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().record.subject, "001");
    }

    #[test]
    fn noisy_subjects_converge_within_default_budget() {
        let config = AnalysisConfig::default();
        for seed in 0..3 {
            let opts = SimulationOptions {
                subjects: 20,
                seed,
                noise: 0.1,
                ..SimulationOptions::default()
            };
            let records: Vec<SubjectRecord> = simulate_subjects(&opts, &config.table.contrasts)
                .unwrap()
                .into_iter()
                .map(|s| s.record)
                .collect();

            for outcome in fit_subjects(&records, &config) {
                if let Err(failure) = outcome {
                    panic!("seed {seed} {}: {}", failure.subject, failure.error);
                }
            }
        }
    }

    #[test]
    fn empty_batch_is_empty() {
        assert!(fit_subjects(&[], &AnalysisConfig::default()).is_empty());
    }
}
