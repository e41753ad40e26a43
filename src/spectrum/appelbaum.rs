//! Appelbaum SSVEP amplitude metric.
//!
//! From one PSD matrix per contrast condition:
//!
//! - rank sensors by their mean power over the harmonic bins, averaged over
//!   the two highest-contrast conditions
//! - signal of a condition = `sqrt(Σ_h mean_top_sensors(P[s, h]))`
//! - baseline = `sqrt(Σ_h mean_conditions(mean(P[top, h + flank])))`
//!
//! The result is one row of the amplitude table consumed by the fit.

use tracing::debug;

use crate::domain::{PsdMatrix, SpectrumConfig, SubjectRecord};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct AppelbaumMetric {
    pub baseline: f64,
    /// One value per condition, in condition order.
    pub signal: Vec<f64>,
    /// Selected sensor indices, strongest first.
    pub top_sensors: Vec<usize>,
}

impl AppelbaumMetric {
    pub fn into_record(self, subject: impl Into<String>) -> SubjectRecord {
        SubjectRecord {
            subject: subject.into(),
            baseline: self.baseline,
            responses: self.signal,
        }
    }
}

pub fn appelbaum_metric(psds: &[PsdMatrix], cfg: &SpectrumConfig) -> Result<AppelbaumMetric, AppError> {
    validate(psds, cfg)?;

    let avg = average_harmonic_power(psds, &cfg.harmonic_bins);
    let top = top_sensors(&avg, cfg.n_max_sensors);

    let signal = psds
        .iter()
        .map(|psd| {
            cfg.harmonic_bins
                .iter()
                .map(|&h| mean(top.iter().map(|&s| psd.power[s][h])))
                .sum::<f64>()
                .sqrt()
        })
        .collect();

    let baseline = cfg
        .harmonic_bins
        .iter()
        .map(|&h| {
            mean(psds.iter().map(|psd| {
                mean(top.iter().flat_map(|&s| {
                    cfg.flank_offsets
                        .iter()
                        .map(move |&o| psd.power[s][h.saturating_add_signed(o)])
                }))
            }))
        })
        .sum::<f64>()
        .sqrt();

    debug!(?top, baseline, "appelbaum metric computed");
    Ok(AppelbaumMetric {
        baseline,
        signal,
        top_sensors: top,
    })
}

/// Per-sensor mean over harmonics of the average of the last two conditions.
pub fn average_harmonic_power(psds: &[PsdMatrix], bins: &[usize]) -> Vec<f64> {
    let [.., high, highest] = psds else {
        return Vec::new();
    };
    (0..highest.power.len())
        .map(|s| mean(bins.iter().map(|&h| (high.power[s][h] + highest.power[s][h]) / 2.0)))
        .collect()
}

/// Indices of the `n` largest values, largest first; ties keep sensor order.
pub fn top_sensors(values: &[f64], n: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    idx.truncate(n);
    idx
}

fn validate(psds: &[PsdMatrix], cfg: &SpectrumConfig) -> Result<(), AppError> {
    if psds.len() < 2 {
        return Err(AppError::new(3, "Appelbaum metric needs at least two conditions."));
    }
    let n_sensors = psds[0].power.len();
    let n_bins = psds[0].n_bins();
    if psds
        .iter()
        .any(|p| p.power.len() != n_sensors || p.n_bins() != n_bins || p.power.iter().any(|r| r.len() != n_bins))
    {
        return Err(AppError::new(3, "PSD matrices must share sensors and frequency bins."));
    }
    if cfg.n_max_sensors > n_sensors {
        return Err(AppError::new(
            3,
            format!("Asked for {} top sensors, PSD has {n_sensors}.", cfg.n_max_sensors),
        ));
    }
    if cfg.harmonic_bins.is_empty() || cfg.flank_offsets.is_empty() {
        return Err(AppError::new(2, "Appelbaum metric needs harmonic bins and flank offsets."));
    }
    for &h in &cfg.harmonic_bins {
        let in_range = |o: isize| h.checked_add_signed(o).is_some_and(|b| b < n_bins);
        if !in_range(0) || !cfg.flank_offsets.iter().all(|&o| in_range(o)) {
            return Err(AppError::new(
                3,
                format!("Harmonic bin {h} or its flanks fall outside the {n_bins} PSD bins."),
            ));
        }
    }
    Ok(())
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two sensors, 8 bins; power = base + bump at bin 4 for each sensor.
    fn psd(bump: [f64; 2]) -> PsdMatrix {
        let row = |b: f64| (0..8).map(|i| if i == 4 { 1.0 + b } else { 1.0 }).collect();
        PsdMatrix {
            sensors: vec!["A".to_string(), "B".to_string()],
            freqs: (0..8).map(|i| i as f64).collect(),
            power: vec![row(bump[0]), row(bump[1])],
        }
    }

    fn cfg() -> SpectrumConfig {
        SpectrumConfig {
            harmonic_bins: vec![4],
            flank_offsets: vec![-3, -2, 2, 3],
            n_max_sensors: 1,
        }
    }

    #[test]
    fn strongest_sensor_drives_the_metric() {
        // Sensor B dominates in the high-contrast conditions.
        let psds = vec![
            psd([0.0, 3.0]),
            psd([0.0, 8.0]),
            psd([0.0, 15.0]),
            psd([5.0, 24.0]),
            psd([5.0, 35.0]),
        ];
        let m = appelbaum_metric(&psds, &cfg()).unwrap();
        assert_eq!(m.top_sensors, vec![1]);
        let expected = [2.0, 3.0, 4.0, 5.0, 6.0];
        for (got, want) in m.signal.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        // Flanks are flat at 1.0.
        assert!((m.baseline - 1.0).abs() < 1e-12);

        let rec = m.into_record("S001");
        assert_eq!(rec.responses.len(), 5);
    }

    #[test]
    fn top_sensors_breaks_ties_by_order() {
        assert_eq!(top_sensors(&[1.0, 3.0, 3.0, 2.0], 2), vec![1, 2]);
    }

    #[test]
    fn flank_outside_spectrum_is_rejected() {
        let psds = vec![psd([0.0, 0.0]); 5];
        let mut c = cfg();
        c.harmonic_bins = vec![6];
        assert_eq!(appelbaum_metric(&psds, &c).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn empty_flanks_are_rejected() {
        let psds = vec![psd([0.0, 1.0]); 5];
        let mut c = cfg();
        c.flank_offsets.clear();
        assert_eq!(appelbaum_metric(&psds, &c).unwrap_err().exit_code(), 2);
    }
}
