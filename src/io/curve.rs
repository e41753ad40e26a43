//! Read/write curve JSON files.
//!
//! A curve JSON is the portable form of one subject's fit: parameters, fit
//! quality, the observed samples and the model evaluated on a fine contrast
//! grid for plotting. The schema is `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveFile, CurveGrid, ExportConfig, SubjectFit};
use crate::error::AppError;
use crate::fit::evaluate_curve;
use crate::math::lin_space;

/// Assemble the curve file for one subject.
pub fn build_curve_file(fit: &SubjectFit, contrasts: &[f64], export: &ExportConfig) -> Result<CurveFile, AppError> {
    let grid = lin_space(export.grid_min, export.grid_max, export.grid_points)?;
    let response = evaluate_curve(&fit.result.params, &grid);

    Ok(CurveFile {
        tool: "crf".to_string(),
        generated_at: Utc::now(),
        subject: fit.record.subject.clone(),
        source: export.source_label.clone(),
        params: fit.result.params,
        fit_quality: fit.result.quality,
        observed: CurveGrid {
            contrast: contrasts.to_vec(),
            response: fit.record.responses.clone(),
        },
        grid: CurveGrid {
            contrast: grid,
            response,
        },
    })
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))?;
    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid curve JSON: {e}")))?;
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, FitResult, ModelParameters, STUDY_CONTRASTS, SubjectRecord};

    fn sample_fit() -> SubjectFit {
        SubjectFit {
            record: SubjectRecord {
                subject: "012".to_string(),
                baseline: 0.05,
                responses: vec![0.1, 0.3, 0.6, 0.9, 1.0],
            },
            result: FitResult {
                params: ModelParameters {
                    semisaturation: 0.17,
                    max_amplitude: 1.02,
                    saturation_exponent: 1.0,
                    baseline: 0.03,
                },
                quality: FitQuality {
                    rss: 6e-4,
                    tss: 0.59,
                    r_squared: 0.999,
                    n: 5,
                    iterations: 10,
                },
            },
        }
    }

    #[test]
    fn curve_file_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("012.json");
        let curve = build_curve_file(&sample_fit(), &STUDY_CONTRASTS, &ExportConfig::default()).unwrap();
        assert_eq!(curve.grid.contrast.len(), 100);
        assert_eq!(curve.grid.contrast[0], 0.05);
        assert_eq!(curve.grid.contrast[99], 0.8);

        write_curve_json(&path, &curve).unwrap();
        let back = read_curve_json(&path).unwrap();
        assert_eq!(back.subject, "012");
        assert_eq!(back.source, "Appelbaum_Nmax_1");
        assert!((back.params.max_amplitude - 1.02).abs() < 1e-12);
        assert_eq!(back.grid.response.len(), 100);
        for (a, b) in back.grid.response.iter().zip(&curve.grid.response) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_curve_json(&path).unwrap_err().exit_code(), 2);
    }
}
