//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation and
//! output changes stay localized.

use crate::domain::{AnalysisConfig, SubjectOutcome};
use crate::io::RowError;
use crate::report::ResidualRow;

/// Batch summary: one line per fitted subject, then failures and skipped rows.
pub fn format_batch_summary(outcomes: &[SubjectOutcome], row_errors: &[RowError], config: &AnalysisConfig) -> String {
    let mut out = String::new();
    let fitted = outcomes.iter().filter(|o| o.is_ok()).count();

    out.push_str("=== crf - Naka-Rushton contrast response fit ===\n");
    out.push_str(&format!("Source: {}\n", config.export.source_label));
    out.push_str(&format!("Contrasts: {}\n", fmt_vec(&config.table.contrasts)));
    out.push_str(&format!(
        "Subjects: {} fitted, {} failed\n\n",
        fitted,
        outcomes.len() - fitted
    ));

    out.push_str(
        format!(
            "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10} {:>6}",
            "subj", "semi", "Rmax", "s", "b", "R2", "iter"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<12} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10} {:-<6}\n",
        "", "", "", "", "", "", ""
    ));

    for fit in outcomes.iter().filter_map(|o| o.as_ref().ok()) {
        let p = &fit.result.params;
        out.push_str(&format!(
            "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>6}\n",
            truncate(&fit.record.subject, 12),
            p.semisaturation,
            p.max_amplitude,
            p.saturation_exponent,
            p.baseline,
            fit.result.quality.r_squared,
            fit.result.quality.iterations,
        ));
    }

    let failures: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    if !failures.is_empty() {
        out.push_str("\nFailed:\n");
        for f in failures {
            out.push_str(&format!("- {f}\n"));
        }
    }

    if !row_errors.is_empty() {
        out.push_str("\nSkipped rows:\n");
        for e in row_errors {
            let id = e.id.as_deref().unwrap_or("?");
            out.push_str(&format!("- line {} ({id}): {}\n", e.line, e.message));
        }
    }

    out
}

/// Per-contrast residual table for one subject.
pub fn format_residuals(subject: &str, rows: &[ResidualRow]) -> String {
    let mut out = format!("Residuals for {subject}:\n");
    out.push_str(&format!(
        "{:>8} {:>12} {:>12} {:>12}\n",
        "contrast", "observed", "fitted", "residual"
    ));
    for r in rows {
        out.push_str(&format!(
            "{:>8.2} {:>12.4} {:>12.4} {:>12.4}\n",
            r.contrast, r.observed, r.fitted, r.residual
        ));
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
