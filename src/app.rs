//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs the log subscriber
//! - parses CLI arguments and resolves the analysis config
//! - runs the requested workflow
//! - prints reports/plots and writes the outputs

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{AppelbaumArgs, Command, FitArgs, PeakArgs, PlotArgs, RtArgs, SegmentArgs, SimulateArgs};
use crate::domain::AnalysisConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `crf` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    let cli = crate::cli::Cli::parse();
    let mut config = AnalysisConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Fit(args) => handle_fit(args, &mut config),
        Command::Plot(args) => handle_plot(args),
        Command::Peak(args) => handle_peak(args, &mut config),
        Command::Appelbaum(args) => handle_appelbaum(args, &mut config),
        Command::Rt(args) => handle_rt(args, &config),
        Command::Segment(args) => handle_segment(args, &config),
        Command::Simulate(args) => handle_simulate(args, &config),
    }
}

/// Log to stderr so stdout stays clean for reports; `RUST_LOG` overrides `info`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fit(args: FitArgs, config: &mut AnalysisConfig) -> Result<(), AppError> {
    if let Some(prefix) = args.prefix {
        config.export.column_prefix = prefix;
    }
    if let Some(scale) = args.scale {
        config.table.amplitude_scale = scale;
    }
    if let Some(n) = args.max_iterations {
        config.fit.solver.max_iterations = n;
    }
    config.validate()?;

    let run = pipeline::run_fit(&args.input, config)?;
    println!(
        "{}",
        crate::report::format_batch_summary(&run.outcomes, &run.table.row_errors, config)
    );

    let fits = run.fits();
    let contrasts = &config.table.contrasts;
    crate::io::write_results_csv(&args.out, &fits, &config.export.column_prefix)?;
    info!(path = %args.out.display(), rows = fits.len(), "wrote results table");

    for fit in &fits {
        if args.ascii {
            let residuals = crate::report::compute_residuals(fit, contrasts)?;
            println!("{}", crate::report::format_residuals(&fit.record.subject, &residuals));
            println!(
                "{}",
                crate::plot::render_fit_plot(fit, contrasts, args.width, args.height)?
            );
        }
        if let Some(dir) = &args.curves_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| AppError::new(2, format!("Failed to create `{}`: {e}", dir.display())))?;
            let curve = crate::io::build_curve_file(fit, contrasts, &config.export)?;
            let path = dir.join(format!(
                "{}.json",
                crate::plot::figure_title(&fit.record.subject, &config.export)
            ));
            crate::io::write_curve_json(&path, &curve)?;
            info!(subject = %fit.record.subject, path = %path.display(), "wrote curve");
        }
        if let Some(dir) = &args.svg_dir {
            crate::plot::write_fit_svg(dir, fit, contrasts, &config.export)?;
        }
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = crate::io::read_curve_json(&args.curve)?;
    println!(
        "{} ({}) R2={:.4}",
        curve.subject, curve.source, curve.fit_quality.r_squared
    );
    println!(
        "{}",
        crate::plot::render_curve_file_plot(&curve, args.width, args.height)
    );
    Ok(())
}

fn handle_peak(args: PeakArgs, config: &mut AnalysisConfig) -> Result<(), AppError> {
    if let Some(n) = args.max_iterations {
        config.peak.solver.max_iterations = n;
    }
    let (freqs, power) = crate::io::read_spectrum(&args.spectrum)?;
    let peak = crate::fit::fit_peak(&freqs, &power, &config.peak.solver)?;
    info!(path = %args.spectrum.display(), center = peak.center, "peak fitted");
    println!(
        "peak: center={:.4} Hz amplitude={:.6} sigma={:.4} rss={:.6e} iterations={}",
        peak.center, peak.amplitude, peak.sigma, peak.rss, peak.iterations
    );
    Ok(())
}

fn handle_appelbaum(args: AppelbaumArgs, config: &mut AnalysisConfig) -> Result<(), AppError> {
    if let Some(n) = args.n_max {
        config.spectrum.n_max_sensors = n;
    }
    let psds = args
        .psds
        .iter()
        .map(|p| crate::io::read_psd_matrix(p))
        .collect::<Result<Vec<_>, _>>()?;
    let metric = crate::spectrum::appelbaum_metric(&psds, &config.spectrum)?;
    info!(subject = %args.subject, top = ?metric.top_sensors, "appelbaum metric computed");

    let record = metric.into_record(args.subject);
    println!(
        "{}: base={:.6e} signal=[{}]",
        record.subject,
        record.baseline,
        record
            .responses
            .iter()
            .map(|v| format!("{v:.6e}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(out) = &args.out {
        crate::io::write_amplitude_table(out, std::slice::from_ref(&record), &config.table)?;
        info!(path = %out.display(), "wrote amplitude table");
    }
    Ok(())
}

fn handle_rt(args: RtArgs, config: &AnalysisConfig) -> Result<(), AppError> {
    let rows = pipeline::classify_subjects(&args.logs_dir, &args.subjects, args.break_info.as_deref(), config)?;
    crate::io::write_trial_table(&args.out, &rows)?;
    info!(path = %args.out.display(), trials = rows.len(), "wrote trial table");
    Ok(())
}

fn handle_segment(args: SegmentArgs, config: &AnalysisConfig) -> Result<(), AppError> {
    if !(args.sfreq.is_finite() && args.sfreq > 0.0) {
        return Err(AppError::new(2, "Sampling frequency must be finite and > 0."));
    }
    let events = crate::io::read_event_table(&args.events)?;
    let epochs = crate::events::segment_events(&events, args.sfreq, &config.segmentation);

    let selected = match &args.clean {
        Some(clean) => {
            let cutoff = args
                .subject
                .as_deref()
                .and_then(|s| config.subjects.correction(s).index_shift_after);
            let shifted = crate::events::apply_index_shift(clean, cutoff);
            crate::events::pick_clean_epochs(&epochs, &shifted)?
        }
        None => epochs,
    };

    crate::io::write_event_table(&args.out, &selected)?;
    info!(path = %args.out.display(), epochs = selected.len(), "wrote epoch events");
    Ok(())
}

fn handle_simulate(args: SimulateArgs, config: &AnalysisConfig) -> Result<(), AppError> {
    let opts = crate::data::SimulationOptions {
        subjects: args.subjects,
        seed: args.seed,
        noise: args.noise,
        ..crate::data::SimulationOptions::default()
    };
    let subjects = crate::data::simulate_subjects(&opts, &config.table.contrasts)?;
    let rows: Vec<_> = subjects
        .iter()
        .map(|s| crate::data::to_table_units(&s.record, config.table.amplitude_scale))
        .collect();
    crate::io::write_amplitude_table(&args.out, &rows, &config.table)?;
    info!(path = %args.out.display(), subjects = rows.len(), seed = args.seed, "wrote simulated table");
    Ok(())
}
