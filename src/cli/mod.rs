//! Command-line parsing for the `crf` analysis tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting and I/O code. Flags only override individual fields of the
//! resolved [`AnalysisConfig`](crate::domain::AnalysisConfig).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "crf", version, about = "Naka-Rushton contrast response fitting for MEG SSVEP amplitudes")]
pub struct Cli {
    /// Analysis config (JSON). Falls back to `VSS_CONFIG`, then built-in defaults.
    #[arg(long, global = true, value_name = "JSON")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every subject of an amplitude table and write the results table.
    Fit(FitArgs),
    /// Plot a previously exported curve JSON in the terminal.
    Plot(PlotArgs),
    /// Fit a Gaussian peak to a power spectrum (`freq, power` CSV).
    Peak(PeakArgs),
    /// Compute one amplitude-table row from per-condition PSD matrices.
    Appelbaum(AppelbaumArgs),
    /// Classify behavioral responses and write the per-trial table.
    Rt(RtArgs),
    /// Select epoch events from a trigger event table.
    Segment(SegmentArgs),
    /// Write a synthetic amplitude table.
    Simulate(SimulateArgs),
}

/// Options of the batch fit.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Amplitude table (CSV).
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Results table (CSV).
    #[arg(long, value_name = "CSV", default_value = "crf_results.csv")]
    pub out: PathBuf,

    /// Column prefix of the results table (overrides config).
    #[arg(long)]
    pub prefix: Option<String>,

    /// Amplitude scale applied on ingest (overrides config).
    #[arg(long)]
    pub scale: Option<f64>,

    /// Solver iteration budget (overrides config).
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Write one curve JSON per fitted subject into this directory.
    #[arg(long, value_name = "DIR")]
    pub curves_dir: Option<PathBuf>,

    /// Write one SVG figure per fitted subject into this directory.
    #[arg(long, value_name = "DIR")]
    pub svg_dir: Option<PathBuf>,

    /// Print an ASCII plot per fitted subject.
    #[arg(long)]
    pub ascii: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}

/// Options for plotting a saved curve.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Curve JSON file produced by `crf fit --curves-dir`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct PeakArgs {
    /// Spectrum CSV with `freq` and `power` columns.
    #[arg(long, value_name = "CSV")]
    pub spectrum: PathBuf,

    /// Solver iteration budget (overrides config).
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Args)]
pub struct AppelbaumArgs {
    /// Subject id of the output row.
    #[arg(long)]
    pub subject: String,

    /// One PSD matrix CSV per condition, lowest contrast first.
    #[arg(long = "psd", value_name = "CSV", num_args = 1.., required = true)]
    pub psds: Vec<PathBuf>,

    /// Number of top sensors (overrides config).
    #[arg(long)]
    pub n_max: Option<usize>,

    /// Write the row as an amplitude table.
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RtArgs {
    /// Directory holding the behavior logs.
    #[arg(long, value_name = "DIR")]
    pub logs_dir: PathBuf,

    /// Subjects to process.
    #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
    pub subjects: Vec<String>,

    /// Break info CSV; enables block assignment.
    #[arg(long, value_name = "CSV")]
    pub break_info: Option<PathBuf>,

    /// Per-trial table (CSV).
    #[arg(long, value_name = "CSV", default_value = "response_times.csv")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct SegmentArgs {
    /// Event table CSV (`sample, code`).
    #[arg(long, value_name = "CSV")]
    pub events: PathBuf,

    /// Sampling frequency (Hz).
    #[arg(long)]
    pub sfreq: f64,

    /// Subject whose index correction applies to `--clean`.
    #[arg(long)]
    pub subject: Option<String>,

    /// Clean-trial indices; only these epochs are kept.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub clean: Option<Vec<usize>>,

    /// Selected epoch events (CSV).
    #[arg(long, value_name = "CSV", default_value = "epochs.csv")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Amplitude table to write (CSV, table units).
    #[arg(long, value_name = "CSV", default_value = "simulated.csv")]
    pub out: PathBuf,

    /// Number of subjects.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub subjects: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Noise standard deviation as a fraction of each subject's maximum amplitude.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fit_with_overrides() {
        let cli = Cli::parse_from([
            "crf", "--config", "cfg.json", "fit", "--input", "amp.csv", "--prefix", "AbN3", "--ascii",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.prefix.as_deref(), Some("AbN3"));
        assert_eq!(args.out, PathBuf::from("crf_results.csv"));
        assert!(args.ascii);
    }

    #[test]
    fn parses_subject_list() {
        let cli = Cli::parse_from(["crf", "rt", "--logs-dir", "logs", "--subjects", "C01,P02"]);
        let Command::Rt(args) = cli.command else {
            panic!("expected rt");
        };
        assert_eq!(args.subjects, vec!["C01", "P02"]);
        assert!(args.break_info.is_none());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
