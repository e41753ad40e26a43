//! Trial epoch segmentation.
//!
//! Stimulus triggers arrive as a flat event table. Each 10 s trial is a run
//! of closely spaced condition triggers; epochs are taken at a fixed stride
//! within a trial, after skipping its first triggers. All gaps and lengths
//! are compared in raw samples.

use tracing::debug;

use crate::domain::{Event, SegmentationConfig};
use crate::error::AppError;

/// Shift every event by the trigger delay, truncated to whole samples.
pub fn shift_events(events: &[Event], delay_ms: f64, sfreq: f64) -> Vec<Event> {
    let shift = (delay_ms / 1000.0 * sfreq) as i64;
    events
        .iter()
        .map(|e| Event {
            sample: e.sample + shift,
            code: e.code,
        })
        .collect()
}

/// Indices of events that start a trial.
///
/// The gap of the first event is measured from sample 0; the first event
/// always starts a trial.
pub fn trial_starts(events: &[Event], gap: i64) -> Vec<usize> {
    let mut starts: Vec<usize> = (0..events.len())
        .filter(|&i| {
            let prev = if i == 0 { 0 } else { events[i - 1].sample };
            events[i].sample - prev > gap
        })
        .collect();
    if !events.is_empty() && starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    starts
}

/// Epoch onsets within the trials starting at `starts`.
///
/// Stops at the end of a trial window or of the table, whichever comes first.
pub fn select_epochs(events: &[Event], starts: &[usize], cfg: &SegmentationConfig) -> Vec<Event> {
    let window = cfg.trial_length - cfg.epoch_length;
    let mut out = Vec::new();
    for &start in starts {
        let start_sample = events[start].sample;
        let mut pos = start + 1 + cfg.skip_initial;
        while pos < events.len() && events[pos].sample - start_sample < window {
            out.push(events[pos]);
            pos += cfg.epoch_step;
        }
    }
    out
}

/// Delay shift, condition filter, trial detection and epoch selection.
pub fn segment_events(events: &[Event], sfreq: f64, cfg: &SegmentationConfig) -> Vec<Event> {
    let shifted = shift_events(events, cfg.trigger_delay_ms, sfreq);
    let valid: Vec<Event> = shifted
        .into_iter()
        .filter(|e| cfg.condition_codes.contains(&e.code))
        .collect();
    let starts = trial_starts(&valid, cfg.trial_gap);
    let epochs = select_epochs(&valid, &starts, cfg);
    debug!(
        events = events.len(),
        valid = valid.len(),
        trials = starts.len(),
        epochs = epochs.len(),
        "events segmented"
    );
    epochs
}

/// Shift clean-trial indices above `cutoff` down by one.
///
/// Used for sessions where one logged trial has no recorded counterpart.
pub fn apply_index_shift(indices: &[usize], cutoff: Option<usize>) -> Vec<usize> {
    match cutoff {
        Some(cutoff) => indices.iter().map(|&i| if i > cutoff { i - 1 } else { i }).collect(),
        None => indices.to_vec(),
    }
}

/// Keep the epochs named by `clean`, in that order.
///
/// An index past the last epoch means the clean list and the event table
/// disagree, so the whole selection is rejected.
pub fn pick_clean_epochs(epochs: &[Event], clean: &[usize]) -> Result<Vec<Event>, AppError> {
    let out_of_range: Vec<usize> = clean.iter().copied().filter(|&i| i >= epochs.len()).collect();
    if !out_of_range.is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "Clean-trial indices {out_of_range:?} are out of range: only {} epochs were segmented.",
                epochs.len()
            ),
        ));
    }
    Ok(clean.iter().map(|&i| epochs[i]).collect())
}
